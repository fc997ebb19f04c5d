//! OpenStack HTTP client
//!
//! Direct Neutron / Senlin REST implementation. Authenticates every request
//! with a pre-issued Keystone token in the `X-Auth-Token` header.

use crate::api::{
    ClusteringApi, Network, NetworkCreateOpts, NetworkUpdateOpts, NetworkingApi, Profile,
    ProfileCreateOpts,
};
use crate::error::{OpenStackError, Result};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const AUTH_HEADER: &str = "X-Auth-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY: usize = 200;

/// Connection settings for [`OpenStackClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub auth_token: String,

    /// Neutron endpoint, e.g. `https://cloud.example.com:9696`
    pub networking_endpoint: Option<String>,

    /// Senlin endpoint, e.g. `https://cloud.example.com:8778`
    pub clustering_endpoint: Option<String>,
}

/// OpenStack REST client
pub struct OpenStackClient {
    http: reqwest::Client,
    auth_token: String,
    networking_endpoint: Option<String>,
    clustering_endpoint: Option<String>,
}

#[derive(Deserialize)]
struct NetworkEnvelope {
    network: Network,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    profile: Profile,
}

#[derive(Deserialize)]
struct TagsEnvelope {
    tags: Vec<String>,
}

impl OpenStackClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.auth_token.trim().is_empty() {
            return Err(OpenStackError::InvalidConfig(
                "auth token must not be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            auth_token: config.auth_token,
            networking_endpoint: config.networking_endpoint.map(trim_endpoint),
            clustering_endpoint: config.clustering_endpoint.map(trim_endpoint),
        })
    }

    fn networking_url(&self, path: &str) -> Result<String> {
        let base = self
            .networking_endpoint
            .as_deref()
            .ok_or(OpenStackError::MissingEndpoint("networking"))?;
        Ok(format!("{}/v2.0/{}", base, path))
    }

    fn clustering_url(&self, path: &str) -> Result<String> {
        let base = self
            .clustering_endpoint
            .as_deref()
            .ok_or(OpenStackError::MissingEndpoint("clustering"))?;
        Ok(format!("{}/v1/{}", base, path))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTH_HEADER, &self.auth_token)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        tracing::debug!(status = status.as_u16(), "{} {} failed: {}", method, url, message);

        Err(OpenStackError::Api {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.send(method, url, body).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl NetworkingApi for OpenStackClient {
    async fn get_network(&self, id: &str) -> Result<Network> {
        let url = self.networking_url(&format!("networks/{}", id))?;
        let envelope: NetworkEnvelope = self.send_json(Method::GET, &url, None).await?;
        Ok(envelope.network)
    }

    async fn create_network(&self, opts: &NetworkCreateOpts) -> Result<Network> {
        let url = self.networking_url("networks")?;
        let body = opts.to_body()?;
        let envelope: NetworkEnvelope = self.send_json(Method::POST, &url, Some(&body)).await?;
        Ok(envelope.network)
    }

    async fn update_network(&self, id: &str, opts: &NetworkUpdateOpts) -> Result<Network> {
        let url = self.networking_url(&format!("networks/{}", id))?;
        let body = opts.to_body()?;
        let envelope: NetworkEnvelope = self.send_json(Method::PUT, &url, Some(&body)).await?;
        Ok(envelope.network)
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        let url = self.networking_url(&format!("networks/{}", id))?;
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn replace_tags(
        &self,
        resource_type: &str,
        id: &str,
        tags: &[String],
    ) -> Result<Vec<String>> {
        let url = self.networking_url(&format!("{}/{}/tags", resource_type, id))?;
        let body = serde_json::json!({ "tags": tags });
        let envelope: TagsEnvelope = self.send_json(Method::PUT, &url, Some(&body)).await?;
        Ok(envelope.tags)
    }
}

#[async_trait]
impl ClusteringApi for OpenStackClient {
    async fn get_profile(&self, id: &str) -> Result<Profile> {
        let url = self.clustering_url(&format!("profiles/{}", id))?;
        let envelope: ProfileEnvelope = self.send_json(Method::GET, &url, None).await?;
        Ok(envelope.profile)
    }

    async fn create_profile(&self, opts: &ProfileCreateOpts) -> Result<Profile> {
        let url = self.clustering_url("profiles")?;
        let body = opts.to_body()?;
        let envelope: ProfileEnvelope = self.send_json(Method::POST, &url, Some(&body)).await?;
        Ok(envelope.profile)
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        let url = self.clustering_url(&format!("profiles/{}", id))?;
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }
}

fn trim_endpoint(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Pull the human readable message out of an OpenStack error body.
///
/// Neutron wraps it in `NeutronError`, Senlin in `error`; some proxies return
/// plain text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/NeutronError/message")
            .or_else(|| value.pointer("/error/message"))
            .or_else(|| value.pointer("/message"))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return Some(message.to_string());
        }
    }

    Some(body.chars().take(MAX_ERROR_BODY).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer exactly one HTTP request with a canned response and hand back the raw request
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}/", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn client(networking: Option<String>, clustering: Option<String>) -> OpenStackClient {
        OpenStackClient::new(ClientConfig {
            auth_token: "secret-token".to_string(),
            networking_endpoint: networking,
            clustering_endpoint: clustering,
        })
        .unwrap()
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"NeutronError": {"type": "NetworkInUse", "message": "Unable to complete operation on network", "detail": ""}}"#)
                .as_deref(),
            Some("Unable to complete operation on network")
        );
        assert_eq!(
            error_message(r#"{"code": 404, "error": {"code": 404, "message": "The profile could not be found.", "type": "ResourceNotFound"}}"#)
                .as_deref(),
            Some("The profile could not be found.")
        );
        assert_eq!(error_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message("   "), None);
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = OpenStackClient::new(ClientConfig {
            auth_token: " ".to_string(),
            networking_endpoint: None,
            clustering_endpoint: None,
        })
        .err()
        .unwrap();
        assert!(matches!(err, OpenStackError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_missing_endpoint() {
        let client = client(None, None);
        let err = client.get_network("abc").await.unwrap_err();
        assert!(matches!(err, OpenStackError::MissingEndpoint("networking")));

        let err = client.get_profile("abc").await.unwrap_err();
        assert!(matches!(err, OpenStackError::MissingEndpoint("clustering")));
    }

    #[tokio::test]
    async fn test_get_network() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"network": {"id": "abc", "name": "private", "status": "BUILD", "admin_state_up": true}}"#,
        )
        .await;

        let network = client(Some(endpoint), None).get_network("abc").await.unwrap();
        assert_eq!(network.id, "abc");
        assert_eq!(network.status, "BUILD");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /v2.0/networks/abc http/1.1"));
        assert!(request.contains("x-auth-token: secret-token"));
    }

    #[tokio::test]
    async fn test_get_network_not_found() {
        let (endpoint, server) = serve_once(
            "404 Not Found",
            r#"{"NeutronError": {"type": "NetworkNotFound", "message": "Network abc could not be found.", "detail": ""}}"#,
        )
        .await;

        let err = client(Some(endpoint), None)
            .get_network("abc")
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("Network abc could not be found."));
    }

    #[tokio::test]
    async fn test_delete_network_conflict() {
        let (endpoint, server) = serve_once(
            "409 Conflict",
            r#"{"NeutronError": {"type": "NetworkInUse", "message": "One or more ports have an IP allocation from this subnet.", "detail": ""}}"#,
        )
        .await;

        let err = client(Some(endpoint), None)
            .delete_network("abc")
            .await
            .unwrap_err();
        let request = server.await.unwrap();

        assert!(err.is_conflict());
        assert!(request.starts_with("DELETE /v2.0/networks/abc"));
    }

    #[tokio::test]
    async fn test_create_network_sends_envelope() {
        let (endpoint, server) = serve_once(
            "201 Created",
            r#"{"network": {"id": "new-id", "name": "private", "status": "BUILD"}}"#,
        )
        .await;

        let opts = NetworkCreateOpts {
            name: Some("private".to_string()),
            external: Some(true),
            ..Default::default()
        };
        let network = client(Some(endpoint), None)
            .create_network(&opts)
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert_eq!(network.id, "new-id");
        assert!(request.starts_with("POST /v2.0/networks HTTP/1.1"));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["network"]["router:external"], true);
    }

    #[tokio::test]
    async fn test_delete_profile_no_content() {
        let (endpoint, server) = serve_once("204 No Content", "").await;

        client(None, Some(endpoint))
            .delete_profile("p-1")
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("DELETE /v1/profiles/p-1"));
    }
}
