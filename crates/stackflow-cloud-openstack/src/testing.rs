//! In-memory Neutron and Senlin stand-ins for handler tests

use crate::api::{
    ClusteringApi, Network, NetworkCreateOpts, NetworkUpdateOpts, NetworkingApi, Profile,
    ProfileCreateOpts,
};
use crate::error::{OpenStackError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

fn api_error(method: &str, url: String, status: u16) -> OpenStackError {
    OpenStackError::Api {
        method: method.to_string(),
        url,
        status,
        message: "fake".to_string(),
    }
}

#[derive(Default)]
struct NeutronState {
    networks: BTreeMap<String, Network>,
    statuses: VecDeque<String>,
    next_id: u32,
    created: Vec<serde_json::Value>,
    updated: Vec<serde_json::Value>,
    delete_calls: u32,
    conflicts_left: u32,
    get_failure: Option<u16>,
    delete_failure: Option<u16>,
}

/// Fake Neutron. Networks get IDs `net-1`, `net-2`, ... and, once
/// [`FakeNeutron::script_statuses`] is used, report the scripted statuses
/// one read at a time, repeating the last one.
#[derive(Default)]
pub struct FakeNeutron {
    inner: Mutex<NeutronState>,
}

impl FakeNeutron {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_statuses(&self, statuses: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner.statuses = statuses.iter().map(|s| s.to_string()).collect();
    }

    pub fn insert(&self, network: Network) {
        let mut inner = self.inner.lock().unwrap();
        inner.networks.insert(network.id.clone(), network);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().unwrap().networks.contains_key(id)
    }

    /// Answer the next `count` deletes with 409
    pub fn conflict_deletes(&self, count: u32) {
        self.inner.lock().unwrap().conflicts_left = count;
    }

    pub fn fail_gets_with(&self, status: u16) {
        self.inner.lock().unwrap().get_failure = Some(status);
    }

    pub fn fail_deletes_with(&self, status: u16) {
        self.inner.lock().unwrap().delete_failure = Some(status);
    }

    pub fn created_bodies(&self) -> Vec<serde_json::Value> {
        self.inner.lock().unwrap().created.clone()
    }

    pub fn updated_bodies(&self) -> Vec<serde_json::Value> {
        self.inner.lock().unwrap().updated.clone()
    }

    pub fn delete_calls(&self) -> u32 {
        self.inner.lock().unwrap().delete_calls
    }
}

#[async_trait]
impl NetworkingApi for FakeNeutron {
    async fn get_network(&self, id: &str) -> Result<Network> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.get_failure {
            return Err(api_error("GET", format!("networks/{id}"), status));
        }

        let scripted = if inner.statuses.len() > 1 {
            inner.statuses.pop_front()
        } else {
            inner.statuses.front().cloned()
        };
        let network = inner
            .networks
            .get_mut(id)
            .ok_or_else(|| api_error("GET", format!("networks/{id}"), 404))?;
        if let Some(status) = scripted {
            network.status = status;
        }
        Ok(network.clone())
    }

    async fn create_network(&self, opts: &NetworkCreateOpts) -> Result<Network> {
        let body = opts.to_body()?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;

        let network = Network {
            id: format!("net-{}", inner.next_id),
            name: opts.name.clone().unwrap_or_default(),
            description: opts.description.clone().unwrap_or_default(),
            admin_state_up: opts.admin_state_up.unwrap_or(true),
            status: "BUILD".to_string(),
            shared: opts.shared.unwrap_or(false),
            tenant_id: opts.tenant_id.clone().unwrap_or_default(),
            external: opts.external.unwrap_or(false),
            tags: Vec::new(),
            availability_zone_hints: opts.availability_zone_hints.clone(),
            segments: opts.segments.clone(),
        };
        inner.created.push(body);
        inner.networks.insert(network.id.clone(), network.clone());
        Ok(network)
    }

    async fn update_network(&self, id: &str, opts: &NetworkUpdateOpts) -> Result<Network> {
        let body = opts.to_body()?;
        let mut inner = self.inner.lock().unwrap();
        inner.updated.push(body);

        let network = inner
            .networks
            .get_mut(id)
            .ok_or_else(|| api_error("PUT", format!("networks/{id}"), 404))?;
        if let Some(name) = &opts.name {
            network.name = name.clone();
        }
        if let Some(description) = &opts.description {
            network.description = description.clone();
        }
        if let Some(up) = opts.admin_state_up {
            network.admin_state_up = up;
        }
        if let Some(shared) = opts.shared {
            network.shared = shared;
        }
        if let Some(external) = opts.external {
            network.external = external;
        }
        Ok(network.clone())
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_calls += 1;

        if let Some(status) = inner.delete_failure {
            return Err(api_error("DELETE", format!("networks/{id}"), status));
        }
        if inner.conflicts_left > 0 {
            inner.conflicts_left -= 1;
            return Err(api_error("DELETE", format!("networks/{id}"), 409));
        }
        inner
            .networks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| api_error("DELETE", format!("networks/{id}"), 404))
    }

    async fn replace_tags(
        &self,
        resource_type: &str,
        id: &str,
        tags: &[String],
    ) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().unwrap();
        let network = inner
            .networks
            .get_mut(id)
            .ok_or_else(|| api_error("PUT", format!("{resource_type}/{id}/tags"), 404))?;
        network.tags = tags.to_vec();
        Ok(network.tags.clone())
    }
}

#[derive(Default)]
struct SenlinState {
    profiles: BTreeMap<String, Profile>,
    next_id: u32,
    create_calls: u32,
    delete_failure: Option<u16>,
}

/// Fake Senlin. Profiles get IDs `profile-1`, `profile-2`, ...
#[derive(Default)]
pub struct FakeSenlin {
    inner: Mutex<SenlinState>,
}

impl FakeSenlin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> u32 {
        self.inner.lock().unwrap().create_calls
    }

    pub fn fail_deletes_with(&self, status: u16) {
        self.inner.lock().unwrap().delete_failure = Some(status);
    }
}

#[async_trait]
impl ClusteringApi for FakeSenlin {
    async fn get_profile(&self, id: &str) -> Result<Profile> {
        self.inner
            .lock()
            .unwrap()
            .profiles
            .get(id)
            .cloned()
            .ok_or_else(|| api_error("GET", format!("profiles/{id}"), 404))
    }

    async fn create_profile(&self, opts: &ProfileCreateOpts) -> Result<Profile> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        inner.create_calls += 1;

        let profile = Profile {
            id: format!("profile-{}", inner.next_id),
            name: opts.name.clone(),
            profile_type: format!(
                "{}-{}",
                opts.spec.profile_type,
                opts.spec.version.as_str().unwrap_or_default()
            ),
            domain: None,
            project: Some("demo".to_string()),
            user: Some("admin".to_string()),
            metadata: opts.metadata.clone(),
            spec: opts.spec.clone(),
            created_at: Some("2016-01-03T16:22:23Z".to_string()),
            updated_at: None,
        };
        inner.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(status) = inner.delete_failure {
            return Err(api_error("DELETE", format!("profiles/{id}"), status));
        }
        inner
            .profiles
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| api_error("DELETE", format!("profiles/{id}"), 404))
    }
}
