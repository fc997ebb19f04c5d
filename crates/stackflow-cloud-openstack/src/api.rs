//! Control-plane API surface and wire types
//!
//! The traits here are the only way the resource handlers talk to OpenStack.
//! [`crate::client::OpenStackClient`] implements them over HTTP; tests
//! substitute in-memory fakes.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Neutron (networking v2) operations
#[async_trait]
pub trait NetworkingApi: Send + Sync {
    async fn get_network(&self, id: &str) -> Result<Network>;

    async fn create_network(&self, opts: &NetworkCreateOpts) -> Result<Network>;

    async fn update_network(&self, id: &str, opts: &NetworkUpdateOpts) -> Result<Network>;

    async fn delete_network(&self, id: &str) -> Result<()>;

    /// Replace every tag on a resource (`resource_type` is the URL collection, e.g. "networks")
    async fn replace_tags(
        &self,
        resource_type: &str,
        id: &str,
        tags: &[String],
    ) -> Result<Vec<String>>;
}

/// Senlin (clustering v1) operations
#[async_trait]
pub trait ClusteringApi: Send + Sync {
    async fn get_profile(&self, id: &str) -> Result<Profile>;

    async fn create_profile(&self, opts: &ProfileCreateOpts) -> Result<Profile>;

    async fn delete_profile(&self, id: &str) -> Result<()>;
}

/// Provider network segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(
        rename = "provider:physical_network",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub physical_network: Option<String>,

    #[serde(
        rename = "provider:network_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub network_type: Option<String>,

    #[serde(
        rename = "provider:segmentation_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub segmentation_id: Option<u32>,
}

/// Network as returned by Neutron
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub admin_state_up: bool,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub shared: bool,

    #[serde(default)]
    pub tenant_id: String,

    #[serde(rename = "router:external", default)]
    pub external: bool,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub availability_zone_hints: Vec<String>,

    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Which create request shape a [`NetworkCreateOpts`] produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateVariant {
    Plain,
    /// Provider extension: explicit segments
    Provider,
    /// External-network extension: `router:external`
    External,
    ProviderExternal,
}

/// Request body for `POST /v2.0/networks`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkCreateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub availability_zone_hints: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,

    #[serde(rename = "router:external", skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,

    /// Extra top-level keys passed through verbatim; they win over typed fields
    #[serde(skip)]
    pub value_specs: BTreeMap<String, String>,
}

impl NetworkCreateOpts {
    pub fn variant(&self) -> CreateVariant {
        match (!self.segments.is_empty(), self.external == Some(true)) {
            (false, false) => CreateVariant::Plain,
            (true, false) => CreateVariant::Provider,
            (false, true) => CreateVariant::External,
            (true, true) => CreateVariant::ProviderExternal,
        }
    }

    /// Full request body including the `network` envelope
    pub fn to_body(&self) -> Result<serde_json::Value> {
        let mut network = serde_json::to_value(self)?;
        if let Some(map) = network.as_object_mut() {
            for (k, v) in &self.value_specs {
                map.insert(k.clone(), serde_json::Value::String(v.clone()));
            }
        }
        Ok(serde_json::json!({ "network": network }))
    }
}

/// Request body for `PUT /v2.0/networks/{id}`; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkUpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,

    #[serde(rename = "router:external", skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
}

impl NetworkUpdateOpts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "network": serde_json::to_value(self)? }))
    }
}

/// Profile spec as understood by Senlin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    #[serde(rename = "type")]
    pub profile_type: String,

    /// Senlin echoes this back as either a string or a number
    pub version: serde_json::Value,

    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Profile as returned by Senlin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub profile_type: String,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    pub spec: ProfileSpec,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Request body for `POST /v1/profiles`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileCreateOpts {
    pub name: String,

    pub spec: ProfileSpec,

    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ProfileCreateOpts {
    pub fn to_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "profile": serde_json::to_value(self)? }))
    }
}
