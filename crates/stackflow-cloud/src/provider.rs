//! Cloud provider trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::Result;
use crate::state::ProviderState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cloud provider abstraction trait
///
/// A provider owns the resource handlers for one control plane and turns a
/// desired [`ResourceSet`] into remote changes, keeping a [`ProviderState`]
/// up to date as it goes.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name used in state keys (e.g., "openstack")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Re-read every tracked resource, dropping the ones the remote lost
    async fn refresh(&self, state: &mut ProviderState) -> Result<()>;

    /// Calculate the actions needed to go from `current` to `desired`
    async fn plan(&self, desired: &ResourceSet, current: &ProviderState) -> Result<Plan>;

    /// Apply the planned actions, recording every change in `state`
    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut ProviderState,
    ) -> Result<ApplyResult>;

    /// Destroy one tracked resource by key (`type:name`)
    async fn destroy(&self, key: &str, state: &mut ProviderState) -> Result<()>;

    /// Destroy every tracked resource
    async fn destroy_all(&self, state: &mut ProviderState) -> Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        let keys: Vec<String> = state.iter().map(|(k, _)| k.clone()).collect();
        for key in keys {
            match self.destroy(&key, state).await {
                Ok(()) => result.add_success(&key, "deleted"),
                Err(e) => result.add_failure(&key, e),
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }
}

/// Set of resources to be managed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by `type:name`
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn get(&self, key: &str) -> Option<&ResourceConfig> {
        self.resources.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources handled by one provider
    pub fn for_provider(&self, provider: &str) -> ResourceSet {
        ResourceSet {
            resources: self
                .resources
                .iter()
                .filter(|(_, r)| r.provider == provider)
                .map(|(k, r)| (k.clone(), r.clone()))
                .collect(),
        }
    }
}

/// Declarative configuration for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "network", "clustering_profile")
    pub resource_type: String,

    /// Name of the resource in the manifest
    pub name: String,

    /// Provider name
    pub provider: String,

    /// Resource-specific configuration
    pub config: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            config,
        }
    }

    /// Get the full resource key (type:name)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.name)
    }
}
