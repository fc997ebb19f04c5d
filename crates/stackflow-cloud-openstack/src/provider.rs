//! OpenStack provider implementation

use crate::api::{ClusteringApi, NetworkingApi};
use crate::client::OpenStackClient;
use crate::network::{self, NetworkHandler};
use crate::profile::{self, ProfileHandler};
use async_trait::async_trait;
use stackflow_cloud::resource::{apply_action, plan_action, refresh_resource};
use stackflow_cloud::{
    Action, ActionType, ApplyResult, CloudError, CloudProvider, Plan, ProviderState,
    ResourceConfig, ResourceSet, Result, Timeouts,
};
use std::sync::Arc;

pub const PROVIDER_NAME: &str = "openstack";

/// A resource may only name the region the provider's endpoints belong to
pub(crate) fn check_region(
    resource_type: &str,
    configured: Option<&str>,
    requested: Option<&str>,
) -> Result<()> {
    match (requested, configured) {
        (None, _) => Ok(()),
        (Some(requested), Some(configured)) if requested == configured => Ok(()),
        (Some(requested), configured) => Err(CloudError::InvalidConfig(format!(
            "{} region {} does not match the provider region {}",
            resource_type,
            requested,
            configured.unwrap_or("(unset)")
        ))),
    }
}

/// OpenStack provider: Neutron networks and Senlin clustering profiles
pub struct OpenStackProvider {
    network: NetworkHandler,
    profile: ProfileHandler,
}

impl OpenStackProvider {
    pub fn new(client: OpenStackClient, region: Option<String>, timeouts: Timeouts) -> Self {
        let client = Arc::new(client);
        Self::with_apis(client.clone(), client, region, timeouts)
    }

    /// Build the provider on arbitrary API implementations
    pub fn with_apis(
        networking: Arc<dyn NetworkingApi>,
        clustering: Arc<dyn ClusteringApi>,
        region: Option<String>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            network: NetworkHandler::new(networking, timeouts, region.clone()),
            profile: ProfileHandler::new(clustering, region),
        }
    }

    /// Resource types this provider can manage
    pub fn resource_types() -> &'static [&'static str] {
        &[network::RESOURCE_TYPE, profile::RESOURCE_TYPE]
    }

    fn plan_one(&self, desired: &ResourceConfig, current: &ProviderState) -> Result<Action> {
        let current = current.get(&desired.key());
        match desired.resource_type.as_str() {
            network::RESOURCE_TYPE => plan_action(&self.network, desired, current),
            profile::RESOURCE_TYPE => plan_action(&self.profile, desired, current),
            other => Err(CloudError::UnsupportedResource(other.to_string())),
        }
    }

    async fn apply_one(
        &self,
        action: &Action,
        desired: Option<&ResourceConfig>,
        state: &mut ProviderState,
    ) -> Result<String> {
        match action.resource_type.as_str() {
            network::RESOURCE_TYPE => apply_action(&self.network, action, desired, state).await,
            profile::RESOURCE_TYPE => apply_action(&self.profile, action, desired, state).await,
            other => Err(CloudError::UnsupportedResource(other.to_string())),
        }
    }
}

#[async_trait]
impl CloudProvider for OpenStackProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "OpenStack"
    }

    async fn refresh(&self, state: &mut ProviderState) -> Result<()> {
        let tracked: Vec<(String, String)> = state
            .iter()
            .map(|(k, r)| (k.clone(), r.resource_type.clone()))
            .collect();

        for (key, resource_type) in tracked {
            tracing::debug!(resource = %key, "Refreshing");
            match resource_type.as_str() {
                network::RESOURCE_TYPE => refresh_resource(&self.network, &key, state).await?,
                profile::RESOURCE_TYPE => refresh_resource(&self.profile, &key, state).await?,
                other => {
                    tracing::warn!(resource = %key, "Skipping unsupported resource type {}", other)
                }
            }
        }
        Ok(())
    }

    async fn plan(&self, desired: &ResourceSet, current: &ProviderState) -> Result<Plan> {
        let desired = desired.for_provider(PROVIDER_NAME);
        let mut actions = Vec::new();

        for resource in desired.iter() {
            actions.push(self.plan_one(resource, current)?);
        }

        // Tracked but no longer declared
        for (key, resource) in current.iter() {
            if desired.get(key).is_none() {
                actions.push(
                    Action::new(ActionType::Delete, &resource.resource_type, key)
                        .with_remote_id(&resource.id),
                );
            }
        }

        Ok(Plan::new(actions))
    }

    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut ProviderState,
    ) -> Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for action in plan.changes() {
            let key = action.resource_key.as_str();
            tracing::info!("{}", action.describe());

            match self.apply_one(action, desired.get(key), state).await {
                Ok(message) => result.add_success(key, message),
                Err(e) => {
                    tracing::warn!(resource = %key, error = %e, "Action failed");
                    result.add_failure(key, e);
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn destroy(&self, key: &str, state: &mut ProviderState) -> Result<()> {
        let resource = state
            .get(key)
            .ok_or_else(|| CloudError::ResourceNotFound(key.to_string()))?;
        let action = Action::new(ActionType::Delete, &resource.resource_type, key)
            .with_remote_id(&resource.id);

        let message = self.apply_one(&action, None, state).await?;
        tracing::info!(resource = %key, "{}", message);
        Ok(())
    }
}
