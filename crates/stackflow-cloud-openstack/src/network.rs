//! Neutron network resource
//!
//! Maps the declarative `network` resource onto Neutron calls. Creation
//! picks between the plain, provider-segment and external-network request
//! shapes, then waits for the network to leave `BUILD`. Deletion is itself a
//! poll: the delete is retried while Neutron reports the network in use, and
//! only a 404 on a later read counts as done.

use crate::api::{Network, NetworkCreateOpts, NetworkUpdateOpts, NetworkingApi, Segment};
use crate::error::{OpenStackError, Result};
use crate::provider::check_region;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackflow_cloud::{
    CloudError, DELETED, PollRequest, ResourceHandler, ResourceState, ResourceStatus,
    StatusFetcher, Timeouts, wait_for_state,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

pub const RESOURCE_TYPE: &str = "network";

const TAG_COLLECTION: &str = "networks";
const WAIT_DELAY: Duration = Duration::from_secs(5);
const WAIT_MIN_INTERVAL: Duration = Duration::from_secs(3);
const DELETING: &str = "DELETING";

/// Boolean that may also be written as a string, as older configs do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolFlag {
    Bool(bool),
    Text(String),
}

impl BoolFlag {
    /// `None` for an empty string, which means "leave it to the server"
    pub fn parse(&self, field: &'static str) -> Result<Option<bool>> {
        match self {
            BoolFlag::Bool(b) => Ok(Some(*b)),
            BoolFlag::Text(s) if s.is_empty() => Ok(None),
            BoolFlag::Text(s) => match s.as_str() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(Some(true)),
                "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(Some(false)),
                _ => Err(OpenStackError::InvalidBool {
                    field,
                    value: s.clone(),
                }),
            },
        }
    }
}

fn parse_flag(flag: &Option<BoolFlag>, field: &'static str) -> Result<Option<bool>> {
    match flag {
        Some(flag) => flag.parse(field),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentConfig {
    pub physical_network: Option<String>,
    pub network_type: Option<String>,
    pub segmentation_id: Option<u32>,
}

impl From<&SegmentConfig> for Segment {
    fn from(s: &SegmentConfig) -> Self {
        Segment {
            physical_network: s.physical_network.clone(),
            network_type: s.network_type.clone(),
            segmentation_id: s.segmentation_id,
        }
    }
}

/// Declarative network config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub admin_state_up: Option<BoolFlag>,
    pub shared: Option<BoolFlag>,
    pub external: Option<bool>,
    pub tenant_id: Option<String>,

    #[serde(default)]
    pub segments: Vec<SegmentConfig>,

    #[serde(default)]
    pub value_specs: BTreeMap<String, String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub availability_zone_hints: Vec<String>,

    pub region: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl NetworkConfig {
    /// Assemble the create request
    pub fn create_opts(&self) -> Result<NetworkCreateOpts> {
        Ok(NetworkCreateOpts {
            name: non_empty(&self.name),
            description: non_empty(&self.description),
            admin_state_up: parse_flag(&self.admin_state_up, "admin_state_up")?,
            shared: parse_flag(&self.shared, "shared")?,
            tenant_id: non_empty(&self.tenant_id),
            availability_zone_hints: self.availability_zone_hints.clone(),
            segments: self.segments.iter().map(Segment::from).collect(),
            external: self.external.filter(|e| *e),
            value_specs: self.value_specs.clone(),
        })
    }

    /// Assemble the update request for the fields that changed since `prior`
    pub fn update_opts(&self, prior: &NetworkConfig) -> Result<NetworkUpdateOpts> {
        let mut opts = NetworkUpdateOpts::default();

        if self.name != prior.name {
            opts.name = Some(self.name.clone().unwrap_or_default());
        }
        if self.description != prior.description {
            opts.description = Some(self.description.clone().unwrap_or_default());
        }
        if self.admin_state_up != prior.admin_state_up {
            opts.admin_state_up = parse_flag(&self.admin_state_up, "admin_state_up")?;
        }
        if self.shared != prior.shared {
            opts.shared = parse_flag(&self.shared, "shared")?;
        }
        if self.external != prior.external {
            opts.external = Some(self.external.unwrap_or(false));
        }

        Ok(opts)
    }

    fn tag_list(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }
}

/// Reports the raw Neutron status of a network
pub struct NetworkStatus<'a> {
    api: &'a dyn NetworkingApi,
}

impl<'a> NetworkStatus<'a> {
    pub fn new(api: &'a dyn NetworkingApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<'a> StatusFetcher for NetworkStatus<'a> {
    async fn fetch(&self, id: &str) -> stackflow_cloud::Result<String> {
        let network = self.api.get_network(id).await?;
        tracing::debug!(network = %id, status = %network.status, "Neutron network status");
        Ok(network.status)
    }
}

/// Drives a network delete: each fetch checks whether the network still
/// exists and, if it does, asks Neutron to delete it.
///
/// A 404 from either call means the network is gone. A 409 means Neutron
/// refused because the network is still in use and surfaces as a conflict,
/// which the delete-mode poll treats as pending. An accepted delete is
/// reported as `DELETING`; only a later 404 confirms it.
pub struct NetworkDeletion<'a> {
    api: &'a dyn NetworkingApi,
}

impl<'a> NetworkDeletion<'a> {
    pub fn new(api: &'a dyn NetworkingApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<'a> StatusFetcher for NetworkDeletion<'a> {
    async fn fetch(&self, id: &str) -> stackflow_cloud::Result<String> {
        let network = self.api.get_network(id).await?;
        tracing::debug!(network = %id, status = %network.status, "Attempting to delete network");

        self.api.delete_network(id).await?;
        tracing::debug!(network = %id, "Delete accepted");
        Ok(DELETING.to_string())
    }
}

/// Network resource handler
pub struct NetworkHandler {
    api: Arc<dyn NetworkingApi>,
    timeouts: Timeouts,
    region: Option<String>,
}

impl NetworkHandler {
    pub fn new(api: Arc<dyn NetworkingApi>, timeouts: Timeouts, region: Option<String>) -> Self {
        Self {
            api,
            timeouts,
            region,
        }
    }

    fn active_request(&self, id: &str) -> PollRequest {
        PollRequest::new(id, self.timeouts.create)
            .pending(["BUILD"])
            .target(["ACTIVE"])
            .failure(["ERROR"])
            .map_status("DOWN", "ACTIVE")
            .initial_delay(WAIT_DELAY)
            .poll_interval(WAIT_MIN_INTERVAL)
            .min_interval(WAIT_MIN_INTERVAL)
    }

    fn delete_request(&self, id: &str) -> PollRequest {
        PollRequest::new(id, self.timeouts.delete)
            .pending(["ACTIVE", DELETING])
            .target([DELETED])
            .delete_mode()
            .initial_delay(WAIT_DELAY)
            .poll_interval(WAIT_MIN_INTERVAL)
            .min_interval(WAIT_MIN_INTERVAL)
    }

    async fn finish_create(&self, id: &str, config: &NetworkConfig) -> stackflow_cloud::Result<()> {
        if !config.tags.is_empty() {
            let tags = self
                .api
                .replace_tags(TAG_COLLECTION, id, &config.tag_list())
                .await?;
            tracing::debug!(network = %id, ?tags, "Set tags on network");
        }

        tracing::debug!(network = %id, "Waiting for network to become available");
        wait_for_state(&self.active_request(id), &NetworkStatus::new(self.api.as_ref()))
            .await?
            .into_result(id)?;
        Ok(())
    }

    fn snapshot(&self, network: Network) -> ResourceState {
        let status = match network.status.as_str() {
            "ACTIVE" | "DOWN" => ResourceStatus::Active,
            "BUILD" => ResourceStatus::Pending,
            _ => ResourceStatus::Unknown,
        };

        let mut state = ResourceState::new(&network.id, RESOURCE_TYPE)
            .with_status(status)
            .with_attribute("name", network.name.into())
            .with_attribute("description", network.description.into())
            .with_attribute(
                "admin_state_up",
                network.admin_state_up.to_string().into(),
            )
            .with_attribute("shared", network.shared.to_string().into())
            .with_attribute("external", network.external.into())
            .with_attribute("tenant_id", network.tenant_id.into())
            .with_attribute("status", network.status.into())
            .with_attribute("tags", network.tags.into())
            .with_attribute(
                "availability_zone_hints",
                network.availability_zone_hints.into(),
            );

        if !network.segments.is_empty() {
            if let Ok(segments) = serde_json::to_value(&network.segments) {
                state.set_attribute("segments", segments);
            }
        }
        if let Some(region) = self.region.as_deref() {
            state.set_attribute("region", region.into());
        }
        state
    }
}

#[async_trait]
impl ResourceHandler for NetworkHandler {
    type Config = NetworkConfig;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn force_new_fields(&self) -> &'static [&'static str] {
        &[
            "region",
            "tenant_id",
            "segments",
            "value_specs",
            "availability_zone_hints",
        ]
    }

    fn validate(&self, config: &NetworkConfig) -> stackflow_cloud::Result<()> {
        check_region(
            RESOURCE_TYPE,
            self.region.as_deref(),
            config.region.as_deref(),
        )
    }

    async fn create(&self, config: &NetworkConfig) -> stackflow_cloud::Result<ResourceState> {
        let opts = config.create_opts()?;
        tracing::debug!(variant = ?opts.variant(), "Create options: {:?}", opts);

        let network = self.api.create_network(&opts).await?;
        let id = network.id.clone();
        tracing::info!(network = %id, "Created network");

        if let Err(e) = self.finish_create(&id, config).await {
            return Err(CloudError::WaitFailed {
                resource_id: id,
                source: Box::new(e),
            });
        }

        self.read(&id).await?.ok_or_else(|| {
            CloudError::ResourceNotFound(format!("network {} vanished after create", id))
        })
    }

    async fn read(&self, id: &str) -> stackflow_cloud::Result<Option<ResourceState>> {
        match self.api.get_network(id).await {
            Ok(network) => {
                tracing::debug!(network = %id, "Retrieved network: {:?}", network);
                Ok(Some(self.snapshot(network)))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        id: &str,
        prior: &NetworkConfig,
        desired: &NetworkConfig,
    ) -> stackflow_cloud::Result<ResourceState> {
        if desired.tags != prior.tags {
            let tags = self
                .api
                .replace_tags(TAG_COLLECTION, id, &desired.tag_list())
                .await?;
            tracing::debug!(network = %id, ?tags, "Updated tags on network");
        }

        let opts = desired.update_opts(prior)?;
        if !opts.is_empty() {
            tracing::debug!(network = %id, "Updating network with options: {:?}", opts);
            self.api.update_network(id, &opts).await?;
        }

        self.read(id)
            .await?
            .ok_or_else(|| CloudError::ResourceNotFound(format!("network {}", id)))
    }

    async fn delete(&self, id: &str) -> stackflow_cloud::Result<()> {
        wait_for_state(&self.delete_request(id), &NetworkDeletion::new(self.api.as_ref())).await?;
        tracing::info!(network = %id, "Deleted network");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNeutron;
    use serde_json::json;

    fn handler(api: Arc<FakeNeutron>) -> NetworkHandler {
        NetworkHandler::new(api, Timeouts::default(), Some("RegionOne".to_string()))
    }

    fn config(value: serde_json::Value) -> NetworkConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_bool_flag_parsing() {
        assert_eq!(BoolFlag::Bool(false).parse("shared").unwrap(), Some(false));
        assert_eq!(
            BoolFlag::Text("true".into()).parse("shared").unwrap(),
            Some(true)
        );
        assert_eq!(BoolFlag::Text("F".into()).parse("shared").unwrap(), Some(false));
        assert_eq!(BoolFlag::Text(String::new()).parse("shared").unwrap(), None);

        let err = BoolFlag::Text("yes".into()).parse("shared").unwrap_err();
        assert!(matches!(err, OpenStackError::InvalidBool { field: "shared", .. }));
    }

    #[test]
    fn test_config_accepts_bool_or_string() {
        let c = config(json!({"admin_state_up": "false", "shared": true}));
        let opts = c.create_opts().unwrap();
        assert_eq!(opts.admin_state_up, Some(false));
        assert_eq!(opts.shared, Some(true));
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let result: std::result::Result<NetworkConfig, _> =
            serde_json::from_value(json!({"nmae": "typo"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_opts_mapping() {
        let c = config(json!({
            "name": "private",
            "description": "",
            "tenant_id": "t-1",
            "external": false,
            "segments": [{"physical_network": "physnet1", "network_type": "vlan", "segmentation_id": 42}],
            "value_specs": {"mtu": "1400"},
            "availability_zone_hints": ["nova"]
        }));

        let opts = c.create_opts().unwrap();
        assert_eq!(opts.name.as_deref(), Some("private"));
        assert_eq!(opts.description, None);
        assert_eq!(opts.tenant_id.as_deref(), Some("t-1"));
        assert_eq!(opts.external, None);
        assert_eq!(opts.segments.len(), 1);
        assert_eq!(opts.segments[0].segmentation_id, Some(42));
        assert_eq!(opts.value_specs["mtu"], "1400");
        assert_eq!(opts.variant(), crate::api::CreateVariant::Provider);
    }

    #[test]
    fn test_create_opts_rejects_bad_bool() {
        let c = config(json!({"admin_state_up": "up"}));
        let err = c.create_opts().unwrap_err();
        assert!(err.to_string().starts_with("admin_state_up, if provided"));
    }

    #[test]
    fn test_update_opts_only_changed_fields() {
        let prior = config(json!({"name": "a", "description": "d", "external": true}));
        let desired = config(json!({"name": "b", "description": "d", "shared": "true"}));

        let opts = desired.update_opts(&prior).unwrap();
        assert_eq!(opts.name.as_deref(), Some("b"));
        assert_eq!(opts.description, None);
        assert_eq!(opts.shared, Some(true));
        assert_eq!(opts.external, Some(false));
        assert_eq!(opts.admin_state_up, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_active() {
        let api = Arc::new(FakeNeutron::new());
        api.script_statuses(&["BUILD", "BUILD", "ACTIVE"]);
        let handler = handler(api.clone());

        let c = config(json!({"name": "private", "tags": ["b", "a"], "admin_state_up": "true"}));
        let state = handler.create(&c).await.unwrap();

        assert_eq!(state.status, ResourceStatus::Active);
        assert_eq!(state.get_attribute::<String>("name").as_deref(), Some("private"));
        assert_eq!(state.get_attribute::<String>("admin_state_up").as_deref(), Some("true"));
        assert_eq!(
            state.get_attribute::<Vec<String>>("tags"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(state.get_attribute::<String>("region").as_deref(), Some("RegionOne"));

        let created = api.created_bodies();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0]["network"]["admin_state_up"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_treats_down_as_active() {
        let api = Arc::new(FakeNeutron::new());
        api.script_statuses(&["BUILD", "DOWN"]);

        let state = handler(api).create(&NetworkConfig::default()).await.unwrap();

        assert_eq!(state.status, ResourceStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_error_state_reports_id() {
        let api = Arc::new(FakeNeutron::new());
        api.script_statuses(&["BUILD", "ERROR"]);

        let err = handler(api).create(&NetworkConfig::default()).await.unwrap_err();

        match err {
            CloudError::WaitFailed { resource_id, .. } => assert_eq!(resource_id, "net-1"),
            other => panic!("expected WaitFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_timeout_reports_id() {
        let api = Arc::new(FakeNeutron::new());
        api.script_statuses(&["BUILD"]);
        let handler = NetworkHandler::new(
            api,
            Timeouts {
                create: Duration::from_secs(30),
                ..Default::default()
            },
            None,
        );

        let err = handler.create(&NetworkConfig::default()).await.unwrap_err();

        match err {
            CloudError::WaitFailed { resource_id, source } => {
                assert_eq!(resource_id, "net-1");
                assert!(source.is_timeout());
            }
            other => panic!("expected WaitFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_invalid_config_makes_no_calls() {
        let api = Arc::new(FakeNeutron::new());
        let c = config(json!({"shared": "sometimes"}));

        let err = handler(api.clone()).create(&c).await.unwrap_err();

        assert!(matches!(err, CloudError::InvalidConfig(_)));
        assert!(api.created_bodies().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_network() {
        let api = Arc::new(FakeNeutron::new());
        assert!(handler(api).read("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_propagates_other_errors() {
        let api = Arc::new(FakeNeutron::new());
        api.fail_gets_with(503);

        let err = handler(api).read("net-1").await.unwrap_err();
        assert!(matches!(err, CloudError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_update_sends_changes_and_tags() {
        let api = Arc::new(FakeNeutron::new());
        api.insert(Network {
            id: "net-1".to_string(),
            name: "old".to_string(),
            status: "ACTIVE".to_string(),
            ..Default::default()
        });
        let handler = handler(api.clone());

        let prior = config(json!({"name": "old"}));
        let desired = config(json!({"name": "new", "tags": ["x"]}));
        let state = handler.update("net-1", &prior, &desired).await.unwrap();

        assert_eq!(state.get_attribute::<String>("name").as_deref(), Some("new"));
        assert_eq!(state.get_attribute::<Vec<String>>("tags"), Some(vec!["x".to_string()]));
        assert_eq!(api.updated_bodies(), vec![json!({"network": {"name": "new"}})]);
    }

    #[tokio::test]
    async fn test_update_tags_only_skips_put() {
        let api = Arc::new(FakeNeutron::new());
        api.insert(Network {
            id: "net-1".to_string(),
            status: "ACTIVE".to_string(),
            ..Default::default()
        });

        let prior = config(json!({"tags": ["x"]}));
        let desired = config(json!({"tags": ["x", "y"]}));
        handler(api.clone())
            .update("net-1", &prior, &desired)
            .await
            .unwrap();

        assert!(api.updated_bodies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_retries_while_in_use() {
        let api = Arc::new(FakeNeutron::new());
        api.insert(Network {
            id: "net-1".to_string(),
            status: "ACTIVE".to_string(),
            ..Default::default()
        });
        api.conflict_deletes(2);

        handler(api.clone()).delete("net-1").await.unwrap();

        assert_eq!(api.delete_calls(), 3);
        assert!(!api.contains("net-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_already_gone() {
        let api = Arc::new(FakeNeutron::new());

        handler(api.clone()).delete("net-1").await.unwrap();

        assert_eq!(api.delete_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_times_out_while_in_use() {
        let api = Arc::new(FakeNeutron::new());
        api.insert(Network {
            id: "net-1".to_string(),
            status: "ACTIVE".to_string(),
            ..Default::default()
        });
        api.conflict_deletes(u32::MAX);
        let handler = NetworkHandler::new(
            api,
            Timeouts {
                delete: Duration::from_secs(60),
                ..Default::default()
            },
            None,
        );

        let err = handler.delete("net-1").await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_fails_fast_on_server_error() {
        let api = Arc::new(FakeNeutron::new());
        api.insert(Network {
            id: "net-1".to_string(),
            status: "ACTIVE".to_string(),
            ..Default::default()
        });
        api.fail_deletes_with(500);

        let err = handler(api.clone()).delete("net-1").await.unwrap_err();

        assert!(matches!(err, CloudError::ApiError(_)));
        assert_eq!(api.delete_calls(), 1);
    }
}
