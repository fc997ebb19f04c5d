//! Senlin clustering profile resource

use crate::api::{ClusteringApi, Profile, ProfileCreateOpts, ProfileSpec};
use crate::provider::check_region;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use stackflow_cloud::{CloudError, ResourceHandler, ResourceState, ResourceStatus, Result};
use std::sync::Arc;

pub const RESOURCE_TYPE: &str = "clustering_profile";

const PROFILE_TYPE: &str = "os.nova.server";
const PROFILE_VERSION: &str = "1.0";

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Declarative profile config. Senlin profiles are immutable, so every
/// field forces a new resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,

    #[serde(default)]
    pub metadata: JsonMap,

    /// Properties of the `os.nova.server` spec
    pub spec: JsonMap,

    pub region: Option<String>,
}

impl ProfileConfig {
    pub fn create_opts(&self) -> ProfileCreateOpts {
        ProfileCreateOpts {
            name: self.name.clone(),
            spec: ProfileSpec {
                profile_type: PROFILE_TYPE.to_string(),
                version: PROFILE_VERSION.into(),
                properties: self.spec.clone(),
            },
            metadata: self.metadata.clone(),
        }
    }
}

/// Normalize a Senlin timestamp to RFC 3339. Senlin omits the offset, in
/// which case UTC is assumed. Unparseable values are kept as-is.
fn rfc3339(raw: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    match chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true),
        Err(e) => {
            tracing::debug!(value = %raw, error = %e, "Unable to parse profile timestamp");
            raw.to_string()
        }
    }
}

/// Clustering profile resource handler
pub struct ProfileHandler {
    api: Arc<dyn ClusteringApi>,
    region: Option<String>,
}

impl ProfileHandler {
    pub fn new(api: Arc<dyn ClusteringApi>, region: Option<String>) -> Self {
        Self { api, region }
    }

    fn snapshot(&self, profile: Profile) -> ResourceState {
        let mut state = ResourceState::new(&profile.id, RESOURCE_TYPE)
            .with_status(ResourceStatus::Active)
            .with_attribute("name", profile.name.into())
            .with_attribute("type", profile.profile_type.into())
            .with_attribute("metadata", profile.metadata.into())
            .with_attribute("spec", profile.spec.properties.into());

        for (key, value) in [
            ("domain", profile.domain),
            ("project", profile.project),
            ("user", profile.user),
        ] {
            if let Some(value) = value {
                state.set_attribute(key, value.into());
            }
        }
        for (key, value) in [
            ("created_at", profile.created_at),
            ("updated_at", profile.updated_at),
        ] {
            if let Some(value) = value {
                state.set_attribute(key, rfc3339(&value).into());
            }
        }
        if let Some(region) = &self.region {
            state.set_attribute("region", region.as_str().into());
        }
        state
    }

    async fn read_back(&self, id: &str) -> Result<ResourceState> {
        self.read(id)
            .await?
            .ok_or_else(|| CloudError::ResourceNotFound(format!("clustering profile {}", id)))
    }
}

#[async_trait]
impl ResourceHandler for ProfileHandler {
    type Config = ProfileConfig;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn force_new_fields(&self) -> &'static [&'static str] {
        &["name", "metadata", "spec", "region"]
    }

    fn validate(&self, config: &ProfileConfig) -> Result<()> {
        check_region(
            RESOURCE_TYPE,
            self.region.as_deref(),
            config.region.as_deref(),
        )
    }

    async fn create(&self, config: &ProfileConfig) -> Result<ResourceState> {
        let opts = config.create_opts();
        tracing::debug!("Clustering profile create options: {:?}", opts);

        let profile = self.api.create_profile(&opts).await?;
        tracing::info!(profile = %profile.id, name = %profile.name, "Created clustering profile");

        self.read_back(&profile.id).await
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        match self.api.get_profile(id).await {
            Ok(profile) => {
                tracing::debug!(profile = %id, "Retrieved clustering profile: {:?}", profile);
                Ok(Some(self.snapshot(profile)))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        id: &str,
        _prior: &ProfileConfig,
        _desired: &ProfileConfig,
    ) -> Result<ResourceState> {
        self.read_back(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.api.delete_profile(id).await {
            Ok(()) => {
                tracing::info!(profile = %id, "Deleted clustering profile");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(profile = %id, "Clustering profile already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
