//! Resource handler abstraction
//!
//! A [`ResourceHandler`] maps one declarative resource kind onto the
//! create/read/update/delete calls of a control-plane API. The free functions
//! in this module implement the provider-neutral parts on top of it: diffing
//! a desired config against the last applied one, and executing a planned
//! [`Action`] while keeping the [`ProviderState`] in sync.

use crate::action::{Action, ActionType};
use crate::error::{CloudError, Result};
use crate::provider::ResourceConfig;
use crate::state::{ProviderState, ResourceState, ResourceStatus};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Per-operation time budgets for waiting on the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

/// CRUD mapping for one resource kind
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Typed declarative config, parsed from the manifest
    type Config: Serialize + DeserializeOwned + Send + Sync;

    /// Resource type name used in manifests and state keys
    fn resource_type(&self) -> &'static str;

    /// Top-level config fields that cannot be changed in place
    fn force_new_fields(&self) -> &'static [&'static str];

    /// Reject configs this handler cannot honor. Runs on every parse.
    fn validate(&self, _config: &Self::Config) -> Result<()> {
        Ok(())
    }

    /// Create the resource and wait until it is usable.
    ///
    /// If the remote accepted the create but the wait failed, return
    /// [`CloudError::WaitFailed`] so the ID is not lost.
    async fn create(&self, config: &Self::Config) -> Result<ResourceState>;

    /// Read the resource. `None` means the remote no longer has it.
    async fn read(&self, id: &str) -> Result<Option<ResourceState>>;

    /// Apply the fields that differ between `prior` and `desired`
    async fn update(
        &self,
        id: &str,
        prior: &Self::Config,
        desired: &Self::Config,
    ) -> Result<ResourceState>;

    /// Delete the resource. Deleting something already gone succeeds.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Parse, validate and normalize a raw manifest config
pub fn parse_config<H: ResourceHandler + ?Sized>(
    handler: &H,
    name: &str,
    raw: &serde_json::Value,
) -> Result<(H::Config, serde_json::Value)> {
    let config: H::Config = serde_json::from_value(raw.clone()).map_err(|e| {
        CloudError::InvalidConfig(format!("{} {}: {}", handler.resource_type(), name, e))
    })?;
    handler.validate(&config)?;
    let normalized = serde_json::to_value(&config)?;
    Ok((config, normalized))
}

/// Top-level keys whose values differ between two configs
pub fn changed_fields(prior: &serde_json::Value, desired: &serde_json::Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let prior = prior.as_object().unwrap_or(&empty);
    let desired = desired.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = prior.keys().chain(desired.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|k| prior.get(*k) != desired.get(*k))
        .cloned()
        .collect()
}

/// Decide what to do with one desired resource.
///
/// The desired config is compared with the config recorded at the last
/// apply, not with the attributes read back from the remote. Changes made
/// outside StackFlow show up in state after a refresh but do not produce an
/// update on their own.
pub fn plan_action<H: ResourceHandler + ?Sized>(
    handler: &H,
    desired: &ResourceConfig,
    current: Option<&ResourceState>,
) -> Result<Action> {
    let (_, normalized) = parse_config(handler, &desired.name, &desired.config)?;
    let action = |action_type| Action::new(action_type, handler.resource_type(), desired.key());

    let Some(current) = current else {
        return Ok(action(ActionType::Create));
    };

    let changes = changed_fields(&current.config, &normalized);
    let action_type = if current.status == ResourceStatus::Tainted {
        ActionType::Replace
    } else if changes.is_empty() {
        ActionType::NoOp
    } else if changes
        .iter()
        .any(|f| handler.force_new_fields().contains(&f.as_str()))
    {
        ActionType::Replace
    } else {
        ActionType::Update
    };

    Ok(action(action_type)
        .with_remote_id(&current.id)
        .with_changes(changes))
}

/// Execute one planned action and record the result in `state`.
///
/// Returns a short message describing what happened.
pub async fn apply_action<H: ResourceHandler + ?Sized>(
    handler: &H,
    action: &Action,
    desired: Option<&ResourceConfig>,
    state: &mut ProviderState,
) -> Result<String> {
    let key = action.resource_key.as_str();

    match action.action_type {
        ActionType::NoOp => Ok("unchanged".to_string()),
        ActionType::Create => {
            let desired = require_desired(key, desired)?;
            create_into(handler, desired, state).await
        }
        ActionType::Update => {
            let desired = require_desired(key, desired)?;
            let current = state
                .get(key)
                .cloned()
                .ok_or_else(|| CloudError::StateError(format!("{} is not in state", key)))?;
            let (config, normalized) = parse_config(handler, &desired.name, &desired.config)?;
            let prior: H::Config = serde_json::from_value(current.config.clone()).map_err(|e| {
                CloudError::StateError(format!("stored config for {} is unreadable: {}", key, e))
            })?;

            let updated = handler.update(&current.id, &prior, &config).await?;
            let updated = updated.with_config(normalized).inherit(&current);
            state.add(key, updated);
            Ok(format!("updated {}", current.id))
        }
        ActionType::Replace => {
            let desired = require_desired(key, desired)?;
            if let Some(current) = state.get(key).cloned() {
                handler.delete(&current.id).await?;
                state.remove(key);
                tracing::info!(resource = %key, id = %current.id, "Deleted for replacement");
            }
            create_into(handler, desired, state).await
        }
        ActionType::Delete => {
            let Some(current) = state.get(key).cloned() else {
                return Ok("already absent".to_string());
            };
            handler.delete(&current.id).await?;
            state.remove(key);
            Ok(format!("deleted {}", current.id))
        }
    }
}

/// Re-read a tracked resource, dropping it from `state` if the remote lost it
pub async fn refresh_resource<H: ResourceHandler + ?Sized>(
    handler: &H,
    key: &str,
    state: &mut ProviderState,
) -> Result<()> {
    let Some(current) = state.get(key).cloned() else {
        return Ok(());
    };

    match handler.read(&current.id).await? {
        Some(fresh) => {
            let mut fresh = fresh.inherit(&current).with_config(current.config.clone());
            if current.status == ResourceStatus::Tainted {
                fresh.status = ResourceStatus::Tainted;
            }
            state.add(key, fresh);
        }
        None => {
            tracing::warn!(resource = %key, id = %current.id, "Resource is gone, removing from state");
            state.remove(key);
        }
    }
    Ok(())
}

fn require_desired<'a>(key: &str, desired: Option<&'a ResourceConfig>) -> Result<&'a ResourceConfig> {
    desired.ok_or_else(|| CloudError::InvalidConfig(format!("{} is not in the manifest", key)))
}

async fn create_into<H: ResourceHandler + ?Sized>(
    handler: &H,
    desired: &ResourceConfig,
    state: &mut ProviderState,
) -> Result<String> {
    let key = desired.key();
    let (config, normalized) = parse_config(handler, &desired.name, &desired.config)?;

    match handler.create(&config).await {
        Ok(created) => {
            let id = created.id.clone();
            state.add(&key, created.with_config(normalized));
            Ok(format!("created {}", id))
        }
        Err(CloudError::WaitFailed { resource_id, source }) => {
            tracing::warn!(resource = %key, id = %resource_id, "Marking resource as tainted");
            state.add(
                &key,
                ResourceState::new(&resource_id, handler.resource_type())
                    .with_status(ResourceStatus::Tainted)
                    .with_config(normalized),
            );
            Err(CloudError::WaitFailed { resource_id, source })
        }
        Err(e) => Err(e),
    }
}
