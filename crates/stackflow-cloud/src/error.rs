//! Cloud provider error types

use std::time::Duration;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported resource type: {0}")]
    UnsupportedResource(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid poll request: {0}")]
    InvalidPollRequest(String),

    #[error(
        "Resource {resource_id} did not reach target state within {} seconds (last state: {})",
        timeout.as_secs(),
        last_state.as_deref().unwrap_or("none")
    )]
    StateTimeout {
        resource_id: String,
        last_state: Option<String>,
        timeout: Duration,
    },

    #[error("Resource {resource_id} was created but did not become ready: {source}")]
    WaitFailed {
        resource_id: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// 404-class error from the remote API
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ResourceNotFound(_))
    }

    /// 409-class error from the remote API
    pub fn is_conflict(&self) -> bool {
        matches!(self, CloudError::Conflict(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CloudError::StateTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
