//! OpenStack provider error types

use stackflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("{method} {url} returned {status}: {message}")]
    Api {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    #[error("{field}, if provided, must be either 'true' or 'false' (got {value:?})")]
    InvalidBool { field: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No {0} endpoint configured")]
    MissingEndpoint(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

impl OpenStackError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenStackError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            OpenStackError::CloudError(e) => e.is_not_found(),
            _ => self.status() == Some(404),
        }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            OpenStackError::CloudError(e) => e.is_conflict(),
            _ => self.status() == Some(409),
        }
    }
}

impl From<OpenStackError> for CloudError {
    fn from(e: OpenStackError) -> Self {
        match e {
            OpenStackError::CloudError(inner) => inner,
            e if e.is_not_found() => CloudError::ResourceNotFound(e.to_string()),
            e if e.is_conflict() => CloudError::Conflict(e.to_string()),
            e @ (OpenStackError::InvalidBool { .. }
            | OpenStackError::InvalidConfig(_)
            | OpenStackError::MissingEndpoint(_)) => CloudError::InvalidConfig(e.to_string()),
            e => CloudError::ApiError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenStackError>;
