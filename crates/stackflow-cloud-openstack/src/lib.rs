//! OpenStack provider for StackFlow
//!
//! Implements the CloudProvider trait for two OpenStack resource kinds:
//!
//! - `network`: Neutron networks, including provider segments, the
//!   external-network extension and tags
//! - `clustering_profile`: Senlin `os.nova.server` profiles
//!
//! # Requirements
//!
//! A pre-issued Keystone token plus the Neutron and Senlin endpoints. See
//! `stackflow-config` for where these are read from.
//!
//! # Example
//!
//! ```ignore
//! use stackflow_cloud::{CloudProvider, ProviderState, Timeouts};
//! use stackflow_cloud_openstack::{ClientConfig, OpenStackClient, OpenStackProvider};
//!
//! let client = OpenStackClient::new(ClientConfig {
//!     auth_token: token,
//!     networking_endpoint: Some("https://cloud.example.com:9696".into()),
//!     clustering_endpoint: None,
//! })?;
//! let provider = OpenStackProvider::new(client, Some("RegionOne".into()), Timeouts::default());
//!
//! let plan = provider.plan(&desired, &state).await?;
//! provider.apply(&plan, &desired, &mut state).await?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod network;
pub mod profile;
pub mod provider;

#[cfg(test)]
mod testing;

pub use client::{ClientConfig, OpenStackClient};
pub use error::{OpenStackError, Result};
pub use network::{NetworkConfig, NetworkHandler};
pub use profile::{ProfileConfig, ProfileHandler};
pub use provider::{OpenStackProvider, PROVIDER_NAME};
