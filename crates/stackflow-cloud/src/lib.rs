//! StackFlow Cloud Infrastructure
//!
//! Provider-neutral building blocks for declarative management of cloud
//! resources: the resource handler abstraction, plan/apply bookkeeping, the
//! local state file, and the async state poller that waits for the control
//! plane to finish asynchronous transitions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  StackFlow CLI                   │
//! │            (stack plan/apply/destroy)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stackflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait CloudProvider / ResourceHandler   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │    Poller    │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │   openstack   │
//!           │   provider    │
//!           └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod poll;
pub mod provider;
pub mod resource;
pub mod state;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use poll::{
    DELETED, FnFetcher, PollMode, PollOutcome, PollRequest, StatusFetcher, fetch_fn,
    wait_for_state,
};
pub use provider::{CloudProvider, ResourceConfig, ResourceSet};
pub use resource::{ResourceHandler, Timeouts};
pub use state::{
    GlobalState, ProviderState, ResourceState, ResourceStatus, StateLock, StateManager,
};
