//! Async state poller
//!
//! Cloud control planes finish most mutations asynchronously: a network is
//! created in `BUILD` and only later turns `ACTIVE`, a delete is accepted and
//! the resource disappears some time afterwards. [`wait_for_state`] drives a
//! resource-specific [`StatusFetcher`] until the observed state reaches one of
//! the target states, hits a failure state, or the timeout elapses.
//!
//! ```ignore
//! let request = PollRequest::new(&network_id, Duration::from_secs(600))
//!     .pending(["BUILD"])
//!     .target(["ACTIVE"])
//!     .map_status("DOWN", "ACTIVE")
//!     .initial_delay(Duration::from_secs(5))
//!     .poll_interval(Duration::from_secs(3));
//!
//! let outcome = wait_for_state(&request, &NetworkStatus::new(&api)).await?;
//! ```

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Logical state reported when a resource is confirmed gone in delete mode
pub const DELETED: &str = "DELETED";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_BACKOFF: f64 = 2.0;

/// Fetches the current raw status of a remote resource.
///
/// Implemented once per resource kind. Errors must keep their
/// classification: a 404 from the remote becomes
/// [`CloudError::ResourceNotFound`] and a 409 becomes [`CloudError::Conflict`].
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch(&self, resource_id: &str) -> Result<String>;
}

/// Adapts an async closure into a [`StatusFetcher`]
pub struct FnFetcher<F>(F);

/// Build a [`StatusFetcher`] from an async closure taking the resource id
pub fn fetch_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    FnFetcher(f)
}

#[async_trait]
impl<F, Fut> StatusFetcher for FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn fetch(&self, resource_id: &str) -> Result<String> {
        (self.0)(resource_id.to_string()).await
    }
}

/// How fetch errors are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollMode {
    /// Waiting for a resource to settle after create/update
    #[default]
    Await,
    /// Waiting for a resource to disappear; not-found means done and
    /// conflicts mean the remote is not ready to delete yet
    Delete,
}

/// Parameters of a single poll. Built once, never mutated while polling.
#[derive(Debug, Clone)]
pub struct PollRequest {
    resource_id: String,
    pending: HashSet<String>,
    target: HashSet<String>,
    failure: HashSet<String>,
    status_map: HashMap<String, String>,
    mode: PollMode,
    initial_delay: Duration,
    poll_interval: Duration,
    min_interval: Duration,
    max_interval: Duration,
    backoff: f64,
    timeout: Duration,
}

impl PollRequest {
    pub fn new(resource_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            resource_id: resource_id.into(),
            pending: HashSet::new(),
            target: HashSet::new(),
            failure: HashSet::new(),
            status_map: HashMap::new(),
            mode: PollMode::Await,
            initial_delay: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            backoff: DEFAULT_BACKOFF,
            timeout,
        }
    }

    /// States that mean "not there yet"
    pub fn pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    /// States that complete the poll successfully
    pub fn target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.extend(states.into_iter().map(Into::into));
        self
    }

    /// States that complete the poll unsuccessfully
    pub fn failure<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failure.extend(states.into_iter().map(Into::into));
        self
    }

    /// Map a raw remote status onto a logical state before classification
    pub fn map_status(mut self, raw: impl Into<String>, logical: impl Into<String>) -> Self {
        self.status_map.insert(raw.into(), logical.into());
        self
    }

    pub fn delete_mode(mut self) -> Self {
        self.mode = PollMode::Delete;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Floor applied to every sleep between attempts
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Cap for the backed-off interval
    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Multiplier applied to the interval after each pending attempt (1.0 = fixed)
    pub fn backoff(mut self, multiplier: f64) -> Self {
        self.backoff = multiplier;
        self
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn mode(&self) -> PollMode {
        self.mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check the request before any remote call is made
    pub fn validate(&self) -> Result<()> {
        if self.resource_id.trim().is_empty() {
            return Err(CloudError::InvalidPollRequest(
                "resource id must not be empty".to_string(),
            ));
        }
        if self.target.is_empty() {
            return Err(CloudError::InvalidPollRequest(format!(
                "no target states given for {}",
                self.resource_id
            )));
        }
        let mut overlap: Vec<&String> = self.target.intersection(&self.pending).collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Err(CloudError::InvalidPollRequest(format!(
                "states {:?} are both pending and target",
                overlap
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(CloudError::InvalidPollRequest(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if !self.backoff.is_finite() || self.backoff < 1.0 {
            return Err(CloudError::InvalidPollRequest(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.backoff
            )));
        }
        Ok(())
    }

    fn logical_state(&self, raw: &str) -> String {
        self.status_map
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }

    fn next_interval(&self, current: Duration) -> Duration {
        let cap = self.max_interval.max(current);
        Duration::from_secs_f64((current.as_secs_f64() * self.backoff).min(cap.as_secs_f64()))
    }
}

/// Result of a poll that reached a terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Last observed logical state
    pub final_state: String,

    /// `true` for a target state, `false` for a failure state
    pub succeeded: bool,

    /// Number of fetch calls made
    pub attempts: u32,

    /// Time spent in the poll, including the initial delay
    pub elapsed: Duration,
}

impl PollOutcome {
    /// Turn a failure-state outcome into an error
    pub fn into_result(self, resource_id: &str) -> Result<PollOutcome> {
        if self.succeeded {
            Ok(self)
        } else {
            Err(CloudError::ApiError(format!(
                "{} entered state {}",
                resource_id, self.final_state
            )))
        }
    }
}

/// Poll `fetcher` until the resource reaches a terminal state.
///
/// Returns `Ok` with `succeeded = true` for a target state (or a confirmed
/// delete), `Ok` with `succeeded = false` for a failure state,
/// [`CloudError::StateTimeout`] when the timeout elapses first, and any
/// other fetch error unchanged without retrying.
pub async fn wait_for_state<F>(request: &PollRequest, fetcher: &F) -> Result<PollOutcome>
where
    F: StatusFetcher + ?Sized,
{
    request.validate()?;

    let id = request.resource_id.as_str();
    let start = Instant::now();
    let deadline = start.checked_add(request.timeout);
    let remaining = || deadline.map(|d| d.saturating_duration_since(Instant::now()));

    tracing::debug!(
        resource = %id,
        mode = ?request.mode,
        timeout_secs = request.timeout.as_secs(),
        "Waiting for state {:?}",
        request.target
    );

    if !request.initial_delay.is_zero() {
        let delay = remaining().map_or(request.initial_delay, |r| r.min(request.initial_delay));
        tokio::time::sleep(delay).await;
    }

    let mut interval = request.poll_interval;
    let mut attempts = 0u32;
    let mut last_state: Option<String> = None;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!(
                resource = %id,
                attempts,
                last_state = last_state.as_deref().unwrap_or("none"),
                "Timed out waiting for state"
            );
            return Err(CloudError::StateTimeout {
                resource_id: id.to_string(),
                last_state,
                timeout: request.timeout,
            });
        }

        attempts += 1;
        match fetcher.fetch(id).await {
            Ok(raw) => {
                let state = request.logical_state(&raw);
                if request.target.contains(&state) {
                    tracing::info!(resource = %id, state = %state, attempts, "Reached target state");
                    return Ok(PollOutcome {
                        final_state: state,
                        succeeded: true,
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
                if request.failure.contains(&state) {
                    tracing::warn!(resource = %id, state = %state, attempts, "Reached failure state");
                    return Ok(PollOutcome {
                        final_state: state,
                        succeeded: false,
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
                if request.pending.contains(&state) {
                    tracing::debug!(resource = %id, state = %state, attempt = attempts, "Still pending");
                } else {
                    tracing::debug!(
                        resource = %id,
                        state = %state,
                        raw = %raw,
                        attempt = attempts,
                        "Unexpected state, continuing to poll"
                    );
                }
                last_state = Some(state);
            }
            Err(e) if request.mode == PollMode::Delete && e.is_not_found() => {
                tracing::info!(resource = %id, attempts, "Resource is gone");
                return Ok(PollOutcome {
                    final_state: DELETED.to_string(),
                    succeeded: true,
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            Err(e) if request.mode == PollMode::Delete && e.is_conflict() => {
                tracing::debug!(resource = %id, attempt = attempts, error = %e, "Delete not accepted yet");
            }
            Err(e) => return Err(e),
        }

        let wait = interval.max(request.min_interval);
        let wait = remaining().map_or(wait, |r| r.min(wait));
        tokio::time::sleep(wait).await;
        interval = request.next_interval(interval);
    }
}
