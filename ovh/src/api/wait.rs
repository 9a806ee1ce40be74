//! Polling until an entity reaches a target status

use std::future::Future;
use std::time::Duration;
use tfplug::context::Context;
use thiserror::Error;
use tokio::time::Instant;

use super::error::ApiError;

/// Status reported when the refresh function finds nothing
pub const DELETED: &str = "DELETED";

/// Status reported while an entity looks settled but does not show a
/// requested change yet
pub const CHANGE_PENDING: &str = "CHANGE_PENDING";

#[cfg(not(test))]
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
#[cfg(test)]
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum WaitError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("timeout after {timeout:?} waiting for state {target:?} (last state: {last_state:?})")]
    Timeout {
        target: Vec<String>,
        last_state: String,
        timeout: Duration,
    },

    #[error("unexpected state {state:?}, wanted target {target:?}")]
    UnexpectedState { state: String, target: Vec<String> },

    #[error("cancelled while waiting for state {target:?}")]
    Cancelled { target: Vec<String> },
}

/// Pending and target statuses of a long-running operation
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            delay: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout,
        }
    }

    /// Initial wait before the first refresh
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Calls `refresh` until it reports a target status
///
/// `refresh` returns the current entity and its status, or `None` when the
/// entity is gone, which counts as [`DELETED`]. A status that is neither
/// pending nor a target aborts the wait, as does cancellation of `ctx`.
pub async fn wait_for_state<T, F, Fut>(
    ctx: &Context,
    conf: &StateChangeConf,
    mut refresh: F,
) -> Result<Option<T>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<(T, String)>, ApiError>>,
{
    let started = Instant::now();
    let deadline = started + conf.timeout;

    if !conf.delay.is_zero() {
        pause(ctx, conf, conf.delay).await?;
    }

    loop {
        let (value, state) = match refresh().await? {
            Some((value, state)) => (Some(value), state),
            None => (None, DELETED.to_string()),
        };

        tracing::debug!(
            "Waiting for state {:?}, current state {:?} ({}s elapsed)",
            conf.target,
            state,
            started.elapsed().as_secs()
        );

        if conf.target.contains(&state) {
            return Ok(value);
        }

        if !conf.pending.contains(&state) {
            return Err(WaitError::UnexpectedState {
                state,
                target: conf.target.clone(),
            });
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                target: conf.target.clone(),
                last_state: state,
                timeout: conf.timeout,
            });
        }

        pause(ctx, conf, conf.poll_interval.min(deadline - now)).await?;
    }
}

async fn pause(ctx: &Context, conf: &StateChangeConf, duration: Duration) -> Result<(), WaitError> {
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = ctx.cancelled() => Err(WaitError::Cancelled {
            target: conf.target.clone(),
        }),
    }
}
