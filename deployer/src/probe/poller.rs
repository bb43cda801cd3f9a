//! Readiness poll loop
//!
//! Evaluates a set of checks on a fixed interval until every one of them
//! holds, the deadline runs out, or the caller cancels. The sleep is
//! injected so tests drive the loop without waiting on wall-clock time.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::PollError;
use crate::models::session::DeploymentSession;
use crate::probe::checks::ReadinessCheck;

/// Default pause between readiness iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default ceiling on total time spent waiting.
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(600);

/// How long the loop is allowed to wait overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDeadline {
    /// Give up once the accumulated wait reaches this much
    Bounded(Duration),
    /// Keep polling until cancelled
    Unbounded,
}

/// Poll loop configuration
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    pub deadline: PollDeadline,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: PollDeadline::Bounded(DEFAULT_POLL_DEADLINE),
        }
    }
}

/// Poll until every check holds.
///
/// Checks run before the first sleep, so a condition that already holds
/// costs zero waiting. Every check is evaluated on every iteration; a
/// check that errors counts as not ready and the loop keeps going. The
/// deadline is measured in accumulated sleep intervals, which keeps runs
/// deterministic under an injected instant sleep.
pub async fn poll_until<S, F>(
    checks: &[Box<dyn ReadinessCheck>],
    session: &DeploymentSession,
    options: &PollOptions,
    sleep_fn: S,
    mut cancel: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<(), PollError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(
        "waiting for readiness: {} check(s), interval {:?}",
        checks.len(),
        options.interval
    );

    let mut waited = Duration::ZERO;
    loop {
        let mut all_hold = true;
        for check in checks {
            let holds = match check.holds(session).await {
                Ok(holds) => holds,
                Err(e) => {
                    warn!("readiness check {} errored, counting as not ready: {}", check.name(), e);
                    false
                }
            };
            debug!(
                "readiness check {}: {}",
                check.name(),
                if holds { "holds" } else { "pending" }
            );
            all_hold &= holds;
        }

        if all_hold {
            info!("readiness reached after waiting {:?}", waited);
            return Ok(());
        }

        if let PollDeadline::Bounded(limit) = options.deadline {
            if waited >= limit {
                return Err(PollError::DeadlineExceeded { waited });
            }
        }

        tokio::select! {
            _ = &mut cancel => {
                info!("readiness poll cancelled by caller");
                return Err(PollError::Cancelled);
            }
            _ = sleep_fn(options.interval) => {
                waited += options.interval;
            }
        }
    }
}
