//! Confirmation polling.
//!
//! The poller asks the verifier for an operation's status at a fixed
//! wall-clock cadence until the verifier reports it as seen. The cadence
//! is not adjusted for response latency and there is no backoff; this is a
//! demonstration-grade policy.
//!
//! # Cancellation
//!
//! Cancelling the token stops further queries. The future returned by
//! [`ConfirmationPoller::poll`] then never resolves: a cancelled poll has no
//! result, and callers use cancellation only to stop resource use. A query
//! already in flight when the token fires is not aborted; its result is
//! discarded.

use std::sync::Arc;
use std::time::Duration;
use tableflow_core::{OperationStatus, Verifier, VerifierError};
use tableflow_types::{ContextId, OperationHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Floor for the poll interval; tokio intervals must be non-zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// How a poll is run. Supplied by the coordinator, which owns the decision
/// of when verifier errors stop being transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Time between two status queries.
    pub interval: Duration,
    /// Consecutive errors after which the poll is abandoned. `None` = never.
    pub max_consecutive_errors: Option<u32>,
}

/// Terminal result of a poll.
///
/// `Confirmed` means the verifier attested the operation was applied. The
/// other two variants are distinct on purpose: "stopped polling" is never
/// reported as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Seen and applied.
    Confirmed(OperationStatus),
    /// Seen and refused by the network.
    Rejected(OperationStatus),
    /// Error budget exhausted before the operation was seen.
    Abandoned {
        /// Status queries issued.
        attempts: u32,
        /// Error from the final attempt.
        last_error: VerifierError,
    },
}

impl PollOutcome {
    /// Seen and applied.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, PollOutcome::Confirmed(_))
    }
}

/// Polls the verifier for one operation at a time.
#[derive(Clone)]
pub struct ConfirmationPoller {
    verifier: Arc<dyn Verifier>,
}

impl ConfirmationPoller {
    /// Create a poller over `verifier`.
    pub fn new(verifier: Arc<dyn Verifier>) -> Self {
        Self { verifier }
    }

    /// Poll `handle` on `context` until it is resolved.
    ///
    /// The first query is issued one interval after the call. A zero
    /// interval is raised to one millisecond. If `cancel` fires first, the
    /// returned future stays pending forever.
    pub fn poll(
        &self,
        handle: OperationHandle,
        context: ContextId,
        policy: PollPolicy,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = PollOutcome> + Send + 'static {
        let poll = self.poll_or_cancel(handle, context, policy, cancel);
        async move {
            match poll.await {
                Some(outcome) => outcome,
                None => std::future::pending().await,
            }
        }
    }

    /// Like [`poll`](Self::poll), but completes with `None` once cancelled
    /// so a task driving it can exit.
    pub fn poll_or_cancel(
        &self,
        handle: OperationHandle,
        context: ContextId,
        policy: PollPolicy,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Option<PollOutcome>> + Send + 'static {
        let verifier = Arc::clone(&self.verifier);
        async move { poll_until_resolved(verifier.as_ref(), &handle, context, policy, &cancel).await }
    }
}

/// The poll loop. Returns `None` once cancelled.
async fn poll_until_resolved(
    verifier: &dyn Verifier,
    handle: &OperationHandle,
    context: ContextId,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Option<PollOutcome> {
    let interval = policy.interval.max(MIN_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut attempts = 0u32;
    let mut consecutive_errors = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(handle = %handle, attempts, "Poll cancelled");
                return None;
            }
            _ = ticker.tick() => {}
        }

        attempts += 1;
        let result = verifier.status(context, handle).await;

        if cancel.is_cancelled() {
            debug!(handle = %handle, attempts, "Discarding status from cancelled poll");
            return None;
        }

        match result {
            Ok(status) if status.is_confirmed() => {
                info!(handle = %handle, attempts, block = ?status.block_number, "Operation confirmed");
                return Some(PollOutcome::Confirmed(status));
            }
            Ok(status) if status.seen => {
                warn!(handle = %handle, attempts, error = ?status.error, "Operation rejected");
                return Some(PollOutcome::Rejected(status));
            }
            Ok(_) => {
                consecutive_errors = 0;
                debug!(handle = %handle, attempts, "Operation not yet seen");
            }
            Err(e) => {
                consecutive_errors += 1;
                if policy
                    .max_consecutive_errors
                    .is_some_and(|max| consecutive_errors >= max)
                {
                    warn!(handle = %handle, attempts, error = %e, "Abandoning poll");
                    return Some(PollOutcome::Abandoned {
                        attempts,
                        last_error: e,
                    });
                }
                warn!(handle = %handle, attempts, error = %e, "Status query failed, will retry");
            }
        }
    }
}
