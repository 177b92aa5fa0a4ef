//! Write slot state machine.
//!
//! A [`LifecycleCoordinator`] manages the single write slot of one table:
//!
//! ```text
//! Idle ──write──▶ Submitting ──accepted──▶ Pending ──confirmed──▶ Confirmed ──refreshed──▶ Idle
//!                     │                      │  │
//!                     └──failed──▶ Idle      │  └──rejected / abandoned──▶ Idle
//!                                            │
//!                                            └──write / relinquish──▶ Superseded
//! ```
//!
//! At most one poll task, and so one cancellation token, is live at any
//! time. Starting a new write cancels the previous token and detaches its
//! task before the new submission is sent. Only the live task is ever
//! awaited, so a superseded operation can never trigger a refresh.
//!
//! All transitions run on the caller's task through `&mut self`; the poll
//! task only computes the outcome. Refreshes for two different operations
//! therefore never interleave. A poll task that dies without an outcome
//! still ends the pending operation, as a failure.

use crate::{
    ConfirmationPoller, InvalidConfig, LifecycleConfig, LifecycleError, OperationSubmitter,
    PendingOperation, PollOutcome, Session,
};
use std::sync::Arc;
use tableflow_core::{ReadAccessor, ReadError, SubmitError, VerifierError};
use tableflow_types::{
    demo, OperationHandle, OperationKind, Param, ResourceDescriptor, Row, Statement,
    StatementError,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Observable state of the write slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing outstanding.
    Idle,
    /// A write is on its way to the network.
    Submitting,
    /// Submitted and being polled.
    Pending(PendingOperation),
    /// Confirmed; the refresh query is running.
    Confirmed(OperationHandle),
}

/// Why a pending operation ended without a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The network saw the operation and refused it.
    Rejected {
        /// Network error message.
        error: Option<String>,
    },
    /// Polling hit the configured error budget.
    Abandoned {
        /// Status queries issued.
        attempts: u32,
        /// Error from the final attempt.
        last_error: VerifierError,
    },
    /// The poll task ended without an outcome (it panicked).
    PollerFailed {
        /// Task failure as reported by the runtime.
        error: String,
    },
}

/// How a pending operation left the `Pending` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Confirmed and refreshed.
    Confirmed {
        /// The confirmed operation.
        handle: OperationHandle,
        /// Table contents after the refresh.
        rows: Vec<Row>,
    },
    /// Resolved without confirmation. No refresh was run.
    Failed {
        /// The failed operation.
        handle: OperationHandle,
        /// What went wrong.
        reason: FailureReason,
    },
}

/// The live poll for the pending operation.
struct ActivePoll {
    pending: PendingOperation,
    cancel: CancellationToken,
    task: JoinHandle<Option<PollOutcome>>,
}

/// Puts the slot back to `Idle` when dropped armed, so a `write` future
/// dropped mid-submission does not leave the slot `Submitting`.
struct IdleOnDrop<'a> {
    state: &'a watch::Sender<SlotState>,
    armed: bool,
}

impl IdleOnDrop<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("Submission did not complete, slot back to idle");
            self.state.send_replace(SlotState::Idle);
        }
    }
}

/// Coordinates writes to one table through a single slot.
pub struct LifecycleCoordinator {
    resource: ResourceDescriptor,
    config: LifecycleConfig,
    submitter: OperationSubmitter,
    poller: ConfirmationPoller,
    reader: Arc<dyn ReadAccessor>,

    /// Parent of every poll token. Cancelled when the coordinator is dropped.
    root: CancellationToken,

    /// Poll for the pending operation, if any.
    active: Option<ActivePoll>,

    /// Confirmed operation whose refresh has not completed.
    confirming: Option<OperationHandle>,

    state: watch::Sender<SlotState>,
    rows: watch::Sender<Vec<Row>>,
}

impl LifecycleCoordinator {
    /// Create a coordinator for `resource`. Fails if `config` is invalid.
    pub fn new(
        resource: ResourceDescriptor,
        submitter: OperationSubmitter,
        poller: ConfirmationPoller,
        reader: Arc<dyn ReadAccessor>,
        config: LifecycleConfig,
    ) -> Result<Self, InvalidConfig> {
        config.validate()?;

        let (state, _) = watch::channel(SlotState::Idle);
        let (rows, _) = watch::channel(Vec::new());

        Ok(Self {
            resource,
            config,
            submitter,
            poller,
            reader,
            root: CancellationToken::new(),
            active: None,
            confirming: None,
            state,
            rows,
        })
    }

    /// The managed table.
    pub fn resource(&self) -> &ResourceDescriptor {
        &self.resource
    }

    /// Current slot state.
    pub fn state(&self) -> SlotState {
        self.state.borrow().clone()
    }

    /// Watch slot state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SlotState> {
        self.state.subscribe()
    }

    /// Rows from the most recent refresh.
    pub fn rows(&self) -> Vec<Row> {
        self.rows.borrow().clone()
    }

    /// Watch refreshed rows.
    pub fn subscribe_rows(&self) -> watch::Receiver<Vec<Row>> {
        self.rows.subscribe()
    }

    /// The outstanding operation, if any.
    pub fn pending(&self) -> Option<&PendingOperation> {
        self.active.as_ref().map(|active| &active.pending)
    }

    /// Load the table contents without a pending operation, e.g. when a
    /// view is first shown.
    pub async fn load_rows(&mut self) -> Result<Vec<Row>, ReadError> {
        let rows = self.fetch_rows().await?;
        self.rows.send_replace(rows.clone());
        Ok(rows)
    }

    /// Submit a write to the managed table.
    ///
    /// Any pending operation is superseded first: its poll is cancelled and
    /// its handle discarded without a refresh. On success the slot is
    /// `Pending` and the handle is returned; on failure it is `Idle` and the
    /// error is returned without retrying. If the future is dropped before
    /// the submission completes, the slot goes back to `Idle`; the operation
    /// may still reach the network but is never tracked.
    pub async fn write(
        &mut self,
        session: &Session,
        statement: Statement,
        params: Vec<Param>,
    ) -> Result<OperationHandle, LifecycleError> {
        let identity = session.identity()?.clone();
        if identity.context != self.resource.context {
            return Err(LifecycleError::ContextMismatch {
                session: identity.context,
                resource: self.resource.context,
            });
        }
        if statement.kind() != OperationKind::Write {
            return Err(SubmitError::InvalidStatement(StatementError::KindMismatch {
                expected: OperationKind::Write,
            })
            .into());
        }

        self.supersede("new write");
        self.set_state(SlotState::Submitting);

        let submitting = IdleOnDrop {
            state: &self.state,
            armed: true,
        };
        let receipt = self
            .submitter
            .submit(&identity, identity.context, &statement, &params)
            .await?;
        submitting.disarm();

        let pending = PendingOperation::new(
            receipt.handle.clone(),
            identity.context,
            statement.kind(),
        );
        self.start_poll(pending);
        Ok(receipt.handle)
    }

    /// Demo convenience: insert one row with the given name.
    pub async fn insert_name(
        &mut self,
        session: &Session,
        name: &str,
    ) -> Result<OperationHandle, LifecycleError> {
        let statement =
            demo::insert_statement(&self.resource.name).map_err(SubmitError::from)?;
        self.write(session, statement, demo::insert_params(name))
            .await
    }

    /// Give up the slot, e.g. when the view is closed.
    ///
    /// The pending operation is superseded; no refresh will run for it.
    pub fn relinquish(&mut self) {
        self.supersede("relinquished");
        self.set_state(SlotState::Idle);
    }

    /// Wait for the pending operation to leave `Pending`.
    ///
    /// Returns `Ok(None)` immediately when nothing is pending. On
    /// confirmation the table is refreshed and the new rows published
    /// before returning. Cancel-safe: if the returned future is dropped
    /// while waiting, the poll keeps running, and if it is dropped during
    /// the refresh, the next call finishes it.
    pub async fn next_resolution(&mut self) -> Result<Option<Resolution>, LifecycleError> {
        if let Some(handle) = self.confirming.clone() {
            return self.finish_refresh(handle).await.map(Some);
        }

        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        let joined = (&mut active.task).await;
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        let handle = active.pending.handle;

        let outcome = match joined {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                // Only supersede() and drop cancel a live token, and both
                // take the poll out of `active` first.
                self.set_state(SlotState::Idle);
                return Ok(None);
            }
            Err(e) => {
                warn!(handle = %handle, error = %e, "Poll task failed");
                self.set_state(SlotState::Idle);
                return Ok(Some(Resolution::Failed {
                    handle,
                    reason: FailureReason::PollerFailed {
                        error: e.to_string(),
                    },
                }));
            }
        };

        match outcome {
            PollOutcome::Confirmed(_) => {
                self.confirming = Some(handle.clone());
                self.set_state(SlotState::Confirmed(handle.clone()));
                self.finish_refresh(handle).await.map(Some)
            }
            PollOutcome::Rejected(status) => {
                self.set_state(SlotState::Idle);
                Ok(Some(Resolution::Failed {
                    handle,
                    reason: FailureReason::Rejected {
                        error: status.error,
                    },
                }))
            }
            PollOutcome::Abandoned {
                attempts,
                last_error,
            } => {
                self.set_state(SlotState::Idle);
                Ok(Some(Resolution::Failed {
                    handle,
                    reason: FailureReason::Abandoned {
                        attempts,
                        last_error,
                    },
                }))
            }
        }
    }

    fn start_poll(&mut self, pending: PendingOperation) {
        let cancel = self.root.child_token();
        let task = tokio::spawn(self.poller.poll_or_cancel(
            pending.handle.clone(),
            pending.context,
            self.config.poll_policy(),
            cancel.clone(),
        ));

        self.set_state(SlotState::Pending(pending.clone()));
        self.active = Some(ActivePoll {
            pending,
            cancel,
            task,
        });
    }

    fn supersede(&mut self, reason: &'static str) {
        if let Some(handle) = self.confirming.take() {
            info!(handle = %handle, reason, "Discarding unfinished refresh");
        }
        // The task is detached; it exits at its next cancellation check.
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            info!(handle = %active.pending.handle, reason, "Pending operation superseded");
        }
    }

    async fn finish_refresh(&mut self, handle: OperationHandle) -> Result<Resolution, LifecycleError> {
        let result = self.fetch_rows().await;
        self.confirming = None;
        self.set_state(SlotState::Idle);

        match result {
            Ok(rows) => {
                info!(handle = %handle, table = %self.resource.name, rows = rows.len(), "Refreshed after confirmation");
                self.rows.send_replace(rows.clone());
                Ok(Resolution::Confirmed { handle, rows })
            }
            Err(source) => {
                warn!(handle = %handle, error = %source, "Refresh after confirmation failed");
                Err(LifecycleError::Refresh { handle, source })
            }
        }
    }

    async fn fetch_rows(&self) -> Result<Vec<Row>, ReadError> {
        let select = demo::select_all(&self.resource.name, self.config.refresh_limit);
        self.reader
            .query(self.resource.context, &self.resource.name, &select)
            .await
    }

    fn set_state(&self, state: SlotState) {
        debug!(table = %self.resource.name, state = ?state, "Slot transition");
        self.state.send_replace(state);
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tableflow_core::{NetworkSubmitter, OperationStatus, SubmissionReceipt, Verifier};
    use tableflow_simulation::{SimulatedNetwork, SimulatedSigner, StatusScript};
    use tableflow_types::{ColumnSpec, ContextId, Identity, ResourceId};
    use tokio::time;
    use tracing_test::traced_test;

    const INTERVAL: Duration = Duration::from_millis(500);

    /// Holds every submission for a minute before passing it on.
    struct SlowSubmitter(SimulatedNetwork);

    #[async_trait]
    impl NetworkSubmitter for SlowSubmitter {
        async fn submit(
            &self,
            identity: &Identity,
            context: ContextId,
            statement: &Statement,
            params: &[Param],
        ) -> Result<SubmissionReceipt, SubmitError> {
            time::sleep(Duration::from_secs(60)).await;
            self.0.submit(identity, context, statement, params).await
        }
    }

    /// A verifier with a bug.
    struct PanickingVerifier;

    #[async_trait]
    impl Verifier for PanickingVerifier {
        async fn status(
            &self,
            _context: ContextId,
            _handle: &OperationHandle,
        ) -> Result<OperationStatus, VerifierError> {
            panic!("status decoder bug")
        }

        async fn resource_schema(
            &self,
            _context: ContextId,
            _resource: ResourceId,
        ) -> Result<Vec<ColumnSpec>, VerifierError> {
            panic!("schema decoder bug")
        }
    }

    struct Harness {
        network: SimulatedNetwork,
        session: Session,
        coordinator: LifecycleCoordinator,
    }

    fn coordinator_over(
        network: &SimulatedNetwork,
        submitter: Arc<dyn NetworkSubmitter>,
        verifier: Arc<dyn Verifier>,
    ) -> LifecycleCoordinator {
        let table = network.create_table_now("t", demo::declared_schema());
        let resource = ResourceDescriptor {
            name: table,
            context: ContextId(1),
            schema: demo::declared_schema(),
        };
        LifecycleCoordinator::new(
            resource,
            OperationSubmitter::new(submitter),
            ConfirmationPoller::new(verifier),
            Arc::new(network.clone()),
            LifecycleConfig::default().with_poll_interval(INTERVAL),
        )
        .unwrap()
    }

    async fn session() -> Session {
        let signer = Arc::new(SimulatedSigner::new("0xabc", ContextId(1)));
        Session::connect(signer).await.unwrap()
    }

    async fn harness() -> Harness {
        let network = SimulatedNetwork::new(ContextId(1));
        let shared = Arc::new(network.clone());
        let coordinator = coordinator_over(&network, shared.clone(), shared);

        Harness {
            network,
            session: session().await,
            coordinator,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_goes_pending_then_idle() {
        let mut h = harness().await;
        h.network.set_default_script(StatusScript::confirm_after(2));

        let handle = h.coordinator.insert_name(&h.session, "Bobby Tables").await.unwrap();
        assert!(matches!(h.coordinator.state(), SlotState::Pending(ref p) if p.handle == handle));

        let resolution = h.coordinator.next_resolution().await.unwrap().unwrap();
        match resolution {
            Resolution::Confirmed { handle: confirmed, rows } => {
                assert_eq!(confirmed, handle);
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].id, 1);
                assert_eq!(rows[0].name, "Bobby Tables");
                assert_eq!(rows[0].tx, handle.as_str());
            }
            other => panic!("expected confirmation, got {other:?}"),
        }

        assert_eq!(h.coordinator.state(), SlotState::Idle);
        assert!(h.coordinator.pending().is_none());
        assert_eq!(h.network.read_queries(), 1);
        assert_eq!(h.network.status_queries(&handle), 3);
        assert_eq!(h.coordinator.rows().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_pending_resolves_immediately() {
        let mut h = harness().await;
        assert_eq!(h.coordinator.next_resolution().await.unwrap(), None);
        assert_eq!(h.network.read_queries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_failure_returns_to_idle() {
        let mut h = harness().await;
        h.network.decline_next_submission("user denied");

        let err = h.coordinator.insert_name(&h.session, "x").await.unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Submit(SubmitError::RejectedBySigner("user denied".into()))
        );
        assert_eq!(h.coordinator.state(), SlotState::Idle);
        assert!(h.coordinator.pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_session_is_refused() {
        let mut h = harness().await;
        h.session.disconnect();

        let err = h.coordinator.insert_name(&h.session, "x").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Session(_)));
        assert_eq!(h.network.submissions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_statement_is_refused() {
        let mut h = harness().await;

        let stmt = demo::create_statement("other").unwrap();
        let err = h.coordinator.write(&h.session, stmt, vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Submit(SubmitError::InvalidStatement(
                StatementError::KindMismatch { .. }
            ))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_write_fails_without_refresh() {
        let mut h = harness().await;
        h.network
            .set_default_script(StatusScript::reject_after(1, "constraint violation"));

        let handle = h.coordinator.insert_name(&h.session, "x").await.unwrap();
        let resolution = h.coordinator.next_resolution().await.unwrap().unwrap();

        assert_eq!(
            resolution,
            Resolution::Failed {
                handle,
                reason: FailureReason::Rejected {
                    error: Some("constraint violation".into())
                },
            }
        );
        assert_eq!(h.coordinator.state(), SlotState::Idle);
        assert_eq!(h.network.read_queries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relinquish_cancels_poll() {
        let mut h = harness().await;
        h.network.set_default_script(StatusScript::confirm_after(2));

        let handle = h.coordinator.insert_name(&h.session, "x").await.unwrap();
        time::sleep(INTERVAL + INTERVAL / 2).await;
        h.coordinator.relinquish();

        time::sleep(INTERVAL * 10).await;
        assert_eq!(h.coordinator.state(), SlotState::Idle);
        assert_eq!(h.coordinator.next_resolution().await.unwrap(), None);
        assert_eq!(h.network.status_queries(&handle), 1);
        assert_eq!(h.network.read_queries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_is_observable() {
        let mut h = harness().await;
        h.network.set_default_script(StatusScript::confirm_after(0));
        let mut states = h.coordinator.subscribe_state();
        let mut rows = h.coordinator.subscribe_rows();

        h.coordinator.insert_name(&h.session, "x").await.unwrap();
        assert!(states.has_changed().unwrap());
        assert!(matches!(*states.borrow_and_update(), SlotState::Pending(_)));

        h.coordinator.next_resolution().await.unwrap();
        assert_eq!(*states.borrow_and_update(), SlotState::Idle);
        assert!(rows.has_changed().unwrap());
        assert_eq!(rows.borrow_and_update().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_rows_publishes_current_contents() {
        let mut h = harness().await;
        h.network.insert_row_now(&h.coordinator.resource().name.clone(), "seed").unwrap();

        let rows = h.coordinator.load_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(h.coordinator.rows(), rows);
        assert_eq!(h.coordinator.state(), SlotState::Idle);
    }

    #[traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_superseded_write_is_logged() {
        let mut h = harness().await;
        h.network.set_default_script(StatusScript::confirm_after(0));

        let first = h.coordinator.insert_name(&h.session, "a").await.unwrap();
        let second = h.coordinator.insert_name(&h.session, "b").await.unwrap();
        assert_ne!(first, second);
        assert!(logs_contain("Pending operation superseded"));

        let resolution = h.coordinator.next_resolution().await.unwrap();
        assert!(matches!(resolution, Some(Resolution::Confirmed { handle, .. }) if handle == second));
    }

    #[test]
    fn test_zero_poll_interval_is_refused() {
        let network = SimulatedNetwork::new(ContextId(1));
        let shared = Arc::new(network.clone());
        let resource = ResourceDescriptor {
            name: network.create_table_now("t", demo::declared_schema()),
            context: ContextId(1),
            schema: demo::declared_schema(),
        };

        let result = LifecycleCoordinator::new(
            resource,
            OperationSubmitter::new(shared.clone()),
            ConfirmationPoller::new(shared.clone()),
            shared,
            LifecycleConfig::default().with_poll_interval(Duration::ZERO),
        );
        assert!(matches!(result, Err(InvalidConfig::ZeroPollInterval)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_verifier_fails_the_operation() {
        let network = SimulatedNetwork::new(ContextId(1));
        let mut coordinator =
            coordinator_over(&network, Arc::new(network.clone()), Arc::new(PanickingVerifier));
        let session = session().await;

        let handle = coordinator.insert_name(&session, "a").await.unwrap();
        let resolution = time::timeout(INTERVAL * 10, coordinator.next_resolution())
            .await
            .expect("a dead poll task must still resolve")
            .unwrap();

        match resolution {
            Some(Resolution::Failed {
                handle: failed,
                reason: FailureReason::PollerFailed { .. },
            }) => assert_eq!(failed, handle),
            other => panic!("expected poller failure, got {other:?}"),
        }
        assert_eq!(coordinator.state(), SlotState::Idle);
        assert!(coordinator.pending().is_none());
        assert_eq!(network.read_queries(), 0);

        // The slot is usable again.
        assert!(coordinator.insert_name(&session, "b").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_write_returns_slot_to_idle() {
        let network = SimulatedNetwork::new(ContextId(1));
        let shared = Arc::new(network.clone());
        let mut coordinator =
            coordinator_over(&network, Arc::new(SlowSubmitter(network.clone())), shared);
        let session = session().await;
        let state = coordinator.subscribe_state();

        let write = time::timeout(Duration::from_secs(1), coordinator.insert_name(&session, "a")).await;
        assert!(write.is_err());

        assert_eq!(*state.borrow(), SlotState::Idle);
        assert!(coordinator.pending().is_none());
        assert_eq!(network.submissions(), 0);
        assert_eq!(coordinator.next_resolution().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_polls_stop_querying() {
        let mut h = harness().await;
        h.network.set_default_script(StatusScript::confirm_after(3));

        let mut superseded = Vec::new();
        for i in 0..50 {
            superseded.push(h.coordinator.insert_name(&h.session, &format!("row {i}")).await.unwrap());
        }
        h.coordinator.relinquish();

        time::sleep(INTERVAL * 10).await;
        for handle in &superseded {
            assert_eq!(h.network.status_queries(handle), 0);
        }
        assert_eq!(h.coordinator.next_resolution().await.unwrap(), None);
    }
}
