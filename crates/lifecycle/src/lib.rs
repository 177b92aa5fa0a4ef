//! Transaction lifecycle coordination.
//!
//! This crate owns everything between "the user asked for a write" and "the
//! refreshed rows are ready": submitting the operation, tracking it as
//! pending, polling the verifier until it is resolved, and refreshing the
//! table once it is confirmed.
//!
//! # Architecture
//!
//! ```text
//! UI action
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ LifecycleCoordinator.write(session, statement, params)      │
//! │                                                             │
//! │   1. Supersede the pending operation, if any                │
//! │      (cancel its poll token, discard its handle)            │
//! │   2. Idle → Submitting: OperationSubmitter.submit           │
//! │   3. Submitting → Pending: spawn ConfirmationPoller         │
//! │      with a fresh cancellation token                        │
//! └─────────────────────────────────────────────────────────────┘
//!                     │
//!                     ▼
//!        Poller queries the verifier every interval
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ LifecycleCoordinator.next_resolution()                      │
//! │                                                             │
//! │   1. Await the live poll task only; superseded tasks are    │
//! │      detached and never observed                            │
//! │   2. Confirmed: ReadAccessor.query, publish rows, → Idle    │
//! │   3. Rejected / Abandoned / task died: → Idle, no refresh   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Table creation goes through [`TableProvisioner`] instead, which blocks
//! until the table exists because nothing else is actionable before that.
//!
//! # Components
//!
//! - [`Session`] - Explicit connect/disconnect wrapper around a signer
//! - [`OperationSubmitter`] - Submits one create/write operation
//! - [`ConfirmationPoller`] - Fixed-cadence, cancellable status polling
//! - [`LifecycleCoordinator`] - One write slot's state machine
//! - [`TableProvisioner`] - Create, confirm, then fetch the real schema
//! - [`LifecycleConfig`] - Poll cadence, error budget and timeouts

mod config;
mod coordinator;
mod error;
mod pending;
mod poller;
mod provisioning;
mod session;
mod submitter;

pub use config::LifecycleConfig;
pub use coordinator::{FailureReason, LifecycleCoordinator, Resolution, SlotState};
pub use error::{InvalidConfig, LifecycleError, ProvisioningError};
pub use pending::PendingOperation;
pub use poller::{ConfirmationPoller, PollOutcome, PollPolicy};
pub use provisioning::TableProvisioner;
pub use session::Session;
pub use submitter::OperationSubmitter;

/// Cancellation token used for poll tasks.
pub use tokio_util::sync::CancellationToken;
