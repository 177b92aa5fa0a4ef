//! Error types for lifecycle coordination.

use std::time::Duration;
use tableflow_core::{ReadError, SignerError, SubmitError, VerifierError};
use tableflow_types::{ContextId, OperationHandle};
use thiserror::Error;

/// A [`LifecycleConfig`](crate::LifecycleConfig) the coordinator cannot run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidConfig {
    /// A zero poll interval would spin on the verifier.
    #[error("poll_interval must be greater than zero")]
    ZeroPollInterval,
}

/// Errors surfaced by the write coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The session has no connected signer.
    #[error("Session error: {0}")]
    Session(#[from] SignerError),

    /// Submission failed; the slot is back to idle. Not retried.
    #[error("Submission failed: {0}")]
    Submit(#[from] SubmitError),

    /// The session is connected to a different network than the table.
    #[error("Session is on context {session} but the table lives on context {resource}")]
    ContextMismatch {
        /// Context of the connected signer.
        session: ContextId,
        /// Context of the managed table.
        resource: ContextId,
    },

    /// The operation was confirmed but the refresh query failed.
    #[error("Refresh after {handle} failed: {source}")]
    Refresh {
        /// The confirmed operation.
        handle: OperationHandle,
        /// Underlying read failure.
        source: ReadError,
    },
}

/// Errors during table provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    /// The session has no connected signer.
    #[error("Session error: {0}")]
    Session(#[from] SignerError),

    /// The create operation could not be submitted.
    #[error("Create submission failed: {0}")]
    Submit(#[from] SubmitError),

    /// Confirmation did not arrive within the configured bound.
    #[error("Create {handle} not confirmed within {after:?}")]
    Timeout {
        /// The create operation.
        handle: OperationHandle,
        /// The bound that was exceeded.
        after: Duration,
    },

    /// The network saw the create and refused it.
    #[error("Create {handle} rejected: {}", reason.as_deref().unwrap_or("no reason given"))]
    Rejected {
        /// The create operation.
        handle: OperationHandle,
        /// Network error message.
        reason: Option<String>,
    },

    /// Polling gave up after too many consecutive verifier errors.
    #[error("Gave up polling create {handle} after {attempts} attempts: {last_error}")]
    Abandoned {
        /// The create operation.
        handle: OperationHandle,
        /// Status queries issued.
        attempts: u32,
        /// Error from the final attempt.
        last_error: VerifierError,
    },

    /// Confirmed, but neither the verifier nor the provisional name
    /// identified the new table.
    #[error("Create {handle} confirmed without a resource id")]
    MissingResourceId {
        /// The create operation.
        handle: OperationHandle,
    },

    /// Confirmed, but the authoritative schema could not be fetched.
    #[error("Schema lookup for {table} failed: {source}")]
    Schema {
        /// Name of the new table.
        table: String,
        /// Underlying verifier failure.
        source: VerifierError,
    },
}
