//! Error types for the external interfaces.
//!
//! None of these decide whether a failure is terminal. That is left to the
//! lifecycle coordinator, which sees the error together with the slot state.

use tableflow_types::StatementError;
use thiserror::Error;

/// Errors from the signer provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// No signer is connected (never connected, or disconnected since).
    #[error("Signer not connected")]
    NotConnected,
}

/// Errors during operation submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The signer declined to authorize the operation.
    #[error("Signer rejected the operation: {0}")]
    RejectedBySigner(String),

    /// The request did not reach the network or was refused by it.
    #[error("Submission failed: {0}")]
    Transport(String),

    /// The statement was malformed before it left the client.
    #[error("Invalid statement: {0}")]
    InvalidStatement(#[from] StatementError),
}

/// Errors talking to the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifierError {
    /// Request failed in transit.
    #[error("Verifier request failed: {0}")]
    Transport(String),

    /// Verifier answered with something we could not decode.
    #[error("Verifier response malformed: {0}")]
    Decode(String),

    /// The requested resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),
}

/// Errors from read queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Request failed in transit.
    #[error("Read query failed: {0}")]
    Transport(String),

    /// Rows could not be decoded into the expected shape.
    #[error("Read response malformed: {0}")]
    Decode(String),
}
