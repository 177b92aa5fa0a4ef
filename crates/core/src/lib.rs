//! External interfaces the lifecycle core calls through.
//!
//! Every collaborator that does I/O sits behind one of the narrow traits in
//! [`traits`]. The lifecycle crate only ever talks to these traits, so the
//! same coordinator runs against the HTTP gateway, the in-memory simulation,
//! or a test double.
//!
//! # Components
//!
//! - [`SignerProvider`] - Supplies the connected identity and its context
//! - [`NetworkSubmitter`] - Sends a signed create/write operation
//! - [`Verifier`] - Reports operation status and authoritative table schemas
//! - [`ReadAccessor`] - Stateless read queries
//!
//! Errors are split by collaborator in [`error`]; only the coordinator
//! decides which of them are terminal.

pub mod error;
mod status;
pub mod traits;

pub use error::{ReadError, SignerError, SubmitError, VerifierError};
pub use status::{OperationStatus, SubmissionReceipt};
pub use traits::{NetworkSubmitter, ReadAccessor, SignerProvider, Verifier};
