//! Narrow interfaces to the external services.

use crate::{
    OperationStatus, ReadError, SignerError, SubmissionReceipt, SubmitError, VerifierError,
};
use async_trait::async_trait;
use tableflow_types::{
    ColumnSpec, ContextId, Identity, OperationHandle, Param, ResourceId, Row, Statement,
};

/// Supplies an authenticated identity.
///
/// Treated as an opaque capability: the core never sees keys, only the
/// identity the provider is currently connected as.
#[async_trait]
pub trait SignerProvider: Send + Sync {
    /// The connected identity, or [`SignerError::NotConnected`].
    async fn identity(&self) -> Result<Identity, SignerError>;

    /// The network the signer is currently connected to.
    async fn context_id(&self) -> Result<ContextId, SignerError>;
}

/// Sends a single create or write operation to the network.
#[async_trait]
pub trait NetworkSubmitter: Send + Sync {
    /// Submit `statement` with positional `params` as `identity`.
    ///
    /// Returns as soon as the network accepted the operation; acceptance
    /// says nothing about confirmation. Implementations never retry.
    async fn submit(
        &self,
        identity: &Identity,
        context: ContextId,
        statement: &Statement,
        params: &[Param],
    ) -> Result<SubmissionReceipt, SubmitError>;
}

/// Attests to the outcome of submitted operations.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Current status of `handle`.
    ///
    /// An operation the verifier has not indexed yet is reported as
    /// `seen: false`, not as an error. Once seen, repeated calls keep
    /// returning the same status.
    async fn status(
        &self,
        context: ContextId,
        handle: &OperationHandle,
    ) -> Result<OperationStatus, VerifierError>;

    /// Authoritative column list of a confirmed table, in declaration order.
    async fn resource_schema(
        &self,
        context: ContextId,
        resource: ResourceId,
    ) -> Result<Vec<ColumnSpec>, VerifierError>;
}

/// Stateless read access to table contents.
#[async_trait]
pub trait ReadAccessor: Send + Sync {
    /// Run `select` against `resource_name` on `context`.
    async fn query(
        &self,
        context: ContextId,
        resource_name: &str,
        select: &str,
    ) -> Result<Vec<Row>, ReadError>;
}
