//! Operation submission.

use std::sync::Arc;
use tableflow_core::{NetworkSubmitter, SubmissionReceipt, SubmitError};
use tableflow_types::{ContextId, Identity, Param, Statement};
use tracing::{info, warn};

/// Submits single create/write operations through the network submitter.
///
/// Returns on network acceptance, not confirmation. Failures are returned
/// to the caller as-is; nothing here retries.
#[derive(Clone)]
pub struct OperationSubmitter {
    network: Arc<dyn NetworkSubmitter>,
}

impl OperationSubmitter {
    /// Create a submitter over `network`.
    pub fn new(network: Arc<dyn NetworkSubmitter>) -> Self {
        Self { network }
    }

    /// Submit `statement` on `context` as `identity`.
    ///
    /// `params` bind the statement's positional placeholders. Identifiers
    /// (table names) are interpolated into the statement by the caller and
    /// are the caller's responsibility.
    pub async fn submit(
        &self,
        identity: &Identity,
        context: ContextId,
        statement: &Statement,
        params: &[Param],
    ) -> Result<SubmissionReceipt, SubmitError> {
        statement.check_params(params)?;

        match self
            .network
            .submit(identity, context, statement, params)
            .await
        {
            Ok(receipt) => {
                info!(
                    handle = %receipt.handle,
                    context = %context,
                    kind = %statement.kind(),
                    provisional_name = %receipt.provisional_name,
                    "Operation submitted"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(
                    context = %context,
                    kind = %statement.kind(),
                    error = %e,
                    "Operation submission failed"
                );
                Err(e)
            }
        }
    }
}
