//! Table provisioning.
//!
//! Creating a table is the one operation the caller has to wait for:
//! nothing else can be done with a table whose final name is not known.
//! The provisioner submits the create, polls until it is confirmed (bounded
//! by the configured timeout), and then asks the verifier for the schema
//! the network actually stored. The declared schema is never trusted, since
//! the network may normalize types or constraints.

use crate::{
    ConfirmationPoller, InvalidConfig, LifecycleConfig, OperationSubmitter, PollOutcome,
    ProvisioningError, Session,
};
use std::sync::Arc;
use tableflow_core::{SubmitError, Verifier};
use tableflow_types::{
    demo, OperationKind, Param, ResourceDescriptor, ResourceId, Statement, StatementError,
    TableName,
};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Creates tables and waits for them to exist.
#[derive(Clone)]
pub struct TableProvisioner {
    submitter: OperationSubmitter,
    poller: ConfirmationPoller,
    verifier: Arc<dyn Verifier>,
    config: LifecycleConfig,
}

impl TableProvisioner {
    /// Create a provisioner. Fails if `config` is invalid.
    pub fn new(
        submitter: OperationSubmitter,
        poller: ConfirmationPoller,
        verifier: Arc<dyn Verifier>,
        config: LifecycleConfig,
    ) -> Result<Self, InvalidConfig> {
        config.validate()?;
        Ok(Self {
            submitter,
            poller,
            verifier,
            config,
        })
    }

    /// Create the demo table under `prefix`.
    pub async fn create_table(
        &self,
        session: &Session,
        prefix: &str,
    ) -> Result<ResourceDescriptor, ProvisioningError> {
        let statement = demo::create_statement(prefix).map_err(SubmitError::from)?;
        self.provision(session, &statement, &[]).await
    }

    /// Submit a create statement and wait until the table exists.
    ///
    /// Returns the descriptor with the network-assigned name and the
    /// authoritative schema.
    pub async fn provision(
        &self,
        session: &Session,
        statement: &Statement,
        params: &[Param],
    ) -> Result<ResourceDescriptor, ProvisioningError> {
        if statement.kind() != OperationKind::Create {
            return Err(SubmitError::InvalidStatement(StatementError::KindMismatch {
                expected: OperationKind::Create,
            })
            .into());
        }

        let identity = session.identity()?.clone();
        let context = identity.context;
        let receipt = self
            .submitter
            .submit(&identity, context, statement, params)
            .await?;
        let handle = receipt.handle;

        // Polling runs inline; dropping this future stops it.
        let poll = self.poller.poll(
            handle.clone(),
            context,
            self.config.poll_policy(),
            CancellationToken::new(),
        );
        let outcome = match self.config.provisioning_timeout {
            Some(after) => match time::timeout(after, poll).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(handle = %handle, after = ?after, "Table creation timed out");
                    return Err(ProvisioningError::Timeout { handle, after });
                }
            },
            None => poll.await,
        };

        let status = match outcome {
            PollOutcome::Confirmed(status) => status,
            PollOutcome::Rejected(status) => {
                return Err(ProvisioningError::Rejected {
                    handle,
                    reason: status.error,
                })
            }
            PollOutcome::Abandoned {
                attempts,
                last_error,
            } => {
                return Err(ProvisioningError::Abandoned {
                    handle,
                    attempts,
                    last_error,
                })
            }
        };

        let (name, resource) = final_name(&receipt.provisional_name, status.resource_id)
            .ok_or_else(|| ProvisioningError::MissingResourceId {
                handle: handle.clone(),
            })?;

        let schema = self
            .verifier
            .resource_schema(context, resource)
            .await
            .map_err(|source| ProvisioningError::Schema {
                table: name.clone(),
                source,
            })?;

        info!(
            handle = %handle,
            table = %name,
            columns = schema.len(),
            "Table provisioned"
        );

        Ok(ResourceDescriptor {
            name,
            context,
            schema,
        })
    }
}

/// Final table name and id.
///
/// The verifier's resource id is appended to the provisional
/// `{prefix}_{context}` name. Without one, the provisional name must
/// already be complete.
fn final_name(provisional: &str, resource: Option<ResourceId>) -> Option<(String, ResourceId)> {
    match resource {
        Some(id) => Some((format!("{provisional}_{id}"), id)),
        None => TableName::parse(provisional)
            .ok()
            .map(|name| (provisional.to_string(), name.resource)),
    }
}
