//! Pending operation tracking.

use tableflow_types::{ContextId, OperationHandle, OperationKind};

/// A submitted operation that has not been resolved yet.
///
/// Exists from successful submission until the operation is confirmed,
/// fails, or is superseded. At most one exists per write slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    /// Handle returned by the submitter.
    pub handle: OperationHandle,
    /// Network the operation was submitted to.
    pub context: ContextId,
    /// Create or write.
    pub kind: OperationKind,
}

impl PendingOperation {
    /// Create a new pending operation.
    pub fn new(handle: OperationHandle, context: ContextId, kind: OperationKind) -> Self {
        Self {
            handle,
            context,
            kind,
        }
    }
}
