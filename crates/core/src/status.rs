//! Values returned by the submitter and the verifier.

use serde::{Deserialize, Serialize};
use tableflow_types::{OperationHandle, ResourceId};

/// What the network hands back when it accepts an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Handle to poll for confirmation.
    pub handle: OperationHandle,
    /// Name the resource will most likely have once confirmed.
    ///
    /// For writes this is the target table. For creates the final name is
    /// only known once the verifier reports the assigned resource id.
    pub provisional_name: String,
}

/// Verifier view of one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    /// The verifier has indexed the operation.
    pub seen: bool,
    /// The operation was applied. Meaningless while `seen` is false.
    pub success: bool,
    /// Table id assigned by a confirmed create.
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
    /// Block the operation was included in.
    #[serde(default)]
    pub block_number: Option<u64>,
    /// Network error message for a failed operation.
    #[serde(default)]
    pub error: Option<String>,
}

impl OperationStatus {
    /// Not indexed yet.
    pub fn unseen() -> Self {
        Self::default()
    }

    /// Seen and applied.
    pub fn confirmed(block_number: u64) -> Self {
        Self {
            seen: true,
            success: true,
            block_number: Some(block_number),
            ..Self::default()
        }
    }

    /// Seen and rejected by the network.
    pub fn failed(block_number: u64, error: impl Into<String>) -> Self {
        Self {
            seen: true,
            success: false,
            block_number: Some(block_number),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Attach the resource id of a confirmed create.
    pub fn with_resource_id(mut self, resource_id: ResourceId) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Seen, whatever the outcome.
    pub fn is_terminal(&self) -> bool {
        self.seen
    }

    /// Seen and applied.
    pub fn is_confirmed(&self) -> bool {
        self.seen && self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(!OperationStatus::unseen().is_terminal());

        let ok = OperationStatus::confirmed(10).with_resource_id(ResourceId(1));
        assert!(ok.is_terminal());
        assert!(ok.is_confirmed());
        assert_eq!(ok.resource_id, Some(ResourceId(1)));

        let failed = OperationStatus::failed(11, "no such table");
        assert!(failed.is_terminal());
        assert!(!failed.is_confirmed());
    }

    #[test]
    fn test_status_defaults_missing_fields() {
        let status: OperationStatus =
            serde_json::from_str(r#"{"seen": true, "success": true}"#).unwrap();
        assert!(status.is_confirmed());
        assert_eq!(status.resource_id, None);
    }
}
