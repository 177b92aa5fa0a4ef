//! Scripted verifier responses.

use tableflow_core::{OperationStatus, VerifierError};
use tableflow_types::ResourceId;

/// What the verifier says about one operation, query by query.
///
/// Queries first hit `transport_errors` failures, then `unseen` "not yet
/// seen" answers, then the terminal status forever after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusScript {
    /// Leading queries that fail in transit.
    pub transport_errors: u32,
    /// Queries answered with `seen: false` after the errors.
    pub unseen: u32,
    /// Terminal outcome. `None` means the operation is never seen.
    pub outcome: Option<Result<(), String>>,
    /// Resource id to report on success, overriding the one assigned by a create.
    pub resource_id: Option<ResourceId>,
}

impl StatusScript {
    /// Confirmed after `unseen` "not yet seen" answers.
    pub fn confirm_after(unseen: u32) -> Self {
        Self {
            transport_errors: 0,
            unseen,
            outcome: Some(Ok(())),
            resource_id: None,
        }
    }

    /// Rejected with `error` after `unseen` "not yet seen" answers.
    pub fn reject_after(unseen: u32, error: impl Into<String>) -> Self {
        Self {
            outcome: Some(Err(error.into())),
            ..Self::confirm_after(unseen)
        }
    }

    /// Never seen.
    pub fn never() -> Self {
        Self {
            outcome: None,
            ..Self::confirm_after(0)
        }
    }

    /// Prepend `count` transport failures.
    pub fn with_transport_errors(mut self, count: u32) -> Self {
        self.transport_errors = count;
        self
    }

    /// Report `id` as the resource id once confirmed.
    pub fn with_resource_id(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    /// Whether the operation ends up applied.
    pub fn succeeds(&self) -> bool {
        matches!(self.outcome, Some(Ok(())))
    }
}

impl Default for StatusScript {
    fn default() -> Self {
        Self::confirm_after(1)
    }
}

/// A script being played back for one operation.
#[derive(Debug, Clone)]
pub(crate) struct ScriptCursor {
    script: StatusScript,
    block_number: u64,
    queries: usize,
}

impl ScriptCursor {
    pub(crate) fn new(script: StatusScript, block_number: u64) -> Self {
        Self {
            script,
            block_number,
            queries: 0,
        }
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries
    }

    /// Answer the next status query.
    pub(crate) fn next(&mut self) -> Result<OperationStatus, VerifierError> {
        self.queries += 1;

        if self.script.transport_errors > 0 {
            self.script.transport_errors -= 1;
            return Err(VerifierError::Transport(
                "simulated transport error".to_string(),
            ));
        }
        if self.script.unseen > 0 {
            self.script.unseen -= 1;
            return Ok(OperationStatus::unseen());
        }

        Ok(match &self.script.outcome {
            None => OperationStatus::unseen(),
            Some(Ok(())) => {
                let status = OperationStatus::confirmed(self.block_number);
                match self.script.resource_id {
                    Some(id) => status.with_resource_id(id),
                    None => status,
                }
            }
            Some(Err(error)) => OperationStatus::failed(self.block_number, error.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_plays_script_in_order() {
        let script = StatusScript::confirm_after(2).with_transport_errors(1);
        let mut cursor = ScriptCursor::new(script, 7);

        assert!(cursor.next().is_err());
        assert!(!cursor.next().unwrap().seen);
        assert!(!cursor.next().unwrap().seen);

        let status = cursor.next().unwrap();
        assert!(status.is_confirmed());
        assert_eq!(status.block_number, Some(7));
        assert_eq!(cursor.queries(), 4);
    }

    #[test]
    fn test_terminal_status_is_stable() {
        let mut cursor = ScriptCursor::new(StatusScript::confirm_after(0), 1);
        for _ in 0..5 {
            assert!(cursor.next().unwrap().is_confirmed());
        }
    }

    #[test]
    fn test_never_stays_unseen() {
        let mut cursor = ScriptCursor::new(StatusScript::never(), 1);
        for _ in 0..5 {
            assert!(!cursor.next().unwrap().seen);
        }
    }

    #[test]
    fn test_rejection_carries_error() {
        let mut cursor = ScriptCursor::new(StatusScript::reject_after(0, "bad"), 3);
        let status = cursor.next().unwrap();
        assert!(status.seen);
        assert!(!status.success);
        assert_eq!(status.error.as_deref(), Some("bad"));
    }
}
