//! Outcome of a single reconcile step

use crate::error::ControllerError;

/// What the executor does after a step returns.
///
/// `Continue` moves on to the next step. `Done` and `Error` are terminal:
/// the pipeline stops and later steps are not attempted.
#[derive(Debug)]
pub enum ReconcileResult {
    /// Proceed to the next step
    Continue,
    /// Stop now and report success
    Done,
    /// Stop now and report the failure so the caller retries with backoff
    Error(ControllerError),
}

impl ReconcileResult {
    /// Hand over to the next step
    pub fn continue_() -> Self {
        Self::Continue
    }

    /// Stop with success
    pub fn done() -> Self {
        Self::Done
    }

    /// Stop with `err`
    pub fn error(err: impl Into<ControllerError>) -> Self {
        Self::Error(err.into())
    }

    /// Whether the pipeline must stop after this result.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_continue_is_not_terminal() {
        assert!(!ReconcileResult::continue_().is_terminal());
        assert!(ReconcileResult::done().is_terminal());
        let err = ControllerError::InvalidConfig("bad".to_string());
        assert!(ReconcileResult::error(err).is_terminal());
    }
}
