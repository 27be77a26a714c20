//! Error types for Handraise

use thiserror::Error;

use crate::types::HandoffStatus;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: HandoffStatus,
        to: HandoffStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dependency failure: {0}")]
    Dependency(String),
}

/// Result type alias for hand-off operations
pub type HandoffResult<T> = Result<T, HandoffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_transition_names_both_statuses() {
        let err = HandoffError::IllegalTransition {
            from: HandoffStatus::Resolved,
            to: HandoffStatus::Assigned,
        };
        assert_eq!(err.to_string(), "Illegal transition: resolved -> assigned");
    }
}
