use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Resource was modified by another request")]
    StaleObject,
    #[error("Transaction deadlock detected")]
    Deadlock,
    #[error("Idempotency key was already used with different parameters")]
    IdempotencyKeyMismatch,
    /// The storage layer rejected an insert because another transaction
    /// committed an order with the same idempotency key first. Only the
    /// orchestrator sees this; it resolves it by re-reading the winner.
    #[error("Idempotency key already claimed by a concurrent request")]
    IdempotencyKeyTaken,
    #[error("Required parameter is missing: {0}")]
    MissingParameter(&'static str),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(vec![message.into()])
    }

    /// Conflicts the caller may resolve by resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Deadlock | DomainError::StaleObject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_joins_messages() {
        let err = DomainError::Validation(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Validation failed: a; b");
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(DomainError::Deadlock.is_retryable());
        assert!(DomainError::StaleObject.is_retryable());
        assert!(!DomainError::IdempotencyKeyMismatch.is_retryable());
        assert!(!DomainError::validation("x").is_retryable());
    }
}
