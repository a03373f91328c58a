// Copyright 2025 Cowboy AI, LLC.

//! Error types for domain operations

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Validation error (struct-level or explicit business rule)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Required call context (tenant, acting user) is missing or empty
    #[error("Missing context: {0}")]
    MissingContext(String),

    /// Aggregate stream does not exist but was required
    #[error("Aggregate not found: {0}")]
    AggregateNotFound(String),

    /// An event fold received an event type it does not recognize.
    /// Indicates drift between emitted event types and a `when` match.
    #[error("Invalid event type: {event_type}")]
    InvalidEventType {
        /// The unrecognized event type discriminator
        event_type: String,
    },

    /// A command was routed to an aggregate that cannot handle it
    #[error("Invalid command type: {reason}")]
    InvalidCommandType {
        /// Description of the routing mistake
        reason: String,
    },

    /// Optimistic concurrency check failed at save time
    #[error("Concurrency conflict: expected version {expected}, but found {current}")]
    ConcurrencyConflict {
        /// Stream version the writer expected
        expected: i64,
        /// Version actually found in the store
        current: i64,
    },

    /// Retry loop exhausted its attempt budget without a successful save
    #[error("Reached maximum number of retries")]
    MaxRetriesReached,

    /// Failed to serialize or deserialize an event payload
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Backend/infrastructure failure reported by the event store
    #[error("Event store error: {0}")]
    EventStore(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::ValidationError(msg.into())
    }

    /// True for errors a retry loop must never replay: validation,
    /// missing-context, not-found and dispatch errors are all stable
    /// across attempts.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, DomainError::ConcurrencyConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::ConcurrencyConflict {
            expected: 3,
            current: 4,
        };
        assert_eq!(
            err.to_string(),
            "Concurrency conflict: expected version 3, but found 4"
        );

        let err = DomainError::AggregateNotFound("contract-acme-c1".to_string());
        assert_eq!(err.to_string(), "Aggregate not found: contract-acme-c1");
    }

    #[test]
    fn test_serde_error_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: DomainError = bad.unwrap_err().into();
        assert!(matches!(err, DomainError::SerializationError(_)));
    }

    #[test]
    fn test_permanence() {
        assert!(DomainError::validation("empty name").is_permanent());
        assert!(!DomainError::ConcurrencyConflict {
            expected: 0,
            current: 1
        }
        .is_permanent());
    }
}
