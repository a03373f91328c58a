// Copyright 2025 Cowboy AI, LLC.

//! Error classification at the gRPC service boundary
//!
//! The gRPC services themselves are thin generated adapters and live
//! outside this crate; what they share is the mapping from the domain
//! error taxonomy to wire status codes.

use crate::errors::DomainError;
use tonic::Status;

impl From<DomainError> for Status {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::ValidationError(_) => Status::invalid_argument(err.to_string()),
            DomainError::MissingContext(_) => Status::unauthenticated(err.to_string()),
            DomainError::AggregateNotFound(_) => Status::not_found(err.to_string()),
            DomainError::ConcurrencyConflict { .. } => Status::aborted(err.to_string()),
            DomainError::InvalidEventType { .. }
            | DomainError::InvalidCommandType { .. }
            | DomainError::MaxRetriesReached
            | DomainError::SerializationError(_)
            | DomainError::EventStore(_) => Status::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use tonic::Code;

    #[test_case(DomainError::validation("name required"), Code::InvalidArgument; "validation")]
    #[test_case(DomainError::MissingContext("tenant is required".into()), Code::Unauthenticated; "missing context")]
    #[test_case(DomainError::AggregateNotFound("contract-acme-c1".into()), Code::NotFound; "not found")]
    #[test_case(DomainError::ConcurrencyConflict { expected: 1, current: 2 }, Code::Aborted; "conflict")]
    #[test_case(DomainError::InvalidEventType { event_type: "V9_UNKNOWN".into() }, Code::Internal; "event type drift")]
    #[test_case(DomainError::InvalidCommandType { reason: "misrouted".into() }, Code::Internal; "command routing")]
    #[test_case(DomainError::MaxRetriesReached, Code::Internal; "retries exhausted")]
    #[test_case(DomainError::EventStore("connection refused".into()), Code::Internal; "backend")]
    fn test_status_classification(err: DomainError, expected: Code) {
        let status: Status = err.into();
        assert_eq!(status.code(), expected);
    }

    #[test]
    fn test_status_carries_message() {
        let status: Status = DomainError::AggregateNotFound("contract-acme-c1".into()).into();
        assert!(status.message().contains("contract-acme-c1"));
    }
}
