// Copyright 2025 Cowboy AI, LLC.

//! Aggregate store trait and related types
//!
//! The store is an external collaborator: an append-only, per-stream
//! event store reached over the network. This module specifies only the
//! client-side contract the command handlers depend on; consistency is
//! delegated entirely to the store's expected-version check on save.

use crate::aggregate::Aggregate;
use crate::errors::DomainError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by the aggregate store boundary
#[derive(Debug, Clone, Error)]
pub enum EventStoreError {
    /// No stream exists for the requested aggregate
    #[error("Aggregate not found: {0}")]
    AggregateNotFound(String),

    /// Optimistic concurrency check failed: another writer appended to
    /// the stream since this aggregate was loaded
    #[error("Wrong expected version: expected {expected}, but current version is {current}")]
    WrongExpectedVersion {
        /// The version the writer expected
        expected: i64,
        /// The actual current stream version
        current: i64,
    },

    /// Failed to reach the event store backend
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to serialize or deserialize event data
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A stored event could not be folded into the aggregate
    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    /// General storage operation failure
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl EventStoreError {
    /// True for the distinguished "no stream" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, EventStoreError::AggregateNotFound(_))
    }

    /// True for the optimistic-lock conflict error; the only store error
    /// the retry loop is allowed to replay
    pub fn is_wrong_expected_version(&self) -> bool {
        matches!(self, EventStoreError::WrongExpectedVersion { .. })
    }
}

impl From<EventStoreError> for DomainError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::AggregateNotFound(id) => DomainError::AggregateNotFound(id),
            EventStoreError::WrongExpectedVersion { expected, current } => {
                DomainError::ConcurrencyConflict { expected, current }
            }
            EventStoreError::SerializationError(msg) | EventStoreError::InvalidEventData(msg) => {
                DomainError::SerializationError(msg)
            }
            EventStoreError::ConnectionError(msg) | EventStoreError::StorageError(msg) => {
                DomainError::EventStore(msg)
            }
        }
    }
}

/// Options for loading an aggregate's stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fetch only the current stream version, skipping event replay.
    /// Used by handlers that need existence and version, not full state.
    pub skip_load_events: bool,
}

/// Retention policy applied to a stream via
/// [`AggregateStore::update_stream_metadata`]. Used for high-churn temp
/// streams (rolling counters, status-refresh triggers).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    /// Drop events older than this age
    pub max_age: Option<Duration>,
    /// Keep at most this many events
    pub max_count: Option<u64>,
}

/// Client-side contract against the external event store.
///
/// `load` replays all events for the aggregate's stream through its fold
/// and adopts the last applied sequence number. `save` appends the events
/// produced since load, using the pre-apply version as the expected
/// stream version, and fails with
/// [`EventStoreError::WrongExpectedVersion`] when another writer appended
/// concurrently.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Check whether a stream exists; returns
    /// [`EventStoreError::AggregateNotFound`] when it does not
    async fn exists(&self, aggregate_id: &str) -> Result<(), EventStoreError>;

    /// Hydrate the aggregate from its stream
    async fn load(
        &self,
        aggregate: &mut dyn Aggregate,
        options: &LoadOptions,
    ) -> Result<(), EventStoreError>;

    /// Append the aggregate's uncommitted events with an expected-version
    /// check
    async fn save(&self, aggregate: &mut dyn Aggregate) -> Result<(), EventStoreError>;

    /// Set the retention policy on a stream
    async fn update_stream_metadata(
        &self,
        stream_id: &str,
        metadata: StreamMetadata,
    ) -> Result<(), EventStoreError>;
}
