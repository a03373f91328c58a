// Copyright 2025 Cowboy AI, LLC.

//! Infrastructure boundary: the aggregate store contract and the
//! in-memory implementation used by the test suites

pub mod event_store;
pub mod memory_event_store;

pub use event_store::{AggregateStore, EventStoreError, LoadOptions, StreamMetadata};
pub use memory_event_store::InMemoryAggregateStore;
