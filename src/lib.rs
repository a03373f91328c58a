// Copyright 2025 Cowboy AI, LLC.

//! # CRM Domain
//!
//! Event-sourced aggregate and command-handling framework for a
//! multi-tenant CRM backend.
//!
//! Every CRM entity (contracts, invoices, organizations, reminders, ...)
//! is an event-sourced aggregate persisted to an external event store and
//! materialized into read models downstream. This crate is the client-side
//! framework those domains share:
//!
//! - **Event**: an immutable, versioned fact appended to an aggregate's
//!   stream, with a flat metadata map (tenant, acting user, app source,
//!   tracing carrier)
//! - **Aggregate**: the consistency boundary; state is a left-fold of the
//!   stream through a `when` function, with version bookkeeping supplied
//!   by a common base
//! - **AggregateStore**: the boundary to the external event store —
//!   exists/load/save/update-stream-metadata, with optimistic concurrency
//!   enforced by an expected-version check on save
//! - **CommandHandler**: load, dispatch, save — wrapped, for contended
//!   aggregates, in a bounded retry loop that replays only version
//!   conflicts against a freshly loaded aggregate
//!
//! ## Design Principles
//!
//! 1. **One writer wins**: no client-side locks; all consistency is
//!    delegated to the store's per-stream append-only version check
//! 2. **Closed command sets**: each aggregate declares an enum of the
//!    commands it handles, dispatched by exhaustive `match`
//! 3. **Re-derivable handlers**: command handling must derive everything
//!    from freshly loaded state, because any attempt may be replayed
//! 4. **Explicit dependencies**: stores, retry policies and options are
//!    injected; no package-level mutable state
//! 5. **Forward-compatible folds**: a `when` must keep interpreting every
//!    event-type version ever emitted for its stream

#![warn(missing_docs)]

mod aggregate;
mod command_handlers;
mod commands;
mod errors;
mod events;
mod grpc;
mod value_objects;

pub mod contract;
pub mod infrastructure;
pub mod invoice;

// Re-export core types
pub use aggregate::{
    compose_aggregate_id, object_id_from_aggregate_id, Aggregate, AggregateBase,
    NOT_FOUND_VERSION,
};
pub use command_handlers::{CommandHandler, CommandHandlerAggregate, RetryPolicy};
pub use commands::{LoadAggregateOptions, RequestContext};
pub use errors::{DomainError, DomainResult};
pub use events::{metadata, Event};
pub use value_objects::{
    ExternalSystem, FieldMask, Source, DEFAULT_APP_SOURCE, DEFAULT_SOURCE,
};

pub use infrastructure::{
    AggregateStore, EventStoreError, InMemoryAggregateStore, LoadOptions, StreamMetadata,
};
