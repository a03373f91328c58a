// Copyright 2025 Cowboy AI, LLC.

//! Request context and load options shared by all command handlers
//!
//! Every inbound call (gRPC, GraphQL, internal scheduler) is translated into
//! a per-aggregate command enum plus a [`RequestContext`] carrying the
//! tenant, the acting user and the originating application. The context is
//! never persisted as-is; it is folded into each produced event's metadata.

use crate::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Call-scoped context attached to every command.
///
/// Constructed per RPC invocation and discarded when the command completes.
/// The `tracing` map is an opaque carrier for distributed-tracing fields
/// injected by the transport layer; it is merged verbatim into event
/// metadata so consumers can continue the trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Tenant the target aggregate belongs to
    pub tenant: String,
    /// Id of the user on whose behalf the command runs (may be empty for
    /// system-initiated commands)
    pub logged_in_user_id: String,
    /// Application that originated the request
    pub app_source: String,
    /// Tracing carrier fields propagated into event metadata
    pub tracing: HashMap<String, String>,
}

impl RequestContext {
    /// Create a context for the given tenant
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            ..Default::default()
        }
    }

    /// Set the acting user id
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.logged_in_user_id = user_id.into();
        self
    }

    /// Set the originating application
    pub fn with_app_source(mut self, app_source: impl Into<String>) -> Self {
        self.app_source = app_source.into();
        self
    }

    /// Attach tracing carrier fields
    pub fn with_tracing(mut self, tracing: HashMap<String, String>) -> Self {
        self.tracing = tracing;
        self
    }

    /// Reject contexts that cannot be attributed to a tenant
    pub fn validate(&self) -> DomainResult<()> {
        if self.tenant.trim().is_empty() {
            return Err(DomainError::MissingContext("tenant is required".into()));
        }
        Ok(())
    }
}

/// How a handler should hydrate the target aggregate before dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadAggregateOptions {
    /// Fail fast with [`DomainError::AggregateNotFound`] when the stream
    /// does not exist, instead of handing the command an unhydrated
    /// aggregate
    pub required: bool,
    /// Load only the current stream version, skipping event replay.
    /// Temp aggregates force this regardless of the option.
    pub skip_load_events: bool,
}

impl LoadAggregateOptions {
    /// Options for commands that must target an existing aggregate
    pub fn required() -> Self {
        Self {
            required: true,
            skip_load_events: false,
        }
    }
}
