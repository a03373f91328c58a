// Copyright 2025 Cowboy AI, LLC.

//! Event envelope and metadata enrichment
//!
//! Events are immutable, versioned facts appended to an aggregate's stream.
//! The envelope carries the serialized payload plus a flat string-keyed
//! metadata map (tenant, acting user, app source, tracing carrier fields)
//! that must round-trip through the store unchanged.

use crate::aggregate::AggregateBase;
use crate::commands::RequestContext;
use crate::errors::DomainResult;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata keys persisted with every event
pub mod metadata {
    /// Tenant the event belongs to; always present
    pub const TENANT: &str = "tenant";
    /// Acting user id; present when a user initiated the command
    pub const USER_ID: &str = "user-id";
    /// Originating application; present when supplied by the caller
    pub const APP: &str = "app";
}

/// Prefix used by store-internal system events, which domain folds skip
const SYSTEM_EVENT_PREFIX: char = '$';

/// An immutable event bound to one aggregate stream.
///
/// Constructed only by aggregate command methods via [`Event::new`]; the
/// stream `version` is assigned when the owning aggregate applies the
/// event. Payloads are versioned by event-type suffix (`V1_`, `V2_`), and
/// an aggregate's fold must keep interpreting every version ever emitted
/// for its stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    /// Unique event id (UUID v7, time-ordered)
    pub event_id: Uuid,
    /// Stream id of the owning aggregate
    pub aggregate_id: String,
    /// Aggregate type tag (e.g. `"contract"`)
    pub aggregate_type: String,
    /// Event type discriminator (e.g. `"V1_CONTRACT_CREATE"`)
    pub event_type: String,
    /// Sequence number within the stream; assigned on apply
    pub version: i64,
    /// Serialized JSON payload specific to the event type
    pub data: serde_json::Value,
    /// Flat string-keyed metadata: tenant, user, app, tracing fields
    pub metadata: HashMap<String, String>,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event for the given aggregate, serializing the typed
    /// payload. The stream version is assigned later by
    /// [`Aggregate::apply`](crate::aggregate::Aggregate::apply).
    pub fn new<T: Serialize>(
        aggregate: &AggregateBase,
        event_type: impl Into<String>,
        payload: &T,
    ) -> DomainResult<Self> {
        Ok(Self {
            event_id: Uuid::now_v7(),
            aggregate_id: aggregate.id.clone(),
            aggregate_type: aggregate.aggregate_type.clone(),
            event_type: event_type.into(),
            version: 0,
            data: serde_json::to_value(payload)?,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        })
    }

    /// Deserialize the payload into its typed event struct
    pub fn get_json_data<T: DeserializeOwned>(&self) -> DomainResult<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// True for events injected by the store infrastructure itself
    /// (`$`-prefixed). Domain folds must no-op on these.
    pub fn is_system_event(&self) -> bool {
        self.event_type.starts_with(SYSTEM_EVENT_PREFIX)
    }

    /// Merge call context into the event's metadata: tracing carrier
    /// fields first, then tenant (always), acting user and app source
    /// (when non-empty).
    pub fn enrich_metadata(&mut self, ctx: &RequestContext) {
        for (key, value) in &ctx.tracing {
            self.metadata.insert(key.clone(), value.clone());
        }
        self.metadata
            .insert(metadata::TENANT.to_string(), ctx.tenant.clone());
        if !ctx.logged_in_user_id.is_empty() {
            self.metadata
                .insert(metadata::USER_ID.to_string(), ctx.logged_in_user_id.clone());
        }
        if !ctx.app_source.is_empty() {
            self.metadata
                .insert(metadata::APP.to_string(), ctx.app_source.clone());
        }
    }

    /// Look up a metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateBase;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestPayload {
        name: String,
    }

    fn base() -> AggregateBase {
        AggregateBase::with_tenant_and_id("contract", "acme", "c1").unwrap()
    }

    #[test]
    fn test_event_binds_to_aggregate() {
        let payload = TestPayload {
            name: "Acme MSA".to_string(),
        };
        let event = Event::new(&base(), "V1_CONTRACT_CREATE", &payload).unwrap();

        assert_eq!(event.aggregate_id, "contract-acme-c1");
        assert_eq!(event.aggregate_type, "contract");
        assert_eq!(event.event_type, "V1_CONTRACT_CREATE");
        assert_eq!(event.get_json_data::<TestPayload>().unwrap(), payload);
    }

    #[test]
    fn test_metadata_enrichment() {
        let mut tracing = HashMap::new();
        tracing.insert("trace-id".to_string(), "t-1".to_string());

        let ctx = RequestContext::new("acme")
            .with_user("user-7")
            .with_app_source("crm-api")
            .with_tracing(tracing);

        let mut event = Event::new(&base(), "V1_CONTRACT_CREATE", &()).unwrap();
        event.enrich_metadata(&ctx);

        assert_eq!(event.metadata_value(metadata::TENANT), Some("acme"));
        assert_eq!(event.metadata_value(metadata::USER_ID), Some("user-7"));
        assert_eq!(event.metadata_value(metadata::APP), Some("crm-api"));
        assert_eq!(event.metadata_value("trace-id"), Some("t-1"));
    }

    #[test]
    fn test_empty_context_fields_are_omitted() {
        let ctx = RequestContext::new("acme");
        let mut event = Event::new(&base(), "V1_CONTRACT_CREATE", &()).unwrap();
        event.enrich_metadata(&ctx);

        assert_eq!(event.metadata_value(metadata::TENANT), Some("acme"));
        assert_eq!(event.metadata_value(metadata::USER_ID), None);
        assert_eq!(event.metadata_value(metadata::APP), None);
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut event = Event::new(&base(), "V1_CONTRACT_CREATE", &()).unwrap();
        event.enrich_metadata(&RequestContext::new("acme").with_user("u1"));

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_system_event_detection() {
        let mut event = Event::new(&base(), "$metadata", &()).unwrap();
        assert!(event.is_system_event());
        event.event_type = "V1_CONTRACT_CREATE".to_string();
        assert!(!event.is_system_event());
    }
}
