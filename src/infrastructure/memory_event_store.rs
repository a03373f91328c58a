// Copyright 2025 Cowboy AI, LLC.

//! In-memory aggregate store with a real expected-version check
//!
//! Backs the unit and integration suites. Not a product event store: no
//! durability, no subscriptions, retention metadata is recorded but not
//! enforced.

use crate::aggregate::{Aggregate, NOT_FOUND_VERSION};
use crate::events::Event;
use crate::infrastructure::event_store::{
    AggregateStore, EventStoreError, LoadOptions, StreamMetadata,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone)]
struct StreamState {
    events: Vec<Event>,
    metadata: Option<StreamMetadata>,
}

impl StreamState {
    fn current_version(&self) -> i64 {
        self.events.last().map_or(NOT_FOUND_VERSION, |e| e.version)
    }
}

/// Thread-safe in-memory store keyed by stream id.
///
/// `Clone` is cheap; all state is `Arc`-wrapped, so cloned handles share
/// the same streams (two handlers cloning the store contend on the same
/// expected-version check, as they would against a real backend).
#[derive(Debug, Default, Clone)]
pub struct InMemoryAggregateStore {
    streams: Arc<RwLock<HashMap<String, StreamState>>>,
}

impl InMemoryAggregateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All persisted events for a stream, in version order
    pub async fn events_for(&self, aggregate_id: &str) -> Vec<Event> {
        self.streams
            .read()
            .await
            .get(aggregate_id)
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    /// Retention metadata recorded for a stream, if any
    pub async fn stream_metadata(&self, aggregate_id: &str) -> Option<StreamMetadata> {
        self.streams
            .read()
            .await
            .get(aggregate_id)
            .and_then(|s| s.metadata)
    }
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn exists(&self, aggregate_id: &str) -> Result<(), EventStoreError> {
        let streams = self.streams.read().await;
        match streams.get(aggregate_id) {
            Some(stream) if !stream.events.is_empty() => Ok(()),
            _ => Err(EventStoreError::AggregateNotFound(aggregate_id.to_string())),
        }
    }

    async fn load(
        &self,
        aggregate: &mut dyn Aggregate,
        options: &LoadOptions,
    ) -> Result<(), EventStoreError> {
        let events = {
            let streams = self.streams.read().await;
            let stream = streams
                .get(aggregate.id())
                .filter(|s| !s.events.is_empty())
                .ok_or_else(|| EventStoreError::AggregateNotFound(aggregate.id().to_string()))?;

            if options.skip_load_events {
                aggregate.base_mut().version = stream.current_version();
                return Ok(());
            }
            stream.events.clone()
        };

        for event in events {
            aggregate
                .load_event(event)
                .map_err(|err| EventStoreError::InvalidEventData(err.to_string()))?;
        }
        Ok(())
    }

    async fn save(&self, aggregate: &mut dyn Aggregate) -> Result<(), EventStoreError> {
        let events = aggregate.take_uncommitted();
        let Some(first) = events.first() else {
            return Ok(());
        };
        // The version carried by the first new event is one past the
        // version the aggregate was loaded at.
        let expected = first.version - 1;

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate.id().to_string()).or_default();
        let current = stream.current_version();
        if current != expected {
            return Err(EventStoreError::WrongExpectedVersion { expected, current });
        }
        stream.events.extend(events);
        Ok(())
    }

    async fn update_stream_metadata(
        &self,
        stream_id: &str,
        metadata: StreamMetadata,
    ) -> Result<(), EventStoreError> {
        let mut streams = self.streams.write().await;
        streams.entry(stream_id.to_string()).or_default().metadata = Some(metadata);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateBase;
    use crate::errors::{DomainError, DomainResult};
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct Renamed {
        name: String,
    }

    struct Probe {
        base: AggregateBase,
        name: String,
    }

    impl Probe {
        fn new(id: &str) -> Self {
            Self {
                base: AggregateBase::with_tenant_and_id("probe", "acme", id).unwrap(),
                name: String::new(),
            }
        }

        fn rename(&mut self, name: &str) -> DomainResult<()> {
            let event = Event::new(
                &self.base,
                "V1_PROBE_RENAME",
                &Renamed {
                    name: name.to_string(),
                },
            )?;
            self.apply(event)
        }
    }

    impl Aggregate for Probe {
        fn base(&self) -> &AggregateBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut AggregateBase {
            &mut self.base
        }

        fn when(&mut self, event: &Event) -> DomainResult<()> {
            if event.is_system_event() {
                return Ok(());
            }
            match event.event_type.as_str() {
                "V1_PROBE_RENAME" => {
                    let payload: Renamed = event.get_json_data()?;
                    self.name = payload.name;
                    Ok(())
                }
                other => Err(DomainError::InvalidEventType {
                    event_type: other.to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_exists_reports_missing_stream() {
        let store = InMemoryAggregateStore::new();
        let err = store.exists("probe-acme-p1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = InMemoryAggregateStore::new();

        let mut probe = Probe::new("p1");
        probe.rename("first").unwrap();
        probe.rename("second").unwrap();
        store.save(&mut probe).await.unwrap();

        store.exists("probe-acme-p1").await.unwrap();

        let mut reloaded = Probe::new("p1");
        store
            .load(&mut reloaded, &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(reloaded.name, "second");
        assert_eq!(reloaded.version(), 1);
    }

    #[tokio::test]
    async fn test_save_rejects_stale_writer() {
        let store = InMemoryAggregateStore::new();

        let mut winner = Probe::new("p1");
        winner.rename("winner").unwrap();
        store.save(&mut winner).await.unwrap();

        // Loser never observed the winner's write.
        let mut loser = Probe::new("p1");
        loser.rename("loser").unwrap();
        let err = store.save(&mut loser).await.unwrap_err();
        assert!(err.is_wrong_expected_version());

        // The losing write left no trace.
        assert_eq!(store.events_for("probe-acme-p1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_skip_load_events_sets_version_only() {
        let store = InMemoryAggregateStore::new();

        let mut probe = Probe::new("p1");
        probe.rename("persisted").unwrap();
        store.save(&mut probe).await.unwrap();

        let mut shallow = Probe::new("p1");
        store
            .load(
                &mut shallow,
                &LoadOptions {
                    skip_load_events: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(shallow.version(), 0);
        assert_eq!(shallow.name, "");
    }

    #[tokio::test]
    async fn test_empty_save_is_a_no_op() {
        let store = InMemoryAggregateStore::new();
        let mut probe = Probe::new("p1");
        store.save(&mut probe).await.unwrap();
        assert!(store.exists("probe-acme-p1").await.is_err());
    }

    #[tokio::test]
    async fn test_stream_metadata_is_recorded() {
        let store = InMemoryAggregateStore::new();
        let retention = StreamMetadata {
            max_age: Some(Duration::from_secs(3600)),
            max_count: Some(100),
        };
        store
            .update_stream_metadata("invoicing_cycle-acme-cycle", retention)
            .await
            .unwrap();
        assert_eq!(
            store.stream_metadata("invoicing_cycle-acme-cycle").await,
            Some(retention)
        );
        // Metadata alone does not make the aggregate exist.
        assert!(store.exists("invoicing_cycle-acme-cycle").await.is_err());
    }
}
