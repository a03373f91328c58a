// Copyright 2025 Cowboy AI, LLC.

//! Aggregate trait and the common aggregate base
//!
//! An aggregate is the event-sourced consistency boundary for one entity
//! instance. Its state is a left-fold of its event stream: the store
//! replays history through [`Aggregate::when`], and command methods append
//! new events through [`Aggregate::apply`]. Concrete aggregates embed an
//! [`AggregateBase`] for identity and version bookkeeping and implement
//! only their own fold and command handling.

use crate::errors::{DomainError, DomainResult};
use crate::events::Event;
use serde::{Deserialize, Serialize};

/// Version sentinel for an aggregate whose stream does not exist yet
pub const NOT_FOUND_VERSION: i64 = -1;

/// Compose the store-facing stream id from type, tenant and business id
pub fn compose_aggregate_id(aggregate_type: &str, tenant: &str, id: &str) -> String {
    if tenant.is_empty() {
        format!("{aggregate_type}-{id}")
    } else {
        format!("{aggregate_type}-{tenant}-{id}")
    }
}

/// Recover the business id from a namespaced stream id, given the type
/// and tenant it was composed with. Inverse of [`compose_aggregate_id`].
pub fn object_id_from_aggregate_id(aggregate_id: &str, aggregate_type: &str, tenant: &str) -> String {
    let prefix = if tenant.is_empty() {
        format!("{aggregate_type}-")
    } else {
        format!("{aggregate_type}-{tenant}-")
    };
    aggregate_id
        .strip_prefix(&prefix)
        .unwrap_or(aggregate_id)
        .to_string()
}

/// Identity and version bookkeeping shared by every concrete aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBase {
    /// Namespaced stream id, `"{type}-{tenant}-{id}"`
    pub id: String,
    /// Aggregate type tag
    pub aggregate_type: String,
    /// Tenant; empty for tenant-agnostic aggregates
    pub tenant: String,
    /// Current in-memory version; [`NOT_FOUND_VERSION`] until hydrated
    /// or first applied
    pub version: i64,
    /// Events applied since load, awaiting persistence
    #[serde(skip)]
    pub uncommitted: Vec<Event>,
    /// Temp streams never replay history on load
    pub skip_load_events: bool,
}

impl AggregateBase {
    /// Base keyed by `(type, id)`, for tenant-agnostic aggregates such as
    /// countries or currencies
    pub fn with_id(aggregate_type: &str, id: &str) -> DomainResult<Self> {
        Self::build(aggregate_type, "", id, false)
    }

    /// Base keyed by `(type, tenant, id)`, the common case for CRM
    /// entities
    pub fn with_tenant_and_id(aggregate_type: &str, tenant: &str, id: &str) -> DomainResult<Self> {
        if tenant.trim().is_empty() {
            return Err(DomainError::validation("tenant must not be empty"));
        }
        Self::build(aggregate_type, tenant, id, false)
    }

    /// Temp variant for short-retention, high-churn streams; the store
    /// skips event replay when loading it
    pub fn temp_with_tenant_and_id(
        aggregate_type: &str,
        tenant: &str,
        id: &str,
    ) -> DomainResult<Self> {
        if tenant.trim().is_empty() {
            return Err(DomainError::validation("tenant must not be empty"));
        }
        Self::build(aggregate_type, tenant, id, true)
    }

    fn build(
        aggregate_type: &str,
        tenant: &str,
        id: &str,
        skip_load_events: bool,
    ) -> DomainResult<Self> {
        if id.trim().is_empty() {
            return Err(DomainError::validation("aggregate id must not be empty"));
        }
        Ok(Self {
            id: compose_aggregate_id(aggregate_type, tenant, id),
            aggregate_type: aggregate_type.to_string(),
            tenant: tenant.to_string(),
            version: NOT_FOUND_VERSION,
            uncommitted: Vec::new(),
            skip_load_events,
        })
    }

    /// Business id, with the type/tenant namespace stripped off
    pub fn object_id(&self) -> String {
        object_id_from_aggregate_id(&self.id, &self.aggregate_type, &self.tenant)
    }
}

/// The event-sourced aggregate contract.
///
/// Implementors supply access to their [`AggregateBase`] and a `when`
/// fold; everything else (apply, replay, version bookkeeping) is
/// provided. An aggregate is owned exclusively by the handler that loaded
/// it for the duration of one command and is discarded afterwards.
pub trait Aggregate: Send {
    /// Shared identity/version state
    fn base(&self) -> &AggregateBase;

    /// Mutable access to the shared state
    fn base_mut(&mut self) -> &mut AggregateBase;

    /// Fold one event into in-memory state.
    ///
    /// Must no-op on [system events](Event::is_system_event) and return
    /// [`DomainError::InvalidEventType`] for unrecognized domain event
    /// types. Must stay able to interpret every event-type version ever
    /// emitted for this stream.
    fn when(&mut self, event: &Event) -> DomainResult<()>;

    /// Namespaced stream id
    fn id(&self) -> &str {
        &self.base().id
    }

    /// Aggregate type tag
    fn aggregate_type(&self) -> &str {
        &self.base().aggregate_type
    }

    /// Tenant this aggregate belongs to (empty when tenant-agnostic)
    fn tenant(&self) -> &str {
        &self.base().tenant
    }

    /// Current in-memory version
    fn version(&self) -> i64 {
        self.base().version
    }

    /// True until the aggregate has been hydrated from an existing
    /// stream or has applied its first event
    fn not_found(&self) -> bool {
        self.base().version < 0
    }

    /// Whether the store should skip event replay when loading
    fn skip_load_events(&self) -> bool {
        self.base().skip_load_events
    }

    /// Apply a newly produced event: assign the next stream version,
    /// fold it through [`when`](Aggregate::when), bump the in-memory
    /// version and buffer the event for the next save.
    fn apply(&mut self, mut event: Event) -> DomainResult<()> {
        event.version = self.base().version + 1;
        self.when(&event)?;
        let base = self.base_mut();
        base.version += 1;
        base.uncommitted.push(event);
        Ok(())
    }

    /// Fold a historical event during replay, adopting its stored
    /// version without buffering it
    fn load_event(&mut self, event: Event) -> DomainResult<()> {
        self.when(&event)?;
        self.base_mut().version = event.version;
        Ok(())
    }

    /// Drain the events applied since load, in application order
    fn take_uncommitted(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.base_mut().uncommitted)
    }

    /// True when there are events awaiting persistence
    fn has_uncommitted(&self) -> bool {
        !self.base().uncommitted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Bumped {
        amount: i64,
    }

    struct Counter {
        base: AggregateBase,
        value: i64,
    }

    impl Counter {
        fn new(tenant: &str, id: &str) -> DomainResult<Self> {
            Ok(Self {
                base: AggregateBase::with_tenant_and_id("counter", tenant, id)?,
                value: 0,
            })
        }

        fn bump(&mut self, amount: i64) -> DomainResult<()> {
            let event = Event::new(&self.base, "V1_COUNTER_BUMP", &Bumped { amount })?;
            self.apply(event)
        }
    }

    impl Aggregate for Counter {
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
                "V1_COUNTER_BUMP" => {
                    let payload: Bumped = event.get_json_data()?;
                    self.value += payload.amount;
                    Ok(())
                }
                other => Err(DomainError::InvalidEventType {
                    event_type: other.to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_id_composition_and_stripping() {
        assert_eq!(compose_aggregate_id("contract", "acme", "c1"), "contract-acme-c1");
        assert_eq!(compose_aggregate_id("country", "", "US"), "country-US");
        assert_eq!(
            object_id_from_aggregate_id("contract-acme-c1", "contract", "acme"),
            "c1"
        );
        assert_eq!(object_id_from_aggregate_id("country-US", "country", ""), "US");
    }

    #[test]
    fn test_empty_ids_are_rejected() {
        assert!(AggregateBase::with_tenant_and_id("contract", "acme", "").is_err());
        assert!(AggregateBase::with_tenant_and_id("contract", " ", "c1").is_err());
        assert!(AggregateBase::with_id("country", "").is_err());
    }

    #[test]
    fn test_not_found_sentinel() {
        let counter = Counter::new("acme", "k1").unwrap();
        assert_eq!(counter.version(), NOT_FOUND_VERSION);
        assert!(counter.not_found());
    }

    #[test]
    fn test_apply_assigns_contiguous_versions() {
        let mut counter = Counter::new("acme", "k1").unwrap();
        counter.bump(2).unwrap();
        counter.bump(3).unwrap();

        assert_eq!(counter.version(), 1);
        assert_eq!(counter.value, 5);
        assert!(!counter.not_found());

        let events = counter.take_uncommitted();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].version, 0);
        assert_eq!(events[1].version, 1);
        assert!(!counter.has_uncommitted());
    }

    #[test]
    fn test_load_event_adopts_stored_version() {
        let mut source = Counter::new("acme", "k1").unwrap();
        source.bump(7).unwrap();
        let history = source.take_uncommitted();

        let mut replayed = Counter::new("acme", "k1").unwrap();
        for event in history {
            replayed.load_event(event).unwrap();
        }
        assert_eq!(replayed.version(), 0);
        assert_eq!(replayed.value, 7);
        assert!(!replayed.has_uncommitted());
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let mut counter = Counter::new("acme", "k1").unwrap();
        let event = Event::new(counter.base(), "V1_SOMETHING_ELSE", &()).unwrap();
        let err = counter.when(&event).unwrap_err();
        assert!(matches!(err, DomainError::InvalidEventType { .. }));
    }

    #[test]
    fn test_system_events_are_skipped() {
        let mut counter = Counter::new("acme", "k1").unwrap();
        let event = Event::new(counter.base(), "$stream-metadata", &()).unwrap();
        counter.when(&event).unwrap();
        assert_eq!(counter.value, 0);
    }

    #[test]
    fn test_temp_base_skips_replay() {
        let base = AggregateBase::temp_with_tenant_and_id("invoicing_cycle", "acme", "cycle").unwrap();
        assert!(base.skip_load_events);
        assert_eq!(base.object_id(), "cycle");
    }
}
