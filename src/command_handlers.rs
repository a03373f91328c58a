// Copyright 2025 Cowboy AI, LLC.

//! Command handlers: load, dispatch, save, retry-on-conflict
//!
//! A handler is the orchestration unit bound to one aggregate family. The
//! simple path loads, dispatches and saves once; the retrying path wraps
//! the same flow in a bounded loop that replays only optimistic-lock
//! conflicts, reloading a fresh aggregate each attempt. Every field-update
//! path on a long-lived, frequently-touched aggregate goes through the
//! retrying path.

use crate::aggregate::Aggregate;
use crate::commands::{LoadAggregateOptions, RequestContext};
use crate::errors::{DomainError, DomainResult};
use crate::infrastructure::event_store::{AggregateStore, LoadOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// An aggregate that can decide commands.
///
/// `Command` is a closed enum of the kinds this aggregate understands, so
/// dispatch is an exhaustive `match`: adding a command kind without
/// handling it is a compile error, not a runtime fallthrough. `handle`
/// must be re-derivable from fresh state, because the retry loop replays
/// it against a newly loaded aggregate after every conflict.
pub trait CommandHandlerAggregate: Aggregate {
    /// The closed set of commands this aggregate handles
    type Command: Send;
    /// Domain-specific result handed back to the caller (often the
    /// created object id)
    type Outcome: Send;

    /// Validate the command against current state and apply the
    /// resulting events
    fn handle(&mut self, ctx: &RequestContext, command: Self::Command)
        -> DomainResult<Self::Outcome>;
}

/// Retry policy for optimistic-lock conflicts.
///
/// Injected into the handler so tests can swap in a zero-delay policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first try
    pub max_attempts: u32,
    /// Backoff slept after the first conflict
    pub initial_backoff: Duration,
    /// Growth factor applied per subsequent conflict
    pub multiplier: f64,
    /// Upper bound on a single backoff sleep
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy with no backoff sleeps, for unit tests
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff slept after the given zero-based attempt fails
    fn backoff_after(&self, attempt: u32) -> Duration {
        let millis =
            (self.initial_backoff.as_millis() as f64) * self.multiplier.powi(attempt as i32);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }
}

/// Orchestrates one command against one aggregate instance.
///
/// Holds no per-command state; a single handler is shared across all
/// concurrent requests for its aggregate family.
#[derive(Debug, Clone)]
pub struct CommandHandler<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: AggregateStore> CommandHandler<S> {
    /// Handler with the default retry policy
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Handler with an explicit retry policy
    pub fn with_retry_policy(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// The store this handler writes through
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Single-shot path: load, dispatch, save. A version conflict
    /// surfaces as [`DomainError::ConcurrencyConflict`]; used where the
    /// caller already serializes writes per entity (initial-create
    /// flows).
    pub async fn handle<A>(
        &self,
        aggregate: &mut A,
        options: &LoadAggregateOptions,
        ctx: &RequestContext,
        command: A::Command,
    ) -> DomainResult<A::Outcome>
    where
        A: CommandHandlerAggregate,
    {
        ctx.validate()?;
        self.load_aggregate(aggregate, options).await?;
        let outcome = aggregate.handle(ctx, command)?;
        self.store.save(aggregate).await?;
        Ok(outcome)
    }

    /// Retrying path: the concurrency-safety mechanism of the platform.
    ///
    /// Each attempt gets an independent, unhydrated aggregate from
    /// `factory`, so no stale state leaks across attempts. Only
    /// wrong-expected-version errors are retried, with exponential
    /// backoff; validation failures, missing aggregates and backend
    /// errors surface immediately. The last attempt's conflict surfaces
    /// as the conflict error itself.
    pub async fn handle_with_retry<A, F>(
        &self,
        factory: F,
        options: &LoadAggregateOptions,
        ctx: &RequestContext,
        command: A::Command,
    ) -> DomainResult<A::Outcome>
    where
        A: CommandHandlerAggregate,
        A::Command: Clone,
        F: Fn() -> DomainResult<A> + Send + Sync,
    {
        ctx.validate()?;

        for attempt in 0..self.retry.max_attempts {
            let mut aggregate = factory()?;
            self.load_aggregate(&mut aggregate, options).await?;

            debug!(
                aggregate_id = aggregate.id(),
                version = aggregate.version(),
                attempt,
                "dispatching command"
            );
            let outcome = aggregate.handle(ctx, command.clone())?;

            match self.store.save(&mut aggregate).await {
                Ok(()) => return Ok(outcome),
                Err(err)
                    if err.is_wrong_expected_version()
                        && attempt + 1 < self.retry.max_attempts =>
                {
                    let backoff = self.retry.backoff_after(attempt);
                    warn!(
                        aggregate_id = aggregate.id(),
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "version conflict, retrying with fresh aggregate"
                    );
                    sleep(backoff).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
        // Only reachable with a zero attempt budget.
        Err(DomainError::MaxRetriesReached)
    }

    /// Hydrate the aggregate per the load options. A missing stream is
    /// an error only when `required`; otherwise the aggregate is handed
    /// to dispatch in its not-found state so create-or-update commands
    /// can decide.
    async fn load_aggregate(
        &self,
        aggregate: &mut dyn Aggregate,
        options: &LoadAggregateOptions,
    ) -> DomainResult<()> {
        match self.store.exists(aggregate.id()).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                if options.required {
                    return Err(DomainError::AggregateNotFound(aggregate.id().to_string()));
                }
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        let load = LoadOptions {
            skip_load_events: options.skip_load_events || aggregate.skip_load_events(),
        };
        self.store.load(aggregate, &load).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_growth_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_after(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(1), Duration::from_millis(200));
        // Capped by max_backoff.
        assert_eq!(policy.backoff_after(2), Duration::from_millis(350));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(350));
    }

    #[test]
    fn test_no_delay_policy() {
        let policy = RetryPolicy::no_delay(3);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_after(0), Duration::ZERO);
        assert_eq!(policy.backoff_after(2), Duration::ZERO);
    }
}
