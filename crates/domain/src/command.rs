//! Load, decide, append.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreError, EventStoreExt, Snapshot, Version,
};
use serde::de::DeserializeOwned;

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Attempts made by [`CommandHandler::execute_retrying`] callers in this crate.
pub const MAX_CONFLICT_RETRIES: u32 = 3;

/// Outcome of a command that was accepted.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// State after the new events were applied.
    pub aggregate: A,

    /// Events appended by this call; empty when the command was a no-op.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

impl<A: Aggregate> CommandResult<A> {
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }
}

/// Runs commands against one aggregate type.
///
/// A command is a closure that inspects the current state and returns the
/// events to record. The handler appends them expecting the version the
/// state was loaded at, so a concurrent writer turns into
/// `EventStoreError::ConcurrencyConflict` instead of a lost update.
pub struct CommandHandler<S, A> {
    store: S,
    _phantom: PhantomData<A>,
}

impl<S: Clone, A> Clone for CommandHandler<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds the aggregate from its latest snapshot and the events after
    /// it. A missing stream yields `A::default()`.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => {
                let version = snapshot.version;
                let mut restored: A = snapshot.into_state()?;
                restored.set_version(version);
                restored
            }
            None => A::default(),
        };

        for envelope in events {
            let event: A::Event = envelope.decode()?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(aggregate_id).await?;
        self.commit(aggregate_id, aggregate, command_fn).await
    }

    /// Like [`execute`](Self::execute), but only if the stream is still at
    /// `expected`. Used when the caller decided on state it read earlier.
    pub async fn execute_expecting<F>(
        &self,
        aggregate_id: AggregateId,
        expected: Version,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(aggregate_id).await?;
        if aggregate.version() != expected {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: aggregate.version(),
            }
            .into());
        }
        self.commit(aggregate_id, aggregate, command_fn).await
    }

    /// Re-runs the command on fresh state after a version conflict, up to
    /// `attempts` times in total.
    pub async fn execute_retrying<F>(
        &self,
        aggregate_id: AggregateId,
        attempts: u32,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 1;
        loop {
            match self.execute(aggregate_id, &command_fn).await {
                Err(err) if err.is_conflict() && attempt < attempts => {
                    metrics::counter!(
                        "command_conflict_retries_total",
                        "aggregate" => A::aggregate_type()
                    )
                    .increment(1);
                    tracing::debug!(%aggregate_id, attempt, "version conflict, retrying command");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn commit<F>(
        &self,
        aggregate_id: AggregateId,
        mut aggregate: A,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let current_version = aggregate.version();
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let envelopes = build_envelopes::<A>(aggregate_id, current_version, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::after(current_version))
            .await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    /// Stores a snapshot when the result crossed the aggregate's interval.
    ///
    /// A failed snapshot is logged and otherwise ignored; the events are
    /// already durable.
    pub async fn snapshot_if_due(&self, result: &CommandResult<A>) {
        if result.is_noop() || !result.aggregate.should_snapshot() {
            return;
        }
        let Some(aggregate_id) = result.aggregate.id() else {
            return;
        };

        let saved = match Snapshot::from_state(
            aggregate_id,
            A::aggregate_type(),
            result.new_version,
            &result.aggregate,
        ) {
            Ok(snapshot) => self.store.save_snapshot(snapshot).await,
            Err(err) => Err(err.into()),
        };

        if let Err(error) = saved {
            tracing::warn!(%aggregate_id, %error, "failed to save snapshot");
        }
    }
}

fn build_envelopes<A: Aggregate>(
    aggregate_id: AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, DomainError> {
    let mut version = current_version;
    events
        .iter()
        .map(|event| {
            version = version.next();
            Ok(EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Started { id: AggregateId },
        Bumped { to: u32 },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Started { .. } => "CounterStarted",
                CounterEvent::Bumped { .. } => "CounterBumped",
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Counter {
        id: Option<AggregateId>,
        value: u32,
        #[serde(default)]
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("counter refused")]
    struct Refused;

    impl From<Refused> for DomainError {
        fn from(_: Refused) -> Self {
            DomainError::forbidden("counter refused")
        }
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;
        type Error = Refused;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                CounterEvent::Started { id } => self.id = Some(id),
                CounterEvent::Bumped { to } => self.value = to,
            }
        }
    }

    impl SnapshotCapable for Counter {
        fn snapshot_interval() -> usize {
            2
        }
    }

    fn bump(counter: &Counter) -> Result<Vec<CounterEvent>, Refused> {
        Ok(vec![CounterEvent::Bumped {
            to: counter.value + 1,
        }])
    }

    type Handler = CommandHandler<InMemoryEventStore, Counter>;

    async fn started(store: &InMemoryEventStore) -> (Handler, AggregateId) {
        let handler = CommandHandler::new(store.clone());
        let id = AggregateId::new();
        handler
            .execute(id, |_| Ok(vec![CounterEvent::Started { id }]))
            .await
            .unwrap();
        (handler, id)
    }

    #[tokio::test]
    async fn test_execute_appends_and_applies() {
        let store = InMemoryEventStore::new();
        let (handler, id) = started(&store).await;

        let result = handler.execute(id, bump).await.unwrap();

        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.aggregate.value, 1);
        assert_eq!(handler.load(id).await.unwrap().value, 1);
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn test_rejected_command_writes_nothing() {
        let store = InMemoryEventStore::new();
        let (handler, id) = started(&store).await;

        let result = handler.execute(id, |_| Err(Refused)).await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_noop_command_keeps_version() {
        let store = InMemoryEventStore::new();
        let (handler, id) = started(&store).await;

        let result = handler.execute(id, |_| Ok(vec![])).await.unwrap();

        assert!(result.is_noop());
        assert_eq!(result.new_version, Version::first());
    }

    #[tokio::test]
    async fn test_load_existing_distinguishes_missing_streams() {
        let store = InMemoryEventStore::new();
        let (handler, id) = started(&store).await;

        assert!(handler.load_existing(id).await.unwrap().is_some());
        assert!(
            handler
                .load_existing(AggregateId::new())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_execute_expecting_rejects_stale_version() {
        let store = InMemoryEventStore::new();
        let (handler, id) = started(&store).await;
        handler.execute(id, bump).await.unwrap();

        let stale = handler.execute_expecting(id, Version::first(), bump).await;
        assert!(stale.unwrap_err().is_conflict());

        let fresh = handler
            .execute_expecting(id, Version::new(2), bump)
            .await
            .unwrap();
        assert_eq!(fresh.aggregate.value, 2);
    }

    #[tokio::test]
    async fn test_concurrent_commands_with_retry_all_land() {
        let store = InMemoryEventStore::new();
        let (handler, id) = started(&store).await;

        let (a, b, c) = tokio::join!(
            handler.execute_retrying(id, MAX_CONFLICT_RETRIES, bump),
            handler.execute_retrying(id, MAX_CONFLICT_RETRIES, bump),
            handler.execute_retrying(id, MAX_CONFLICT_RETRIES, bump),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(handler.load(id).await.unwrap().value, 3);
    }

    #[tokio::test]
    async fn test_snapshot_saved_on_interval_and_used_on_load() {
        let store = InMemoryEventStore::new();
        let (handler, id) = started(&store).await;

        let result = handler.execute(id, bump).await.unwrap();
        handler.snapshot_if_due(&result).await;

        let snapshot = store.get_snapshot(id).await.unwrap().unwrap();
        assert_eq!(snapshot.version, Version::new(2));

        handler.execute(id, bump).await.unwrap();
        let loaded = handler.load(id).await.unwrap();
        assert_eq!(loaded.value, 2);
        assert_eq!(loaded.version(), Version::new(3));
    }
}
