use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Version the stream must be at for the append to succeed.
    /// `None` skips the check.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// No version check.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not exist yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }

    /// Expects `version`, treating the initial version as "stream is new".
    pub fn after(version: Version) -> Self {
        if version.is_initial() {
            Self::expect_new()
        } else {
            Self::expect_version(version)
        }
    }
}

/// An event together with its position in the global log.
///
/// Sequences only grow, in commit order. They need not be contiguous: an
/// append that fails after reserving numbers leaves a gap behind.
#[derive(Debug, Clone)]
pub struct SequencedEvent {
    pub sequence: i64,
    pub event: EventEnvelope,
}

/// A stream of events from the global log.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SequencedEvent>> + Send>>;

/// Storage for event streams.
///
/// Implementations must be thread-safe. An append is atomic: either every
/// event of the batch is stored or none is.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events for one aggregate.
    ///
    /// Fails with `ConcurrencyConflict` when `options.expected_version` is
    /// set and the stream is at another version. Returns the stream version
    /// after the append.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// All events of one stream, oldest first.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Events of one stream from `from_version` on, oldest first.
    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Events with a sequence greater than `after`, in commit order.
    ///
    /// Once an event with sequence `n` is visible, no event with a lower
    /// sequence appears later, so a consumer resumes from the last sequence
    /// it handled.
    async fn stream_events_after(&self, after: i64) -> Result<EventStream>;

    /// Current version of a stream, `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Stores a snapshot, replacing any earlier one for the aggregate.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>>;
}

/// Convenience methods available on every [`EventStore`].
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn append_event(&self, event: EventEnvelope, options: AppendOptions) -> Result<Version> {
        self.append(vec![event], options).await
    }

    /// The whole global log.
    async fn stream_all_events(&self) -> Result<EventStream> {
        self.stream_events_after(0).await
    }

    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }

    /// Loads the latest snapshot (if any) and the events recorded after it.
    async fn load_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<(Option<Snapshot>, Vec<EventEnvelope>)> {
        match self.get_snapshot(aggregate_id).await? {
            Some(snapshot) => {
                let events = self
                    .get_events_for_aggregate_from_version(aggregate_id, snapshot.version.next())
                    .await?;
                Ok((Some(snapshot), events))
            }
            None => {
                let events = self.get_events_for_aggregate(aggregate_id).await?;
                Ok((None, events))
            }
        }
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch is non-empty, targets a single stream and carries
/// consecutive versions.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in events.iter().skip(1) {
        if event.aggregate_id != first.aggregate_id || event.aggregate_type != first.aggregate_type
        {
            return Err(EventStoreError::InvalidAppend(
                "all events of a batch must target the same aggregate".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be consecutive: expected {expected_version}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
