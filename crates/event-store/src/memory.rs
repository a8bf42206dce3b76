use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version,
    store::{AppendOptions, EventStore, EventStream, SequencedEvent, validate_events_for_append},
};

/// How an injected fault behaves when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// The append is refused and nothing is stored. The sequence numbers
    /// it would have used are burnt, as by a rolled-back transaction.
    Reject,
    /// The append is stored but the caller receives an error, as when the
    /// acknowledgement is lost on the way back.
    LoseAck,
}

#[derive(Debug, Clone)]
struct Fault {
    event_type: String,
    mode: FaultMode,
    remaining: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Commit order.
    events: Vec<SequencedEvent>,
    last_sequence: i64,
    versions: HashMap<AggregateId, Version>,
    snapshots: HashMap<AggregateId, Snapshot>,
    faults: Vec<Fault>,
    latency: Option<Duration>,
}

impl MemoryState {
    /// Consumes one shot of the first fault matching any event of the batch.
    fn take_fault(&mut self, events: &[EventEnvelope]) -> Option<(FaultMode, String)> {
        let index = self.faults.iter().position(|fault| {
            fault.remaining > 0 && events.iter().any(|e| e.event_type == fault.event_type)
        })?;
        let fault = &mut self.faults[index];
        fault.remaining -= 1;
        let fired = (fault.mode, fault.event_type.clone());
        if fault.remaining == 0 {
            self.faults.remove(index);
        }
        Some(fired)
    }
}

/// Event store kept in process memory.
///
/// Used by tests and by the service when no database is configured. Faults
/// can be injected per event type to exercise failure paths, and a fixed
/// latency can be added to every call.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Number of stored events with the given type.
    pub async fn count_of(&self, event_type: &str) -> usize {
        self.state
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.event.event_type == event_type)
            .count()
    }

    /// Makes the next `times` appends containing `event_type` fail with
    /// [`EventStoreError::Unavailable`].
    pub async fn inject_fault(&self, event_type: impl Into<String>, mode: FaultMode, times: usize) {
        self.state.write().await.faults.push(Fault {
            event_type: event_type.into(),
            mode,
            remaining: times,
        });
    }

    pub async fn clear_faults(&self) {
        self.state.write().await.faults.clear();
    }

    /// Delays every subsequent call by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    async fn delay(&self) {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;
        self.delay().await;

        let aggregate_id = events[0].aggregate_id;
        let first_new_version = events[0].version;

        let mut state = self.state.write().await;

        let fault = state.take_fault(&events);
        if let Some((FaultMode::Reject, event_type)) = &fault {
            state.last_sequence += events.len() as i64;
            return Err(EventStoreError::Unavailable(format!(
                "injected fault rejected {event_type}"
            )));
        }

        let current_version = state
            .versions
            .get(&aggregate_id)
            .copied()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Unique (aggregate_id, version), as the database enforces.
        if first_new_version != current_version.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);
        state.versions.insert(aggregate_id, last_version);
        for event in events {
            state.last_sequence += 1;
            let sequence = state.last_sequence;
            state.events.push(SequencedEvent { sequence, event });
        }

        if let Some((FaultMode::LoseAck, event_type)) = fault {
            return Err(EventStoreError::Unavailable(format!(
                "injected fault lost acknowledgement for {event_type}"
            )));
        }

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        self.get_events_for_aggregate_from_version(aggregate_id, Version::first())
            .await
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        self.delay().await;
        let state = self.state.read().await;
        // Appends are version-checked, so commit order is version order.
        Ok(state
            .events
            .iter()
            .map(|e| &e.event)
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect())
    }

    async fn stream_events_after(&self, after: i64) -> Result<EventStream> {
        use futures_util::stream;

        self.delay().await;
        let state = self.state.read().await;
        // Sequences are sorted, so the tail starts at the first one past `after`.
        let start = state.events.partition_point(|e| e.sequence <= after);
        let tail = state.events[start..].to_vec();
        Ok(Box::pin(stream::iter(tail.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        self.delay().await;
        Ok(self.state.read().await.versions.get(&aggregate_id).copied())
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.delay().await;
        self.state
            .write()
            .await
            .snapshots
            .insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        self.delay().await;
        Ok(self.state.read().await.snapshots.get(&aggregate_id).cloned())
    }
}
