//! Feeds store events to registered projections.

use event_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Replays the global stream into a set of projections.
///
/// Catch-up runs are serialized, so concurrent readers asking for fresh data
/// never deliver the same event twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    catch_up: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Delivers every event a projection has not seen yet. Returns the
    /// sequence of the newest event in the store, or of the oldest position
    /// when nothing newer exists.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<i64> {
        let _guard = self.catch_up.lock().await;

        let mut oldest: Option<i64> = None;
        for projection in &self.projections {
            let position = projection.position().await.last_sequence;
            oldest = Some(oldest.map_or(position, |o| o.min(position)));
        }
        let oldest = oldest.unwrap_or(0);

        let mut stream = self.store.stream_events_after(oldest).await?;
        let mut last = oldest;
        let mut delivered = 0u64;

        while let Some(result) = stream.next().await {
            let recorded = result?;
            last = recorded.sequence;

            for projection in &self.projections {
                if projection.position().await.is_behind(recorded.sequence) {
                    projection.handle(&recorded).await?;
                    delivered += 1;
                    metrics::counter!(
                        "projection_events_processed_total",
                        "projection" => projection.name()
                    )
                    .increment(1);
                }
            }
        }

        if delivered > 0 {
            tracing::debug!(last_sequence = last, delivered, "catch-up complete");
        }
        Ok(last)
    }

    /// Resets every projection and replays the whole store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<i64> {
        {
            let _guard = self.catch_up.lock().await;
            for projection in &self.projections {
                projection.reset().await?;
            }
        }
        let last_sequence = self.run_catch_up().await?;
        tracing::info!(
            last_sequence,
            projections = self.projections.len(),
            "projections rebuilt"
        );
        Ok(last_sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{
        AppendOptions, EventEnvelope, FaultMode, InMemoryEventStore, SequencedEvent, Version,
    };
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Clone, Default)]
    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        seen: Arc<RwLock<Vec<i64>>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, recorded: &SequencedEvent) -> Result<()> {
            *self.count.write().await += 1;
            self.seen.write().await.push(recorded.sequence);
            let mut pos = self.position.write().await;
            *pos = pos.advance_to(recorded.sequence);
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            self.seen.write().await.clear();
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn ping(id: AggregateId, version: i64, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(id)
            .aggregate_type("Beacon")
            .event_type(event_type)
            .version(Version::new(version))
            .payload_raw(serde_json::json!({ "n": version }))
            .build()
            .unwrap()
    }

    async fn store_with(events: i64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let batch = (1..=events).map(|v| ping(id, v, "Pinged")).collect();
        store.append(batch, AppendOptions::new()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_catch_up_delivers_each_event_once() {
        let store = store_with(3).await;
        let projection = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection.clone()));

        assert_eq!(processor.run_catch_up().await.unwrap(), 3);
        assert_eq!(processor.run_catch_up().await.unwrap(), 3);

        assert_eq!(*projection.count.read().await, 3);
    }

    #[tokio::test]
    async fn test_late_projection_catches_up_alone() {
        let store = store_with(2).await;
        let early = CountingProjection::default();
        let late = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(early.clone()));
        processor.run_catch_up().await.unwrap();

        processor.register(Box::new(late.clone()));
        processor.run_catch_up().await.unwrap();

        assert_eq!(*early.count.read().await, 2);
        assert_eq!(*late.count.read().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_catch_ups_do_not_double_deliver() {
        let store = store_with(5).await;
        let projection = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection.clone()));

        let (a, b) = tokio::join!(processor.run_catch_up(), processor.run_catch_up());
        a.unwrap();
        b.unwrap();

        assert_eq!(*projection.count.read().await, 5);
    }

    #[tokio::test]
    async fn test_rebuild_resets_and_replays() {
        let store = store_with(2).await;
        let projection = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection.clone()));
        processor.run_catch_up().await.unwrap();

        processor.rebuild_all().await.unwrap();

        assert_eq!(*projection.count.read().await, 2);
        assert_eq!(projection.position.read().await.last_sequence, 2);
    }

    #[tokio::test]
    async fn test_resumes_by_sequence_across_gaps() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let projection = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(projection.clone()));

        store
            .append(vec![ping(id, 1, "Pinged"), ping(id, 2, "Pinged")], AppendOptions::new())
            .await
            .unwrap();
        assert_eq!(processor.run_catch_up().await.unwrap(), 2);

        // A failed append burns sequences 3 and 4.
        store.inject_fault("Lost", FaultMode::Reject, 1).await;
        let _ = store
            .append(vec![ping(id, 3, "Lost"), ping(id, 4, "Lost")], AppendOptions::new())
            .await;
        store
            .append(vec![ping(id, 3, "Pinged")], AppendOptions::new())
            .await
            .unwrap();
        assert_eq!(processor.run_catch_up().await.unwrap(), 5);

        store
            .append(vec![ping(id, 4, "Pinged")], AppendOptions::new())
            .await
            .unwrap();
        assert_eq!(processor.run_catch_up().await.unwrap(), 6);
        assert_eq!(processor.run_catch_up().await.unwrap(), 6);

        assert_eq!(*projection.seen.read().await, vec![1, 2, 5, 6]);
        assert_eq!(projection.position.read().await.last_sequence, 6);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let projection = CountingProjection::default();
        let mut processor = ProjectionProcessor::new(InMemoryEventStore::new());
        processor.register(Box::new(projection.clone()));

        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
        assert_eq!(*projection.count.read().await, 0);
    }
}
