//! Time-bounded access to any event store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version,
    store::{AppendOptions, EventStore, EventStream},
};

/// Wraps an [`EventStore`] so that every call fails with
/// [`EventStoreError::Timeout`] once it exceeds `limit`.
///
/// A timed-out append may still have been committed by the backend; callers
/// that care re-read the stream to find out.
#[derive(Clone)]
pub struct TimeoutEventStore<S> {
    inner: S,
    limit: Duration,
}

impl<S: EventStore> TimeoutEventStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    async fn bounded<T: Send>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                metrics::counter!("event_store_timeouts_total", "operation" => operation)
                    .increment(1);
                tracing::warn!(
                    operation,
                    limit_ms = self.limit.as_millis() as u64,
                    "event store call timed out"
                );
                Err(EventStoreError::Timeout {
                    operation,
                    after: self.limit,
                })
            }
        }
    }
}

#[async_trait]
impl<S: EventStore> EventStore for TimeoutEventStore<S> {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        self.bounded("append", self.inner.append(events, options))
            .await
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        self.bounded("read", self.inner.get_events_for_aggregate(aggregate_id))
            .await
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        self.bounded(
            "read",
            self.inner
                .get_events_for_aggregate_from_version(aggregate_id, from_version),
        )
        .await
    }

    async fn stream_events_after(&self, after: i64) -> Result<EventStream> {
        self.bounded("stream", self.inner.stream_events_after(after))
            .await
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        self.bounded("version", self.inner.get_aggregate_version(aggregate_id))
            .await
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.bounded("save_snapshot", self.inner.save_snapshot(snapshot))
            .await
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        self.bounded("get_snapshot", self.inner.get_snapshot(aggregate_id))
            .await
    }
}
