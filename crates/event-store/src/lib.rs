//! Append-only event store.
//!
//! Every aggregate owns one stream of events keyed by its [`AggregateId`].
//! Appends are atomic per call and guarded by an expected version
//! (optimistic concurrency). Two backends are provided:
//!
//! - [`InMemoryEventStore`] for tests and local runs, with fault injection
//! - [`PostgresEventStore`] backed by `sqlx`
//!
//! [`TimeoutEventStore`] bounds every call on any backend.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod snapshot;
pub mod store;
pub mod timeout;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::{FaultMode, InMemoryEventStore};
pub use postgres::PostgresEventStore;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream, SequencedEvent};
pub use timeout::TimeoutEventStore;
