//! Core projection trait and position tracking.

use async_trait::async_trait;
use event_store::SequencedEvent;

use crate::Result;

/// How far into the global stream a projection has read: the sequence of
/// the last event it handled.
///
/// Sequences can skip numbers, so this is not a count of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition {
    pub last_sequence: i64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self { last_sequence: 0 }
    }

    /// Position after handling the event at `sequence`.
    pub fn advance_to(&self, sequence: i64) -> Self {
        Self {
            last_sequence: self.last_sequence.max(sequence),
        }
    }

    /// Whether the event at `sequence` is still unseen.
    pub fn is_behind(&self, sequence: i64) -> bool {
        self.last_sequence < sequence
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.last_sequence)
    }
}

/// Folds store events into a read model.
///
/// `handle` sees every event of the store, including ones of aggregate types
/// it does not care about, and must advance its position to each one's
/// sequence.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, recorded: &SequencedEvent) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Drops all state and goes back to position zero.
    async fn reset(&self) -> Result<()>;
}
