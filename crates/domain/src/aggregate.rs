//! Aggregate and event traits shared by carts, orders and the catalog.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded on an aggregate stream, named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Name stored in the envelope's `event_type` column.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced entity.
///
/// State is never written directly: commands inspect the current state and
/// return events, and [`Aggregate::apply`] folds those events back into
/// state. `apply` must not fail and must not depend on anything but the
/// event and the current state, since it also runs on every reload.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;
    type Error: std::error::Error + Send + Sync;

    /// Stream type recorded with every event of this aggregate.
    fn aggregate_type() -> &'static str;

    /// `None` until the first event has been applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Aggregates whose state can be stored as a snapshot to shorten replay.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Number of events between two snapshots.
    fn snapshot_interval() -> usize {
        100
    }

    fn should_snapshot(&self) -> bool {
        let version = self.version().as_i64();
        version > 0 && (version as usize).is_multiple_of(Self::snapshot_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TallyEvent {
        Opened { id: AggregateId },
        Counted { by: u32 },
    }

    impl DomainEvent for TallyEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TallyEvent::Opened { .. } => "TallyOpened",
                TallyEvent::Counted { .. } => "TallyCounted",
            }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Tally {
        id: Option<AggregateId>,
        total: u32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("tally error")]
    struct TallyError;

    impl Aggregate for Tally {
        type Event = TallyEvent;
        type Error = TallyError;

        fn aggregate_type() -> &'static str {
            "Tally"
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
                TallyEvent::Opened { id } => self.id = Some(id),
                TallyEvent::Counted { by } => self.total += by,
            }
        }
    }

    impl SnapshotCapable for Tally {
        fn snapshot_interval() -> usize {
            10
        }
    }

    #[test]
    fn test_apply_events_folds_in_order() {
        let id = AggregateId::new();
        let mut tally = Tally::default();
        assert!(tally.id().is_none());

        tally.apply_events(vec![
            TallyEvent::Opened { id },
            TallyEvent::Counted { by: 2 },
            TallyEvent::Counted { by: 3 },
        ]);

        assert_eq!(tally.id(), Some(id));
        assert_eq!(tally.total, 5);
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(TallyEvent::Counted { by: 1 }.event_type(), "TallyCounted");
        assert_eq!(
            TallyEvent::Opened {
                id: AggregateId::new()
            }
            .event_type(),
            "TallyOpened"
        );
    }

    #[test]
    fn test_snapshot_due_on_interval_only() {
        let mut tally = Tally::default();
        assert!(!tally.should_snapshot());

        tally.set_version(Version::new(10));
        assert!(tally.should_snapshot());

        tally.set_version(Version::new(11));
        assert!(!tally.should_snapshot());
    }
}
