use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an event stream.
///
/// Every aggregate (cart, order, restaurant, product) owns exactly one
/// stream. Streams that must be unique per some other entity (one cart per
/// customer, one restaurant per owner) derive their id with
/// [`AggregateId::derived`] so that a second creation collides on the
/// store's version check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Creates a new random aggregate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an aggregate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Derives a stable ID from `key` within `namespace` (UUID v5).
    ///
    /// The same `(namespace, key)` pair always yields the same ID, and
    /// different namespaces never collide for the same key.
    pub fn derived(namespace: &Uuid, key: Uuid) -> Self {
        Self(Uuid::new_v5(namespace, key.as_bytes()))
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AggregateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AggregateId> for Uuid {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}
