//! Restaurant aggregate.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::value_objects::RestaurantId;

use super::CatalogError;

/// Public profile of a restaurant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl RestaurantProfile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidName);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RestaurantEvent {
    RestaurantRegistered(RestaurantRegisteredData),
    RestaurantProfileUpdated(RestaurantProfileUpdatedData),
    RestaurantApproved(RestaurantReviewData),
    RestaurantApprovalRevoked(RestaurantReviewData),
    RestaurantRemoved(RestaurantReviewData),
}

impl DomainEvent for RestaurantEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RestaurantEvent::RestaurantRegistered(_) => "RestaurantRegistered",
            RestaurantEvent::RestaurantProfileUpdated(_) => "RestaurantProfileUpdated",
            RestaurantEvent::RestaurantApproved(_) => "RestaurantApproved",
            RestaurantEvent::RestaurantApprovalRevoked(_) => "RestaurantApprovalRevoked",
            RestaurantEvent::RestaurantRemoved(_) => "RestaurantRemoved",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantRegisteredData {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub profile: RestaurantProfile,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantProfileUpdatedData {
    pub profile: RestaurantProfile,
    pub updated_at: DateTime<Utc>,
}

/// Admin decision on a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantReviewData {
    pub by: UserId,
    pub at: DateTime<Utc>,
}

impl RestaurantReviewData {
    fn now(by: UserId) -> Self {
        Self { by, at: Utc::now() }
    }
}

/// A restaurant and its approval state.
///
/// ```text
/// registered ──approve──► approved ──revoke──► registered
///      │                     │
///      └───────remove────────┴──► removed ──register──► registered
/// ```
///
/// Only approved restaurants that were not removed take orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Restaurant {
    id: Option<RestaurantId>,
    #[serde(default)]
    version: Version,
    owner_id: Option<UserId>,
    profile: RestaurantProfile,
    approved: bool,
    removed: bool,
    registered_at: Option<DateTime<Utc>>,
}

impl Aggregate for Restaurant {
    type Event = RestaurantEvent;
    type Error = CatalogError;

    fn aggregate_type() -> &'static str {
        "Restaurant"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(Into::into)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            RestaurantEvent::RestaurantRegistered(data) => {
                self.id = Some(data.restaurant_id);
                self.owner_id = Some(data.owner_id);
                self.profile = data.profile;
                self.approved = false;
                self.removed = false;
                self.registered_at = Some(data.registered_at);
            }
            RestaurantEvent::RestaurantProfileUpdated(data) => self.profile = data.profile,
            RestaurantEvent::RestaurantApproved(_) => self.approved = true,
            RestaurantEvent::RestaurantApprovalRevoked(_) => self.approved = false,
            RestaurantEvent::RestaurantRemoved(_) => {
                self.removed = true;
                self.approved = false;
            }
        }
    }
}

// Queries
impl Restaurant {
    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.id
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }

    pub fn profile(&self) -> &RestaurantProfile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn is_approved(&self) -> bool {
        self.approved
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }

    /// Registered, approved and not removed.
    pub fn is_orderable(&self) -> bool {
        self.id.is_some() && self.approved && !self.removed
    }

    fn ensure_active(&self) -> Result<(), CatalogError> {
        if self.id.is_none() {
            return Err(CatalogError::RestaurantNotRegistered);
        }
        if self.removed {
            return Err(CatalogError::RestaurantRemoved);
        }
        Ok(())
    }
}

// Commands
impl Restaurant {
    pub fn register(
        &self,
        restaurant_id: RestaurantId,
        owner_id: UserId,
        profile: RestaurantProfile,
    ) -> Result<Vec<RestaurantEvent>, CatalogError> {
        if self.id.is_some() && !self.removed {
            return Err(CatalogError::AlreadyRegistered);
        }
        profile.validate()?;

        Ok(vec![RestaurantEvent::RestaurantRegistered(
            RestaurantRegisteredData {
                restaurant_id,
                owner_id,
                profile,
                registered_at: Utc::now(),
            },
        )])
    }

    pub fn update_profile(
        &self,
        profile: RestaurantProfile,
    ) -> Result<Vec<RestaurantEvent>, CatalogError> {
        self.ensure_active()?;
        profile.validate()?;
        if profile == self.profile {
            return Ok(vec![]);
        }

        Ok(vec![RestaurantEvent::RestaurantProfileUpdated(
            RestaurantProfileUpdatedData {
                profile,
                updated_at: Utc::now(),
            },
        )])
    }

    pub fn approve(&self, by: UserId) -> Result<Vec<RestaurantEvent>, CatalogError> {
        self.ensure_active()?;
        if self.approved {
            return Ok(vec![]);
        }
        Ok(vec![RestaurantEvent::RestaurantApproved(
            RestaurantReviewData::now(by),
        )])
    }

    pub fn revoke_approval(&self, by: UserId) -> Result<Vec<RestaurantEvent>, CatalogError> {
        self.ensure_active()?;
        if !self.approved {
            return Ok(vec![]);
        }
        Ok(vec![RestaurantEvent::RestaurantApprovalRevoked(
            RestaurantReviewData::now(by),
        )])
    }

    pub fn remove(&self, by: UserId) -> Result<Vec<RestaurantEvent>, CatalogError> {
        if self.id.is_none() {
            return Err(CatalogError::RestaurantNotRegistered);
        }
        if self.removed {
            return Ok(vec![]);
        }
        Ok(vec![RestaurantEvent::RestaurantRemoved(
            RestaurantReviewData::now(by),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered() -> (Restaurant, UserId) {
        let owner = UserId::new();
        let mut restaurant = Restaurant::default();
        let events = restaurant
            .register(
                RestaurantId::for_owner(owner),
                owner,
                RestaurantProfile::named("Noodle Bar"),
            )
            .unwrap();
        restaurant.apply_events(events);
        (restaurant, owner)
    }

    #[test]
    fn test_register_starts_unapproved() {
        let (restaurant, owner) = registered();
        assert_eq!(restaurant.owner_id(), Some(owner));
        assert_eq!(restaurant.name(), "Noodle Bar");
        assert!(!restaurant.is_approved());
        assert!(!restaurant.is_orderable());
    }

    #[test]
    fn test_register_twice_fails() {
        let (restaurant, owner) = registered();
        let result = restaurant.register(
            RestaurantId::for_owner(owner),
            owner,
            RestaurantProfile::named("Other"),
        );
        assert!(matches!(result, Err(CatalogError::AlreadyRegistered)));
    }

    #[test]
    fn test_blank_name_rejected() {
        let result = Restaurant::default().register(
            RestaurantId::new(),
            UserId::new(),
            RestaurantProfile::named("   "),
        );
        assert!(matches!(result, Err(CatalogError::InvalidName)));
    }

    #[test]
    fn test_approval_cycle_is_idempotent() {
        let (mut restaurant, _) = registered();
        let admin = UserId::new();

        let events = restaurant.approve(admin).unwrap();
        restaurant.apply_events(events);
        assert!(restaurant.is_orderable());
        assert!(restaurant.approve(admin).unwrap().is_empty());

        let events = restaurant.revoke_approval(admin).unwrap();
        restaurant.apply_events(events);
        assert!(!restaurant.is_orderable());
        assert!(restaurant.revoke_approval(admin).unwrap().is_empty());
    }

    #[test]
    fn test_removed_restaurant_can_be_registered_again() {
        let (mut restaurant, owner) = registered();
        let admin = UserId::new();
        restaurant.apply_events(restaurant.approve(admin).unwrap());
        restaurant.apply_events(restaurant.remove(admin).unwrap());

        assert!(restaurant.is_removed());
        assert!(!restaurant.is_orderable());
        assert!(matches!(
            restaurant.approve(admin),
            Err(CatalogError::RestaurantRemoved)
        ));
        assert!(restaurant.remove(admin).unwrap().is_empty());

        let events = restaurant
            .register(
                RestaurantId::for_owner(owner),
                owner,
                RestaurantProfile::named("Noodle Bar II"),
            )
            .unwrap();
        restaurant.apply_events(events);
        assert!(!restaurant.is_removed());
        assert!(!restaurant.is_approved());
        assert_eq!(restaurant.name(), "Noodle Bar II");
    }

    #[test]
    fn test_unchanged_profile_is_noop() {
        let (restaurant, _) = registered();
        let same = restaurant.profile().clone();
        assert!(restaurant.update_profile(same).unwrap().is_empty());
        assert!(matches!(
            Restaurant::default().update_profile(RestaurantProfile::named("x")),
            Err(CatalogError::RestaurantNotRegistered)
        ));
    }
}
