//! Caller identity.
//!
//! Authentication happens upstream. By the time a request reaches the
//! service the caller is known, and every operation receives it explicitly
//! as an [`Actor`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of an authenticated user (customer, restaurant owner or admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Browses, fills a cart and places orders.
    #[serde(alias = "user")]
    Customer,
    /// Owns exactly one restaurant and handles its orders.
    #[serde(alias = "restaurant")]
    RestaurantOwner,
    /// Approves restaurants and oversees every order.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::RestaurantOwner => "restaurant_owner",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Role::Customer),
            "restaurant_owner" | "restaurant" | "owner" => Ok(Role::RestaurantOwner),
            "admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    pub fn restaurant_owner(user_id: UserId) -> Self {
        Self::new(user_id, Role::RestaurantOwner)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    pub fn is_restaurant_owner(&self) -> bool {
        self.role == Role::RestaurantOwner
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role, self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_current_and_legacy_names() {
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("user".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("restaurant".parse::<Role>().unwrap(), Role::RestaurantOwner);
        assert_eq!("Restaurant_Owner".parse::<Role>().unwrap(), Role::RestaurantOwner);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(
            "courier".parse::<Role>(),
            Err(ParseRoleError("courier".to_string()))
        );
    }

    #[test]
    fn role_serde_accepts_aliases() {
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::Customer);
        let json = serde_json::to_string(&Role::RestaurantOwner).unwrap();
        assert_eq!(json, "\"restaurant_owner\"");
    }

    #[test]
    fn actor_role_predicates() {
        let id = UserId::new();
        assert!(Actor::customer(id).is_customer());
        assert!(Actor::restaurant_owner(id).is_restaurant_owner());
        assert!(Actor::admin(id).is_admin());
        assert!(!Actor::customer(id).is_admin());
    }

    #[test]
    fn actor_display() {
        let id = UserId::new();
        assert_eq!(Actor::admin(id).to_string(), format!("admin:{id}"));
    }
}
