//! Role checks applied at the service boundary.

use common::{Actor, UserId};

use crate::error::DomainError;
use crate::value_objects::RestaurantId;

pub fn ensure_customer(actor: &Actor) -> Result<(), DomainError> {
    if actor.is_customer() {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!(
            "{} cannot act as a customer",
            actor.role
        )))
    }
}

pub fn ensure_admin(actor: &Actor) -> Result<(), DomainError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DomainError::forbidden("admin role required"))
    }
}

/// Whether `actor` may manage the restaurant: admins always, owners only
/// their own.
pub fn manages(actor: &Actor, restaurant_id: RestaurantId) -> bool {
    actor.is_admin()
        || (actor.is_restaurant_owner() && RestaurantId::for_owner(actor.user_id) == restaurant_id)
}

pub fn ensure_manages(actor: &Actor, restaurant_id: RestaurantId) -> Result<(), DomainError> {
    if manages(actor, restaurant_id) {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!(
            "{actor} does not manage restaurant {restaurant_id}"
        )))
    }
}

/// Customers see their own orders, owners the orders of their restaurant,
/// admins everything.
pub fn can_view_order(actor: &Actor, customer_id: UserId, restaurant_id: RestaurantId) -> bool {
    if actor.is_customer() {
        actor.user_id == customer_id
    } else {
        manages(actor, restaurant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_manages_only_their_restaurant() {
        let owner = Actor::restaurant_owner(UserId::new());
        let own = RestaurantId::for_owner(owner.user_id);

        assert!(ensure_manages(&owner, own).is_ok());
        assert!(matches!(
            ensure_manages(&owner, RestaurantId::new()),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_manages_everything_and_customers_nothing() {
        let admin = Actor::admin(UserId::new());
        let customer = Actor::customer(UserId::new());
        let restaurant = RestaurantId::for_owner(customer.user_id);

        assert!(manages(&admin, RestaurantId::new()));
        // A customer id that happens to derive a restaurant id grants nothing.
        assert!(!manages(&customer, restaurant));
        assert!(ensure_admin(&customer).is_err());
        assert!(ensure_customer(&admin).is_err());
        assert!(ensure_customer(&customer).is_ok());
    }

    #[test]
    fn test_order_visibility() {
        let customer = Actor::customer(UserId::new());
        let owner = Actor::restaurant_owner(UserId::new());
        let restaurant = RestaurantId::for_owner(owner.user_id);

        assert!(can_view_order(&customer, customer.user_id, restaurant));
        assert!(!can_view_order(&customer, UserId::new(), restaurant));
        assert!(can_view_order(&owner, customer.user_id, restaurant));
        assert!(!can_view_order(&owner, customer.user_id, RestaurantId::new()));
        assert!(can_view_order(&Actor::admin(UserId::new()), customer.user_id, restaurant));
    }
}
