use common::{Actor, UserId};
use event_store::EventStore;
use serde::Serialize;

use crate::access::{ensure_admin, ensure_manages};
use crate::command::CommandHandler;
use crate::error::DomainError;
use crate::value_objects::{Money, ProductId, RestaurantId};

use super::{CatalogError, Product, ProductDetails, Restaurant, RestaurantProfile};

/// A product that can be sold right now, with the price it sells for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderableProduct {
    pub product_id: ProductId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: Money,
}

/// Restaurant and menu management.
pub struct CatalogService<S> {
    restaurants: CommandHandler<S, Restaurant>,
    products: CommandHandler<S, Product>,
}

impl<S: Clone> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            restaurants: self.restaurants.clone(),
            products: self.products.clone(),
        }
    }
}

impl<S: EventStore + Clone> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self {
            restaurants: CommandHandler::new(store.clone()),
            products: CommandHandler::new(store),
        }
    }

    /// Registers the caller's restaurant. It stays hidden from customers
    /// until an admin approves it.
    #[tracing::instrument(skip(self, actor, profile), fields(actor = %actor))]
    pub async fn register_restaurant(
        &self,
        actor: &Actor,
        profile: RestaurantProfile,
    ) -> Result<Restaurant, DomainError> {
        if !actor.is_restaurant_owner() {
            return Err(DomainError::forbidden(
                "only restaurant owners register restaurants",
            ));
        }
        let restaurant_id = RestaurantId::for_owner(actor.user_id);
        let owner_id = actor.user_id;

        let result = self
            .restaurants
            .execute(restaurant_id.into(), |restaurant| {
                restaurant.register(restaurant_id, owner_id, profile)
            })
            .await?;

        tracing::info!(%restaurant_id, "restaurant registered");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor, profile), fields(actor = %actor))]
    pub async fn update_restaurant(
        &self,
        actor: &Actor,
        restaurant_id: RestaurantId,
        profile: RestaurantProfile,
    ) -> Result<Restaurant, DomainError> {
        ensure_manages(actor, restaurant_id)?;
        let result = self
            .restaurants
            .execute(restaurant_id.into(), |restaurant| {
                restaurant.update_profile(profile)
            })
            .await?;
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn approve_restaurant(
        &self,
        actor: &Actor,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DomainError> {
        ensure_admin(actor)?;
        let by = actor.user_id;
        let result = self
            .restaurants
            .execute(restaurant_id.into(), |restaurant| restaurant.approve(by))
            .await?;
        if !result.is_noop() {
            tracing::info!(%restaurant_id, "restaurant approved");
        }
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn revoke_approval(
        &self,
        actor: &Actor,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DomainError> {
        ensure_admin(actor)?;
        let by = actor.user_id;
        let result = self
            .restaurants
            .execute(restaurant_id.into(), |restaurant| {
                restaurant.revoke_approval(by)
            })
            .await?;
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn remove_restaurant(
        &self,
        actor: &Actor,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DomainError> {
        ensure_admin(actor)?;
        let by = actor.user_id;
        let result = self
            .restaurants
            .execute(restaurant_id.into(), |restaurant| restaurant.remove(by))
            .await?;
        if !result.is_noop() {
            tracing::info!(%restaurant_id, "restaurant removed");
        }
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor, details), fields(actor = %actor))]
    pub async fn add_product(
        &self,
        actor: &Actor,
        restaurant_id: RestaurantId,
        details: ProductDetails,
    ) -> Result<Product, DomainError> {
        ensure_manages(actor, restaurant_id)?;
        let restaurant = self.require_restaurant(restaurant_id).await?;
        if restaurant.is_removed() {
            return Err(CatalogError::RestaurantRemoved.into());
        }

        let product_id = ProductId::new();
        let result = self
            .products
            .execute(product_id.into(), |product| {
                product.list(product_id, restaurant_id, details)
            })
            .await?;

        tracing::info!(%product_id, %restaurant_id, "product listed");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor, details), fields(actor = %actor))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: ProductId,
        details: ProductDetails,
    ) -> Result<Product, DomainError> {
        self.authorize_product(actor, product_id).await?;
        let result = self
            .products
            .execute(product_id.into(), |product| product.update(details))
            .await?;
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn set_product_availability(
        &self,
        actor: &Actor,
        product_id: ProductId,
        available: bool,
    ) -> Result<Product, DomainError> {
        self.authorize_product(actor, product_id).await?;
        let result = self
            .products
            .execute(product_id.into(), |product| {
                product.set_availability(available)
            })
            .await?;
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn delist_product(
        &self,
        actor: &Actor,
        product_id: ProductId,
    ) -> Result<Product, DomainError> {
        self.authorize_product(actor, product_id).await?;
        let result = self
            .products
            .execute(product_id.into(), |product| product.delist())
            .await?;
        Ok(result.aggregate)
    }

    pub async fn get_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Option<Restaurant>, DomainError> {
        self.restaurants.load_existing(restaurant_id.into()).await
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, DomainError> {
        self.products.load_existing(product_id.into()).await
    }

    /// The restaurant owned by `owner`, removed or not.
    pub async fn restaurant_for_owner(
        &self,
        owner: UserId,
    ) -> Result<Option<Restaurant>, DomainError> {
        self.get_restaurant(RestaurantId::for_owner(owner)).await
    }

    /// Checks that the product and its restaurant currently take orders and
    /// returns the current price.
    pub async fn orderable_product(
        &self,
        product_id: ProductId,
    ) -> Result<OrderableProduct, DomainError> {
        let unavailable = || DomainError::from(CatalogError::Unavailable { product_id });

        let product = self.get_product(product_id).await?.ok_or_else(unavailable)?;
        if !product.is_orderable() {
            return Err(unavailable());
        }
        let restaurant_id = product.restaurant_id().ok_or_else(unavailable)?;
        let restaurant = self.get_restaurant(restaurant_id).await?;
        if !restaurant.is_some_and(|r| r.is_orderable()) {
            return Err(unavailable());
        }

        Ok(OrderableProduct {
            product_id,
            restaurant_id,
            name: product.name().to_string(),
            price: product.price(),
        })
    }

    async fn require_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DomainError> {
        self.get_restaurant(restaurant_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Restaurant", restaurant_id))
    }

    async fn authorize_product(
        &self,
        actor: &Actor,
        product_id: ProductId,
    ) -> Result<Product, DomainError> {
        let product = self
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;
        let restaurant_id = product
            .restaurant_id()
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;
        ensure_manages(actor, restaurant_id)?;
        Ok(product)
    }
}
