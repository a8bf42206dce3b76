//! Catalog read model: restaurants and their menus.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{
    Aggregate, Money, Product, ProductEvent, ProductId, Restaurant, RestaurantEvent, RestaurantId,
};
use event_store::SequencedEvent;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestaurantView {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub image_url: Option<String>,
    pub approved: bool,
    #[serde(skip)]
    pub removed: bool,
    pub registered_at: DateTime<Utc>,
}

impl RestaurantView {
    /// Shown to customers.
    pub fn is_listed(&self) -> bool {
        self.approved && !self.removed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub product_id: ProductId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub available: bool,
    #[serde(skip)]
    pub delisted: bool,
}

#[derive(Default)]
struct CatalogState {
    restaurants: HashMap<RestaurantId, RestaurantView>,
    products: HashMap<ProductId, ProductView>,
    position: ProjectionPosition,
}

impl CatalogState {
    fn apply_restaurant(&mut self, restaurant_id: RestaurantId, event: RestaurantEvent) {
        if let RestaurantEvent::RestaurantRegistered(data) = event {
            let profile = data.profile;
            self.restaurants.insert(
                data.restaurant_id,
                RestaurantView {
                    restaurant_id: data.restaurant_id,
                    owner_id: data.owner_id,
                    name: profile.name,
                    description: profile.description,
                    address: profile.address,
                    contact_number: profile.contact_number,
                    image_url: profile.image_url,
                    approved: false,
                    removed: false,
                    registered_at: data.registered_at,
                },
            );
            return;
        }

        let Some(view) = self.restaurants.get_mut(&restaurant_id) else {
            return;
        };
        match event {
            RestaurantEvent::RestaurantProfileUpdated(data) => {
                let profile = data.profile;
                view.name = profile.name;
                view.description = profile.description;
                view.address = profile.address;
                view.contact_number = profile.contact_number;
                view.image_url = profile.image_url;
            }
            RestaurantEvent::RestaurantApproved(_) => view.approved = true,
            RestaurantEvent::RestaurantApprovalRevoked(_) => view.approved = false,
            RestaurantEvent::RestaurantRemoved(_) => {
                view.removed = true;
                view.approved = false;
            }
            RestaurantEvent::RestaurantRegistered(_) => {}
        }
    }

    fn apply_product(&mut self, product_id: ProductId, event: ProductEvent) {
        if let ProductEvent::ProductListed(data) = event {
            let details = data.details;
            self.products.insert(
                data.product_id,
                ProductView {
                    product_id: data.product_id,
                    restaurant_id: data.restaurant_id,
                    name: details.name,
                    description: details.description,
                    price: details.price,
                    category: details.category,
                    image_url: details.image_url,
                    available: true,
                    delisted: false,
                },
            );
            return;
        }

        let Some(view) = self.products.get_mut(&product_id) else {
            return;
        };
        match event {
            ProductEvent::ProductUpdated(data) => {
                let details = data.details;
                view.name = details.name;
                view.description = details.description;
                view.price = details.price;
                view.category = details.category;
                view.image_url = details.image_url;
            }
            ProductEvent::ProductAvailabilityChanged(data) => view.available = data.available,
            ProductEvent::ProductDelisted(_) => view.delisted = true,
            ProductEvent::ProductListed(_) => {}
        }
    }
}

/// Restaurants and menus as browsed by customers, owners and admins.
#[derive(Clone, Default)]
pub struct CatalogView {
    state: Arc<RwLock<CatalogState>>,
}

impl CatalogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn restaurant(&self, restaurant_id: RestaurantId) -> Option<RestaurantView> {
        self.state
            .read()
            .await
            .restaurants
            .get(&restaurant_id)
            .filter(|r| !r.removed)
            .cloned()
    }

    /// Restaurants that are not removed, pending ones included, by name.
    pub async fn restaurants(&self) -> Vec<RestaurantView> {
        self.select_restaurants(|r| !r.removed).await
    }

    /// Approved restaurants, by name.
    pub async fn listed_restaurants(&self) -> Vec<RestaurantView> {
        self.select_restaurants(RestaurantView::is_listed).await
    }

    pub async fn restaurant_of(&self, owner: UserId) -> Option<RestaurantView> {
        self.state
            .read()
            .await
            .restaurants
            .values()
            .find(|r| r.owner_id == owner && !r.removed)
            .cloned()
    }

    /// The menu of one restaurant, delisted products left out.
    pub async fn menu(&self, restaurant_id: RestaurantId) -> Vec<ProductView> {
        self.select_products(|p| p.restaurant_id == restaurant_id).await
    }

    /// What a customer may add to the cart right now.
    pub async fn available_menu(&self, restaurant_id: RestaurantId) -> Vec<ProductView> {
        self.select_products(|p| p.restaurant_id == restaurant_id && p.available)
            .await
    }

    pub async fn pending_approvals(&self) -> usize {
        self.state
            .read()
            .await
            .restaurants
            .values()
            .filter(|r| !r.removed && !r.approved)
            .count()
    }

    async fn select_restaurants(
        &self,
        keep: impl Fn(&RestaurantView) -> bool,
    ) -> Vec<RestaurantView> {
        let state = self.state.read().await;
        let mut restaurants: Vec<_> = state
            .restaurants
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect();
        restaurants.sort_by(|a, b| a.name.cmp(&b.name));
        restaurants
    }

    async fn select_products(&self, keep: impl Fn(&ProductView) -> bool) -> Vec<ProductView> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| !p.delisted && keep(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.cmp(&b.name))
        });
        products
    }
}

#[async_trait]
impl Projection for CatalogView {
    fn name(&self) -> &'static str {
        "CatalogView"
    }

    async fn handle(&self, recorded: &SequencedEvent) -> Result<()> {
        let event = &recorded.event;
        let mut state = self.state.write().await;

        if event.is_for(Restaurant::aggregate_type()) {
            state.apply_restaurant(event.aggregate_id.into(), event.decode()?);
        } else if event.is_for(Product::aggregate_type()) {
            state.apply_product(event.aggregate_id.into(), event.decode()?);
        }

        state.position = state.position.advance_to(recorded.sequence);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = CatalogState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::recorded;
    use domain::catalog::{
        ProductAvailabilityChangedData, ProductDelistedData, ProductListedData,
        RestaurantRegisteredData, RestaurantReviewData,
    };
    use domain::{ProductDetails, RestaurantProfile};

    async fn register(view: &CatalogView, name: &str) -> RestaurantId {
        let owner = UserId::new();
        let restaurant_id = RestaurantId::for_owner(owner);
        let event = RestaurantEvent::RestaurantRegistered(RestaurantRegisteredData {
            restaurant_id,
            owner_id: owner,
            profile: RestaurantProfile::named(name),
            registered_at: Utc::now(),
        });
        view.handle(&recorded("Restaurant", restaurant_id.into(), 1, &event))
            .await
            .unwrap();
        restaurant_id
    }

    async fn review(
        view: &CatalogView,
        restaurant_id: RestaurantId,
        version: i64,
        event: fn(RestaurantReviewData) -> RestaurantEvent,
    ) {
        let event = event(RestaurantReviewData {
            by: UserId::new(),
            at: Utc::now(),
        });
        view.handle(&recorded("Restaurant", restaurant_id.into(), version, &event))
            .await
            .unwrap();
    }

    async fn list(view: &CatalogView, restaurant_id: RestaurantId, name: &str) -> ProductId {
        let product_id = ProductId::new();
        let event = ProductEvent::ProductListed(ProductListedData {
            product_id,
            restaurant_id,
            details: ProductDetails::new(name, Money::from_cents(800)),
            listed_at: Utc::now(),
        });
        view.handle(&recorded("Product", product_id.into(), 1, &event))
            .await
            .unwrap();
        product_id
    }

    #[tokio::test]
    async fn test_only_approved_restaurants_are_listed() {
        let view = CatalogView::new();
        let approved = register(&view, "Bravo").await;
        register(&view, "Alpha").await;
        review(&view, approved, 2, RestaurantEvent::RestaurantApproved).await;

        let listed = view.listed_restaurants().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].restaurant_id, approved);

        let all = view.restaurants().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Alpha");
        assert_eq!(view.pending_approvals().await, 1);
    }

    #[tokio::test]
    async fn test_removed_restaurant_disappears() {
        let view = CatalogView::new();
        let restaurant_id = register(&view, "Gone").await;
        review(&view, restaurant_id, 2, RestaurantEvent::RestaurantApproved).await;
        review(&view, restaurant_id, 3, RestaurantEvent::RestaurantRemoved).await;

        assert!(view.restaurant(restaurant_id).await.is_none());
        assert!(view.restaurants().await.is_empty());
        assert_eq!(view.pending_approvals().await, 0);
    }

    #[tokio::test]
    async fn test_menu_hides_delisted_and_available_menu_hides_unavailable() {
        let view = CatalogView::new();
        let restaurant_id = register(&view, "Menu House").await;
        let soup = list(&view, restaurant_id, "Soup").await;
        let stew = list(&view, restaurant_id, "Stew").await;
        list(&view, restaurant_id, "Salad").await;

        let off = ProductEvent::ProductAvailabilityChanged(ProductAvailabilityChangedData {
            available: false,
            changed_at: Utc::now(),
        });
        view.handle(&recorded("Product", soup.into(), 2, &off))
            .await
            .unwrap();
        let delisted = ProductEvent::ProductDelisted(ProductDelistedData {
            delisted_at: Utc::now(),
        });
        view.handle(&recorded("Product", stew.into(), 2, &delisted))
            .await
            .unwrap();

        assert_eq!(view.menu(restaurant_id).await.len(), 2);
        let available = view.available_menu(restaurant_id).await;
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Salad");
    }

    #[tokio::test]
    async fn test_restaurant_of_owner() {
        let view = CatalogView::new();
        let restaurant_id = register(&view, "Mine").await;
        let owner = view.restaurant(restaurant_id).await.unwrap().owner_id;

        assert_eq!(
            view.restaurant_of(owner).await.map(|r| r.restaurant_id),
            Some(restaurant_id)
        );
        assert!(view.restaurant_of(UserId::new()).await.is_none());
    }
}
