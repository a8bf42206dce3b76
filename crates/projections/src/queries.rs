//! Role-scoped queries over the read models.

use common::Actor;
use domain::access::{can_view_order, manages};
use domain::{OrderId, RestaurantId};
use event_store::EventStore;

use crate::error::{ProjectionError, Result};
use crate::processor::ProjectionProcessor;
use crate::views::{
    CatalogView, DashboardStats, DashboardView, OrderFilter, OrderView, OrdersView, ProductView,
    ProfileView, ProfilesView, RestaurantView, StatusCounts, UserFilter,
};

/// Answers every read of the service.
///
/// Each query first catches the views up with the store, so a caller always
/// sees its own writes.
pub struct QueryService<S: EventStore> {
    processor: ProjectionProcessor<S>,
    orders: OrdersView,
    catalog: CatalogView,
    dashboard: DashboardView,
    profiles: ProfilesView,
}

impl<S: EventStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        let orders = OrdersView::new();
        let catalog = CatalogView::new();
        let dashboard = DashboardView::new();
        let profiles = ProfilesView::new();

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(orders.clone()));
        processor.register(Box::new(catalog.clone()));
        processor.register(Box::new(dashboard.clone()));
        processor.register(Box::new(profiles.clone()));

        Self {
            processor,
            orders,
            catalog,
            dashboard,
            profiles,
        }
    }

    pub async fn catch_up(&self) -> Result<i64> {
        self.processor.run_catch_up().await
    }

    pub async fn rebuild(&self) -> Result<i64> {
        self.processor.rebuild_all().await
    }

    /// Customers see their own orders, owners the orders of their
    /// restaurant, admins everything. Newest first.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn list_orders(&self, actor: &Actor, filter: OrderFilter) -> Result<Vec<OrderView>> {
        self.catch_up().await?;
        let orders = if actor.is_customer() {
            self.orders.for_customer(actor.user_id, filter).await
        } else if actor.is_restaurant_owner() {
            self.orders
                .for_restaurant(RestaurantId::for_owner(actor.user_id), filter)
                .await
        } else {
            self.orders.all(filter).await
        };
        Ok(orders)
    }

    /// The order if the caller may see it; `NotFound` otherwise.
    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> Result<OrderView> {
        self.catch_up().await?;
        self.orders
            .get(order_id)
            .await
            .filter(|o| can_view_order(actor, o.customer_id, o.restaurant_id))
            .ok_or_else(|| ProjectionError::not_found("Order", order_id))
    }

    pub async fn status_counts(&self, actor: &Actor) -> Result<StatusCounts> {
        let orders = self.list_orders(actor, OrderFilter::default()).await?;
        Ok(StatusCounts::of(orders.iter().map(|o| o.status)))
    }

    /// Customers browse approved restaurants, owners see their own, admins
    /// see all of them, pending ones included.
    pub async fn list_restaurants(&self, actor: &Actor) -> Result<Vec<RestaurantView>> {
        self.catch_up().await?;
        let restaurants = if actor.is_customer() {
            self.catalog.listed_restaurants().await
        } else if actor.is_restaurant_owner() {
            self.catalog
                .restaurant_of(actor.user_id)
                .await
                .into_iter()
                .collect()
        } else {
            self.catalog.restaurants().await
        };
        Ok(restaurants)
    }

    /// The menu of one restaurant. Managers see unavailable products too;
    /// everyone else only sees what can be ordered, and only for approved
    /// restaurants.
    pub async fn restaurant_menu(
        &self,
        actor: &Actor,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<ProductView>> {
        self.catch_up().await?;
        let not_found = || ProjectionError::not_found("Restaurant", restaurant_id);
        let restaurant = self.catalog.restaurant(restaurant_id).await.ok_or_else(not_found)?;

        if manages(actor, restaurant_id) {
            Ok(self.catalog.menu(restaurant_id).await)
        } else if restaurant.is_listed() {
            Ok(self.catalog.available_menu(restaurant_id).await)
        } else {
            Err(not_found())
        }
    }

    pub async fn dashboard(&self, actor: &Actor) -> Result<DashboardStats> {
        require_admin(actor)?;
        self.catch_up().await?;
        Ok(self.dashboard.stats().await)
    }

    /// Registered users for the admin user list, newest first.
    pub async fn list_users(&self, actor: &Actor, filter: UserFilter) -> Result<Vec<ProfileView>> {
        require_admin(actor)?;
        self.catch_up().await?;
        Ok(self.profiles.users(filter).await)
    }
}

fn require_admin(actor: &Actor) -> Result<()> {
    if !actor.is_admin() {
        return Err(ProjectionError::Forbidden("admin role required".to_string()));
    }
    Ok(())
}
