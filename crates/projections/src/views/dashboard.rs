//! Admin dashboard counters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::{
    Aggregate, Money, Order, OrderEvent, OrderId, OrderStatus, Profile, ProfileEvent,
    Restaurant, RestaurantEvent, RestaurantId,
};
use event_store::SequencedEvent;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::views::orders::StatusCounts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub restaurants: usize,
    pub pending_approvals: usize,
    pub orders: StatusCounts,
    /// Distinct customers that placed at least one order.
    pub customers: usize,
    /// Registered profiles, any role.
    pub users: usize,
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: Money,
}

#[derive(Default)]
struct DashboardState {
    /// Approval flag of every restaurant that is not removed.
    restaurants: HashMap<RestaurantId, bool>,
    orders: HashMap<OrderId, (Money, OrderStatus)>,
    customers: HashSet<UserId>,
    users: HashSet<UserId>,
    position: ProjectionPosition,
}

#[derive(Clone, Default)]
pub struct DashboardView {
    state: Arc<RwLock<DashboardState>>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> DashboardStats {
        let state = self.state.read().await;
        DashboardStats {
            restaurants: state.restaurants.len(),
            pending_approvals: state.restaurants.values().filter(|a| !**a).count(),
            orders: StatusCounts::of(state.orders.values().map(|(_, status)| *status)),
            customers: state.customers.len(),
            users: state.users.len(),
            revenue: state
                .orders
                .values()
                .filter(|(_, status)| *status != OrderStatus::Cancelled)
                .map(|(total, _)| *total)
                .sum(),
        }
    }
}

#[async_trait]
impl Projection for DashboardView {
    fn name(&self) -> &'static str {
        "DashboardView"
    }

    async fn handle(&self, recorded: &SequencedEvent) -> Result<()> {
        let event = &recorded.event;
        let mut state = self.state.write().await;

        if event.is_for(Order::aggregate_type()) {
            match event.decode::<OrderEvent>()? {
                OrderEvent::OrderPlaced(data) => {
                    state.customers.insert(data.customer_id);
                    state
                        .orders
                        .insert(data.order_id, (data.total_price, OrderStatus::Pending));
                }
                OrderEvent::StatusChanged(data) => {
                    let order_id = OrderId::from(event.aggregate_id);
                    if let Some(entry) = state.orders.get_mut(&order_id) {
                        entry.1 = data.to;
                    }
                }
            }
        } else if event.is_for(Restaurant::aggregate_type()) {
            let restaurant_id = RestaurantId::from(event.aggregate_id);
            match event.decode::<RestaurantEvent>()? {
                RestaurantEvent::RestaurantRegistered(_) => {
                    state.restaurants.insert(restaurant_id, false);
                }
                RestaurantEvent::RestaurantApproved(_) => {
                    if let Some(approved) = state.restaurants.get_mut(&restaurant_id) {
                        *approved = true;
                    }
                }
                RestaurantEvent::RestaurantApprovalRevoked(_) => {
                    if let Some(approved) = state.restaurants.get_mut(&restaurant_id) {
                        *approved = false;
                    }
                }
                RestaurantEvent::RestaurantRemoved(_) => {
                    state.restaurants.remove(&restaurant_id);
                }
                RestaurantEvent::RestaurantProfileUpdated(_) => {}
            }
        } else if event.is_for(Profile::aggregate_type()) {
            if let ProfileEvent::ProfileRegistered(data) = event.decode::<ProfileEvent>()? {
                state.users.insert(data.user_id);
            }
        }

        state.position = state.position.advance_to(recorded.sequence);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = DashboardState::default();
        Ok(())
    }
}
