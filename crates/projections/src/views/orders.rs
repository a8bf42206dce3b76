//! Orders read model, shared by the customer, owner and admin order lists.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{
    Aggregate, Money, Order, OrderEvent, OrderId, OrderStatus, PaymentMethod, ProductId,
    Profile, ProfileEvent, Restaurant, RestaurantEvent, RestaurantId,
};
use event_store::SequencedEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// One order as the order lists show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub customer_id: UserId,
    /// Current profile name of the customer; `None` without a profile.
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub restaurant_id: RestaurantId,
    /// Current name of the restaurant; `None` if it never registered.
    pub restaurant_name: Option<String>,
    pub lines: Vec<OrderLineView>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub contact_number: String,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancel_reason: Option<String>,
}

/// Optional status predicate applied to a fetched list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
        }
    }

    pub fn matches(&self, order: &OrderView) -> bool {
        self.status.is_none_or(|s| s == order.status)
    }
}

/// Number of orders per status, plus the total, as the filter tabs show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub preparing: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    fn count(&mut self, status: OrderStatus) {
        self.all += 1;
        let slot = match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Confirmed => &mut self.confirmed,
            OrderStatus::Preparing => &mut self.preparing,
            OrderStatus::Delivered => &mut self.delivered,
            OrderStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }

    pub fn of(status: impl IntoIterator<Item = OrderStatus>) -> Self {
        let mut counts = Self::default();
        for s in status {
            counts.count(s);
        }
        counts
    }
}

struct CustomerContact {
    name: String,
    email: String,
}

#[derive(Default)]
struct OrdersState {
    orders: HashMap<OrderId, OrderView>,
    restaurant_names: HashMap<RestaurantId, String>,
    contacts: HashMap<UserId, CustomerContact>,
    /// Profile stream id back to its user.
    users_by_stream: HashMap<AggregateId, UserId>,
    position: ProjectionPosition,
}

impl OrdersState {
    fn select(&self, keep: impl Fn(&OrderView) -> bool, filter: OrderFilter) -> Vec<OrderView> {
        let mut orders: Vec<OrderView> = self
            .orders
            .values()
            .filter(|o| keep(o) && filter.matches(o))
            .map(|o| self.with_name(o.clone()))
            .collect();
        // Newest first; ties broken by id so pages are stable.
        orders.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });
        orders
    }

    fn with_name(&self, mut order: OrderView) -> OrderView {
        order.restaurant_name = self.restaurant_names.get(&order.restaurant_id).cloned();
        if let Some(contact) = self.contacts.get(&order.customer_id) {
            order.customer_name = Some(contact.name.clone());
            order.customer_email = Some(contact.email.clone());
        }
        order
    }

    fn apply_order(&mut self, order_id: OrderId, event: OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(data) => {
                let lines: Vec<OrderLineView> = data
                    .lines
                    .into_iter()
                    .map(|line| OrderLineView {
                        line_total: line.line_total(),
                        product_id: line.product_id,
                        product_name: line.product_name,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                    })
                    .collect();
                let view = OrderView {
                    order_id: data.order_id,
                    customer_id: data.customer_id,
                    customer_name: None,
                    customer_email: None,
                    restaurant_id: data.restaurant_id,
                    restaurant_name: None,
                    subtotal: lines.iter().map(|l| l.line_total).sum(),
                    lines,
                    delivery_fee: data.delivery_fee,
                    total_price: data.total_price,
                    payment_method: data.payment_method,
                    status: OrderStatus::Pending,
                    delivery_address: data.delivery.address,
                    contact_number: data.delivery.contact_number,
                    placed_at: data.placed_at,
                    updated_at: data.placed_at,
                    cancel_reason: None,
                };
                self.orders.insert(data.order_id, view);
            }
            OrderEvent::StatusChanged(data) => {
                let Some(view) = self.orders.get_mut(&order_id) else {
                    tracing::warn!(%order_id, "status change for unknown order");
                    return;
                };
                view.status = data.to;
                view.updated_at = data.changed_at;
                if data.to == OrderStatus::Cancelled {
                    view.cancel_reason = data.reason;
                }
            }
        }
    }

    fn apply_restaurant(&mut self, restaurant_id: RestaurantId, event: RestaurantEvent) {
        match event {
            RestaurantEvent::RestaurantRegistered(data) => {
                self.restaurant_names
                    .insert(data.restaurant_id, data.profile.name);
            }
            RestaurantEvent::RestaurantProfileUpdated(data) => {
                self.restaurant_names.insert(restaurant_id, data.profile.name);
            }
            RestaurantEvent::RestaurantApproved(_)
            | RestaurantEvent::RestaurantApprovalRevoked(_)
            | RestaurantEvent::RestaurantRemoved(_) => {}
        }
    }

    fn apply_profile(&mut self, stream: AggregateId, event: ProfileEvent) {
        match event {
            ProfileEvent::ProfileRegistered(data) => {
                self.users_by_stream.insert(stream, data.user_id);
                self.contacts.insert(
                    data.user_id,
                    CustomerContact {
                        name: data.details.full_name,
                        email: data.details.email,
                    },
                );
            }
            ProfileEvent::ProfileNameChanged(data) => {
                let user_id = self.users_by_stream.get(&stream);
                if let Some(contact) = user_id.and_then(|id| self.contacts.get_mut(id)) {
                    contact.name = data.full_name;
                }
            }
        }
    }
}

/// Every placed order with its lines and current status.
///
/// Restaurant names and customer profiles are joined in at read time, so a
/// rename shows on old orders too.
#[derive(Clone, Default)]
pub struct OrdersView {
    state: Arc<RwLock<OrdersState>>,
}

impl OrdersView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: OrderId) -> Option<OrderView> {
        let state = self.state.read().await;
        state.orders.get(&order_id).cloned().map(|o| state.with_name(o))
    }

    /// Orders placed by `customer`, newest first.
    pub async fn for_customer(&self, customer: UserId, filter: OrderFilter) -> Vec<OrderView> {
        self.state
            .read()
            .await
            .select(|o| o.customer_id == customer, filter)
    }

    /// Orders received by one restaurant, newest first.
    pub async fn for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        filter: OrderFilter,
    ) -> Vec<OrderView> {
        self.state
            .read()
            .await
            .select(|o| o.restaurant_id == restaurant_id, filter)
    }

    pub async fn all(&self, filter: OrderFilter) -> Vec<OrderView> {
        self.state.read().await.select(|_| true, filter)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Projection for OrdersView {
    fn name(&self) -> &'static str {
        "OrdersView"
    }

    async fn handle(&self, recorded: &SequencedEvent) -> Result<()> {
        let event = &recorded.event;
        let mut state = self.state.write().await;

        if event.is_for(Order::aggregate_type()) {
            let order_event: OrderEvent = event.decode()?;
            state.apply_order(event.aggregate_id.into(), order_event);
        } else if event.is_for(Restaurant::aggregate_type()) {
            let restaurant_event: RestaurantEvent = event.decode()?;
            state.apply_restaurant(event.aggregate_id.into(), restaurant_event);
        } else if event.is_for(Profile::aggregate_type()) {
            let profile_event: ProfileEvent = event.decode()?;
            state.apply_profile(event.aggregate_id, profile_event);
        }

        state.position = state.position.advance_to(recorded.sequence);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = OrdersState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::recorded;
    use common::{Actor, AggregateId};
    use domain::{DeliveryDetails, OrderDraft, OrderLine, RestaurantProfile};
    use event_store::{EventEnvelope, SequencedEvent, Version};

    fn draft(customer: UserId, restaurant_id: RestaurantId) -> OrderDraft {
        OrderDraft {
            customer_id: customer,
            restaurant_id,
            lines: vec![
                OrderLine::new(ProductId::new(), "A", 2, Money::from_cents(1000)),
                OrderLine::new(ProductId::new(), "B", 1, Money::from_cents(500)),
            ],
            delivery_fee: Money::from_cents(500),
            payment_method: PaymentMethod::Card,
            delivery: DeliveryDetails::new("3 Mill Lane", "555-0190").unwrap(),
        }
    }

    async fn place(view: &OrdersView, customer: UserId, restaurant_id: RestaurantId) -> OrderId {
        let order_id = OrderId::new();
        let event = OrderEvent::order_placed(order_id, draft(customer, restaurant_id));
        view.handle(&recorded("Order", order_id.into(), 1, &event))
            .await
            .unwrap();
        order_id
    }

    async fn change(
        view: &OrdersView,
        order_id: OrderId,
        version: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) {
        let event = OrderEvent::status_changed(from, to, &Actor::admin(UserId::new()), None);
        view.handle(&recorded("Order", order_id.into(), version, &event))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_placed_order_has_lines_and_totals() {
        let view = OrdersView::new();
        let order_id = place(&view, UserId::new(), RestaurantId::new()).await;

        let order = view.get(order_id).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].line_total, Money::from_cents(2000));
        assert_eq!(order.subtotal, Money::from_cents(2500));
        assert_eq!(order.total_price, Money::from_cents(3000));
        assert_eq!(order.contact_number, "555-0190");
    }

    #[tokio::test]
    async fn test_restaurant_name_follows_renames() {
        let view = OrdersView::new();
        let owner = UserId::new();
        let restaurant_id = RestaurantId::for_owner(owner);
        let registered = RestaurantEvent::RestaurantRegistered(domain::catalog::RestaurantRegisteredData {
            restaurant_id,
            owner_id: owner,
            profile: RestaurantProfile::named("Old Name"),
            registered_at: Utc::now(),
        });
        view.handle(&recorded("Restaurant", restaurant_id.into(), 1, &registered))
            .await
            .unwrap();
        let order_id = place(&view, UserId::new(), restaurant_id).await;
        assert_eq!(
            view.get(order_id).await.unwrap().restaurant_name.as_deref(),
            Some("Old Name")
        );

        let renamed =
            RestaurantEvent::RestaurantProfileUpdated(domain::catalog::RestaurantProfileUpdatedData {
                profile: RestaurantProfile::named("New Name"),
                updated_at: Utc::now(),
            });
        view.handle(&recorded("Restaurant", restaurant_id.into(), 2, &renamed))
            .await
            .unwrap();

        assert_eq!(
            view.get(order_id).await.unwrap().restaurant_name.as_deref(),
            Some("New Name")
        );
    }

    #[tokio::test]
    async fn test_customer_profile_joined_at_read_time() {
        use common::Role;
        use domain::ProfileDetails;
        use domain::profile::{ProfileNameChangedData, ProfileRegisteredData};

        let view = OrdersView::new();
        let customer = UserId::new();
        let order_id = place(&view, customer, RestaurantId::new()).await;
        assert_eq!(view.get(order_id).await.unwrap().customer_name, None);

        let stream = Profile::stream_id(customer);
        let registered = ProfileEvent::ProfileRegistered(ProfileRegisteredData {
            user_id: customer,
            role: Role::Customer,
            details: ProfileDetails::new("Ada", "Ada@Example.com"),
            registered_at: Utc::now(),
        });
        view.handle(&recorded("Profile", stream, 1, &registered))
            .await
            .unwrap();
        let renamed = ProfileEvent::ProfileNameChanged(ProfileNameChangedData {
            full_name: "Ada Lovelace".to_string(),
            changed_at: Utc::now(),
        });
        view.handle(&recorded("Profile", stream, 2, &renamed))
            .await
            .unwrap();

        let order = view.get(order_id).await.unwrap();
        assert_eq!(order.customer_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(order.customer_email.as_deref(), Some("ada@example.com"));
        let listed = view.for_customer(customer, OrderFilter::default()).await;
        assert_eq!(listed[0].customer_name.as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_lists_are_scoped_and_filtered() {
        let view = OrdersView::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let pizza = RestaurantId::new();
        let sushi = RestaurantId::new();

        let a1 = place(&view, alice, pizza).await;
        place(&view, alice, sushi).await;
        place(&view, bob, pizza).await;
        change(&view, a1, 2, OrderStatus::Pending, OrderStatus::Confirmed).await;

        assert_eq!(view.for_customer(alice, OrderFilter::default()).await.len(), 2);
        assert_eq!(view.for_restaurant(pizza, OrderFilter::default()).await.len(), 2);
        assert_eq!(view.all(OrderFilter::default()).await.len(), 3);

        let confirmed = view.all(OrderFilter::status(OrderStatus::Confirmed)).await;
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].order_id, a1);
    }

    #[tokio::test]
    async fn test_newest_first() {
        let view = OrdersView::new();
        let customer = UserId::new();
        let first = place(&view, customer, RestaurantId::new()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = place(&view, customer, RestaurantId::new()).await;

        let orders = view.for_customer(customer, OrderFilter::default()).await;

        assert_eq!(orders[0].order_id, second);
        assert_eq!(orders[1].order_id, first);
    }

    #[tokio::test]
    async fn test_cancel_reason_recorded() {
        let view = OrdersView::new();
        let order_id = place(&view, UserId::new(), RestaurantId::new()).await;
        let event = OrderEvent::status_changed(
            OrderStatus::Pending,
            OrderStatus::Cancelled,
            &Actor::admin(UserId::new()),
            Some("out of stock".to_string()),
        );
        view.handle(&recorded("Order", order_id.into(), 2, &event))
            .await
            .unwrap();

        let order = view.get(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancel_reason.as_deref(), Some("out of stock"));
    }

    #[tokio::test]
    async fn test_other_streams_only_advance_position() {
        let view = OrdersView::new();
        let cart_event = serde_json::json!({"type": "CartCleared", "data": {}});
        let event = EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("Cart")
            .event_type("CartCleared")
            .version(Version::new(1))
            .payload_raw(cart_event)
            .build()
            .unwrap();

        view.handle(&SequencedEvent { sequence: 17, event })
            .await
            .unwrap();

        assert!(view.is_empty().await);
        assert_eq!(view.position().await.last_sequence, 17);
    }

    #[test]
    fn test_status_counts() {
        let counts = StatusCounts::of([
            OrderStatus::Pending,
            OrderStatus::Pending,
            OrderStatus::Delivered,
        ]);
        assert_eq!(counts.all, 3);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.delivered, 1);
        assert_eq!(counts.cancelled, 0);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let view = OrdersView::new();
        place(&view, UserId::new(), RestaurantId::new()).await;

        view.reset().await.unwrap();

        assert!(view.is_empty().await);
        assert_eq!(view.position().await, ProjectionPosition::zero());
    }
}
