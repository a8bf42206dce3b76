//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId, Role, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};
use crate::value_objects::{Money, OrderId, PaymentMethod, RestaurantId};

use super::{
    DeliveryDetails, OrderDraft, OrderError, OrderEvent, OrderLine, OrderStatus,
    events::{OrderPlacedData, StatusChangedData},
};

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_by: UserId,
    pub role: Role,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// A placed order.
///
/// Everything but the status is fixed when the order is placed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,

    #[serde(default)]
    version: Version,

    customer_id: Option<UserId>,
    restaurant_id: Option<RestaurantId>,
    lines: Vec<OrderLine>,
    delivery_fee: Money,
    total_price: Money,
    payment_method: PaymentMethod,
    delivery: Option<DeliveryDetails>,
    status: OrderStatus,
    placed_at: Option<DateTime<Utc>>,
    history: Vec<StatusChange>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::StatusChanged(data) => self.apply_status_changed(data),
        }
    }
}

impl SnapshotCapable for Order {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl Order {
    pub fn order_id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn customer_id(&self) -> Option<UserId> {
        self.customer_id
    }

    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.restaurant_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn delivery_fee(&self) -> Money {
        self.delivery_fee
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn delivery(&self) -> Option<&DeliveryDetails> {
        self.delivery.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }
}

// Command methods (return events)
impl Order {
    pub fn place(&self, order_id: OrderId, draft: OrderDraft) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        draft.validate()?;

        Ok(vec![OrderEvent::order_placed(order_id, draft)])
    }

    /// Moves the order to `target`.
    ///
    /// Asking for the current status succeeds without an event, so a
    /// repeated request is harmless. Authorization is the caller's job.
    pub fn transition(
        &self,
        target: OrderStatus,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_none() {
            return Err(OrderError::NotPlaced);
        }
        if self.status == target {
            return Ok(vec![]);
        }
        if !self.status.can_transition_to(target) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }

        Ok(vec![OrderEvent::status_changed(
            self.status,
            target,
            actor,
            reason,
        )])
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.customer_id = Some(data.customer_id);
        self.restaurant_id = Some(data.restaurant_id);
        self.lines = data.lines;
        self.delivery_fee = data.delivery_fee;
        self.total_price = data.total_price;
        self.payment_method = data.payment_method;
        self.delivery = Some(data.delivery);
        self.status = OrderStatus::Pending;
        self.placed_at = Some(data.placed_at);
    }

    fn apply_status_changed(&mut self, data: StatusChangedData) {
        self.status = data.to;
        self.history.push(StatusChange {
            from: data.from,
            to: data.to,
            changed_by: data.changed_by,
            role: data.role,
            reason: data.reason,
            changed_at: data.changed_at,
        });
    }
}
