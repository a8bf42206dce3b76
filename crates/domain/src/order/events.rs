//! Order domain events.

use chrono::{DateTime, Utc};
use common::{Actor, Role, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{Money, OrderId, PaymentMethod, RestaurantId};

use super::{DeliveryDetails, OrderDraft, OrderLine, OrderStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// The order was created from a checkout, in status `pending`.
    OrderPlaced(OrderPlacedData),

    StatusChanged(StatusChangedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::StatusChanged(_) => "StatusChanged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub lines: Vec<OrderLine>,
    pub delivery_fee: Money,
    /// Fixed at placement; never recomputed.
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryDetails,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_by: UserId,
    pub role: Role,
    #[serde(default)]
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn order_placed(order_id: OrderId, draft: OrderDraft) -> Self {
        let total_price = draft.total();
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            customer_id: draft.customer_id,
            restaurant_id: draft.restaurant_id,
            lines: draft.lines,
            delivery_fee: draft.delivery_fee,
            total_price,
            payment_method: draft.payment_method,
            delivery: draft.delivery,
            placed_at: Utc::now(),
        })
    }

    pub fn status_changed(
        from: OrderStatus,
        to: OrderStatus,
        actor: &Actor,
        reason: Option<String>,
    ) -> Self {
        OrderEvent::StatusChanged(StatusChangedData {
            from,
            to,
            changed_by: actor.user_id,
            role: actor.role,
            reason,
            changed_at: Utc::now(),
        })
    }
}
