//! Cart domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::order::OrderDraft;
use crate::value_objects::{CartLineId, OrderId, ProductId, RestaurantId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    CartOpened(CartOpenedData),
    LineAdded(LineAddedData),
    LineQuantityChanged(LineQuantityChangedData),
    LineRemoved(LineRemovedData),
    CartCleared(CartClearedData),

    /// The cart is locked for checkout into `order_id`.
    CheckoutStarted(CheckoutStartedData),

    /// The checkout was abandoned before its order was created.
    CheckoutAborted(CheckoutAbortedData),

    /// The order exists; lines are gone and the lock is released.
    CartCheckedOut(CartCheckedOutData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartOpened(_) => "CartOpened",
            CartEvent::LineAdded(_) => "LineAdded",
            CartEvent::LineQuantityChanged(_) => "LineQuantityChanged",
            CartEvent::LineRemoved(_) => "LineRemoved",
            CartEvent::CartCleared(_) => "CartCleared",
            CartEvent::CheckoutStarted(_) => "CheckoutStarted",
            CartEvent::CheckoutAborted(_) => "CheckoutAborted",
            CartEvent::CartCheckedOut(_) => "CartCheckedOut",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartOpenedData {
    pub cart_id: AggregateId,
    pub customer_id: UserId,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineAddedData {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub restaurant_id: RestaurantId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineQuantityChangedData {
    pub line_id: CartLineId,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRemovedData {
    pub line_id: CartLineId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartClearedData {
    pub cleared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStartedData {
    pub order_id: OrderId,
    pub draft: OrderDraft,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutAbortedData {
    pub order_id: OrderId,
    pub reason: String,
    pub aborted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCheckedOutData {
    pub order_id: OrderId,
    pub checked_out_at: DateTime<Utc>,
}
