//! Per-customer carts.

mod aggregate;
mod events;
mod service;

pub use aggregate::{Cart, CartLine, PendingCheckout};
pub use events::{
    CartCheckedOutData, CartClearedData, CartEvent, CartOpenedData, CheckoutAbortedData,
    CheckoutStartedData, LineAddedData, LineQuantityChangedData, LineRemovedData,
};
pub use service::{CartLineView, CartService, CartSummary};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::{CartLineId, MAX_LINE_QUANTITY, OrderId};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})", max = MAX_LINE_QUANTITY)]
    InvalidQuantity { quantity: i64 },

    #[error("Cart line not found: {line_id}")]
    LineNotFound { line_id: CartLineId },

    #[error("Cart is empty")]
    Empty,

    #[error("Cart holds items from {count} restaurants; an order needs exactly one")]
    MultipleRestaurants { count: usize },

    #[error("Checkout in progress for order {order_id}")]
    CheckoutInProgress { order_id: OrderId },

    #[error("No checkout pending for order {order_id}")]
    NoPendingCheckout { order_id: OrderId },
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::InvalidQuantity { .. } => ErrorKind::InvalidInput,
            CartError::LineNotFound { .. } => ErrorKind::NotFound,
            CartError::Empty => ErrorKind::EmptyCart,
            CartError::MultipleRestaurants { .. } => ErrorKind::MultiRestaurantCart,
            CartError::CheckoutInProgress { .. } | CartError::NoPendingCheckout { .. } => {
                ErrorKind::Conflict
            }
        }
    }
}
