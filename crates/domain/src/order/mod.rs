//! Placed orders and their status machine.

mod aggregate;
pub(crate) mod draft;
mod events;
mod service;
mod status;

pub use aggregate::{Order, StatusChange};
pub use draft::{DeliveryDetails, OrderDraft, OrderLine};
pub use events::{OrderEvent, OrderPlacedData, StatusChangedData};
pub use service::OrderService;
pub use status::{OrderStatus, ParseStatusError, TRANSITIONS};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::value_objects::{MAX_LINE_QUANTITY, MAX_PRICE, Money};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order has no lines")]
    EmptyOrder,

    #[error("Invalid quantity: {quantity} (must be between 1 and {max})", max = MAX_LINE_QUANTITY)]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid price: {price} (must be greater than 0 and at most {max})", max = MAX_PRICE)]
    InvalidPrice { price: Money },

    #[error("Order total does not fit in an amount of money")]
    TotalOverflow,

    #[error("Delivery address is required")]
    MissingDeliveryAddress,

    #[error("Contact number is required")]
    MissingContactNumber,

    #[error("Order was already placed")]
    AlreadyPlaced,

    #[error("Order was never placed")]
    NotPlaced,

    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::EmptyOrder => ErrorKind::EmptyCart,
            OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. }
            | OrderError::TotalOverflow
            | OrderError::MissingDeliveryAddress
            | OrderError::MissingContactNumber => ErrorKind::InvalidInput,
            OrderError::AlreadyPlaced => ErrorKind::Conflict,
            OrderError::NotPlaced => ErrorKind::NotFound,
            OrderError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
        }
    }
}
