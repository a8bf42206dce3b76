//! Checkout error types.

use domain::{DomainError, ErrorKind, OrderId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The order exists but the cart could not be cleared. Retrying the
    /// checkout finishes it without creating another order.
    #[error("Order {order_id} was placed but the cart could not be cleared: {source}")]
    PartialOrderFailure {
        order_id: OrderId,
        #[source]
        source: DomainError,
    },
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Domain(err) => err.kind(),
            CheckoutError::PartialOrderFailure { .. } => ErrorKind::PartialOrderFailure,
        }
    }

    /// The order that already exists, if any.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            CheckoutError::PartialOrderFailure { order_id, .. } => Some(*order_id),
            CheckoutError::Domain(_) => None,
        }
    }
}

impl From<domain::CartError> for CheckoutError {
    fn from(err: domain::CartError) -> Self {
        CheckoutError::Domain(err.into())
    }
}

impl From<domain::OrderError> for CheckoutError {
    fn from(err: domain::OrderError) -> Self {
        CheckoutError::Domain(err.into())
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
