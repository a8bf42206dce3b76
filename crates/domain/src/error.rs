//! Domain error types.

use event_store::EventStoreError;
use serde::Serialize;
use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::profile::ProfileError;

/// Coarse classification of a failure, shared by every layer.
///
/// Callers branch on the kind rather than on concrete error variants:
/// validation kinds are fixed by correcting input, `PartialOrderFailure`,
/// `Timeout` and `Conflict` may be retried, everything else is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    EmptyCart,
    MultiRestaurantCart,
    ProductUnavailable,
    IllegalTransition,
    PartialOrderFailure,
    Timeout,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::EmptyCart => "empty_cart",
            ErrorKind::MultiRestaurantCart => "multi_restaurant_cart",
            ErrorKind::ProductUnavailable => "product_unavailable",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::PartialOrderFailure => "partial_order_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::PartialOrderFailure | ErrorKind::Timeout | ErrorKind::Conflict
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        DomainError::Forbidden(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::EventStore(err) => match err {
                EventStoreError::ConcurrencyConflict { .. } => ErrorKind::Conflict,
                EventStoreError::Timeout { .. } => ErrorKind::Timeout,
                _ => ErrorKind::Internal,
            },
            DomainError::Cart(err) => err.kind(),
            DomainError::Order(err) => err.kind(),
            DomainError::Catalog(err) => err.kind(),
            DomainError::Profile(err) => err.kind(),
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// True when the stream moved on between load and append.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(err) if err.is_conflict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use common::AggregateId;
    use event_store::Version;

    #[test]
    fn test_store_errors_map_to_kinds() {
        let conflict = DomainError::from(EventStoreError::ConcurrencyConflict {
            aggregate_id: AggregateId::new(),
            expected: Version::first(),
            actual: Version::new(2),
        });
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert!(conflict.is_conflict());

        let timeout = DomainError::from(EventStoreError::Timeout {
            operation: "append",
            after: std::time::Duration::from_millis(5),
        });
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert!(timeout.kind().is_retryable());

        let down = DomainError::from(EventStoreError::Unavailable("down".into()));
        assert_eq!(down.kind(), ErrorKind::Internal);
        assert!(!down.is_conflict());
    }

    #[test]
    fn test_domain_variants_map_to_kinds() {
        assert_eq!(
            DomainError::not_found("Order", "x").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(DomainError::forbidden("no").kind(), ErrorKind::Forbidden);
        assert_eq!(
            DomainError::from(OrderError::IllegalTransition {
                from: OrderStatus::Preparing,
                to: OrderStatus::Cancelled,
            })
            .kind(),
            ErrorKind::IllegalTransition
        );
        assert_eq!(DomainError::from(CartError::Empty).kind(), ErrorKind::EmptyCart);
    }

    #[test]
    fn test_terminal_kinds_are_not_retryable() {
        assert!(!ErrorKind::Forbidden.is_retryable());
        assert!(!ErrorKind::IllegalTransition.is_retryable());
        assert!(ErrorKind::PartialOrderFailure.is_retryable());
        assert_eq!(ErrorKind::MultiRestaurantCart.to_string(), "multi_restaurant_cart");
    }
}
