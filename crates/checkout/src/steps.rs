//! Step names used in logs and metrics.

pub const STEP_RESERVE_CART: &str = "reserve_cart";
pub const STEP_CREATE_ORDER: &str = "create_order";
pub const STEP_CLEAR_CART: &str = "clear_cart";

/// Outcome labels for `checkout_executions_total`.
pub const OUTCOME_PLACED: &str = "placed";
pub const OUTCOME_RESUMED: &str = "resumed";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_PARTIAL: &str = "partial";
