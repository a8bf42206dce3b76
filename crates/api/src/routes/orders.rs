//! Order status changes and role-scoped order queries.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{
    DeliveryDetails, Money, Order, OrderId, OrderLine, OrderStatus, PaymentMethod, RestaurantId,
    StatusChange,
};
use event_store::EventStore;
use projections::{OrderFilter, OrderView, StatusCounts};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// An order as just written by a command.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: Option<OrderId>,
    pub customer_id: Option<UserId>,
    pub restaurant_id: Option<RestaurantId>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub delivery: Option<DeliveryDetails>,
    pub placed_at: Option<DateTime<Utc>>,
    pub history: Vec<StatusChange>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id(),
            customer_id: order.customer_id(),
            restaurant_id: order.restaurant_id(),
            status: order.status(),
            lines: order.lines().to_vec(),
            subtotal: order.subtotal(),
            delivery_fee: order.delivery_fee(),
            total_price: order.total_price(),
            payment_method: order.payment_method(),
            delivery: order.delivery().cloned(),
            placed_at: order.placed_at(),
            history: order.history().to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /orders/{id}/status
pub async fn transition<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state
        .orders
        .transition(&actor, order_id, req.status, req.reason)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders?status=: newest first, scoped to the caller's role.
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(state.queries.list_orders(&actor, filter).await?))
}

/// GET /orders/counts
pub async fn counts<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<StatusCounts>, ApiError> {
    Ok(Json(state.queries.status_counts(&actor).await?))
}

/// GET /orders/{id}: 404 for orders the caller may not see.
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.queries.get_order(&actor, order_id).await?))
}
