//! Checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::{CheckoutStatus, PlaceOrder};
use event_store::EventStore;
use serde::Serialize;

use super::orders::OrderResponse;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    /// The order that was finished, if a checkout was pending.
    pub order: Option<OrderResponse>,
}

/// POST /checkout: places an order from the caller's cart.
///
/// Safe to repeat after any failure: an interrupted checkout is finished
/// instead of starting a second one.
pub async fn place<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(req): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.checkout.place_order(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /checkout: whether a checkout is waiting to be finished.
pub async fn status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<CheckoutStatus>, ApiError> {
    Ok(Json(state.checkout.checkout_status(&actor).await?))
}

/// POST /checkout/reconcile
pub async fn reconcile<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let order = state.checkout.reconcile(&actor).await?;
    Ok(Json(ReconcileResponse {
        order: order.as_ref().map(OrderResponse::from),
    }))
}
