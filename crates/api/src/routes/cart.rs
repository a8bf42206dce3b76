//! Cart endpoints. Every change answers with the repriced cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{CartLineId, CartSummary, ProductId};
use event_store::EventStore;
use serde::Deserialize;

use super::parse_id;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

/// GET /cart
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<CartSummary>, ApiError> {
    Ok(Json(state.carts.summary(&actor).await?))
}

/// POST /cart/items: adds a product, merging with an existing line.
pub async fn add_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartSummary>, ApiError> {
    state
        .carts
        .add_item(&actor, req.product_id, req.quantity)
        .await?;
    Ok(Json(state.carts.summary(&actor).await?))
}

/// PATCH /cart/items/{line_id}: a quantity below one leaves the line as is.
pub async fn set_quantity<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(line_id): Path<String>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<CartSummary>, ApiError> {
    let line_id: CartLineId = parse_id(&line_id, "cart line")?;
    state
        .carts
        .set_quantity(&actor, line_id, req.quantity)
        .await?;
    Ok(Json(state.carts.summary(&actor).await?))
}

/// DELETE /cart/items/{line_id}
pub async fn remove_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(line_id): Path<String>,
) -> Result<Json<CartSummary>, ApiError> {
    let line_id: CartLineId = parse_id(&line_id, "cart line")?;
    state.carts.remove_item(&actor, line_id).await?;
    Ok(Json(state.carts.summary(&actor).await?))
}

/// DELETE /cart
pub async fn clear<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<CartSummary>, ApiError> {
    state.carts.clear(&actor).await?;
    Ok(Json(state.carts.summary(&actor).await?))
}
