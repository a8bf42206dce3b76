//! Menu management.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Product, ProductDetails, ProductId, RestaurantId};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product_id: Option<ProductId>,
    pub restaurant_id: Option<RestaurantId>,
    #[serde(flatten)]
    pub details: Option<ProductDetails>,
    pub available: bool,
    pub delisted: bool,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.product_id(),
            restaurant_id: product.restaurant_id(),
            details: product.details().cloned(),
            available: product.is_available(),
            delisted: product.is_delisted(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

/// POST /restaurants/{id}/products
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(details): Json<ProductDetails>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id, "restaurant")?;
    let product = state
        .catalog
        .add_product(&actor, restaurant_id, details)
        .await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// PUT /products/{id}: new price applies to carts, not to placed orders.
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(details): Json<ProductDetails>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state
        .catalog
        .update_product(&actor, product_id, details)
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// POST /products/{id}/availability
pub async fn set_availability<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state
        .catalog
        .set_product_availability(&actor, product_id, req.available)
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// DELETE /products/{id}
pub async fn delist<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state.catalog.delist_product(&actor, product_id).await?;
    Ok(Json(ProductResponse::from(&product)))
}
