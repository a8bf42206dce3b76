//! Restaurant browsing and management.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::UserId;
use domain::{Restaurant, RestaurantId, RestaurantProfile};
use event_store::EventStore;
use projections::{ProductView, RestaurantView};
use serde::Serialize;

use super::parse_id;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RestaurantResponse {
    pub restaurant_id: Option<RestaurantId>,
    pub owner_id: Option<UserId>,
    #[serde(flatten)]
    pub profile: RestaurantProfile,
    pub approved: bool,
    pub removed: bool,
    pub registered_at: Option<DateTime<Utc>>,
}

impl From<&Restaurant> for RestaurantResponse {
    fn from(restaurant: &Restaurant) -> Self {
        Self {
            restaurant_id: restaurant.restaurant_id(),
            owner_id: restaurant.owner_id(),
            profile: restaurant.profile().clone(),
            approved: restaurant.is_approved(),
            removed: restaurant.is_removed(),
            registered_at: restaurant.registered_at(),
        }
    }
}

/// GET /restaurants
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<Vec<RestaurantView>>, ApiError> {
    Ok(Json(state.queries.list_restaurants(&actor).await?))
}

/// GET /restaurants/{id}/products
pub async fn menu<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProductView>>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id, "restaurant")?;
    Ok(Json(
        state.queries.restaurant_menu(&actor, restaurant_id).await?,
    ))
}

/// POST /restaurants: registers the caller's restaurant, pending approval.
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(profile): Json<RestaurantProfile>,
) -> Result<(StatusCode, Json<RestaurantResponse>), ApiError> {
    let restaurant = state.catalog.register_restaurant(&actor, profile).await?;
    Ok((StatusCode::CREATED, Json(RestaurantResponse::from(&restaurant))))
}

/// PUT /restaurants/{id}
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(profile): Json<RestaurantProfile>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id, "restaurant")?;
    let restaurant = state
        .catalog
        .update_restaurant(&actor, restaurant_id, profile)
        .await?;
    Ok(Json(RestaurantResponse::from(&restaurant)))
}

/// POST /restaurants/{id}/approve
pub async fn approve<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id, "restaurant")?;
    let restaurant = state
        .catalog
        .approve_restaurant(&actor, restaurant_id)
        .await?;
    Ok(Json(RestaurantResponse::from(&restaurant)))
}

/// POST /restaurants/{id}/revoke
pub async fn revoke<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id, "restaurant")?;
    let restaurant = state.catalog.revoke_approval(&actor, restaurant_id).await?;
    Ok(Json(RestaurantResponse::from(&restaurant)))
}

/// DELETE /restaurants/{id}
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id, "restaurant")?;
    let restaurant = state
        .catalog
        .remove_restaurant(&actor, restaurant_id)
        .await?;
    Ok(Json(RestaurantResponse::from(&restaurant)))
}
