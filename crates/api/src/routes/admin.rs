//! Admin dashboard and user list.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use event_store::EventStore;
use projections::{DashboardStats, ProfileView, UserFilter};

use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /admin/stats
pub async fn stats<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.queries.dashboard(&actor).await?))
}

/// GET /admin/users?role=customer
pub async fn users<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<ProfileView>>, ApiError> {
    Ok(Json(state.queries.list_users(&actor, filter).await?))
}
