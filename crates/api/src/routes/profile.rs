//! The caller's own profile.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Role, UserId};
use domain::{Profile, ProfileDetails};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::caller::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterProfileRequest {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeNameRequest {
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
    pub full_name: String,
    pub email: String,
    pub registered_at: Option<DateTime<Utc>>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id(),
            role: profile.role(),
            full_name: profile.full_name().to_string(),
            email: profile.email().to_string(),
            registered_at: profile.registered_at(),
        }
    }
}

/// GET /profile
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profiles.get_profile(&actor).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// POST /profile: sign-up details for the caller.
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(req): Json<RegisterProfileRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    let details = ProfileDetails::new(req.full_name, req.email);
    let profile = state.profiles.register_profile(&actor, details).await?;
    Ok((StatusCode::CREATED, Json(ProfileResponse::from(&profile))))
}

/// PUT /profile
pub async fn change_name<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(req): Json<ChangeNameRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profiles.change_name(&actor, &req.full_name).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}
