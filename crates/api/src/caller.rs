//! Caller identity taken from the auth gateway headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Actor, Role, UserId};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller of a request.
///
/// The gateway in front of the service verifies credentials and forwards
/// the user id and role; requests without them are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = Uuid::parse_str(header(parts, USER_ID_HEADER)?)
            .map(UserId::from_uuid)
            .map_err(|e| ApiError::Unauthenticated(format!("invalid {USER_ID_HEADER}: {e}")))?;
        let role: Role = header(parts, USER_ROLE_HEADER)?
            .parse()
            .map_err(|e| ApiError::Unauthenticated(format!("invalid {USER_ROLE_HEADER}: {e}")))?;

        Ok(Caller(Actor::new(user_id, role)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(format!("{name} header missing")))
}
