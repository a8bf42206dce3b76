//! HTTP handlers, one module per resource.

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod profile;
pub mod restaurants;

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ApiError;

/// Parses an id taken from the path.
pub(crate) fn parse_id<T>(raw: &str, entity: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {entity} id {raw:?}: {e}")))
}
