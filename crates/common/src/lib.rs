//! Shared types used across the order lifecycle crates.
//!
//! - [`AggregateId`] identifies an event stream.
//! - [`Actor`] is the authenticated caller passed into every operation.

pub mod actor;
pub mod types;

pub use actor::{Actor, ParseRoleError, Role, UserId};
pub use types::AggregateId;
