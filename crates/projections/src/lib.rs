//! Query side of the order lifecycle manager.
//!
//! - [`Projection`] folds store events into a read model
//! - [`ProjectionProcessor`] replays the global stream into projections
//! - [`QueryService`] answers role-scoped queries, catching up first
//! - Views: orders, catalog, profiles, admin dashboard

pub mod error;
pub mod processor;
pub mod projection;
pub mod queries;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use queries::QueryService;
pub use views::{
    CatalogView, DashboardStats, DashboardView, OrderFilter, OrderLineView, OrderView,
    OrdersView, ProductView, ProfileView, ProfilesView, RestaurantView, StatusCounts, UserFilter,
};
