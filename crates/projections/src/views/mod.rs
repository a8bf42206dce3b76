//! Read models fed from the global event stream.

pub mod catalog;
pub mod dashboard;
pub mod orders;
pub mod profiles;

pub use catalog::{CatalogView, ProductView, RestaurantView};
pub use dashboard::{DashboardStats, DashboardView};
pub use orders::{OrderFilter, OrderLineView, OrderView, OrdersView, StatusCounts};
pub use profiles::{ProfileView, ProfilesView, UserFilter};
