//! HTTP API for the order lifecycle manager.
//!
//! Exposes carts, checkout, order status changes, role-scoped order
//! queries, user profiles and catalog management over JSON, with structured logging
//! (tracing) and Prometheus metrics. The caller is identified by the
//! `x-user-id` and `x-user-role` headers set by the auth gateway.

pub mod caller;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use caller::Caller;
pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{
        admin, cart, checkout, health, metrics, orders, products, profile, restaurants,
    };

    let metrics_router = Router::new()
        .route("/metrics", get(metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health::check))
        .route("/cart", get(cart::get::<S>).delete(cart::clear::<S>))
        .route("/cart/items", post(cart::add_item::<S>))
        .route(
            "/cart/items/{line_id}",
            patch(cart::set_quantity::<S>).delete(cart::remove_item::<S>),
        )
        .route("/checkout", get(checkout::status::<S>).post(checkout::place::<S>))
        .route("/checkout/reconcile", post(checkout::reconcile::<S>))
        .route("/orders", get(orders::list::<S>))
        .route("/orders/counts", get(orders::counts::<S>))
        .route("/orders/{id}", get(orders::get::<S>))
        .route("/orders/{id}/status", post(orders::transition::<S>))
        .route(
            "/restaurants",
            get(restaurants::list::<S>).post(restaurants::register::<S>),
        )
        .route(
            "/restaurants/{id}",
            put(restaurants::update::<S>).delete(restaurants::remove::<S>),
        )
        .route("/restaurants/{id}/approve", post(restaurants::approve::<S>))
        .route("/restaurants/{id}/revoke", post(restaurants::revoke::<S>))
        .route(
            "/restaurants/{id}/products",
            get(restaurants::menu::<S>).post(products::add::<S>),
        )
        .route(
            "/products/{id}",
            put(products::update::<S>).delete(products::delist::<S>),
        )
        .route(
            "/products/{id}/availability",
            post(products::set_availability::<S>),
        )
        .route(
            "/profile",
            get(profile::get::<S>)
                .post(profile::register::<S>)
                .put(profile::change_name::<S>),
        )
        .route("/admin/stats", get(admin::stats::<S>))
        .route("/admin/users", get(admin::users::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the shared state and brings the read models up to date with
/// whatever the store already holds.
pub async fn create_state<S: EventStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Result<Arc<AppState<S>>, ApiError> {
    let state = AppState::new(store, config.delivery_fee);
    let replayed = state.queries.catch_up().await?;
    tracing::info!(last_sequence = replayed, "read models caught up");
    Ok(Arc::new(state))
}
