//! Shared application state.

use checkout::CheckoutCoordinator;
use domain::{CartService, CatalogService, Money, OrderService, ProfileService};
use event_store::EventStore;
use projections::QueryService;

/// Services shared by every handler, all over one event store.
pub struct AppState<S: EventStore> {
    pub carts: CartService<S>,
    pub catalog: CatalogService<S>,
    pub orders: OrderService<S>,
    pub checkout: CheckoutCoordinator<S>,
    pub profiles: ProfileService<S>,
    pub queries: QueryService<S>,
}

impl<S: EventStore + Clone> AppState<S> {
    pub fn new(store: S, delivery_fee: Money) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            checkout: CheckoutCoordinator::new(store.clone()).with_delivery_fee(delivery_fee),
            profiles: ProfileService::new(store.clone()),
            queries: QueryService::new(store),
        }
    }
}
