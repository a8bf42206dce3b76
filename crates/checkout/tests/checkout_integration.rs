//! Integration tests for checkout, including storage faults between steps.

use std::time::Duration;

use checkout::{CheckoutCoordinator, PlaceOrder};
use common::{Actor, UserId};
use domain::{
    Aggregate, CartService, ErrorKind, MAX_LINE_QUANTITY, MAX_PRICE, Money, OrderService, OrderStatus, PaymentMethod,
    ProductDetails, ProductId, RestaurantId, RestaurantProfile,
};
use event_store::{EventStore, FaultMode, InMemoryEventStore, TimeoutEventStore};

struct TestHarness<S: EventStore + Clone> {
    coordinator: CheckoutCoordinator<S>,
    carts: CartService<S>,
    orders: OrderService<S>,
}

impl<S: EventStore + Clone> TestHarness<S> {
    fn new(store: S) -> Self {
        Self {
            coordinator: CheckoutCoordinator::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store),
        }
    }

    /// An approved restaurant with the given menu.
    async fn restaurant(&self, name: &str, menu: &[(&str, i64)]) -> (RestaurantId, Vec<ProductId>) {
        let owner = Actor::restaurant_owner(UserId::new());
        let catalog = self.carts.catalog();
        let restaurant_id = catalog
            .register_restaurant(&owner, RestaurantProfile::named(name))
            .await
            .unwrap()
            .restaurant_id()
            .unwrap();
        catalog
            .approve_restaurant(&Actor::admin(UserId::new()), restaurant_id)
            .await
            .unwrap();

        let mut products = Vec::new();
        for (dish, cents) in menu {
            let product = catalog
                .add_product(
                    &owner,
                    restaurant_id,
                    ProductDetails::new(*dish, Money::from_cents(*cents)),
                )
                .await
                .unwrap();
            products.push(product.product_id().unwrap());
        }
        (restaurant_id, products)
    }

    /// A customer holding A 10.00 × 2 and B 5.00 × 1 from one restaurant.
    async fn customer_with_two_lines(&self) -> Actor {
        let (_, menu) = self
            .restaurant("Trattoria", &[("A", 1000), ("B", 500)])
            .await;
        let customer = Actor::customer(UserId::new());
        self.carts.add_item(&customer, menu[0], 2).await.unwrap();
        self.carts.add_item(&customer, menu[1], 1).await.unwrap();
        customer
    }
}

fn request() -> PlaceOrder {
    PlaceOrder::new("21 Baker St", "555-0123", PaymentMethod::Cash)
}

#[tokio::test]
async fn test_single_restaurant_cart_becomes_order() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let customer = h.customer_with_two_lines().await;

    let order = h.coordinator.place_order(&customer, request()).await.unwrap();

    assert_eq!(order.total_price(), Money::from_cents(3000));
    assert_eq!(order.lines().len(), 2);
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.customer_id(), Some(customer.user_id));
    assert_eq!(order.payment_method(), PaymentMethod::Cash);
    assert_eq!(order.delivery().unwrap().address, "21 Baker St");

    let cart = h.carts.get_cart(&customer).await.unwrap();
    assert!(cart.is_empty());
    assert!(cart.pending_checkout().is_none());
    assert_eq!(cart.last_checkout(), order.order_id());

    let stored = h
        .orders
        .get_order(order.order_id().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_price(), Money::from_cents(3000));
}

#[tokio::test]
async fn test_multi_restaurant_cart_rejected() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let (_, pizza) = h.restaurant("Pizza Place", &[("Margherita", 900)]).await;
    let (_, sushi) = h.restaurant("Sushi Spot", &[("Maki", 700)]).await;
    let customer = Actor::customer(UserId::new());
    h.carts.add_item(&customer, pizza[0], 1).await.unwrap();
    let before = h.carts.add_item(&customer, sushi[0], 1).await.unwrap();
    let events_before = store.event_count().await;

    let err = h
        .coordinator
        .place_order(&customer, request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MultiRestaurantCart);
    assert_eq!(store.event_count().await, events_before);
    let after = h.carts.get_cart(&customer).await.unwrap();
    assert_eq!(after.version(), before.version());
    assert_eq!(after.lines().len(), 2);
}

#[tokio::test]
async fn test_oversized_amounts_rejected_before_checkout() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let owner = Actor::restaurant_owner(UserId::new());
    let catalog = h.carts.catalog();
    let restaurant_id = catalog
        .register_restaurant(&owner, RestaurantProfile::named("Gilded"))
        .await
        .unwrap()
        .restaurant_id()
        .unwrap();
    let err = catalog
        .add_product(
            &owner,
            restaurant_id,
            ProductDetails::new("Truffle", Money::from_cents(3_000_000_000)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let (_, menu) = h.restaurant("Ceiling", &[("Caviar", MAX_PRICE.cents())]).await;
    let customer = Actor::customer(UserId::new());
    let err = h
        .carts
        .add_item(&customer, menu[0], 4_000_000_000)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    h.carts
        .add_item(&customer, menu[0], i64::from(MAX_LINE_QUANTITY))
        .await
        .unwrap();
    let order = h.coordinator.place_order(&customer, request()).await.unwrap();
    assert_eq!(
        order.total_price(),
        Money::from_cents(MAX_PRICE.cents() * i64::from(MAX_LINE_QUANTITY) + 500)
    );
}

#[tokio::test]
async fn test_empty_cart_creates_nothing() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let customer = Actor::customer(UserId::new());

    let err = h
        .coordinator
        .place_order(&customer, request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmptyCart);
    assert_eq!(store.event_count().await, 0);
}

#[tokio::test]
async fn test_unavailable_product_blocks_checkout() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let owner = Actor::restaurant_owner(UserId::new());
    let restaurant_id = h
        .carts
        .catalog()
        .register_restaurant(&owner, RestaurantProfile::named("Taqueria"))
        .await
        .unwrap()
        .restaurant_id()
        .unwrap();
    h.carts
        .catalog()
        .approve_restaurant(&Actor::admin(UserId::new()), restaurant_id)
        .await
        .unwrap();
    let taco = h
        .carts
        .catalog()
        .add_product(
            &owner,
            restaurant_id,
            ProductDetails::new("Taco", Money::from_cents(400)),
        )
        .await
        .unwrap()
        .product_id()
        .unwrap();
    let customer = Actor::customer(UserId::new());
    h.carts.add_item(&customer, taco, 3).await.unwrap();

    h.carts
        .catalog()
        .set_product_availability(&owner, taco, false)
        .await
        .unwrap();
    let err = h
        .coordinator
        .place_order(&customer, request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProductUnavailable);
    assert_eq!(store.count_of("CheckoutStarted").await, 0);
    assert_eq!(store.count_of("OrderPlaced").await, 0);
}

#[tokio::test]
async fn test_clear_failure_is_partial_and_retry_finishes() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let customer = h.customer_with_two_lines().await;

    store
        .inject_fault("CartCheckedOut", FaultMode::Reject, 1)
        .await;
    let err = h
        .coordinator
        .place_order(&customer, request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PartialOrderFailure);
    let order_id = err.order_id().unwrap();
    assert!(h.orders.exists(order_id).await.unwrap());
    let status = h.coordinator.checkout_status(&customer).await.unwrap();
    assert_eq!(status.pending_order, Some(order_id));

    // The cart stays locked until the checkout is finished.
    let locked = h.carts.clear(&customer).await.unwrap_err();
    assert_eq!(locked.kind(), ErrorKind::Conflict);

    // New arguments are ignored; the recorded draft wins.
    let order = h
        .coordinator
        .place_order(
            &customer,
            PlaceOrder::new("elsewhere", "000", PaymentMethod::Online),
        )
        .await
        .unwrap();

    assert_eq!(order.order_id(), Some(order_id));
    assert_eq!(order.payment_method(), PaymentMethod::Cash);
    assert_eq!(store.count_of("OrderPlaced").await, 1);
    assert!(h.carts.get_cart(&customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reconcile_finishes_interrupted_checkout() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let customer = h.customer_with_two_lines().await;

    store
        .inject_fault("CartCheckedOut", FaultMode::Reject, 1)
        .await;
    let err = h
        .coordinator
        .place_order(&customer, request())
        .await
        .unwrap_err();
    let order_id = err.order_id().unwrap();

    let order = h.coordinator.reconcile(&customer).await.unwrap().unwrap();

    assert_eq!(order.order_id(), Some(order_id));
    assert_eq!(store.count_of("OrderPlaced").await, 1);
    assert!(h.coordinator.reconcile(&customer).await.unwrap().is_none());
}

#[tokio::test]
async fn test_order_failure_releases_cart() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let customer = h.customer_with_two_lines().await;

    store.inject_fault("OrderPlaced", FaultMode::Reject, 1).await;
    let err = h
        .coordinator
        .place_order(&customer, request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.order_id(), None);
    assert_eq!(store.count_of("OrderPlaced").await, 0);
    assert_eq!(store.count_of("CheckoutAborted").await, 1);

    let cart = h.carts.get_cart(&customer).await.unwrap();
    assert!(cart.pending_checkout().is_none());
    assert_eq!(cart.lines().len(), 2);

    // Fault consumed: a fresh attempt goes through.
    let order = h.coordinator.place_order(&customer, request()).await.unwrap();
    assert_eq!(order.total_price(), Money::from_cents(3000));
    assert_eq!(store.count_of("OrderPlaced").await, 1);
}

#[tokio::test]
async fn test_lost_acknowledgement_still_completes() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let customer = h.customer_with_two_lines().await;

    store.inject_fault("OrderPlaced", FaultMode::LoseAck, 1).await;
    let order = h.coordinator.place_order(&customer, request()).await.unwrap();

    assert_eq!(order.total_price(), Money::from_cents(3000));
    assert_eq!(store.count_of("OrderPlaced").await, 1);
    assert_eq!(store.count_of("CheckoutAborted").await, 0);
    assert!(h.carts.get_cart(&customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_checkouts_place_one_order() {
    let store = InMemoryEventStore::new();
    let h = TestHarness::new(store.clone());
    let customer = h.customer_with_two_lines().await;

    let (first, second) = tokio::join!(
        h.coordinator.place_order(&customer, request()),
        h.coordinator.place_order(&customer, request()),
    );

    assert_eq!(store.count_of("OrderPlaced").await, 1);
    let placed: Vec<_> = [first, second]
        .into_iter()
        .filter_map(|r| r.ok())
        .filter_map(|order| order.order_id())
        .collect();
    assert!(!placed.is_empty());
    assert!(placed.iter().all(|id| *id == placed[0]));
    assert!(h.carts.get_cart(&customer).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_times_out_before_writing() {
    let inner = InMemoryEventStore::new();
    let h = TestHarness::new(TimeoutEventStore::new(
        inner.clone(),
        Duration::from_millis(100),
    ));
    let customer = h.customer_with_two_lines().await;
    let events_before = inner.event_count().await;

    inner.set_latency(Some(Duration::from_secs(5))).await;
    let err = h
        .coordinator
        .place_order(&customer, request())
        .await
        .unwrap_err();
    inner.set_latency(None).await;

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.kind().is_retryable());
    assert_eq!(inner.event_count().await, events_before);
}
