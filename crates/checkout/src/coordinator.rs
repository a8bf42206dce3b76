//! Checkout coordinator.

use std::time::Instant;

use common::{Actor, UserId};
use domain::access::ensure_customer;
use domain::{
    Aggregate, Cart, CartService, DEFAULT_DELIVERY_FEE, DeliveryDetails, Money, Order,
    OrderDraft, OrderId, OrderLine, OrderService, PaymentMethod,
};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};
use crate::steps;

/// What the customer supplies at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub delivery_address: String,
    pub contact_number: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl PlaceOrder {
    pub fn new(
        delivery_address: impl Into<String>,
        contact_number: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            delivery_address: delivery_address.into(),
            contact_number: contact_number.into(),
            payment_method,
        }
    }
}

/// Where the customer's checkout stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutStatus {
    /// Set while a reservation is waiting to be finished.
    pub pending_order: Option<OrderId>,
    pub last_order: Option<OrderId>,
}

/// Drives checkouts from a customer's cart.
///
/// The cart stream doubles as the lock: reserving it is an append that
/// expects the version the draft was priced from, so two checkouts racing on
/// one cart cannot both get past step one.
pub struct CheckoutCoordinator<S> {
    carts: CartService<S>,
    orders: OrderService<S>,
    delivery_fee: Money,
}

impl<S: Clone> Clone for CheckoutCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            orders: self.orders.clone(),
            delivery_fee: self.delivery_fee,
        }
    }
}

impl<S> CheckoutCoordinator<S>
where
    S: EventStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store),
            delivery_fee: DEFAULT_DELIVERY_FEE,
        }
    }

    pub fn with_delivery_fee(mut self, fee: Money) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub fn delivery_fee(&self) -> Money {
        self.delivery_fee
    }

    /// Places an order from the caller's cart.
    ///
    /// A cart that still carries an unfinished reservation is finished
    /// first, from its recorded draft; `request` is ignored in that case.
    #[tracing::instrument(skip(self, actor, request), fields(actor = %actor))]
    pub async fn place_order(&self, actor: &Actor, request: PlaceOrder) -> Result<Order> {
        ensure_customer(actor)?;
        let started = Instant::now();
        let customer = actor.user_id;

        let cart = self.carts.load(customer).await?;
        let outcome = match cart.pending_checkout() {
            Some(pending) => {
                tracing::info!(order_id = %pending.order_id, "resuming pending checkout");
                self.finish(customer, pending.order_id, pending.draft.clone())
                    .await
                    .map(|order| (order, steps::OUTCOME_RESUMED))
            }
            None => self
                .start(customer, &cart, request)
                .await
                .map(|order| (order, steps::OUTCOME_PLACED)),
        };

        record_outcome(&outcome, started);
        outcome.map(|(order, _)| order)
    }

    /// Finishes a reservation left behind by an interrupted checkout.
    /// Returns `None` when there is nothing to finish.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn reconcile(&self, actor: &Actor) -> Result<Option<Order>> {
        ensure_customer(actor)?;
        let started = Instant::now();
        let cart = self.carts.load(actor.user_id).await?;
        let Some(pending) = cart.pending_checkout() else {
            return Ok(None);
        };

        tracing::info!(order_id = %pending.order_id, "reconciling pending checkout");
        let outcome = self
            .finish(actor.user_id, pending.order_id, pending.draft.clone())
            .await
            .map(|order| (order, steps::OUTCOME_RESUMED));
        record_outcome(&outcome, started);
        outcome.map(|(order, _)| Some(order))
    }

    pub async fn checkout_status(&self, actor: &Actor) -> Result<CheckoutStatus> {
        ensure_customer(actor)?;
        let cart = self.carts.load(actor.user_id).await?;
        Ok(CheckoutStatus {
            pending_order: cart.pending_checkout().map(|p| p.order_id),
            last_order: cart.last_checkout(),
        })
    }

    async fn start(&self, customer: UserId, cart: &Cart, request: PlaceOrder) -> Result<Order> {
        let draft = self.build_draft(customer, cart, request).await?;
        let order_id = OrderId::new();

        tracing::info!(step = steps::STEP_RESERVE_CART, %order_id, "checkout step started");
        self.carts
            .begin_checkout(customer, cart.version(), order_id, draft.clone())
            .await?;

        self.finish(customer, order_id, draft).await
    }

    /// Prices the cart against the current menu.
    async fn build_draft(
        &self,
        customer: UserId,
        cart: &Cart,
        request: PlaceOrder,
    ) -> Result<OrderDraft> {
        let restaurant_id = cart.single_restaurant()?;
        let delivery = DeliveryDetails::new(&request.delivery_address, &request.contact_number)?;

        let mut lines = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            let product = self
                .carts
                .catalog()
                .orderable_product(line.product_id)
                .await?;
            lines.push(OrderLine::new(
                product.product_id,
                product.name,
                line.quantity,
                product.price,
            ));
        }

        let draft = OrderDraft {
            customer_id: customer,
            restaurant_id,
            lines,
            delivery_fee: self.delivery_fee,
            payment_method: request.payment_method,
            delivery,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Steps two and three for a reserved cart.
    async fn finish(&self, customer: UserId, order_id: OrderId, draft: OrderDraft) -> Result<Order> {
        let order = self.create_order(customer, order_id, draft).await?;
        self.clear_cart(customer, order_id).await?;
        tracing::info!(%order_id, total = %order.total_price(), "checkout completed");
        Ok(order)
    }

    async fn create_order(
        &self,
        customer: UserId,
        order_id: OrderId,
        draft: OrderDraft,
    ) -> Result<Order> {
        tracing::info!(step = steps::STEP_CREATE_ORDER, %order_id, "checkout step started");
        let err = match self.orders.place(order_id, draft).await {
            Ok(result) => return Ok(result.aggregate),
            Err(err) => err,
        };

        // The append may have landed without us hearing back, or an earlier
        // attempt created the order already.
        match self.orders.get_order(order_id).await {
            Ok(Some(order)) => {
                tracing::info!(%order_id, "order already exists, continuing");
                Ok(order)
            }
            Ok(None) => {
                tracing::warn!(
                    step = steps::STEP_CREATE_ORDER,
                    %order_id,
                    error = %err,
                    "order not created, releasing cart"
                );
                if let Err(release) = self
                    .carts
                    .abort_checkout(customer, order_id, &err.to_string())
                    .await
                {
                    tracing::warn!(%order_id, error = %release, "cart release failed");
                }
                metrics::counter!("checkout_compensations_total").increment(1);
                Err(err.into())
            }
            Err(check) => {
                tracing::warn!(%order_id, error = %check, "could not confirm order, cart stays reserved");
                Err(err.into())
            }
        }
    }

    async fn clear_cart(&self, customer: UserId, order_id: OrderId) -> Result<()> {
        tracing::info!(step = steps::STEP_CLEAR_CART, %order_id, "checkout step started");
        let err = match self.carts.complete_checkout(customer, order_id).await {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };

        if let Ok(cart) = self.carts.load(customer).await
            && cart.last_checkout() == Some(order_id)
        {
            return Ok(());
        }

        tracing::warn!(
            step = steps::STEP_CLEAR_CART,
            %order_id,
            error = %err,
            "order placed but cart not cleared"
        );
        Err(CheckoutError::PartialOrderFailure {
            order_id,
            source: err,
        })
    }
}

fn record_outcome(outcome: &Result<(Order, &'static str)>, started: Instant) {
    let label = match outcome {
        Ok((_, label)) => *label,
        Err(CheckoutError::PartialOrderFailure { .. }) => steps::OUTCOME_PARTIAL,
        Err(_) => steps::OUTCOME_REJECTED,
    };
    metrics::counter!("checkout_executions_total", "outcome" => label).increment(1);
    metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
}
