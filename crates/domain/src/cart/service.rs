use std::collections::BTreeSet;

use common::{Actor, UserId};
use event_store::{EventStore, Version};
use serde::Serialize;

use crate::access::ensure_customer;
use crate::aggregate::Aggregate;
use crate::catalog::CatalogService;
use crate::command::{CommandHandler, CommandResult, MAX_CONFLICT_RETRIES};
use crate::error::DomainError;
use crate::order::OrderDraft;
use crate::value_objects::{CartLineId, Money, OrderId, ProductId, RestaurantId};

use super::{Cart, CartError};

/// A cart line priced at the current menu price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub restaurant_id: RestaurantId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
    /// False once the product was delisted or switched off.
    pub available: bool,
}

/// What the cart page shows.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub customer_id: UserId,
    pub lines: Vec<CartLineView>,
    pub subtotal: Money,
    pub restaurants: Vec<RestaurantId>,
    /// Order of a checkout that has not finished yet.
    pub pending_order: Option<OrderId>,
    pub version: Version,
}

/// Cart operations for customers, plus the checkout hooks used to lock
/// and release a cart.
pub struct CartService<S> {
    carts: CommandHandler<S, Cart>,
    catalog: CatalogService<S>,
}

impl<S: Clone> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl<S: EventStore + Clone> CartService<S> {
    pub fn new(store: S) -> Self {
        Self {
            carts: CommandHandler::new(store.clone()),
            catalog: CatalogService::new(store),
        }
    }

    pub fn catalog(&self) -> &CatalogService<S> {
        &self.catalog
    }

    /// Adds a product, checking first that it can be ordered right now.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn add_item(
        &self,
        actor: &Actor,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, DomainError> {
        ensure_customer(actor)?;
        if quantity < 1 {
            return Err(CartError::InvalidQuantity { quantity }.into());
        }
        let product = self.catalog.orderable_product(product_id).await?;

        let cart_id = Cart::stream_id(actor.user_id);
        let customer = actor.user_id;
        let result = self
            .carts
            .execute_retrying(cart_id, MAX_CONFLICT_RETRIES, |cart| {
                cart.add_item(
                    cart_id,
                    customer,
                    product.product_id,
                    product.restaurant_id,
                    quantity,
                )
            })
            .await?;

        Ok(self.finish(result).await)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn set_quantity(
        &self,
        actor: &Actor,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<Cart, DomainError> {
        ensure_customer(actor)?;
        let result = self
            .carts
            .execute_retrying(
                Cart::stream_id(actor.user_id),
                MAX_CONFLICT_RETRIES,
                |cart| cart.set_quantity(line_id, quantity),
            )
            .await?;
        Ok(self.finish(result).await)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn remove_item(&self, actor: &Actor, line_id: CartLineId) -> Result<Cart, DomainError> {
        ensure_customer(actor)?;
        let result = self
            .carts
            .execute_retrying(
                Cart::stream_id(actor.user_id),
                MAX_CONFLICT_RETRIES,
                |cart| cart.remove_line(line_id),
            )
            .await?;
        Ok(self.finish(result).await)
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn clear(&self, actor: &Actor) -> Result<Cart, DomainError> {
        ensure_customer(actor)?;
        let result = self
            .carts
            .execute_retrying(
                Cart::stream_id(actor.user_id),
                MAX_CONFLICT_RETRIES,
                Cart::clear,
            )
            .await?;
        Ok(self.finish(result).await)
    }

    pub async fn get_cart(&self, actor: &Actor) -> Result<Cart, DomainError> {
        ensure_customer(actor)?;
        self.load(actor.user_id).await
    }

    /// The customer's cart; an empty one if they never added anything.
    pub async fn load(&self, customer: UserId) -> Result<Cart, DomainError> {
        self.carts.load(Cart::stream_id(customer)).await
    }

    /// Sum of current price × quantity over all lines.
    pub async fn compute_subtotal(&self, actor: &Actor) -> Result<Money, DomainError> {
        Ok(self.summary(actor).await?.subtotal)
    }

    pub async fn restaurants_represented(
        &self,
        actor: &Actor,
    ) -> Result<BTreeSet<RestaurantId>, DomainError> {
        Ok(self.get_cart(actor).await?.restaurants())
    }

    pub async fn summary(&self, actor: &Actor) -> Result<CartSummary, DomainError> {
        let cart = self.get_cart(actor).await?;

        let mut lines = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            let product = self.catalog.get_product(line.product_id).await?;
            let (product_name, unit_price, available) = match &product {
                Some(p) => (p.name().to_string(), p.price(), p.is_orderable()),
                None => (String::new(), Money::zero(), false),
            };
            lines.push(CartLineView {
                line_id: line.line_id,
                product_id: line.product_id,
                restaurant_id: line.restaurant_id,
                product_name,
                unit_price,
                quantity: line.quantity,
                line_total: unit_price.multiply(line.quantity),
                available,
            });
        }

        Ok(CartSummary {
            customer_id: actor.user_id,
            subtotal: lines.iter().map(|l| l.line_total).sum(),
            lines,
            restaurants: cart.restaurants().into_iter().collect(),
            pending_order: cart.pending_checkout().map(|p| p.order_id),
            version: cart.version(),
        })
    }

    /// Locks the cart for checkout, provided nothing changed since it was
    /// read at `expected`.
    pub async fn begin_checkout(
        &self,
        customer: UserId,
        expected: Version,
        order_id: OrderId,
        draft: OrderDraft,
    ) -> Result<Cart, DomainError> {
        let result = self
            .carts
            .execute_expecting(Cart::stream_id(customer), expected, |cart| {
                cart.begin_checkout(order_id, draft)
            })
            .await?;
        Ok(result.aggregate)
    }

    pub async fn abort_checkout(
        &self,
        customer: UserId,
        order_id: OrderId,
        reason: &str,
    ) -> Result<Cart, DomainError> {
        let result = self
            .carts
            .execute(Cart::stream_id(customer), |cart| {
                cart.abort_checkout(order_id, reason)
            })
            .await?;
        Ok(result.aggregate)
    }

    pub async fn complete_checkout(
        &self,
        customer: UserId,
        order_id: OrderId,
    ) -> Result<Cart, DomainError> {
        let result = self
            .carts
            .execute(Cart::stream_id(customer), |cart| {
                cart.complete_checkout(order_id)
            })
            .await?;
        Ok(self.finish(result).await)
    }

    async fn finish(&self, result: CommandResult<Cart>) -> Cart {
        self.carts.snapshot_if_due(&result).await;
        result.aggregate
    }
}
