//! Order placement and status changes.

use common::Actor;
use event_store::{EventStore, EventStoreExt};

use crate::access::{can_view_order, ensure_manages};
use crate::command::{CommandHandler, CommandResult, MAX_CONFLICT_RETRIES};
use crate::error::DomainError;
use crate::value_objects::OrderId;

use super::{Order, OrderDraft, OrderStatus};

pub struct OrderService<S> {
    handler: CommandHandler<S, Order>,
}

impl<S: Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Creates the order stream. Fails with a conflict if `order_id` was
    /// already placed.
    #[tracing::instrument(skip(self, draft), fields(customer = %draft.customer_id))]
    pub async fn place(
        &self,
        order_id: OrderId,
        draft: OrderDraft,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .handler
            .execute_expecting(order_id.into(), event_store::Version::initial(), |order| {
                order.place(order_id, draft)
            })
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            %order_id,
            total = %result.aggregate.total_price(),
            "order placed"
        );
        Ok(result)
    }

    /// Whether anything was ever recorded for `order_id`.
    pub async fn exists(&self, order_id: OrderId) -> Result<bool, DomainError> {
        Ok(self.handler.store().aggregate_exists(order_id.into()).await?)
    }

    /// Moves an order to `target` on behalf of `actor`.
    ///
    /// Only admins and the owner of the order's restaurant may do this; the
    /// check runs before the transition is even considered. Concurrent
    /// changes are retried on fresh state, so two identical requests racing
    /// each other record one change and both succeed.
    #[tracing::instrument(skip(self, actor, reason), fields(actor = %actor))]
    pub async fn transition(
        &self,
        actor: &Actor,
        order_id: OrderId,
        target: OrderStatus,
        reason: Option<String>,
    ) -> Result<Order, DomainError> {
        let order = self.require(order_id).await?;
        if actor.is_customer() {
            return Err(DomainError::forbidden("customers cannot change order status"));
        }
        let restaurant_id = order
            .restaurant_id()
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;
        ensure_manages(actor, restaurant_id)?;

        let result = self
            .handler
            .execute_retrying(order_id.into(), MAX_CONFLICT_RETRIES, |order| {
                order.transition(target, actor, reason.clone())
            })
            .await?;
        self.handler.snapshot_if_due(&result).await;

        if !result.is_noop() {
            metrics::counter!("order_transitions_total", "to" => target.as_str()).increment(1);
            tracing::info!(%order_id, status = %target, "order status changed");
        }
        Ok(result.aggregate)
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id.into()).await
    }

    /// The order if `actor` may see it. Orders the caller may not see are
    /// reported as missing.
    pub async fn get_order_for(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        let order = self.require(order_id).await?;
        match (order.customer_id(), order.restaurant_id()) {
            (Some(customer), Some(restaurant)) if can_view_order(actor, customer, restaurant) => {
                Ok(order)
            }
            _ => Err(DomainError::not_found("Order", order_id)),
        }
    }

    async fn require(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))
    }
}
