//! Cart aggregate implementation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{Aggregate, SnapshotCapable};
use crate::order::OrderDraft;
use crate::value_objects::{CartLineId, MAX_LINE_QUANTITY, OrderId, ProductId, RestaurantId};

use super::CartError;
use super::events::*;

/// Namespace for cart stream ids derived from the customer.
const CART_NAMESPACE: Uuid = Uuid::from_u128(0x2b8e_51d4_07a3_4c6f_b1e9_3d72_c0a5_8f14);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    /// Captured when the line was added; products never change restaurant.
    pub restaurant_id: RestaurantId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// An in-flight checkout recorded on the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub order_id: OrderId,
    pub draft: OrderDraft,
    pub started_at: DateTime<Utc>,
}

/// A customer's cart.
///
/// Each customer has exactly one cart stream, see [`Cart::stream_id`].
/// While a checkout is pending the cart is locked: every line change is
/// refused until the checkout completes or is aborted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    id: Option<AggregateId>,
    #[serde(default)]
    version: Version,
    customer_id: Option<UserId>,
    lines: Vec<CartLine>,
    pending_checkout: Option<PendingCheckout>,
    last_checkout: Option<OrderId>,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "Cart"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CartEvent::CartOpened(data) => {
                self.id = Some(data.cart_id);
                self.customer_id = Some(data.customer_id);
            }
            CartEvent::LineAdded(data) => self.lines.push(CartLine {
                line_id: data.line_id,
                product_id: data.product_id,
                restaurant_id: data.restaurant_id,
                quantity: data.quantity,
                added_at: data.added_at,
            }),
            CartEvent::LineQuantityChanged(data) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_id == data.line_id) {
                    line.quantity = data.new_quantity;
                }
            }
            CartEvent::LineRemoved(data) => self.lines.retain(|l| l.line_id != data.line_id),
            CartEvent::CartCleared(_) => self.lines.clear(),
            CartEvent::CheckoutStarted(data) => {
                self.pending_checkout = Some(PendingCheckout {
                    order_id: data.order_id,
                    draft: data.draft,
                    started_at: data.started_at,
                });
            }
            CartEvent::CheckoutAborted(_) => self.pending_checkout = None,
            CartEvent::CartCheckedOut(data) => {
                self.lines.clear();
                self.pending_checkout = None;
                self.last_checkout = Some(data.order_id);
            }
        }
    }
}

impl SnapshotCapable for Cart {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl Cart {
    /// Stream id of `customer`'s cart.
    pub fn stream_id(customer: UserId) -> AggregateId {
        AggregateId::derived(&CART_NAMESPACE, customer.as_uuid())
    }

    pub fn customer_id(&self) -> Option<UserId> {
        self.customer_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, line_id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn pending_checkout(&self) -> Option<&PendingCheckout> {
        self.pending_checkout.as_ref()
    }

    /// Order created by the most recent completed checkout.
    pub fn last_checkout(&self) -> Option<OrderId> {
        self.last_checkout
    }

    /// Distinct restaurants of the current lines.
    pub fn restaurants(&self) -> BTreeSet<RestaurantId> {
        self.lines.iter().map(|l| l.restaurant_id).collect()
    }

    /// The one restaurant every line belongs to.
    pub fn single_restaurant(&self) -> Result<RestaurantId, CartError> {
        let restaurants = self.restaurants();
        match restaurants.len() {
            0 => Err(CartError::Empty),
            1 => Ok(restaurants.into_iter().next().ok_or(CartError::Empty)?),
            count => Err(CartError::MultipleRestaurants { count }),
        }
    }

    fn ensure_unlocked(&self) -> Result<(), CartError> {
        match &self.pending_checkout {
            Some(pending) => Err(CartError::CheckoutInProgress {
                order_id: pending.order_id,
            }),
            None => Ok(()),
        }
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
        .ok_or(CartError::InvalidQuantity { quantity })
}

// Command methods (return events)
impl Cart {
    /// Adds `quantity` of a product. A product already in the cart has its
    /// line incremented instead of getting a second line.
    pub fn add_item(
        &self,
        cart_id: AggregateId,
        customer_id: UserId,
        product_id: ProductId,
        restaurant_id: RestaurantId,
        quantity: i64,
    ) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_unlocked()?;
        let quantity = positive_quantity(quantity)?;

        let mut events = Vec::with_capacity(2);
        if self.id.is_none() {
            events.push(CartEvent::CartOpened(CartOpenedData {
                cart_id,
                customer_id,
                opened_at: Utc::now(),
            }));
        }

        match self.lines.iter().find(|l| l.product_id == product_id) {
            Some(line) => {
                let new_quantity =
                    positive_quantity(i64::from(line.quantity) + i64::from(quantity))?;
                events.push(CartEvent::LineQuantityChanged(LineQuantityChangedData {
                    line_id: line.line_id,
                    old_quantity: line.quantity,
                    new_quantity,
                }));
            }
            None => events.push(CartEvent::LineAdded(LineAddedData {
                line_id: CartLineId::new(),
                product_id,
                restaurant_id,
                quantity,
                added_at: Utc::now(),
            })),
        }

        Ok(events)
    }

    /// Sets a line's quantity. Anything below one is ignored.
    pub fn set_quantity(
        &self,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<Vec<CartEvent>, CartError> {
        if quantity < 1 {
            return Ok(vec![]);
        }
        self.ensure_unlocked()?;
        let line = self
            .line(line_id)
            .ok_or(CartError::LineNotFound { line_id })?;
        let quantity = positive_quantity(quantity)?;
        if line.quantity == quantity {
            return Ok(vec![]);
        }

        Ok(vec![CartEvent::LineQuantityChanged(
            LineQuantityChangedData {
                line_id,
                old_quantity: line.quantity,
                new_quantity: quantity,
            },
        )])
    }

    pub fn remove_line(&self, line_id: CartLineId) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_unlocked()?;
        if self.line(line_id).is_none() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::LineRemoved(LineRemovedData { line_id })])
    }

    pub fn clear(&self) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_unlocked()?;
        if self.lines.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::CartCleared(CartClearedData {
            cleared_at: Utc::now(),
        })])
    }

    /// Locks the cart for checkout into `order_id`.
    pub fn begin_checkout(
        &self,
        order_id: OrderId,
        draft: OrderDraft,
    ) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_unlocked()?;
        if self.lines.is_empty() {
            return Err(CartError::Empty);
        }
        Ok(vec![CartEvent::CheckoutStarted(CheckoutStartedData {
            order_id,
            draft,
            started_at: Utc::now(),
        })])
    }

    /// Releases the lock of the checkout into `order_id`, if it still holds.
    pub fn abort_checkout(
        &self,
        order_id: OrderId,
        reason: impl Into<String>,
    ) -> Result<Vec<CartEvent>, CartError> {
        match &self.pending_checkout {
            Some(pending) if pending.order_id == order_id => {
                Ok(vec![CartEvent::CheckoutAborted(CheckoutAbortedData {
                    order_id,
                    reason: reason.into(),
                    aborted_at: Utc::now(),
                })])
            }
            _ => Ok(vec![]),
        }
    }

    /// Empties the cart after the order for `order_id` was created.
    pub fn complete_checkout(&self, order_id: OrderId) -> Result<Vec<CartEvent>, CartError> {
        match &self.pending_checkout {
            Some(pending) if pending.order_id == order_id => {
                Ok(vec![CartEvent::CartCheckedOut(CartCheckedOutData {
                    order_id,
                    checked_out_at: Utc::now(),
                })])
            }
            _ if self.last_checkout == Some(order_id) => Ok(vec![]),
            _ => Err(CartError::NoPendingCheckout { order_id }),
        }
    }
}
