//! The priced snapshot an order is created from.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::value_objects::{
    MAX_LINE_QUANTITY, MAX_PRICE, Money, OrderLineId, PaymentMethod, ProductId, RestaurantId,
};

use super::OrderError;

/// Where and how to reach the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub contact_number: String,
}

impl DeliveryDetails {
    /// Trims both fields; blank ones are rejected.
    pub fn new(
        address: impl AsRef<str>,
        contact_number: impl AsRef<str>,
    ) -> Result<Self, OrderError> {
        let details = Self {
            address: address.as_ref().trim().to_string(),
            contact_number: contact_number.as_ref().trim().to_string(),
        };
        details.validate()?;
        Ok(details)
    }

    fn validate(&self) -> Result<(), OrderError> {
        if self.address.trim().is_empty() {
            return Err(OrderError::MissingDeliveryAddress);
        }
        if self.contact_number.trim().is_empty() {
            return Err(OrderError::MissingContactNumber);
        }
        Ok(())
    }
}

/// A product as it was sold: name and price are copied at checkout and do
/// not follow later menu changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_id: OrderLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            line_id: OrderLineId::new(),
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Everything needed to create an order, validated and priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub lines: Vec<OrderLine>,
    pub delivery_fee: Money,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryDetails,
}

impl OrderDraft {
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    /// Subtotal plus delivery fee.
    pub fn total(&self) -> Money {
        self.subtotal() + self.delivery_fee
    }

    /// The total, or `None` when any step of the sum overflows.
    pub fn checked_total(&self) -> Option<Money> {
        self.lines.iter().try_fold(self.delivery_fee, |acc, line| {
            acc.checked_add(line.unit_price.checked_multiply(line.quantity)?)
        })
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        for line in &self.lines {
            if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
            if !line.unit_price.is_positive() || line.unit_price > MAX_PRICE {
                return Err(OrderError::InvalidPrice {
                    price: line.unit_price,
                });
            }
        }
        if self.checked_total().is_none() {
            return Err(OrderError::TotalOverflow);
        }
        self.delivery.validate()
    }
}
