//! Value objects shared across carts, orders and the catalog.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use common::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for restaurant ids derived from their owner.
const RESTAURANT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d05_8e21_5a0c_7b3d_9e10);

/// Fee added to every order unless the service is configured otherwise.
pub const DEFAULT_DELIVERY_FEE: Money = Money::from_cents(500);

/// Highest price a product may be listed at ($1,000,000.00).
pub const MAX_PRICE: Money = Money::from_cents(100_000_000);

/// Most units of one product a cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for common::AggregateId {
            fn from(id: $name) -> Self {
                common::AggregateId::from_uuid(id.0)
            }
        }

        impl From<common::AggregateId> for $name {
            fn from(id: common::AggregateId) -> Self {
                Self(id.as_uuid())
            }
        }
    };
}

uuid_id!(
    /// Identifies a product on a restaurant's menu.
    ProductId
);
uuid_id!(
    /// Identifies a restaurant. Derived from the owner, see [`RestaurantId::for_owner`].
    RestaurantId
);
uuid_id!(
    /// Identifies one line of a cart.
    CartLineId
);
uuid_id!(
    /// Identifies one line of a placed order.
    OrderLineId
);
uuid_id!(
    /// Identifies a placed order; also the order's stream id.
    OrderId
);

impl RestaurantId {
    /// The restaurant an owner manages. An owner has at most one, so the id
    /// is a name-based uuid of the owner's user id.
    pub fn for_owner(owner: UserId) -> Self {
        Self(Uuid::new_v5(&RESTAURANT_NAMESPACE, owner.as_uuid().as_bytes()))
    }
}

/// An amount of money in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Price times quantity, saturating at the `i64` bounds. Listed prices
    /// and line quantities are capped well below the point where this
    /// saturates; use [`Money::checked_multiply`] where the result is stored.
    pub fn multiply(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }

    pub fn checked_multiply(&self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

// Operators saturate instead of panicking on overflow.
impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// How the customer intends to pay. Recorded only; nothing is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct ParsePaymentMethodError(pub String);

impl std::str::FromStr for PaymentMethod {
    type Err = ParsePaymentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "online" => Ok(PaymentMethod::Online),
            _ => Err(ParsePaymentMethodError(s.to_string())),
        }
    }
}
