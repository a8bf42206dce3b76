//! Order status machine.

use serde::{Deserialize, Serialize};

/// Status of a placed order.
///
/// ```text
/// pending ──► confirmed ──► preparing ──► delivered
///    │            │
///    └────────────┴──► cancelled
/// ```
///
/// The edges are exactly [`TRANSITIONS`]; everything else, including every
/// backward move and `preparing → cancelled`, is illegal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Delivered,
    Cancelled,
}

/// Every allowed `(from, to)` pair.
pub const TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (OrderStatus::Pending, OrderStatus::Confirmed),
    (OrderStatus::Pending, OrderStatus::Cancelled),
    (OrderStatus::Confirmed, OrderStatus::Preparing),
    (OrderStatus::Confirmed, OrderStatus::Cancelled),
    (OrderStatus::Preparing, OrderStatus::Delivered),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        TRANSITIONS.contains(&(*self, target))
    }

    pub fn next_statuses(&self) -> impl Iterator<Item = OrderStatus> + '_ {
        TRANSITIONS
            .iter()
            .filter(move |(from, _)| from == self)
            .map(|(_, to)| *to)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().next().is_none()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Preparing.can_transition_to(Delivered));
    }

    #[test]
    fn test_only_table_edges_are_legal() {
        let mut legal = 0;
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                if from.can_transition_to(to) {
                    legal += 1;
                    assert!(TRANSITIONS.contains(&(from, to)));
                }
            }
        }
        assert_eq!(legal, TRANSITIONS.len());
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Preparing.is_terminal());
        assert_eq!(
            OrderStatus::Pending.next_statuses().collect::<Vec<_>>(),
            vec![OrderStatus::Confirmed, OrderStatus::Cancelled]
        );
    }

    #[test]
    fn test_parse_and_serde_agree() {
        for status in OrderStatus::ALL {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(status.as_str())
            );
        }
        assert_eq!("Delivered".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
