use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A status string that does not belong to the persisted enum set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status `{}`", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

/// Overall shipping status of an order.
///
/// Transitions are forward-only: pending -> confirmed -> shipped ->
/// out for delivery -> completed. `cancelled` is reachable from pending or
/// confirmed only; completed and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    #[serde(rename = "out for delivery")]
    OutForDelivery,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out for delivery",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// The fixed forward-only transition map. There is no edge out of
    /// `completed` or `cancelled`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, OutForDelivery)
                | (OutForDelivery, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "out for delivery" => Ok(OrderStatus::OutForDelivery),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Per-line-item fulfillment state, independent of the overall order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Confirmed => "confirmed",
            ItemStatus::Cancelled => "cancelled",
            ItemStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Cancelled | ItemStatus::Completed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "confirmed" => Ok(ItemStatus::Confirmed),
            "cancelled" => Ok(ItemStatus::Cancelled),
            "completed" => Ok(ItemStatus::Completed),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Settlement status on the tracking record, independent of shipping status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Recompute an order's status from its item statuses.
///
/// Called after every item mutation; no call site hand-rolls this. The result
/// only ranges over {pending, confirmed, completed, cancelled}; shipped and
/// out-for-delivery are operator/rider driven and never derived from items.
pub fn derive_order_status(items: &[ItemStatus]) -> OrderStatus {
    if items.is_empty() {
        return OrderStatus::Pending;
    }
    if items.iter().all(|s| *s == ItemStatus::Cancelled) {
        return OrderStatus::Cancelled;
    }
    if items.iter().all(|s| s.is_terminal()) {
        return OrderStatus::Completed;
    }
    if items.iter().any(|s| *s == ItemStatus::Confirmed) {
        return OrderStatus::Confirmed;
    }
    OrderStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::OutForDelivery,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    #[test]
    fn transition_map_is_exact() {
        use OrderStatus::*;
        let allowed = [
            (Pending, Confirmed),
            (Confirmed, Shipped),
            (Shipped, OutForDelivery),
            (OutForDelivery, Completed),
            (Pending, Cancelled),
            (Confirmed, Cancelled),
        ];
        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn skipping_confirmed_is_rejected() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for to in ALL {
            assert!(!OrderStatus::Completed.can_transition_to(to));
            assert!(!OrderStatus::Cancelled.can_transition_to(to));
        }
    }

    #[test]
    fn out_for_delivery_round_trips_with_spaces() {
        let parsed: OrderStatus = "out for delivery".parse().unwrap();
        assert_eq!(parsed, OrderStatus::OutForDelivery);
        assert_eq!(parsed.as_str(), "out for delivery");
        assert!("out_for_delivery".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn payment_status_is_capitalized() {
        assert_eq!(PaymentStatus::Paid.as_str(), "Paid");
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn derive_all_cancelled_is_cancelled() {
        let items = [ItemStatus::Cancelled, ItemStatus::Cancelled];
        assert_eq!(derive_order_status(&items), OrderStatus::Cancelled);
    }

    #[test]
    fn derive_mixed_terminal_is_completed() {
        let items = [ItemStatus::Completed, ItemStatus::Cancelled];
        assert_eq!(derive_order_status(&items), OrderStatus::Completed);
    }

    #[test]
    fn derive_one_confirmed_is_confirmed() {
        let items = [ItemStatus::Confirmed, ItemStatus::Pending];
        assert_eq!(derive_order_status(&items), OrderStatus::Confirmed);

        let items = [ItemStatus::Confirmed, ItemStatus::Cancelled];
        assert_eq!(derive_order_status(&items), OrderStatus::Confirmed);
    }

    #[test]
    fn derive_all_pending_stays_pending() {
        let items = [ItemStatus::Pending, ItemStatus::Pending];
        assert_eq!(derive_order_status(&items), OrderStatus::Pending);
        assert_eq!(derive_order_status(&[]), OrderStatus::Pending);
    }
}
