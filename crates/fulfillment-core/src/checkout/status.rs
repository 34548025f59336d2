//! Order status and its transition table.

use crate::events::OrderEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order placed, awaiting payment.
    #[default]
    Pending,
    /// Payment captured.
    Paid,
    /// Order being prepared.
    Preparing,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled. Terminal.
    Cancelled,
    /// Order refunded. Terminal.
    Refunded,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    /// Parse a status name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
    }

    /// Statuses reachable from this one through an explicit update.
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Paid, OrderStatus::Cancelled],
            OrderStatus::Paid => &[
                OrderStatus::Preparing,
                OrderStatus::Cancelled,
                OrderStatus::Refunded,
            ],
            OrderStatus::Preparing => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered, OrderStatus::Refunded],
            OrderStatus::Delivered => &[OrderStatus::Refunded],
            OrderStatus::Cancelled | OrderStatus::Refunded => &[],
        }
    }

    /// Whether `to` is a table edge from this status.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Targets that need a captured payment on the order.
    pub fn requires_captured_payment(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Status an event moves the order to, if any.
    ///
    /// Events bypass the transition table: a refund forces `Refunded` from
    /// anywhere, a delivered shipment moves a paid, preparing or shipped
    /// order straight to `Delivered`.
    pub fn on_event(&self, event: &OrderEvent) -> Option<OrderStatus> {
        let target = match event {
            OrderEvent::PaymentCaptured { .. } => {
                (*self == OrderStatus::Pending).then_some(OrderStatus::Paid)
            }
            OrderEvent::PaymentRefunded { .. } => Some(OrderStatus::Refunded),
            OrderEvent::ShipmentDelivered { .. } => matches!(
                self,
                OrderStatus::Shipped | OrderStatus::Preparing | OrderStatus::Paid
            )
            .then_some(OrderStatus::Delivered),
        };
        target.filter(|to| to != self)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{OrderId, PaymentId, ShipmentId};

    #[test]
    fn test_transition_table_is_exhaustive() {
        use OrderStatus::*;
        let legal = [
            (Pending, Paid),
            (Pending, Cancelled),
            (Paid, Preparing),
            (Paid, Cancelled),
            (Paid, Refunded),
            (Preparing, Shipped),
            (Preparing, Cancelled),
            (Shipped, Delivered),
            (Shipped, Refunded),
            (Delivered, Refunded),
        ];
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_targets() {
        for status in OrderStatus::ALL {
            assert_eq!(status.is_terminal(), status.allowed_targets().is_empty());
        }
    }

    #[test]
    fn test_parse_round_trips_names() {
        assert_eq!(OrderStatus::parse("shipped"), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::parse("LOST"), None);
    }

    #[test]
    fn test_event_targets() {
        let order_id = OrderId::new("o1");
        let captured = OrderEvent::PaymentCaptured {
            order_id: order_id.clone(),
            payment_id: PaymentId::new("p1"),
        };
        let refunded = OrderEvent::PaymentRefunded {
            order_id: order_id.clone(),
            payment_id: PaymentId::new("p1"),
        };
        let delivered = OrderEvent::ShipmentDelivered {
            order_id,
            shipment_id: ShipmentId::new("s1"),
        };

        assert_eq!(OrderStatus::Pending.on_event(&captured), Some(OrderStatus::Paid));
        assert_eq!(OrderStatus::Preparing.on_event(&captured), None);

        assert_eq!(OrderStatus::Delivered.on_event(&refunded), Some(OrderStatus::Refunded));
        assert_eq!(OrderStatus::Cancelled.on_event(&refunded), Some(OrderStatus::Refunded));
        assert_eq!(OrderStatus::Refunded.on_event(&refunded), None);

        assert_eq!(OrderStatus::Paid.on_event(&delivered), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::Pending.on_event(&delivered), None);
        assert_eq!(OrderStatus::Cancelled.on_event(&delivered), None);
    }
}
