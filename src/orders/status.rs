use std::fmt;

use serde::{Deserialize, Serialize};

/// Order lifecycle. Forward-only along the delivery path, with a
/// cancellation escape from the first two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether `next` is a legal single step from `self` for a non-admin
    /// actor.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, Ready)
                | (Ready, OutForDelivery)
                | (OutForDelivery, Delivered)
        ) || (self.can_cancel() && next == Cancelled)
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Stripe,
    Razorpay,
    Cash,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    const ALL: [OrderStatus; 7] = [
        Pending,
        Confirmed,
        Preparing,
        Ready,
        OutForDelivery,
        Delivered,
        Cancelled,
    ];

    #[test]
    fn forward_path_is_single_step() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
    }

    #[test]
    fn no_skipping_ahead() {
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Preparing));
        assert!(!Confirmed.can_transition_to(OutForDelivery));
        assert!(!Preparing.can_transition_to(Delivered));
    }

    #[test]
    fn no_moving_backwards() {
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(OutForDelivery));
        assert!(!Ready.can_transition_to(Preparing));
    }

    #[test]
    fn cancellation_only_from_pending_or_confirmed() {
        for status in ALL {
            assert_eq!(
                status.can_transition_to(Cancelled),
                matches!(status, Pending | Confirmed),
                "cancel from {status}"
            );
        }
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for from in [Delivered, Cancelled] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn wire_format_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&OutForDelivery).unwrap(),
            r#""out_for_delivery""#
        );
        let parsed: OrderStatus = serde_json::from_str(r#""out_for_delivery""#).unwrap();
        assert_eq!(parsed, OutForDelivery);
        assert_eq!(OutForDelivery.to_string(), "out_for_delivery");
    }
}
