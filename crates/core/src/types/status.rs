//! Status enums for orders.
//!
//! Order status is a small forward-only state machine:
//!
//! ```text
//! Order Placed ──► Shipped ──► Delivered
//!      │              │
//!      └──────────────┴──► Cancelled
//! ```
//!
//! `Delivered` and `Cancelled` are terminal.

use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// Serialized with the human-readable labels the storefront client displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "order_status"))]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Order Placed")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Order Placed"))]
    OrderPlaced,
    #[cfg_attr(feature = "postgres", sqlx(rename = "Shipped"))]
    Shipped,
    #[cfg_attr(feature = "postgres", sqlx(rename = "Delivered"))]
    Delivered,
    #[cfg_attr(feature = "postgres", sqlx(rename = "Cancelled"))]
    Cancelled,
}

/// Error returned when a status change is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change order status from {from} to {to}")]
pub struct StatusTransitionError {
    /// Current status.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::OrderPlaced,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Returns the display label (also the wire and database value).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OrderPlaced => "Order Placed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::OrderPlaced, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered | Self::Cancelled)
        )
    }

    /// Validate a transition and return the new status.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] for backward moves, no-op moves and
    /// any move out of a terminal state.
    pub const fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| {
                let valid = Self::ALL.map(Self::label).join(", ");
                format!("Invalid status. Valid statuses are: {valid}")
            })
    }
}

/// How an order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "payment_type"))]
pub enum PaymentType {
    /// Cash on delivery.
    #[serde(rename = "COD")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "COD"))]
    CashOnDelivery,
    /// Paid through the payment provider's hosted checkout.
    #[cfg_attr(feature = "postgres", sqlx(rename = "Online"))]
    Online,
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashOnDelivery => write!(f, "COD"),
            Self::Online => write!(f, "Online"),
        }
    }
}
