//! Payment types.

use crate::error::FulfillmentError;
use crate::ids::{OrderId, PaymentId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment status.
///
/// There is no transition table: any status may be written at any time.
/// Only `Captured` and `Refunded` carry side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Created,
    Authorized,
    Captured,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Created,
        PaymentStatus::Authorized,
        PaymentStatus::Captured,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "CREATED",
            PaymentStatus::Authorized => "AUTHORIZED",
            PaymentStatus::Captured => "CAPTURED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment against an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Payment provider name (e.g., "stripe").
    pub provider: String,
    /// Fixed at creation to the order total.
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        order_id: OrderId,
        provider: impl Into<String>,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::generate(),
            order_id,
            provider: provider.into(),
            amount,
            status: PaymentStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_captured(&self) -> bool {
        self.status == PaymentStatus::Captured
    }

    pub fn set_status(&mut self, status: PaymentStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

/// Sum of amounts (minor units) of the payments in `status`.
pub fn total_in_status<'a>(
    payments: impl IntoIterator<Item = &'a Payment>,
    status: PaymentStatus,
) -> Result<i64, FulfillmentError> {
    payments
        .into_iter()
        .filter(|p| p.status == status)
        .try_fold(0i64, |acc, p| {
            acc.checked_add(p.amount.amount)
                .ok_or(FulfillmentError::Overflow)
        })
}
