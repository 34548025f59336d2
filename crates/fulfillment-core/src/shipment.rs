//! Shipment types.

use crate::ids::{OrderId, ShipmentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shipment status. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    #[default]
    Created,
    InTransit,
    Delivered,
    Lost,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Created,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
        ShipmentStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Created => "CREATED",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Lost => "LOST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Carrier details supplied when a shipment is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewShipment {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShipmentUpdate {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub status: Option<ShipmentStatus>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl ShipmentUpdate {
    pub fn status(status: ShipmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A shipment of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub status: ShipmentStatus,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn new(order_id: OrderId, details: NewShipment, now: DateTime<Utc>) -> Self {
        Self {
            id: ShipmentId::generate(),
            order_id,
            carrier: details.carrier,
            tracking_number: details.tracking_number,
            tracking_url: details.tracking_url,
            status: ShipmentStatus::Created,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update.
    ///
    /// Explicit timestamps win; otherwise moving to `InTransit` stamps
    /// `shipped_at` and moving to `Delivered` stamps `delivered_at`, each
    /// only if still empty.
    pub fn apply(&mut self, update: ShipmentUpdate, now: DateTime<Utc>) {
        if let Some(carrier) = update.carrier {
            self.carrier = Some(carrier);
        }
        if let Some(tracking_number) = update.tracking_number {
            self.tracking_number = Some(tracking_number);
        }
        if let Some(tracking_url) = update.tracking_url {
            self.tracking_url = Some(tracking_url);
        }
        if let Some(shipped_at) = update.shipped_at {
            self.shipped_at = Some(shipped_at);
        }
        if let Some(delivered_at) = update.delivered_at {
            self.delivered_at = Some(delivered_at);
        }
        if let Some(status) = update.status {
            self.status = status;
            match status {
                ShipmentStatus::InTransit => {
                    self.shipped_at.get_or_insert(now);
                }
                ShipmentStatus::Delivered => {
                    self.delivered_at.get_or_insert(now);
                }
                ShipmentStatus::Created | ShipmentStatus::Lost => {}
            }
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn shipment() -> Shipment {
        Shipment::new(OrderId::new("o1"), NewShipment::default(), Utc::now())
    }

    #[test]
    fn test_in_transit_stamps_shipped_at_once() {
        let mut s = shipment();
        let t1 = Utc::now();
        s.apply(ShipmentUpdate::status(ShipmentStatus::InTransit), t1);
        assert_eq!(s.shipped_at, Some(t1));

        s.apply(ShipmentUpdate::status(ShipmentStatus::InTransit), t1 + Duration::hours(1));
        assert_eq!(s.shipped_at, Some(t1));
    }

    #[test]
    fn test_explicit_delivered_at_is_kept() {
        let mut s = shipment();
        let earlier = Utc::now() - Duration::days(1);
        s.apply(
            ShipmentUpdate {
                status: Some(ShipmentStatus::Delivered),
                delivered_at: Some(earlier),
                ..ShipmentUpdate::default()
            },
            Utc::now(),
        );
        assert_eq!(s.delivered_at, Some(earlier));
    }

    #[test]
    fn test_any_status_order_is_accepted() {
        let mut s = shipment();
        s.apply(ShipmentUpdate::status(ShipmentStatus::Delivered), Utc::now());
        s.apply(ShipmentUpdate::status(ShipmentStatus::Created), Utc::now());
        assert_eq!(s.status, ShipmentStatus::Created);
        assert!(s.delivered_at.is_some());
    }
}
