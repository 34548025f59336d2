//! Coupon types and validation rules.

use crate::ids::CouponId;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a coupon's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CouponKind {
    /// `value` percent off the subtotal.
    Percent,
    /// `value` minor units off the subtotal.
    Fixed,
}

/// Why a coupon cannot be applied, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    NotFoundOrInactive,
    NotStarted,
    Expired,
    UsageLimit,
    MinOrder,
}

impl CouponRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponRejection::NotFoundOrInactive => "NOT_FOUND_OR_INACTIVE",
            CouponRejection::NotStarted => "NOT_STARTED",
            CouponRejection::Expired => "EXPIRED",
            CouponRejection::UsageLimit => "USAGE_LIMIT",
            CouponRejection::MinOrder => "MIN_ORDER",
        }
    }
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a coupon validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponCheck {
    pub ok: bool,
    pub reason: Option<CouponRejection>,
}

impl CouponCheck {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn rejected(reason: CouponRejection) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

impl From<Result<(), CouponRejection>> for CouponCheck {
    fn from(result: Result<(), CouponRejection>) -> Self {
        match result {
            Ok(()) => Self::accepted(),
            Err(reason) => Self::rejected(reason),
        }
    }
}

/// A coupon definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Code entered at checkout (unique).
    pub code: String,
    /// Percent or fixed amount.
    pub kind: CouponKind,
    /// Percentage points or minor units, depending on `kind`.
    pub value: i64,
    /// Minimum subtotal in minor units.
    pub min_order: Option<i64>,
    /// Not valid before this time.
    pub starts_at: Option<DateTime<Utc>>,
    /// Not valid after this time.
    pub ends_at: Option<DateTime<Utc>>,
    /// Maximum number of orders (None = unlimited).
    pub usage_limit: Option<i64>,
    /// Orders placed with this coupon so far.
    pub used_count: i64,
    /// Whether the coupon is enabled.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Create a new percentage coupon.
    pub fn percent(code: impl Into<String>, percent: i64, now: DateTime<Utc>) -> Self {
        Self::new(code, CouponKind::Percent, percent, now)
    }

    /// Create a new fixed amount coupon.
    pub fn fixed(code: impl Into<String>, amount: i64, now: DateTime<Utc>) -> Self {
        Self::new(code, CouponKind::Fixed, amount, now)
    }

    fn new(code: impl Into<String>, kind: CouponKind, value: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: CouponId::generate(),
            code: code.into(),
            kind,
            value,
            min_order: None,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            used_count: 0,
            active: true,
            created_at: now,
        }
    }

    pub fn with_min_order(mut self, min_order: i64) -> Self {
        self.min_order = Some(min_order);
        self
    }

    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    pub fn with_window(
        mut self,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self
    }

    /// Whether `value` is in range for the coupon kind.
    pub fn has_valid_value(&self) -> bool {
        match self.kind {
            CouponKind::Percent => (0..=100).contains(&self.value),
            CouponKind::Fixed => self.value >= 0,
        }
    }

    /// Check the coupon against a candidate subtotal.
    ///
    /// Reasons are reported in a fixed priority: inactive, not started,
    /// expired, usage limit, minimum order.
    pub fn check(&self, now: DateTime<Utc>, subtotal: i64) -> Result<(), CouponRejection> {
        if !self.active {
            return Err(CouponRejection::NotFoundOrInactive);
        }
        if self.starts_at.is_some_and(|starts| now < starts) {
            return Err(CouponRejection::NotStarted);
        }
        if self.ends_at.is_some_and(|ends| now > ends) {
            return Err(CouponRejection::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(CouponRejection::UsageLimit);
        }
        if self.min_order.is_some_and(|min| subtotal < min) {
            return Err(CouponRejection::MinOrder);
        }
        Ok(())
    }

    /// Discount for a subtotal, never more than the subtotal.
    ///
    /// Percent coupons round down.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let base = subtotal.amount.max(0);
        let amount = match self.kind {
            CouponKind::Percent => {
                let raw = i128::from(base) * i128::from(self.value) / 100;
                i64::try_from(raw).unwrap_or(i64::MAX).min(base)
            }
            CouponKind::Fixed => self.value.min(base),
        };
        Money::new(amount.max(0), subtotal.currency)
    }

    /// Count one more order against the coupon.
    pub fn record_usage(&mut self) {
        self.used_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use chrono::Duration;

    fn usd(amount: i64) -> Money {
        Money::new(amount, Currency::USD)
    }

    #[test]
    fn test_percentage_discount_rounds_down() {
        let coupon = Coupon::percent("SAVE10", 10, Utc::now());
        assert_eq!(coupon.discount_for(usd(3000)), usd(300));
        assert_eq!(coupon.discount_for(usd(1999)), usd(199));
    }

    #[test]
    fn test_percentage_discount_capped_at_subtotal() {
        let coupon = Coupon::percent("ALL", 100, Utc::now());
        assert_eq!(coupon.discount_for(usd(1234)), usd(1234));
    }

    #[test]
    fn test_fixed_discount() {
        let coupon = Coupon::fixed("SAVE5", 500, Utc::now());
        assert_eq!(coupon.discount_for(usd(10000)), usd(500));
    }

    #[test]
    fn test_fixed_discount_capped() {
        let coupon = Coupon::fixed("SAVE100", 10000, Utc::now());
        assert_eq!(coupon.discount_for(usd(5000)), usd(5000));
    }

    #[test]
    fn test_rejection_priority() {
        let now = Utc::now();
        // Every rule fails; inactive wins.
        let mut coupon = Coupon::percent("X", 10, now)
            .with_window(Some(now + Duration::days(1)), Some(now - Duration::days(1)))
            .with_usage_limit(0)
            .with_min_order(10_000);
        coupon.active = false;
        assert_eq!(coupon.check(now, 0), Err(CouponRejection::NotFoundOrInactive));

        coupon.active = true;
        assert_eq!(coupon.check(now, 0), Err(CouponRejection::NotStarted));

        coupon.starts_at = None;
        assert_eq!(coupon.check(now, 0), Err(CouponRejection::Expired));

        coupon.ends_at = None;
        assert_eq!(coupon.check(now, 0), Err(CouponRejection::UsageLimit));

        coupon.usage_limit = None;
        assert_eq!(coupon.check(now, 0), Err(CouponRejection::MinOrder));

        assert_eq!(coupon.check(now, 10_000), Ok(()));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = Utc::now();
        let coupon = Coupon::fixed("EDGE", 100, now).with_window(Some(now), Some(now));
        assert_eq!(coupon.check(now, 0), Ok(()));
    }

    #[test]
    fn test_usage_limit() {
        let now = Utc::now();
        let mut coupon = Coupon::percent("TEST", 10, now).with_usage_limit(2);
        coupon.record_usage();
        assert!(coupon.check(now, 100).is_ok());
        coupon.record_usage();
        assert_eq!(coupon.check(now, 100), Err(CouponRejection::UsageLimit));
    }

    #[test]
    fn test_value_ranges() {
        let now = Utc::now();
        assert!(Coupon::percent("A", 100, now).has_valid_value());
        assert!(!Coupon::percent("B", 101, now).has_valid_value());
        assert!(!Coupon::fixed("C", -1, now).has_valid_value());
    }
}
