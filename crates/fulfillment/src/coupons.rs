//! Coupon ledger.

use chrono::{DateTime, Utc};
use fulfillment_core::prelude::*;
use fulfillment_store::Transaction;
use tracing::info;

/// Check a code against a candidate subtotal (minor units) without using it.
pub fn validate<T: Transaction>(
    tx: &T,
    code: &str,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<CouponCheck, FulfillmentError> {
    Ok(lookup(tx, code, subtotal, now)?.map(|_| ()).into())
}

/// Resolve a code for checkout; any rejection becomes `InvalidCoupon`.
pub(crate) fn resolve<T: Transaction>(
    tx: &T,
    code: &str,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<Coupon, FulfillmentError> {
    lookup(tx, code, subtotal, now)?.map_err(|reason| FulfillmentError::InvalidCoupon {
        code: code.to_string(),
        reason,
    })
}

fn lookup<T: Transaction>(
    tx: &T,
    code: &str,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<Result<Coupon, CouponRejection>, FulfillmentError> {
    let Some(coupon) = tx.coupon_by_code(code)? else {
        return Ok(Err(CouponRejection::NotFoundOrInactive));
    };
    Ok(coupon.check(now, subtotal).map(|()| coupon))
}

/// Discount a coupon grants on a subtotal.
pub fn compute_discount(subtotal: Money, coupon: &Coupon) -> Money {
    coupon.discount_for(subtotal)
}

/// Count one use of the coupon. Only called while creating an order.
pub(crate) fn commit_usage<T: Transaction>(
    tx: &mut T,
    mut coupon: Coupon,
) -> Result<Coupon, FulfillmentError> {
    coupon.record_usage();
    tx.put_coupon(coupon.clone())?;
    Ok(coupon)
}

/// Register a new coupon.
pub fn create<T: Transaction>(tx: &mut T, coupon: Coupon) -> Result<Coupon, FulfillmentError> {
    if !coupon.has_valid_value() {
        return Err(FulfillmentError::InvalidCouponValue(coupon.value));
    }
    if tx.coupon_by_code(&coupon.code)?.is_some() {
        return Err(FulfillmentError::CouponCodeTaken(coupon.code));
    }
    tx.put_coupon(coupon.clone())?;
    info!(code = %coupon.code, kind = ?coupon.kind, value = coupon.value, "coupon created");
    Ok(coupon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fulfillment_store::{MemoryStore, Store};

    #[test]
    fn test_unknown_code_is_not_found() {
        let store = MemoryStore::new().unwrap();
        let tx = store.begin().unwrap();
        let check = validate(&tx, "NOPE", 1000, Utc::now()).unwrap();
        assert_eq!(check, CouponCheck::rejected(CouponRejection::NotFoundOrInactive));
    }

    #[test]
    fn test_expired_code_rejected_at_resolve() {
        let store = MemoryStore::new().unwrap();
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        create(
            &mut tx,
            Coupon::percent("OLD", 10, now).with_window(None, Some(now - Duration::days(1))),
        )
        .unwrap();

        assert_eq!(
            validate(&tx, "OLD", 1000, now).unwrap().reason,
            Some(CouponRejection::Expired)
        );
        let err = resolve(&tx, "OLD", 1000, now).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::InvalidCoupon {
                code: "OLD".into(),
                reason: CouponRejection::Expired,
            }
        );
    }

    #[test]
    fn test_create_rejects_duplicates_and_bad_values() {
        let store = MemoryStore::new().unwrap();
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        create(&mut tx, Coupon::fixed("FIVE", 500, now)).unwrap();

        assert_eq!(
            create(&mut tx, Coupon::fixed("FIVE", 100, now)).unwrap_err(),
            FulfillmentError::CouponCodeTaken("FIVE".into())
        );
        assert_eq!(
            create(&mut tx, Coupon::percent("HUGE", 150, now)).unwrap_err(),
            FulfillmentError::InvalidCouponValue(150)
        );
    }

    #[test]
    fn test_commit_usage_hits_limit() {
        let store = MemoryStore::new().unwrap();
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        let coupon = create(&mut tx, Coupon::fixed("ONCE", 100, now).with_usage_limit(1)).unwrap();
        commit_usage(&mut tx, coupon).unwrap();

        assert_eq!(
            validate(&tx, "ONCE", 1000, now).unwrap().reason,
            Some(CouponRejection::UsageLimit)
        );
    }
}
