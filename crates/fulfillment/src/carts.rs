//! Cart manager. Every mutation targets the caller's ACTIVE cart.

use chrono::{DateTime, Utc};
use fulfillment_core::prelude::*;
use fulfillment_store::Transaction;
use tracing::{debug, info};

/// The user's ACTIVE cart, created on first use.
pub fn get_or_create_active<T: Transaction>(
    tx: &mut T,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> Result<Cart, FulfillmentError> {
    if let Some(cart) = tx.active_cart(user_id)? {
        return Ok(cart);
    }
    let cart = Cart::new(user_id.clone(), now);
    tx.put_cart(cart.clone())?;
    debug!(user_id = %user_id, cart_id = %cart.id, "cart created");
    Ok(cart)
}

/// Add a product, merging into an existing line for the same product.
pub fn add_item<T: Transaction>(
    tx: &mut T,
    user_id: &UserId,
    product_id: &ProductId,
    quantity: i64,
    max_quantity: i64,
    now: DateTime<Utc>,
) -> Result<Cart, FulfillmentError> {
    if quantity <= 0 {
        return Err(FulfillmentError::InvalidQuantity(quantity));
    }
    let product = tx
        .product(product_id)?
        .ok_or_else(|| FulfillmentError::ProductNotFound(product_id.clone()))?;

    let mut cart = get_or_create_active(tx, user_id, now)?;
    cart.add_item(&product, quantity, max_quantity, now)?;
    tx.put_cart(cart.clone())?;
    Ok(cart)
}

/// Set a line's quantity; zero or less removes the line.
pub fn update_item<T: Transaction>(
    tx: &mut T,
    user_id: &UserId,
    line_item_id: &CartItemId,
    quantity: i64,
    max_quantity: i64,
    now: DateTime<Utc>,
) -> Result<Cart, FulfillmentError> {
    let mut cart = tx
        .active_cart(user_id)?
        .ok_or_else(|| FulfillmentError::CartItemNotFound(line_item_id.clone()))?;
    cart.update_quantity(line_item_id, quantity, max_quantity, now)?;
    tx.put_cart(cart.clone())?;
    Ok(cart)
}

pub fn remove_item<T: Transaction>(
    tx: &mut T,
    user_id: &UserId,
    line_item_id: &CartItemId,
    now: DateTime<Utc>,
) -> Result<Cart, FulfillmentError> {
    let mut cart = tx
        .active_cart(user_id)?
        .ok_or_else(|| FulfillmentError::CartItemNotFound(line_item_id.clone()))?;
    cart.remove_item(line_item_id, now)?;
    tx.put_cart(cart.clone())?;
    Ok(cart)
}

/// Abandon the ACTIVE cart and return its empty replacement.
pub fn abandon<T: Transaction>(
    tx: &mut T,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> Result<Cart, FulfillmentError> {
    let cart = get_or_create_active(tx, user_id, now)?;
    let replacement = close_and_replace(tx, cart, CartStatus::Abandoned, now)?;
    info!(user_id = %user_id, cart_id = %replacement.id, "cart abandoned");
    Ok(replacement)
}

/// Close `cart` with `status` and open a fresh ACTIVE cart for its owner.
pub(crate) fn close_and_replace<T: Transaction>(
    tx: &mut T,
    mut cart: Cart,
    status: CartStatus,
    now: DateTime<Utc>,
) -> Result<Cart, FulfillmentError> {
    cart.close(status, now);
    let replacement = Cart::new(cart.user_id.clone(), now);
    tx.put_cart(cart)?;
    tx.put_cart(replacement.clone())?;
    Ok(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fulfillment_store::{MemoryStore, Store};

    fn setup(store: &MemoryStore) -> (UserId, ProductId) {
        let mut tx = store.begin().unwrap();
        let pid = ProductId::new("p1");
        tx.put_product(Product::new(
            pid.clone(),
            "SKU-1",
            "Widget",
            Money::new(1000, Currency::USD),
            Utc::now(),
        ))
        .unwrap();
        tx.commit().unwrap();
        (UserId::new("u1"), pid)
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let store = MemoryStore::new().unwrap();
        let (user, _) = setup(&store);
        let mut tx = store.begin().unwrap();
        let first = get_or_create_active(&mut tx, &user, Utc::now()).unwrap();
        let second = get_or_create_active(&mut tx, &user, Utc::now()).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_add_item_keeps_first_price() {
        let store = MemoryStore::new().unwrap();
        let (user, pid) = setup(&store);
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        add_item(&mut tx, &user, &pid, 1, DEFAULT_MAX_QUANTITY_PER_LINE, now).unwrap();

        let mut product = tx.product(&pid).unwrap().unwrap();
        product.price = Money::new(2000, Currency::USD);
        tx.put_product(product).unwrap();

        let cart = add_item(&mut tx, &user, &pid, 2, DEFAULT_MAX_QUANTITY_PER_LINE, now).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].unit_price.amount, 1000);
    }

    #[test]
    fn test_add_rejects_unknown_and_inactive_products() {
        let store = MemoryStore::new().unwrap();
        let (user, pid) = setup(&store);
        let now = Utc::now();
        let mut tx = store.begin().unwrap();

        let err = add_item(&mut tx, &user, &ProductId::new("ghost"), 1, 10, now).unwrap_err();
        assert!(matches!(err, FulfillmentError::ProductNotFound(_)));

        let product = tx.product(&pid).unwrap().unwrap().deactivated();
        tx.put_product(product).unwrap();
        let err = add_item(&mut tx, &user, &pid, 1, 10, now).unwrap_err();
        assert!(matches!(err, FulfillmentError::ProductInactive(_)));
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let store = MemoryStore::new().unwrap();
        let (user, pid) = setup(&store);
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        let cart = add_item(&mut tx, &user, &pid, 2, 10, now).unwrap();
        let line = cart.items[0].id.clone();

        let cart = update_item(&mut tx, &user, &line, 0, 10, now).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_foreign_line_not_found() {
        let store = MemoryStore::new().unwrap();
        let (user, pid) = setup(&store);
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        let cart = add_item(&mut tx, &user, &pid, 2, 10, now).unwrap();
        let line = cart.items[0].id.clone();

        let other = UserId::new("u2");
        let err = remove_item(&mut tx, &other, &line, now).unwrap_err();
        assert_eq!(err, FulfillmentError::CartItemNotFound(line));
    }

    #[test]
    fn test_abandon_replaces_cart() {
        let store = MemoryStore::new().unwrap();
        let (user, pid) = setup(&store);
        let now = Utc::now();
        let mut tx = store.begin().unwrap();
        let cart = add_item(&mut tx, &user, &pid, 1, 10, now).unwrap();

        let replacement = abandon(&mut tx, &user, now).unwrap();
        assert_ne!(replacement.id, cart.id);
        assert!(replacement.is_empty());
        assert_eq!(tx.cart(&cart.id).unwrap().unwrap().status, CartStatus::Abandoned);
        assert_eq!(tx.active_cart(&user).unwrap().unwrap().id, replacement.id);
    }
}
