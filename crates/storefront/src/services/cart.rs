//! Cart persistence in the visitor's session.
//!
//! Handlers load the cart, mutate it in memory and save it back. A stored
//! cart that no longer deserializes is replaced by an empty one, and a failed
//! save is logged without failing the request.

use tower_sessions::Session;
use tracing::instrument;

use autoparts_core::Cart;

use crate::models::session_keys;

/// Load the visitor's cart, falling back to an empty cart.
#[instrument(skip(session))]
pub async fn load(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(Some(cart)) => cart,
        Ok(None) => Cart::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored cart could not be read, starting with an empty cart");
            Cart::new()
        }
    }
}

/// Save the cart after a mutation.
///
/// Any change to the cart discards the current checkout attempt, so the next
/// checkout starts with a fresh idempotency key.
#[instrument(skip(session, cart), fields(items = cart.total_items()))]
pub async fn save(session: &Session, cart: &Cart) {
    if let Err(e) = session.insert(session_keys::CART, cart).await {
        tracing::error!(error = %e, "Failed to save cart");
    }
    if let Err(e) = session.remove_value(session_keys::CHECKOUT).await {
        tracing::warn!(error = %e, "Failed to discard checkout attempt");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    use autoparts_core::{CartProduct, CheckoutAttempt, ProductId};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn product(id: u64) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Part {id}"),
            unit_price: Decimal::new(250_000, 0),
            regular_price: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_load_missing_cart_is_empty() {
        let session = session();
        assert!(load(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let session = session();
        let mut cart = Cart::new();
        cart.add_item(product(1), 3);
        save(&session, &cart).await;

        let loaded = load(&session).await;
        assert_eq!(loaded.total_items(), 3);
        assert_eq!(loaded.total_price(), Decimal::new(750_000, 0));
    }

    #[tokio::test]
    async fn test_corrupt_cart_loads_empty() {
        let session = session();
        session
            .insert(session_keys::CART, serde_json::json!({"items": "not a list"}))
            .await
            .unwrap();
        assert!(load(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_discards_checkout_attempt() {
        let session = session();
        session
            .insert(session_keys::CHECKOUT, CheckoutAttempt::start())
            .await
            .unwrap();

        save(&session, &Cart::new()).await;

        let attempt: Option<CheckoutAttempt> = session.get(session_keys::CHECKOUT).await.unwrap();
        assert!(attempt.is_none());
    }
}
