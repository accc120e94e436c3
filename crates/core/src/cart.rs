//! Shopping cart store.
//!
//! The cart is an owned value: the storefront loads it from the visitor's
//! session, mutates it, and writes it back. Totals are computed on demand
//! and never stored, so they cannot drift from the line items.
//!
//! Quantities are always at least 1. Asking for less clamps to 1; removing
//! a line requires [`Cart::remove_item`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, discount_percentage};

/// Snapshot of the product data a cart line needs.
///
/// Taken when the product is first added; later adds of the same product
/// only change the quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    /// Price charged per unit.
    pub unit_price: Decimal,
    /// Pre-discount price, when the product is on sale.
    #[serde(default)]
    pub regular_price: Option<Decimal>,
    /// Image URL for the cart thumbnail.
    #[serde(default)]
    pub image: Option<String>,
}

/// One product in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: CartProduct,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.unit_price * Decimal::from(self.quantity)
    }

    /// Whole-percent saving against the regular price, zero when not on sale.
    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        self.product
            .regular_price
            .map_or(0, |regular| discount_percentage(regular, self.product.unit_price))
    }
}

/// Ordered collection of cart lines, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of `product`.
    ///
    /// If the product is already in the cart its quantity is increased and
    /// the stored snapshot is kept. A quantity of 0 is treated as 1.
    pub fn add_item(&mut self, product: CartProduct, quantity: u32) {
        let quantity = quantity.max(1);
        if let Some(existing) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem { product, quantity });
        }
    }

    /// Set the quantity for `id`, clamping anything below 1 to 1.
    ///
    /// Returns `false` if the product is not in the cart (nothing changes).
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.product.id == id) else {
            return false;
        };
        item.quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        true
    }

    /// Remove the line for `id`. Returns `false` if it was not present.
    pub fn remove_item(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product.id != id);
        self.items.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: u64, price: i64) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Part {id}"),
            unit_price: Decimal::new(price, 0),
            regular_price: None,
            image: None,
        }
    }

    #[test]
    fn test_add_same_product_sums_quantities() {
        let mut cart = Cart::new();
        cart.add_item(product(1, 100), 1);
        cart.add_item(product(1, 100), 2);
        cart.add_item(product(1, 100), 3);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 6);
    }

    #[test]
    fn test_add_keeps_first_snapshot() {
        let mut cart = Cart::new();
        cart.add_item(product(1, 100), 1);
        cart.add_item(product(1, 999), 1);
        assert_eq!(cart.items()[0].product.unit_price, Decimal::new(100, 0));
    }

    #[test]
    fn test_add_zero_quantity_counts_as_one() {
        let mut cart = Cart::new();
        cart.add_item(product(1, 100), 0);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cart = Cart::new();
        cart.add_item(product(3, 10), 1);
        cart.add_item(product(1, 10), 1);
        cart.add_item(product(2, 10), 1);
        let ids: Vec<u64> = cart.items().iter().map(|i| i.id().get()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_remove_then_add_starts_fresh() {
        let mut cart = Cart::new();
        cart.add_item(product(1, 100), 5);
        assert!(cart.remove_item(ProductId::new(1)));
        cart.add_item(product(1, 100), 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(product(1, 100), 1);
        assert!(!cart.remove_item(ProductId::new(2)));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let mut cart = Cart::new();
        cart.add_item(product(1, 100), 4);
        assert!(cart.update_quantity(ProductId::new(1), 0));
        assert_eq!(cart.items()[0].quantity, 1);
        assert!(cart.update_quantity(ProductId::new(1), -3));
        assert_eq!(cart.items()[0].quantity, 1);
        assert!(cart.update_quantity(ProductId::new(1), 7));
        assert_eq!(cart.items()[0].quantity, 7);
    }

    #[test]
    fn test_update_absent_is_noop() {
        let mut cart = Cart::new();
        assert!(!cart.update_quantity(ProductId::new(9), 3));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let mut cart = Cart::new();
        let check = |cart: &Cart| {
            let expected: Decimal = cart
                .items()
                .iter()
                .map(|i| i.product.unit_price * Decimal::from(i.quantity))
                .sum();
            assert_eq!(cart.total_price(), expected);
        };

        cart.add_item(product(1, 150_000), 2);
        check(&cart);
        cart.add_item(product(2, 75_500), 1);
        check(&cart);
        cart.update_quantity(ProductId::new(2), 4);
        check(&cart);
        cart.remove_item(ProductId::new(1));
        check(&cart);
        assert_eq!(cart.total_price(), Decimal::new(302_000, 0));
        assert_eq!(cart.total_items(), 4);
        cart.clear();
        check(&cart);
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_line_discount_percentage() {
        let mut p = product(1, 75);
        p.regular_price = Some(Decimal::new(100, 0));
        let item = CartItem {
            product: p,
            quantity: 2,
        };
        assert_eq!(item.discount_percentage(), 25);
        assert_eq!(item.line_total(), Decimal::new(150, 0));
    }

    #[test]
    fn test_serde_round_trip_keeps_order() {
        let mut cart = Cart::new();
        cart.add_item(product(2, 10), 1);
        cart.add_item(product(1, 20), 3);
        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
