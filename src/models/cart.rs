//! Shopping cart aggregate
//!
//! Derived totals are recomputed from the item mapping on every mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Flat tax rate applied to the subtotal
pub const TAX_RATE: f64 = 0.10;
/// Subtotal at or above which shipping is free
pub const FREE_SHIPPING_THRESHOLD: f64 = 50.0;
/// Shipping charged below the free-shipping threshold
pub const FLAT_SHIPPING: f64 = 5.99;
/// Largest quantity a single cart line may hold
pub const MAX_ITEM_QUANTITY: u32 = 10_000;

/// Rounds a monetary amount to cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// == Cart Item ==
/// A line in the cart; the unit price is snapshotted when the item is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub sku: String,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
    pub subtotal: f64,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(product_id: String, sku: String, product_name: String, price: f64, quantity: u32) -> Self {
        Self {
            product_id,
            sku,
            product_name,
            price,
            quantity,
            subtotal: round_cents(price * f64::from(quantity)),
            added_at: Utc::now(),
        }
    }

    /// Sets the quantity and recomputes the line subtotal from the snapshotted price.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.subtotal = round_cents(self.price * f64::from(quantity));
    }
}

// == Cart ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub session_id: String,
    /// Items keyed by SKU
    pub items: BTreeMap<String, CartItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub total: f64,
    /// Sum of unit quantities, not distinct SKUs
    pub item_count: u32,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart that would expire `ttl` from now.
    pub fn empty(session_id: impl Into<String>, ttl: std::time::Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            items: BTreeMap::new(),
            subtotal: 0.0,
            tax: 0.0,
            shipping: 0.0,
            total: 0.0,
            item_count: 0,
            last_updated: now,
            expires_at: now + chrono_ttl(ttl),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recomputes subtotal, tax, shipping, total and item count from the items.
    pub fn recalculate(&mut self) {
        let subtotal: f64 = self.items.values().map(|item| item.subtotal).sum();
        self.subtotal = round_cents(subtotal);
        self.item_count = self
            .items
            .values()
            .fold(0u32, |count, item| count.saturating_add(item.quantity));
        self.tax = round_cents(self.subtotal * TAX_RATE);
        self.shipping = if self.subtotal > 0.0 && self.subtotal < FREE_SHIPPING_THRESHOLD {
            FLAT_SHIPPING
        } else {
            0.0
        };
        self.total = round_cents(self.subtotal + self.tax + self.shipping);
    }

    /// Recomputes totals and slides the expiry window forward.
    pub fn touch(&mut self, ttl: std::time::Duration) {
        self.recalculate();
        let now = Utc::now();
        self.last_updated = now;
        self.expires_at = now + chrono_ttl(ttl);
    }
}

fn chrono_ttl(ttl: std::time::Duration) -> Duration {
    Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: std::time::Duration = std::time::Duration::from_secs(3600);

    fn cart_with(items: &[(&str, f64, u32)]) -> Cart {
        let mut cart = Cart::empty("session-1", TTL);
        for (sku, price, qty) in items {
            cart.items.insert(
                sku.to_string(),
                CartItem::new("id".into(), sku.to_string(), "name".into(), *price, *qty),
            );
        }
        cart.recalculate();
        cart
    }

    #[test]
    fn test_empty_cart_totals() {
        let cart = Cart::empty("s", TTL);
        assert_eq!(cart.item_count, 0);
        assert_eq!(cart.subtotal, 0.0);
        assert_eq!(cart.shipping, 0.0);
        assert_eq!(cart.total, 0.0);
        assert!(cart.expires_at > cart.last_updated);
    }

    #[test]
    fn test_shipping_charged_below_threshold() {
        let cart = cart_with(&[("A", 10.0, 2)]);
        assert_eq!(cart.subtotal, 20.0);
        assert_eq!(cart.tax, 2.0);
        assert_eq!(cart.shipping, FLAT_SHIPPING);
        assert_eq!(cart.total, 27.99);
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let cart = cart_with(&[("A", 25.0, 2)]);
        assert_eq!(cart.subtotal, 50.0);
        assert_eq!(cart.shipping, 0.0);
        assert_eq!(cart.total, 55.0);
    }

    #[test]
    fn test_item_count_sums_quantities() {
        let cart = cart_with(&[("A", 1.0, 3), ("B", 2.0, 4)]);
        assert_eq!(cart.item_count, 7);
        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_item_count_saturates_instead_of_overflowing() {
        let cart = cart_with(&[("A", 1.0, u32::MAX), ("B", 1.0, 2)]);
        assert_eq!(cart.item_count, u32::MAX);
    }

    #[test]
    fn test_set_quantity_uses_snapshot_price() {
        let mut item = CartItem::new("id".into(), "A".into(), "n".into(), 19.99, 1);
        item.set_quantity(3);
        assert_eq!(item.subtotal, 59.97);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(0.125 * 100.0), 12.5);
        assert_eq!(round_cents(2.999), 3.0);
    }
}
