//! Cart hash layout
//!
//! A cart is stored as one metadata hash at `cart:{session}` plus one hash per
//! line at `cart:{session}:item:{sku}`. Money is written with two decimals and
//! timestamps as RFC 3339.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Cart, CartItem};

pub fn cart_key(session_id: &str) -> String {
    format!("cart:{}", session_id)
}

pub fn item_key(session_id: &str, sku: &str) -> String {
    format!("cart:{}:item:{}", session_id, sku)
}

/// Matches every item hash of one session and nothing else.
pub fn item_pattern(session_id: &str) -> String {
    format!("cart:{}:item:*", session_id)
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn field(name: &str, value: impl Into<String>) -> (String, String) {
    (name.to_string(), value.into())
}

pub fn encode_meta(cart: &Cart) -> Vec<(String, String)> {
    vec![
        field("subtotal", money(cart.subtotal)),
        field("tax", money(cart.tax)),
        field("shipping", money(cart.shipping)),
        field("total", money(cart.total)),
        field("item_count", cart.item_count.to_string()),
        field("last_updated", cart.last_updated.to_rfc3339()),
        field("expires_at", cart.expires_at.to_rfc3339()),
    ]
}

pub fn encode_item(item: &CartItem) -> Vec<(String, String)> {
    vec![
        field("product_id", item.product_id.as_str()),
        field("sku", item.sku.as_str()),
        field("product_name", item.product_name.as_str()),
        field("price", money(item.price)),
        field("quantity", item.quantity.to_string()),
        field("subtotal", money(item.subtotal)),
        field("added_at", item.added_at.to_rfc3339()),
    ]
}

fn timestamp(hash: &HashMap<String, String>, name: &str) -> Option<DateTime<Utc>> {
    hash.get(name)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Copies the stored timestamps onto `cart`; totals are left to `Cart::recalculate`.
pub fn decode_meta(cart: &mut Cart, hash: &HashMap<String, String>) {
    if let Some(last_updated) = timestamp(hash, "last_updated") {
        cart.last_updated = last_updated;
    }
    if let Some(expires_at) = timestamp(hash, "expires_at") {
        cart.expires_at = expires_at;
    }
}

/// Rebuilds an item, skipping hashes without a SKU or a positive quantity.
///
/// The line subtotal is recomputed from price and quantity.
pub fn decode_item(hash: &HashMap<String, String>) -> Option<CartItem> {
    let sku = hash.get("sku").filter(|sku| !sku.is_empty())?.clone();
    let quantity: u32 = hash.get("quantity")?.parse().ok().filter(|q| *q > 0)?;
    let price: f64 = hash.get("price").and_then(|p| p.parse().ok()).unwrap_or(0.0);

    let mut item = CartItem::new(
        hash.get("product_id").cloned().unwrap_or_default(),
        sku,
        hash.get("product_name").cloned().unwrap_or_default(),
        price,
        quantity,
    );
    if let Some(added_at) = timestamp(hash, "added_at") {
        item.added_at = added_at;
    }
    Some(item)
}
