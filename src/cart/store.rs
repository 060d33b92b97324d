//! Cart Aggregate Store
//!
//! Session carts live only in the cache. Every mutation is a read-modify-write:
//! load the cart, change it, recompute totals, then write metadata and items in
//! one atomic pipeline with a fresh TTL.
//!
//! Two concurrent mutations of the same session can lose an update: the last
//! pipeline to land wins. There is no version check.

use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{with_deadline, Pipeline, SharedCache};
use crate::cart::codec::{self, cart_key, item_key, item_pattern};
use crate::error::{CacheError, CartError};
use crate::models::cart::{round_cents, MAX_ITEM_QUANTITY};
use crate::models::{Cart, CartItem, Product};

/// Sliding lifetime of a cart after its last mutation
pub const DEFAULT_CART_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct CartStore {
    cache: SharedCache,
    ttl: Duration,
    deadline: Duration,
}

impl CartStore {
    pub fn new(cache: SharedCache) -> Self {
        Self {
            cache,
            ttl: DEFAULT_CART_TTL,
            deadline: Duration::from_secs(10),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_operation_timeout(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    // == Get Cart ==
    /// Returns the session's cart, or a fresh empty cart if none exists.
    ///
    /// Never writes.
    pub async fn get_cart(&self, session_id: &str) -> Result<Cart, CartError> {
        Ok(with_deadline(self.deadline, self.load(session_id)).await?)
    }

    async fn load(&self, session_id: &str) -> Result<Cart, CacheError> {
        let mut cart = Cart::empty(session_id, self.ttl);

        let meta = self.cache.hash_get_all(&cart_key(session_id)).await?;
        if meta.is_empty() {
            return Ok(cart);
        }
        codec::decode_meta(&mut cart, &meta);

        for key in self.cache.keys(&item_pattern(session_id)).await? {
            let hash = self.cache.hash_get_all(&key).await?;
            if let Some(item) = codec::decode_item(&hash) {
                cart.items.insert(item.sku.clone(), item);
            }
        }

        cart.recalculate();
        Ok(cart)
    }

    async fn save(&self, cart: &Cart, removed_sku: Option<&str>) -> Result<(), CartError> {
        let session_id = cart.session_id.as_str();
        let meta_key = cart_key(session_id);

        let mut pipe = Pipeline::new();
        pipe.hash_set(meta_key.clone(), codec::encode_meta(cart))
            .expire(meta_key, self.ttl);
        if let Some(sku) = removed_sku {
            pipe.delete(item_key(session_id, sku));
        }
        for item in cart.items.values() {
            let key = item_key(session_id, &item.sku);
            pipe.hash_set(key.clone(), codec::encode_item(item))
                .expire(key, self.ttl);
        }

        with_deadline(self.deadline, self.cache.execute(pipe)).await?;
        Ok(())
    }

    // == Add Item ==
    /// Adds `quantity` units of `product`.
    ///
    /// An existing line keeps its original unit price; stock checks belong to the caller.
    /// The merged line quantity may not exceed `MAX_ITEM_QUANTITY`.
    pub async fn add_item(&self, session_id: &str, quantity: u32, product: &Product) -> Result<Cart, CartError> {
        check_quantity(quantity)?;

        let mut cart = self.get_cart(session_id).await?;
        match cart.items.get_mut(&product.sku) {
            Some(item) => {
                let total = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::InvalidQuantity(quantity))?;
                check_quantity(total)?;
                item.set_quantity(total);
            }
            None => {
                let item = CartItem::new(
                    product.id.to_string(),
                    product.sku.clone(),
                    product.name.clone(),
                    round_cents(product.price),
                    quantity,
                );
                cart.items.insert(product.sku.clone(), item);
            }
        }

        cart.touch(self.ttl);
        self.save(&cart, None).await?;
        debug!(session_id, sku = %product.sku, quantity, "item added to cart");
        Ok(cart)
    }

    // == Update Item Quantity ==
    /// Overwrites a line's quantity; zero removes the line.
    pub async fn update_item_quantity(&self, session_id: &str, sku: &str, quantity: u32) -> Result<Cart, CartError> {
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let mut cart = self.get_cart(session_id).await?;

        let removed = if quantity == 0 {
            cart.items
                .remove(sku)
                .ok_or_else(|| CartError::ItemNotFound(sku.to_string()))?;
            Some(sku)
        } else {
            cart.items
                .get_mut(sku)
                .ok_or_else(|| CartError::ItemNotFound(sku.to_string()))?
                .set_quantity(quantity);
            None
        };

        cart.touch(self.ttl);
        self.save(&cart, removed).await?;
        debug!(session_id, sku, quantity, "cart item updated");
        Ok(cart)
    }

    // == Remove Item ==
    /// Removes a line. Removing a SKU that is not in the cart returns it unchanged.
    pub async fn remove_item(&self, session_id: &str, sku: &str) -> Result<Cart, CartError> {
        match self.update_item_quantity(session_id, sku, 0).await {
            Err(CartError::ItemNotFound(_)) => self.get_cart(session_id).await,
            result => result,
        }
    }

    // == Clear ==
    /// Deletes the cart metadata and every item key of the session.
    ///
    /// Returns the number of keys removed.
    pub async fn clear(&self, session_id: &str) -> Result<usize, CartError> {
        let removed = with_deadline(self.deadline, async {
            let mut keys = self.cache.keys(&item_pattern(session_id)).await?;
            keys.push(cart_key(session_id));
            self.cache.delete(&keys).await
        })
        .await?;

        info!(session_id, removed, "cart cleared");
        Ok(removed)
    }
}

fn check_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 || quantity > MAX_ITEM_QUANTITY {
        return Err(CartError::InvalidQuantity(quantity));
    }
    Ok(())
}
