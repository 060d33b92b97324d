//! Cache key layout for catalog entries.

/// Global list of recently cached SKUs, newest first
pub const RECENT_PRODUCTS_KEY: &str = "products:recent";

/// Serialized product document
pub fn product_key(sku: &str) -> String {
    format!("product:{}", sku)
}

/// SKU index entry; maps to the SKU whose `product:` key holds the document
pub fn sku_key(sku: &str) -> String {
    format!("sku:{}", sku)
}

pub fn category_key(category: &str) -> String {
    format!("category:{}", category)
}
