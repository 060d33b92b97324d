//! Product document model
//!
//! The store holds the source of truth; the cache holds serialized snapshots
//! of the same struct.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::models::FieldError;

pub const MIN_SKU_LENGTH: usize = 3;
pub const MAX_SKU_LENGTH: usize = 50;

/// Inventory levels across warehouses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub warehouse_main: u32,
    pub warehouse_east: u32,
    pub warehouse_west: u32,
    /// Always the sum of the warehouse counts after `recalculate_total`
    pub total: u32,
}

impl Stock {
    /// Sum of the warehouse counts, or `None` if it does not fit in a `u32`.
    pub fn checked_total(&self) -> Option<u32> {
        self.warehouse_main
            .checked_add(self.warehouse_east)?
            .checked_add(self.warehouse_west)
    }

    /// Saturates at `u32::MAX`; validated patches never get there.
    pub fn recalculate_total(&mut self) {
        self.total = self.checked_total().unwrap_or(u32::MAX);
    }
}

/// Review statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    pub average: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

// == Product ==
/// A catalog product identified by an immutable SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub brand: String,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub stock: Stock,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_in_stock(&self) -> bool {
        self.stock.total > 0 && self.status == ProductStatus::Active
    }

    /// Case-insensitive substring match over the searchable text fields.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [&self.name, &self.description, &self.brand, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
    }
}

/// Validates SKU length, returning the field error on failure.
pub fn validate_sku(sku: &str, field: &str) -> Option<FieldError> {
    let len = sku.chars().count();
    if (MIN_SKU_LENGTH..=MAX_SKU_LENGTH).contains(&len) {
        None
    } else {
        Some(FieldError::new(
            field,
            format!(
                "SKU must be between {} and {} characters",
                MIN_SKU_LENGTH, MAX_SKU_LENGTH
            ),
            "invalid_format",
        ))
    }
}

// == New Product ==
/// Request body for creating a product; the SKU is generated server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub brand: String,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// == Field Rules ==
// Shared by creation and patch validation so both paths enforce the same limits.

fn check_length(errors: &mut Vec<FieldError>, field: String, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        let message = if min == 0 {
            format!("must be at most {} characters", max)
        } else {
            format!("must be between {} and {} characters", min, max)
        };
        errors.push(FieldError::new(field, message, "invalid_length"));
    }
}

fn check_name(errors: &mut Vec<FieldError>, prefix: &str, name: &str) {
    check_length(errors, format!("{}name", prefix), name, 2, 200);
}

fn check_description(errors: &mut Vec<FieldError>, prefix: &str, description: &str) {
    check_length(errors, format!("{}description", prefix), description, 0, 2000);
}

fn check_category(errors: &mut Vec<FieldError>, prefix: &str, category: &str) {
    check_length(errors, format!("{}category", prefix), category, 2, 100);
}

fn check_subcategory(errors: &mut Vec<FieldError>, prefix: &str, subcategory: &str) {
    check_length(errors, format!("{}subcategory", prefix), subcategory, 0, 100);
}

fn check_brand(errors: &mut Vec<FieldError>, prefix: &str, brand: &str) {
    check_length(errors, format!("{}brand", prefix), brand, 2, 100);
}

fn check_price(errors: &mut Vec<FieldError>, prefix: &str, price: f64) {
    if !(price.is_finite() && price > 0.0) {
        errors.push(FieldError::new(
            format!("{}price", prefix),
            "must be greater than 0",
            "invalid_price",
        ));
    }
}

fn check_currency(errors: &mut Vec<FieldError>, prefix: &str, currency: &str) {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.push(FieldError::new(
            format!("{}currency", prefix),
            "must be a 3-letter currency code",
            "invalid_currency",
        ));
    }
}

fn check_tags(errors: &mut Vec<FieldError>, prefix: &str, tags: &[String]) {
    for (i, tag) in tags.iter().enumerate() {
        check_length(errors, format!("{}tags[{}]", prefix, i), tag, 2, 50);
    }
}

/// Images must be absolute http(s) URLs with a host.
fn check_images(errors: &mut Vec<FieldError>, prefix: &str, images: &[String]) {
    for (i, image) in images.iter().enumerate() {
        let valid = Url::parse(image)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(FieldError::new(
                format!("{}images[{}]", prefix, i),
                "must be an http or https URL",
                "invalid_url",
            ));
        }
    }
}

fn check_stock(errors: &mut Vec<FieldError>, prefix: &str, stock: &Stock) {
    if stock.checked_total().is_none() {
        errors.push(FieldError::new(
            format!("{}stock", prefix),
            format!("warehouse counts must sum to at most {}", u32::MAX),
            "invalid_stock",
        ));
    }
}

impl NewProduct {
    /// Validates the request; `prefix` is prepended to field names (e.g. `[0].`).
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();

        check_name(&mut errors, prefix, &self.name);
        check_description(&mut errors, prefix, &self.description);
        check_category(&mut errors, prefix, &self.category);
        check_subcategory(&mut errors, prefix, &self.subcategory);
        check_brand(&mut errors, prefix, &self.brand);
        check_price(&mut errors, prefix, self.price);
        check_currency(&mut errors, prefix, &self.currency);
        check_tags(&mut errors, prefix, &self.tags);
        check_images(&mut errors, prefix, &self.images);

        errors
    }

    /// Generates a SKU of the form `BRA-CAT-{unix seconds}-{4 hex}`.
    pub fn generate_sku(&self, now: DateTime<Utc>) -> String {
        let prefix = |value: &str| -> String {
            value
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(3)
                .collect::<String>()
                .to_uppercase()
        };
        let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();

        format!(
            "{}-{}-{}-{}",
            prefix(&self.brand),
            prefix(&self.category),
            now.timestamp(),
            suffix
        )
    }

    /// Materializes the request into an active product with zero stock.
    pub fn into_product(self) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            sku: self.generate_sku(now),
            currency: self.currency.to_uppercase(),
            name: self.name,
            description: self.description,
            category: self.category,
            subcategory: self.subcategory,
            brand: self.brand,
            price: self.price,
            stock: Stock::default(),
            attributes: self.attributes,
            images: self.images,
            ratings: Ratings::default(),
            tags: self.tags,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

// == Product Patch ==
/// Partial update limited to the mutable product fields.
///
/// Anything not listed here (`id`, `sku`, `created_at`, `ratings`, unknown keys)
/// is dropped during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<Stock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }

    /// Checks the values that are present with the same rules as creation;
    /// `prefix` is prepended to field names.
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if let Some(name) = &self.name {
            check_name(&mut errors, prefix, name);
        }
        if let Some(description) = &self.description {
            check_description(&mut errors, prefix, description);
        }
        if let Some(category) = &self.category {
            check_category(&mut errors, prefix, category);
        }
        if let Some(subcategory) = &self.subcategory {
            check_subcategory(&mut errors, prefix, subcategory);
        }
        if let Some(brand) = &self.brand {
            check_brand(&mut errors, prefix, brand);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, prefix, price);
        }
        if let Some(currency) = &self.currency {
            check_currency(&mut errors, prefix, currency);
        }
        if let Some(stock) = &self.stock {
            check_stock(&mut errors, prefix, stock);
        }
        if let Some(images) = &self.images {
            check_images(&mut errors, prefix, images);
        }
        if let Some(tags) = &self.tags {
            check_tags(&mut errors, prefix, tags);
        }

        errors
    }

    /// Applies the present fields, recalculating stock and the update timestamp.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(subcategory) = &self.subcategory {
            product.subcategory = subcategory.clone();
        }
        if let Some(brand) = &self.brand {
            product.brand = brand.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(currency) = &self.currency {
            product.currency = currency.to_uppercase();
        }
        if let Some(stock) = &self.stock {
            product.stock = stock.clone();
        }
        if let Some(attributes) = &self.attributes {
            product.attributes = attributes.clone();
        }
        if let Some(images) = &self.images {
            product.images = images.clone();
        }
        if let Some(tags) = &self.tags {
            product.tags = tags.clone();
        }
        if let Some(status) = self.status {
            product.status = status;
        }

        product.stock.recalculate_total();
        product.updated_at = Utc::now();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            name: "Wireless Mouse".to_string(),
            description: String::new(),
            category: "Electronics".to_string(),
            subcategory: String::new(),
            brand: "Logitech".to_string(),
            price: 29.99,
            currency: "cad".to_string(),
            images: vec![],
            attributes: HashMap::new(),
            tags: vec![],
        }
    }

    #[test]
    fn test_generate_sku_format() {
        let req = new_product();
        let now = Utc::now();
        let sku = req.generate_sku(now);

        assert!(sku.starts_with(&format!("LOG-ELE-{}-", now.timestamp())));
        assert!(validate_sku(&sku, "sku").is_none());
    }

    #[test]
    fn test_generate_sku_unique_within_same_second() {
        let req = new_product();
        let now = Utc::now();
        let skus: std::collections::HashSet<String> =
            (0..20).map(|_| req.generate_sku(now)).collect();
        assert!(skus.len() > 1);
    }

    #[test]
    fn test_into_product_defaults() {
        let product = new_product().into_product();
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.stock.total, 0);
        assert_eq!(product.currency, "CAD");
        assert!(!product.is_in_stock());
    }

    #[test]
    fn test_new_product_validation() {
        let mut req = new_product();
        assert!(req.validate("").is_empty());

        req.price = 0.0;
        req.name = "x".to_string();
        req.currency = "CA".to_string();
        let errors = req.validate("[1].");
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"[1].price"));
        assert!(fields.contains(&"[1].name"));
        assert!(fields.contains(&"[1].currency"));
    }

    #[test]
    fn test_validate_sku_bounds() {
        assert!(validate_sku("AB", "sku").is_some());
        assert!(validate_sku("ABC", "sku").is_none());
        assert!(validate_sku(&"X".repeat(50), "sku").is_none());
        assert!(validate_sku(&"X".repeat(51), "sku").is_some());
    }

    #[test]
    fn test_patch_strips_immutable_fields() {
        let json = r#"{"sku": "NEW", "id": "abc", "created_at": "2020-01-01T00:00:00Z", "price": 12.5}"#;
        let patch: ProductPatch = serde_json::from_str(json).unwrap();
        assert_eq!(patch.price, Some(12.5));
        assert!(!patch.is_empty());

        let only_immutable: ProductPatch = serde_json::from_str(r#"{"sku": "NEW"}"#).unwrap();
        assert!(only_immutable.is_empty());
    }

    #[test]
    fn test_patch_apply_recalculates_stock() {
        let mut product = fixtures::product("ACM-ELE-1", 10.0);
        let before = product.updated_at;
        let patch = ProductPatch {
            stock: Some(Stock {
                warehouse_main: 3,
                warehouse_east: 4,
                warehouse_west: 5,
                total: 999,
            }),
            ..Default::default()
        };

        patch.apply_to(&mut product);

        assert_eq!(product.stock.total, 12);
        assert_eq!(product.sku, "ACM-ELE-1");
        assert!(product.updated_at >= before);
    }

    #[test]
    fn test_new_product_rejects_bad_image_url() {
        let mut req = new_product();
        req.images = vec![
            "https://cdn.example.com/mouse.jpg".to_string(),
            "not a url".to_string(),
            "ftp://cdn.example.com/mouse.jpg".to_string(),
        ];
        let errors = req.validate("");
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["images[1]", "images[2]"]);
        assert!(errors.iter().all(|e| e.code == "invalid_url"));
    }

    fn patch_error_fields(patch: &ProductPatch) -> Vec<String> {
        patch.validate("").into_iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_patch_rejects_long_description() {
        let patch = ProductPatch {
            description: Some("d".repeat(2001)),
            ..Default::default()
        };
        assert_eq!(patch_error_fields(&patch), vec!["description"]);

        let ok = ProductPatch {
            description: Some("d".repeat(2000)),
            ..Default::default()
        };
        assert!(ok.validate("").is_empty());
    }

    #[test]
    fn test_patch_rejects_long_subcategory() {
        let patch = ProductPatch {
            subcategory: Some("s".repeat(101)),
            ..Default::default()
        };
        assert_eq!(patch_error_fields(&patch), vec!["subcategory"]);
    }

    #[test]
    fn test_patch_rejects_bad_tags() {
        let patch = ProductPatch {
            tags: Some(vec!["ok".to_string(), "x".to_string(), "t".repeat(51)]),
            ..Default::default()
        };
        assert_eq!(patch_error_fields(&patch), vec!["tags[1]", "tags[2]"]);
    }

    #[test]
    fn test_patch_rejects_non_alphabetic_currency() {
        let patch = ProductPatch {
            currency: Some("C4D".to_string()),
            ..Default::default()
        };
        let errors = patch.validate("[2].");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "[2].currency");
        assert_eq!(errors[0].code, "invalid_currency");
    }

    #[test]
    fn test_patch_rejects_bad_image_url() {
        let patch = ProductPatch {
            images: Some(vec!["/relative/path.png".to_string()]),
            ..Default::default()
        };
        assert_eq!(patch_error_fields(&patch), vec!["images[0]"]);
    }

    #[test]
    fn test_patch_rejects_stock_overflow() {
        let patch = ProductPatch {
            stock: Some(Stock {
                warehouse_main: u32::MAX,
                warehouse_east: 1,
                warehouse_west: 0,
                total: 0,
            }),
            ..Default::default()
        };
        let errors = patch.validate("");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "stock");
        assert_eq!(errors[0].code, "invalid_stock");
    }

    #[test]
    fn test_recalculate_total_saturates() {
        let mut stock = Stock {
            warehouse_main: u32::MAX,
            warehouse_east: 1,
            warehouse_west: 1,
            total: 0,
        };
        assert_eq!(stock.checked_total(), None);
        stock.recalculate_total();
        assert_eq!(stock.total, u32::MAX);
    }

    #[test]
    fn test_matches_query() {
        let product = fixtures::product("ACM-ELE-1", 10.0);
        assert!(product.matches_query("acme"));
        assert!(product.matches_query("GADG"));
        assert!(!product.matches_query("kitchen"));
    }
}
