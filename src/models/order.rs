//! Order document model
//!
//! Line items snapshot the product name and price when the order is placed;
//! totals are always derived from the items and the discount.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StatusTransitionError;
use crate::models::cart::round_cents;
use crate::models::customer::{is_valid_email, Address};
use crate::models::{FieldError, Product};

/// Ontario HST
pub const ORDER_TAX_RATE: f64 = 0.13;
pub const ORDER_FREE_SHIPPING_THRESHOLD: f64 = 100.0;
pub const ORDER_FLAT_SHIPPING: f64 = 15.0;
/// Days added to the ship date for the delivery estimate
pub const ESTIMATED_DELIVERY_DAYS: i64 = 5;

pub const MIN_ORDER_NUMBER_LENGTH: usize = 3;
pub const MAX_ORDER_NUMBER_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Forward-only lifecycle; cancelling is possible until the order ships.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Processing)
                    | (Pending, Cancelled)
                    | (Processing, Shipped)
                    | (Processing, Cancelled)
                    | (Shipped, Delivered)
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    Cash,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: String,
}

// == Order Item ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
}

impl OrderItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            quantity,
            unit_price: product.price,
            subtotal: round_cents(product.price * f64::from(quantity)),
        }
    }
}

// == Totals ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub discount: f64,
    pub grand_total: f64,
}

impl OrderTotals {
    /// Shipping is free from `ORDER_FREE_SHIPPING_THRESHOLD`; the grand total never goes below zero.
    pub fn compute(items: &[OrderItem], discount: f64) -> Self {
        let subtotal = round_cents(items.iter().map(|item| item.subtotal).sum());
        let tax = round_cents(subtotal * ORDER_TAX_RATE);
        let shipping = if subtotal >= ORDER_FREE_SHIPPING_THRESHOLD {
            0.0
        } else {
            ORDER_FLAT_SHIPPING
        };
        let discount = round_cents(discount);
        let grand_total = round_cents((subtotal + tax + shipping - discount).max(0.0));

        Self {
            subtotal,
            tax,
            shipping,
            discount,
            grand_total,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub ordered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

// == Order ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_email: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    pub payment: Payment,
    pub timeline: Timeline,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Moves to `next`, stamping the timeline the first time each stage is reached.
    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }

        let timeline = &mut self.timeline;
        match next {
            OrderStatus::Processing => {
                timeline.paid_at.get_or_insert(now);
            }
            OrderStatus::Shipped => {
                let shipped_at = *timeline.shipped_at.get_or_insert(now);
                timeline.estimated_delivery = Some(shipped_at + Duration::days(ESTIMATED_DELIVERY_DAYS));
            }
            OrderStatus::Delivered => {
                timeline.delivered_at.get_or_insert(now);
            }
            OrderStatus::Cancelled => {
                timeline.cancelled_at.get_or_insert(now);
            }
            OrderStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }
}

/// `ORD-YYYYMMDD-HHMMSS-XXXX`, the suffix being four random hex digits.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d-%H%M%S"), suffix)
}

/// Checks the path/body order number used by lookups and bulk operations.
pub fn validate_order_number(order_number: &str) -> Option<FieldError> {
    let len = order_number.chars().count();
    if len == 0 {
        return Some(FieldError::new("order_number", "Order number is required", "missing_order_number"));
    }
    if !(MIN_ORDER_NUMBER_LENGTH..=MAX_ORDER_NUMBER_LENGTH).contains(&len) {
        return Some(FieldError::new(
            "order_number",
            format!(
                "Order number must be between {} and {} characters",
                MIN_ORDER_NUMBER_LENGTH, MAX_ORDER_NUMBER_LENGTH
            ),
            "invalid_order_number_format",
        ));
    }
    None
}

// == New Order ==
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub sku: String,
    pub quantity: u32,
}

/// One entry of the POST /api/orders body. Names and prices come from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub customer_email: String,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub payment: Payment,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub discount: f64,
}

impl NewOrder {
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.customer_email) {
            errors.push(FieldError::new(
                format!("{}customer_email", prefix),
                "must be a valid email address",
                "invalid_email",
            ));
        }
        if self.items.is_empty() {
            errors.push(FieldError::new(
                format!("{}items", prefix),
                "Order must contain at least one item",
                "required",
            ));
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.quantity == 0 {
                errors.push(FieldError::new(
                    format!("{}items[{}].quantity", prefix, i),
                    "Quantity must be at least 1",
                    "invalid_quantity",
                ));
            }
        }
        if !self.discount.is_finite() || self.discount < 0.0 {
            errors.push(FieldError::new(
                format!("{}discount", prefix),
                "Discount cannot be negative",
                "invalid_discount",
            ));
        }
        errors.extend(self.shipping_address.validate(&format!("{}shipping_address.", prefix)));
        if let Some(billing) = &self.billing_address {
            errors.extend(billing.validate(&format!("{}billing_address.", prefix)));
        }
        errors
    }

    /// Builds a pending order from resolved line items.
    pub fn into_order(self, items: Vec<OrderItem>, customer_email: String, now: DateTime<Utc>) -> Order {
        let totals = OrderTotals::compute(&items, self.discount);
        Order {
            id: Uuid::new_v4(),
            order_number: generate_order_number(now),
            customer_id: self.customer_id,
            customer_email,
            status: OrderStatus::Pending,
            items,
            totals,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            payment: self.payment,
            timeline: Timeline {
                ordered_at: now,
                ..Timeline::default()
            },
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

// == Order Patch ==
/// Mutable order fields. Identity, customer and items are fixed once placed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        *self == OrderPatch::default()
    }

    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(address) = &self.shipping_address {
            errors.extend(address.validate(&format!("{}shipping_address.", prefix)));
        }
        if let Some(address) = &self.billing_address {
            errors.extend(address.validate(&format!("{}billing_address.", prefix)));
        }
        if let Some(discount) = self.discount {
            if !discount.is_finite() || discount < 0.0 {
                errors.push(FieldError::new(
                    format!("{}discount", prefix),
                    "Discount cannot be negative",
                    "invalid_discount",
                ));
            }
        }
        errors
    }

    /// Applies the present fields; an illegal status change leaves the order untouched.
    pub fn apply_to(&self, order: &mut Order) -> Result<(), StatusTransitionError> {
        let now = Utc::now();
        if let Some(status) = self.status {
            order.transition(status, now)?;
        }
        if let Some(address) = &self.shipping_address {
            order.shipping_address = address.clone();
        }
        if let Some(address) = &self.billing_address {
            order.billing_address = Some(address.clone());
        }
        if let Some(payment) = &self.payment {
            order.payment = payment.clone();
        }
        if let Some(notes) = &self.notes {
            order.notes = notes.clone();
        }
        if let Some(discount) = self.discount {
            order.totals = OrderTotals::compute(&order.items, discount);
        }
        order.updated_at = now;
        Ok(())
    }
}

/// One entry of the PUT /api/orders body
#[derive(Debug, Clone, Deserialize)]
pub struct BulkOrderUpdateItem {
    #[serde(default)]
    pub order_number: String,
    #[serde(flatten)]
    pub patch: OrderPatch,
}

/// One entry of the DELETE /api/orders body
#[derive(Debug, Clone, Deserialize)]
pub struct BulkOrderDeleteItem {
    #[serde(default)]
    pub order_number: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::customer::fixtures::address;
    use crate::models::product::fixtures::product;

    pub fn new_order(customer_id: Uuid, email: &str, skus: &[(&str, u32)]) -> NewOrder {
        NewOrder {
            customer_id,
            customer_email: email.to_string(),
            items: skus
                .iter()
                .map(|(sku, quantity)| NewOrderItem {
                    sku: sku.to_string(),
                    quantity: *quantity,
                })
                .collect(),
            shipping_address: address("Toronto"),
            billing_address: None,
            payment: Payment {
                method: PaymentMethod::CreditCard,
                status: PaymentStatus::Pending,
                transaction_id: String::new(),
            },
            notes: String::new(),
            discount: 0.0,
        }
    }

    /// A pending order with one line of `quantity` x `price`.
    pub fn order(price: f64, quantity: u32) -> Order {
        let item = OrderItem::from_product(&product("ACM-ELE-1", price), quantity);
        new_order(Uuid::new_v4(), "ada@example.com", &[("ACM-ELE-1", quantity)]).into_order(
            vec![item],
            "ada@example.com".to_string(),
            Utc::now(),
        )
    }
}
