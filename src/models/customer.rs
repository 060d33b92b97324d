//! Customer profile model
//!
//! Profiles are plain documents in the store. The password hash is persisted
//! next to the document but never serialized into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AddressError;
use crate::models::FieldError;

pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "fr", "es"];
pub const SUPPORTED_CURRENCIES: [&str; 3] = ["CAD", "USD", "EUR"];
pub const MIN_PASSWORD_LENGTH: usize = 8;

fn check_length(errors: &mut Vec<FieldError>, field: String, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        errors.push(FieldError::new(
            field,
            format!("must be between {} and {} characters", min, max),
            "invalid_length",
        ));
    }
}

fn check_required(errors: &mut Vec<FieldError>, field: String, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "is required", "required"));
    }
}

/// Loose shape check: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

// == Address ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    /// Two-letter province or state code, e.g. `ON`
    pub province: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Address {
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_required(&mut errors, format!("{}street", prefix), &self.street);
        check_required(&mut errors, format!("{}city", prefix), &self.city);
        check_required(&mut errors, format!("{}postal_code", prefix), &self.postal_code);
        check_required(&mut errors, format!("{}country", prefix), &self.country);
        if self.province.chars().count() != 2 {
            errors.push(FieldError::new(
                format!("{}province", prefix),
                "must be a 2-letter code",
                "invalid_length",
            ));
        }
        errors
    }
}

// == Preferences ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub newsletter: bool,
    pub sms_notifications: bool,
    pub email_notifications: bool,
    pub language: String,
    pub currency: String,
    #[serde(default)]
    pub favorite_categories: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            newsletter: true,
            sms_notifications: false,
            email_notifications: true,
            language: "en".to_string(),
            currency: "CAD".to_string(),
            favorite_categories: Vec::new(),
        }
    }
}

impl Preferences {
    pub fn validate(&self, prefix: &str) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !SUPPORTED_LANGUAGES.contains(&self.language.as_str()) {
            errors.push(FieldError::new(
                format!("{}preferences.language", prefix),
                format!("must be one of {}", SUPPORTED_LANGUAGES.join(", ")),
                "invalid_choice",
            ));
        }
        if !SUPPORTED_CURRENCIES.contains(&self.currency.as_str()) {
            errors.push(FieldError::new(
                format!("{}preferences.currency", prefix),
                format!("must be one of {}", SUPPORTED_CURRENCIES.join(", ")),
                "invalid_choice",
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    Deleted,
}

// == Customer ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string; kept out of every serialized form
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub loyalty_points: u32,
    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_verified: bool,
    #[serde(default)]
    pub total_orders: u32,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_order_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The address flagged as default, falling back to the first one.
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|address| address.is_default)
            .or_else(|| self.addresses.first())
    }

    fn clear_default(&mut self) {
        for address in &mut self.addresses {
            address.is_default = false;
        }
    }

    /// Appends an address. The first address, or one flagged default, becomes the only default.
    pub fn add_address(&mut self, mut address: Address) {
        if self.addresses.is_empty() {
            address.is_default = true;
        } else if address.is_default {
            self.clear_default();
        }
        self.addresses.push(address);
        self.updated_at = Utc::now();
    }

    pub fn update_address(&mut self, index: usize, address: Address) -> Result<(), AddressError> {
        if index >= self.addresses.len() {
            return Err(AddressError::NotFound(index));
        }
        if address.is_default {
            self.clear_default();
        }
        self.addresses[index] = address;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Removes an address; the last one cannot go. Removing the default promotes the first remaining one.
    pub fn remove_address(&mut self, index: usize) -> Result<Address, AddressError> {
        if index >= self.addresses.len() {
            return Err(AddressError::NotFound(index));
        }
        if self.addresses.len() == 1 {
            return Err(AddressError::LastAddress);
        }

        let removed = self.addresses.remove(index);
        if removed.is_default {
            self.addresses[0].is_default = true;
        }
        self.updated_at = Utc::now();
        Ok(removed)
    }

    /// Folds a placed order into the running statistics.
    pub fn record_order(&mut self, amount: f64, at: DateTime<Utc>) {
        self.total_orders = self.total_orders.saturating_add(1);
        self.total_spent = crate::models::cart::round_cents(self.total_spent + amount);
        self.last_order_date = Some(at);
        self.updated_at = at;
    }

    pub fn loyalty_tier(&self) -> &'static str {
        match self.loyalty_points {
            10_000.. => "Platinum",
            5_000.. => "Gold",
            1_000.. => "Silver",
            _ => "Bronze",
        }
    }
}

// == New Customer ==
/// Request body for POST /api/customers
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: Address,
}

impl NewCustomer {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "must be a valid email address", "invalid_email"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(FieldError::new(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
                "invalid_length",
            ));
        }
        check_length(&mut errors, "first_name".to_string(), &self.first_name, 2, 50);
        check_length(&mut errors, "last_name".to_string(), &self.last_name, 2, 50);
        check_length(&mut errors, "phone".to_string(), &self.phone, 10, 20);
        errors.extend(self.address.validate("address."));
        errors
    }

    /// Builds an active, unverified profile whose only address is the default.
    pub fn into_customer(self, password_hash: String) -> Customer {
        let now = Utc::now();
        let mut address = self.address;
        address.is_default = true;

        Customer {
            id: Uuid::new_v4(),
            email: self.email.trim().to_lowercase(),
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            addresses: vec![address],
            preferences: Preferences::default(),
            loyalty_points: 0,
            account_status: AccountStatus::Active,
            email_verified: false,
            phone_verified: false,
            total_orders: 0,
            total_spent: 0.0,
            last_order_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// == Customer Patch ==
/// Partial profile update. `email`, `id` and statistics are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomerPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Option<Vec<Address>>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub account_status: Option<AccountStatus>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        *self == CustomerPatch::default()
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(first_name) = &self.first_name {
            check_length(&mut errors, "first_name".to_string(), first_name, 2, 50);
        }
        if let Some(last_name) = &self.last_name {
            check_length(&mut errors, "last_name".to_string(), last_name, 2, 50);
        }
        if let Some(phone) = &self.phone {
            check_length(&mut errors, "phone".to_string(), phone, 10, 20);
        }
        if let Some(addresses) = &self.addresses {
            if addresses.is_empty() {
                errors.push(FieldError::new(
                    "addresses",
                    "Customer must have at least one address",
                    "required",
                ));
            }
            if addresses.iter().filter(|a| a.is_default).count() > 1 {
                errors.push(FieldError::new(
                    "addresses",
                    "At most one address can be the default",
                    "multiple_defaults",
                ));
            }
            for (i, address) in addresses.iter().enumerate() {
                errors.extend(address.validate(&format!("addresses[{}].", i)));
            }
        }
        if let Some(preferences) = &self.preferences {
            errors.extend(preferences.validate(""));
        }
        errors
    }

    pub fn apply_to(&self, customer: &mut Customer) {
        if let Some(first_name) = &self.first_name {
            customer.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            customer.last_name = last_name.clone();
        }
        if let Some(phone) = &self.phone {
            customer.phone = phone.clone();
        }
        if let Some(addresses) = &self.addresses {
            customer.addresses = addresses.clone();
            if !customer.addresses.iter().any(|a| a.is_default) {
                if let Some(first) = customer.addresses.first_mut() {
                    first.is_default = true;
                }
            }
        }
        if let Some(preferences) = &self.preferences {
            customer.preferences = preferences.clone();
        }
        if let Some(status) = self.account_status {
            customer.account_status = status;
        }
        customer.updated_at = Utc::now();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada.example.com"));
        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("ada@@example.com"));
    }

    #[test]
    fn test_new_customer_validation() {
        assert!(fixtures::new_customer("ada@example.com").validate().is_empty());

        let mut req = fixtures::new_customer("nope");
        req.password = "short".to_string();
        req.phone = "123".to_string();
        req.address.province = "Ontario".to_string();
        let fields: Vec<String> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "password", "phone", "address.province"]);
    }

    #[test]
    fn test_into_customer_defaults() {
        let customer = fixtures::new_customer("Ada@Example.com").into_customer("hash".into());
        assert_eq!(customer.email, "ada@example.com");
        assert_eq!(customer.account_status, AccountStatus::Active);
        assert!(customer.addresses[0].is_default);
        assert_eq!(customer.preferences.currency, "CAD");
        assert_eq!(customer.loyalty_tier(), "Bronze");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let customer = fixtures::customer("ada@example.com");
        let json = serde_json::to_value(&customer).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("hash\""));
    }

    #[test]
    fn test_add_default_address_moves_flag() {
        let mut customer = fixtures::customer("ada@example.com");
        let mut office = fixtures::address("Ottawa");
        office.is_default = true;
        customer.add_address(office);

        let defaults: Vec<&str> = customer
            .addresses
            .iter()
            .filter(|a| a.is_default)
            .map(|a| a.city.as_str())
            .collect();
        assert_eq!(defaults, vec!["Ottawa"]);
        assert_eq!(customer.default_address().unwrap().city, "Ottawa");
    }

    #[test]
    fn test_remove_default_promotes_first() {
        let mut customer = fixtures::customer("ada@example.com");
        customer.add_address(fixtures::address("Ottawa"));

        let removed = customer.remove_address(0).unwrap();
        assert_eq!(removed.city, "Toronto");
        assert!(customer.addresses[0].is_default);
        assert_eq!(customer.remove_address(0), Err(AddressError::LastAddress));
        assert_eq!(customer.remove_address(5), Err(AddressError::NotFound(5)));
    }

    #[test]
    fn test_update_address_out_of_range() {
        let mut customer = fixtures::customer("ada@example.com");
        let result = customer.update_address(1, fixtures::address("Ottawa"));
        assert_eq!(result, Err(AddressError::NotFound(1)));
    }

    #[test]
    fn test_patch_rejects_two_defaults() {
        let mut a = fixtures::address("Toronto");
        a.is_default = true;
        let patch = CustomerPatch {
            addresses: Some(vec![a.clone(), a]),
            ..Default::default()
        };
        let codes: Vec<String> = patch.validate().into_iter().map(|e| e.code).collect();
        assert_eq!(codes, vec!["multiple_defaults"]);
    }

    #[test]
    fn test_patch_ignores_email() {
        let patch: CustomerPatch =
            serde_json::from_str(r#"{"email": "evil@example.com", "total_spent": 9}"#).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_record_order_and_tiers() {
        let mut customer = fixtures::customer("ada@example.com");
        customer.record_order(10.005, Utc::now());
        customer.record_order(5.0, Utc::now());
        assert_eq!(customer.total_orders, 2);
        assert_eq!(customer.total_spent, 15.01);
        assert!(customer.last_order_date.is_some());

        customer.loyalty_points = 5_000;
        assert_eq!(customer.loyalty_tier(), "Gold");
        customer.loyalty_points = 10_000;
        assert_eq!(customer.loyalty_tier(), "Platinum");
    }
}
