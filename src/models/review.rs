//! Product review model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FieldError, Ratings};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

fn check_rating(errors: &mut Vec<FieldError>, rating: u8) {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        errors.push(FieldError::new(
            "rating",
            format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING),
            "invalid_rating",
        ));
    }
}

fn check_title(errors: &mut Vec<FieldError>, title: &str) {
    let len = title.chars().count();
    if !(2..=200).contains(&len) {
        errors.push(FieldError::new(
            "title",
            "must be between 2 and 200 characters",
            "invalid_length",
        ));
    }
}

fn check_comment(errors: &mut Vec<FieldError>, comment: &str) {
    if comment.chars().count() > 2000 {
        errors.push(FieldError::new(
            "comment",
            "must be at most 2000 characters",
            "invalid_length",
        ));
    }
}

// == Review ==
/// A customer's review of a product. One per customer and product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub product_sku: String,
    pub customer_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub rating: u8,
    pub title: String,
    #[serde(default)]
    pub comment: String,
    /// Set when the review cites an order of the customer that contains the product
    #[serde(default)]
    pub verified_purchase: bool,
    #[serde(default)]
    pub helpful_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn is_positive(&self) -> bool {
        self.rating >= 4
    }

    pub fn is_negative(&self) -> bool {
        self.rating <= 2
    }
}

/// Average rounded to one decimal place, over every review of a product.
pub fn ratings_for<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Ratings {
    let (sum, count) = reviews
        .into_iter()
        .fold((0u64, 0u32), |(sum, count), review| {
            (sum + u64::from(review.rating), count.saturating_add(1))
        });

    if count == 0 {
        return Ratings::default();
    }
    let average = sum as f64 / f64::from(count);
    Ratings {
        average: (average * 10.0).round() / 10.0,
        count,
    }
}

// == New Review ==
/// Request body for POST /api/products/:sku/reviews
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub customer_id: Uuid,
    #[serde(default)]
    pub order_number: Option<String>,
    pub rating: u8,
    pub title: String,
    #[serde(default)]
    pub comment: String,
}

impl NewReview {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_rating(&mut errors, self.rating);
        check_title(&mut errors, &self.title);
        check_comment(&mut errors, &self.comment);
        errors
    }

    pub fn into_review(self, product_sku: &str, verified_purchase: bool) -> Review {
        let now = Utc::now();
        Review {
            id: Uuid::new_v4(),
            product_sku: product_sku.to_string(),
            customer_id: self.customer_id,
            order_number: self.order_number,
            rating: self.rating,
            title: self.title,
            comment: self.comment,
            verified_purchase,
            helpful_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

// == Review Patch ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewPatch {
    pub fn is_empty(&self) -> bool {
        *self == ReviewPatch::default()
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(rating) = self.rating {
            check_rating(&mut errors, rating);
        }
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        if let Some(comment) = &self.comment {
            check_comment(&mut errors, comment);
        }
        errors
    }

    pub fn apply_to(&self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(title) = &self.title {
            review.title = title.clone();
        }
        if let Some(comment) = &self.comment {
            review.comment = comment.clone();
        }
        review.updated_at = Utc::now();
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn new_review(customer_id: Uuid, rating: u8) -> NewReview {
        NewReview {
            customer_id,
            order_number: None,
            rating,
            title: "Solid purchase".to_string(),
            comment: "Does what it says.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_bounds() {
        assert!(fixtures::new_review(Uuid::new_v4(), 5).validate().is_empty());

        let mut req = fixtures::new_review(Uuid::new_v4(), 0);
        req.title = "x".to_string();
        req.comment = "c".repeat(2001);
        let codes: Vec<String> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(codes, vec!["rating", "title", "comment"]);

        assert_eq!(fixtures::new_review(Uuid::new_v4(), 6).validate().len(), 1);
    }

    #[test]
    fn test_ratings_average() {
        let customer = Uuid::new_v4();
        let reviews: Vec<Review> = [5, 4, 4]
            .into_iter()
            .map(|rating| fixtures::new_review(customer, rating).into_review("A-1", false))
            .collect();

        let ratings = ratings_for(&reviews);
        assert_eq!(ratings.count, 3);
        assert_eq!(ratings.average, 4.3);
        assert_eq!(ratings_for(&[]), Ratings::default());
    }

    #[test]
    fn test_patch_limited_to_content() {
        let patch: ReviewPatch =
            serde_json::from_str(r#"{"rating": 2, "helpful_count": 99, "customer_id": "x"}"#).unwrap();
        let mut review = fixtures::new_review(Uuid::new_v4(), 5).into_review("A-1", true);
        patch.apply_to(&mut review);

        assert_eq!(review.rating, 2);
        assert_eq!(review.helpful_count, 0);
        assert!(review.is_negative());
        assert!(review.verified_purchase);
    }
}
