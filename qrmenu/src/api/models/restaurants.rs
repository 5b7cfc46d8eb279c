//! API request/response models for restaurants.

use crate::api::models::rules;
use crate::db::models::restaurants::{RestaurantDBResponse, RestaurantUpdateDBRequest};
use crate::db::models::stats::OwnerStatsDBResponse;
use crate::types::{RestaurantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RestaurantCreate {
    #[validate(custom(function = "rules::restaurant_name"))]
    #[schema(example = "Chez Nous")]
    pub name: String,
    #[validate(custom(function = "rules::slug"))]
    #[schema(example = "chez-nous")]
    pub slug: String,
}

/// All fields are optional; only provided fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantUpdate {
    #[validate(custom(function = "rules::restaurant_name"))]
    pub name: Option<String>,
    #[validate(custom(function = "rules::slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 255, message = "Location too long"))]
    pub location: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub contact_email: Option<String>,
    #[validate(length(max = 50, message = "Phone number too long"))]
    pub contact_phone: Option<String>,
    #[validate(custom(function = "rules::hex_color"))]
    #[schema(example = "#C0392B")]
    pub primary_color: Option<String>,
    #[validate(custom(function = "rules::hex_color"))]
    pub background_color: Option<String>,
    #[validate(custom(function = "rules::absolute_url"))]
    pub logo_url: Option<String>,
    #[validate(custom(function = "rules::absolute_url"))]
    pub header_image_url: Option<String>,
}

impl From<RestaurantUpdate> for RestaurantUpdateDBRequest {
    fn from(update: RestaurantUpdate) -> Self {
        Self {
            name: update.name.map(|name| name.trim().to_string()),
            slug: update.slug,
            location: update.location,
            contact_email: update.contact_email,
            contact_phone: update.contact_phone,
            primary_color: update.primary_color,
            background_color: update.background_color,
            logo_url: update.logo_url,
            header_image_url: update.header_image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RestaurantId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub name: String,
    pub slug: String,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub logo_url: Option<String>,
    pub header_image_url: Option<String>,
    /// Path of the rendered QR code image
    pub qr_code_url: Option<String>,
    /// Customer-facing URL encoded in the QR code
    pub menu_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RestaurantResponse {
    pub fn new(db: RestaurantDBResponse, menu_url: String) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            name: db.name,
            slug: db.slug,
            location: db.location,
            contact_email: db.contact_email,
            contact_phone: db.contact_phone,
            primary_color: db.primary_color,
            background_color: db.background_color,
            logo_url: db.logo_url,
            header_image_url: db.header_image_url,
            qr_code_url: db.qr_code_url,
            menu_url,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestaurantBody {
    pub restaurant: RestaurantResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestaurantList {
    pub restaurants: Vec<RestaurantResponse>,
}

/// Dashboard counters for the caller's restaurants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStats {
    pub restaurants: i64,
    pub categories: i64,
    pub menu_items: i64,
    /// Scans since the start of the current month
    pub qr_scans: i64,
}

impl From<OwnerStatsDBResponse> for OwnerStats {
    fn from(db: OwnerStatsDBResponse) -> Self {
        Self {
            restaurants: db.restaurants,
            categories: db.categories,
            menu_items: db.menu_items,
            qr_scans: db.qr_scans,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_update_reports_every_failing_field() {
        let update = RestaurantUpdate {
            slug: Some("Bad Slug".to_string()),
            primary_color: Some("red".to_string()),
            contact_email: Some("not-an-email".to_string()),
            logo_url: Some("logo.png".to_string()),
            ..Default::default()
        };

        let Error::Validation { details } = Error::from(update.validate().unwrap_err()) else {
            panic!("expected validation error");
        };
        let messages: Vec<_> = details.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Invalid email",
                "Invalid URL",
                "Invalid color format (use #RRGGBB)",
                "Slug must contain only lowercase letters, numbers, and hyphens",
            ]
        );
    }

    #[test]
    fn test_empty_update_is_valid() {
        assert!(RestaurantUpdate::default().validate().is_ok());
    }
}
