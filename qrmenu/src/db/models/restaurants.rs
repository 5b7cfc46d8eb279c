//! Database models for restaurants.

use crate::types::{RestaurantId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a restaurant. The id is chosen by the caller so that the QR
/// code path can be derived before insertion.
#[derive(Debug, Clone)]
pub struct RestaurantCreateDBRequest {
    pub id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub slug: String,
    pub qr_code_url: Option<String>,
}

/// Database request for updating a restaurant. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct RestaurantUpdateDBRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub logo_url: Option<String>,
    pub header_image_url: Option<String>,
}

/// Database response for a restaurant
#[derive(Debug, Clone, FromRow)]
pub struct RestaurantDBResponse {
    pub id: RestaurantId,
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
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RestaurantDBResponse {
    /// Apply an update in place, as the database would
    pub(crate) fn apply(&mut self, update: &RestaurantUpdateDBRequest, now: DateTime<Utc>) {
        fn set(column: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                *column = value.clone();
            }
        }
        fn set_opt(column: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                *column = value.clone();
            }
        }

        set(&mut self.name, &update.name);
        set(&mut self.slug, &update.slug);
        set_opt(&mut self.location, &update.location);
        set_opt(&mut self.contact_email, &update.contact_email);
        set_opt(&mut self.contact_phone, &update.contact_phone);
        set_opt(&mut self.primary_color, &update.primary_color);
        set_opt(&mut self.background_color, &update.background_color);
        set_opt(&mut self.logo_url, &update.logo_url);
        set_opt(&mut self.header_image_url, &update.header_image_url);
        self.updated_at = now;
    }
}

/// A restaurant as listed on the admin surface
#[derive(Debug, Clone, FromRow)]
pub struct RestaurantSummaryDBResponse {
    pub id: RestaurantId,
    pub owner_id: UserId,
    pub owner_email: Option<String>,
    pub name: String,
    pub slug: String,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_count: i64,
}
