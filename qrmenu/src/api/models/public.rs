//! Response model for the anonymous menu page.

use crate::api::models::categories::CategoryResponse;
use crate::db::models::restaurants::RestaurantDBResponse;
use crate::types::RestaurantId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What a customer sees after scanning a QR code. Only active categories and available items
/// are included; the owner is never exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicRestaurant {
    #[schema(value_type = String, format = "uuid")]
    pub id: RestaurantId,
    pub name: String,
    pub slug: String,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub logo_url: Option<String>,
    pub header_image_url: Option<String>,
    pub menu_url: String,
    pub categories: Vec<CategoryResponse>,
}

impl PublicRestaurant {
    pub fn new(db: RestaurantDBResponse, menu_url: String, categories: Vec<CategoryResponse>) -> Self {
        Self {
            id: db.id,
            name: db.name,
            slug: db.slug,
            location: db.location,
            contact_email: db.contact_email,
            contact_phone: db.contact_phone,
            primary_color: db.primary_color,
            background_color: db.background_color,
            logo_url: db.logo_url,
            header_image_url: db.header_image_url,
            menu_url,
            categories,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicMenuResponse {
    pub restaurant: PublicRestaurant,
}
