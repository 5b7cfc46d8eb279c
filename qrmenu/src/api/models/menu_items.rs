//! API request/response models for menu items.

use crate::api::models::rules;
use crate::db::models::menu_items::{MenuItemDBResponse, MenuItemUpdateDBRequest};
use crate::types::{CategoryId, MenuItemId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemCreate {
    #[schema(value_type = String, format = "uuid")]
    pub category_id: CategoryId,
    #[validate(custom(function = "rules::item_name"))]
    #[schema(example = "Steak frites")]
    pub name: String,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = "rules::non_negative_price"))]
    #[schema(value_type = f64, example = 18.5)]
    pub price: Decimal,
    #[validate(custom(function = "rules::url_or_empty"))]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    #[validate(range(min = 0, message = "Sort order must be positive"))]
    pub sort_order: i32,
}

/// All fields are optional; only provided fields are updated. Setting `categoryId` moves the item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    #[validate(custom(function = "rules::item_name"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom(function = "rules::non_negative_price"))]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(custom(function = "rules::url_or_empty"))]
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    #[validate(range(min = 0, message = "Sort order must be positive"))]
    pub sort_order: Option<i32>,
}

impl From<MenuItemUpdate> for MenuItemUpdateDBRequest {
    fn from(update: MenuItemUpdate) -> Self {
        Self {
            category_id: update.category_id,
            name: update.name.map(|name| name.trim().to_string()),
            description: update.description,
            price: update.price.map(|price| price.round_dp(2)),
            image_url: update.image_url,
            is_available: update.is_available,
            sort_order: update.sort_order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MenuItemId,
    #[schema(value_type = String, format = "uuid")]
    pub category_id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MenuItemDBResponse> for MenuItemResponse {
    fn from(db: MenuItemDBResponse) -> Self {
        Self {
            id: db.id,
            category_id: db.category_id,
            name: db.name,
            description: db.description,
            price: db.price,
            image_url: db.image_url,
            is_available: db.is_available,
            sort_order: db.sort_order,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemBody {
    pub menu_item: MenuItemResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemList {
    pub menu_items: Vec<MenuItemResponse>,
}
