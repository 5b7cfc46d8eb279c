//! Database models for menu items.

use crate::types::{CategoryId, MenuItemId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct MenuItemCreateDBRequest {
    pub category_id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub sort_order: i32,
}

/// `None` leaves a column unchanged
#[derive(Debug, Clone, Default)]
pub struct MenuItemUpdateDBRequest {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, FromRow)]
pub struct MenuItemDBResponse {
    pub id: MenuItemId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItemDBResponse {
    pub(crate) fn apply(&mut self, update: &MenuItemUpdateDBRequest, now: DateTime<Utc>) {
        if let Some(category_id) = update.category_id {
            self.category_id = category_id;
        }
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if update.description.is_some() {
            self.description = update.description.clone();
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if update.image_url.is_some() {
            self.image_url = update.image_url.clone();
        }
        if let Some(is_available) = update.is_available {
            self.is_available = is_available;
        }
        if let Some(sort_order) = update.sort_order {
            self.sort_order = sort_order;
        }
        self.updated_at = now;
    }
}
