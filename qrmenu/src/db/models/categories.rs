//! Database models for menu categories.

use crate::types::{CategoryId, RestaurantId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CategoryCreateDBRequest {
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

/// `None` leaves a column unchanged
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryDBResponse {
    pub id: CategoryId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryDBResponse {
    pub(crate) fn apply(&mut self, update: &CategoryUpdateDBRequest, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if update.description.is_some() {
            self.description = update.description.clone();
        }
        if let Some(sort_order) = update.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
    }
}
