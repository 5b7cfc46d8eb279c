//! API request/response models for menu categories.

use crate::api::models::{menu_items::MenuItemResponse, rules};
use crate::db::models::categories::{CategoryDBResponse, CategoryUpdateDBRequest};
use crate::types::{CategoryId, RestaurantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreate {
    #[schema(value_type = String, format = "uuid")]
    pub restaurant_id: RestaurantId,
    #[validate(custom(function = "rules::category_name"))]
    #[schema(example = "Starters")]
    pub name: String,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Sort order must be positive"))]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// All fields are optional; only provided fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    #[validate(custom(function = "rules::category_name"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Sort order must be positive"))]
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl From<CategoryUpdate> for CategoryUpdateDBRequest {
    fn from(update: CategoryUpdate) -> Self {
        Self {
            name: update.name.map(|name| name.trim().to_string()),
            description: update.description,
            sort_order: update.sort_order,
            is_active: update.is_active,
        }
    }
}

/// A category with its items, both ordered by `sortOrder`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CategoryId,
    #[schema(value_type = String, format = "uuid")]
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<MenuItemResponse>,
}

impl CategoryResponse {
    pub fn new(db: CategoryDBResponse, items: Vec<MenuItemResponse>) -> Self {
        Self {
            id: db.id,
            restaurant_id: db.restaurant_id,
            name: db.name,
            description: db.description,
            sort_order: db.sort_order,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryBody {
    pub category: CategoryResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryList {
    pub categories: Vec<CategoryResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_defaults() {
        let create: CategoryCreate = serde_json::from_value(json!({
            "restaurantId": uuid::Uuid::new_v4(),
            "name": "Desserts",
        }))
        .unwrap();

        assert_eq!(create.sort_order, 0);
        assert!(create.is_active);
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_negative_sort_order_rejected() {
        let update = CategoryUpdate {
            sort_order: Some(-3),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
