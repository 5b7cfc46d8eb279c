//! Storage backends.
//!
//! [`Storage`] is the data access seam of the application. Services only ever see an
//! `Arc<dyn Storage>`, so the backend is chosen once at startup from `database.type`:
//!
//! - [`PostgresStorage`]: PostgreSQL via `sqlx`, schema managed by [`crate::migrator`]
//! - [`InMemoryStorage`]: process-local maps, for tests and throwaway deployments
//!
//! Both backends enforce the same uniqueness rules (user email, restaurant slug, category name
//! within a restaurant) and report violations as [`DbError::UniqueViolation`](crate::db::errors::DbError).
//! Both cascade deletes: restaurant -> categories -> menu items, and restaurant -> scans.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStorage;
pub use postgres::PostgresStorage;

use chrono::{DateTime, Utc};

use crate::{
    db::{
        errors::Result,
        models::{
            categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest},
            menu_items::{MenuItemCreateDBRequest, MenuItemDBResponse, MenuItemUpdateDBRequest},
            restaurants::{RestaurantCreateDBRequest, RestaurantDBResponse, RestaurantSummaryDBResponse, RestaurantUpdateDBRequest},
            scans::{ScanCreateDBRequest, ScanDBResponse},
            stats::{MonthWindow, OwnerStatsDBResponse, RestaurantStatsDBResponse, SystemCountsDBResponse},
            users::{UserCreateDBRequest, UserDBResponse, UserSummaryDBResponse},
        },
    },
    types::{CategoryId, MenuItemId, RestaurantId, Role, UserId},
};

#[async_trait::async_trait]
pub trait Storage: Send + Sync + 'static {
    // Users

    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    /// `email` must already be normalized
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;

    async fn update_user_role(&self, id: UserId, role: Role) -> Result<Option<UserDBResponse>>;

    async fn update_user_password(&self, id: UserId, password_hash: &str) -> Result<Option<UserDBResponse>>;

    /// Newest first
    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<UserSummaryDBResponse>>;

    async fn count_users(&self) -> Result<i64>;

    // Restaurants

    async fn create_restaurant(&self, request: &RestaurantCreateDBRequest) -> Result<RestaurantDBResponse>;

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<RestaurantDBResponse>>;

    async fn get_restaurant_by_slug(&self, slug: &str) -> Result<Option<RestaurantDBResponse>>;

    /// Newest first
    async fn list_restaurants_by_owner(&self, owner_id: UserId) -> Result<Vec<RestaurantDBResponse>>;

    /// Fails with `NotFound` if the restaurant doesn't exist
    async fn update_restaurant(&self, id: RestaurantId, request: &RestaurantUpdateDBRequest) -> Result<RestaurantDBResponse>;

    /// Returns whether a restaurant was deleted
    async fn delete_restaurant(&self, id: RestaurantId) -> Result<bool>;

    /// Newest first, with owner email and category count
    async fn list_restaurant_summaries(&self, skip: i64, limit: i64) -> Result<Vec<RestaurantSummaryDBResponse>>;

    async fn count_restaurants(&self) -> Result<i64>;

    // Categories

    async fn create_category(&self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryDBResponse>>;

    /// Exact name match within one restaurant
    async fn find_category_by_name(&self, restaurant_id: RestaurantId, name: &str) -> Result<Option<CategoryDBResponse>>;

    /// Ordered by `sort_order`, then creation time
    async fn list_categories(&self, restaurant_id: RestaurantId) -> Result<Vec<CategoryDBResponse>>;

    async fn update_category(&self, id: CategoryId, request: &CategoryUpdateDBRequest) -> Result<CategoryDBResponse>;

    async fn delete_category(&self, id: CategoryId) -> Result<bool>;

    // Menu items

    async fn create_menu_item(&self, request: &MenuItemCreateDBRequest) -> Result<MenuItemDBResponse>;

    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItemDBResponse>>;

    /// Ordered by `sort_order`, then creation time
    async fn list_menu_items(&self, category_id: CategoryId) -> Result<Vec<MenuItemDBResponse>>;

    /// Items of several categories at once, ordered by `sort_order`, then creation time
    async fn list_menu_items_in(&self, category_ids: &[CategoryId]) -> Result<Vec<MenuItemDBResponse>>;

    async fn update_menu_item(&self, id: MenuItemId, request: &MenuItemUpdateDBRequest) -> Result<MenuItemDBResponse>;

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool>;

    // Scans

    async fn record_scan(&self, request: &ScanCreateDBRequest) -> Result<ScanDBResponse>;

    // Statistics

    /// Counts across everything `owner_id` owns; scans only since `scans_since`
    async fn owner_stats(&self, owner_id: UserId, scans_since: DateTime<Utc>) -> Result<OwnerStatsDBResponse>;

    async fn system_counts(&self, window: &MonthWindow) -> Result<SystemCountsDBResponse>;

    /// One row per restaurant, newest first
    async fn restaurant_stats(&self, this_month_start: DateTime<Utc>) -> Result<Vec<RestaurantStatsDBResponse>>;
}
