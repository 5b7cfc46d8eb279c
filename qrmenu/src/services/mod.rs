//! Business logic behind the HTTP handlers.
//!
//! Each service borrows the [`AppState`](crate::AppState) for the duration of one request and
//! reads the caller from the task-local [`TenantContext`](crate::auth::tenant::TenantContext).
//! Services own validation beyond field shape, ownership checks, cache reads and cache
//! invalidation. Handlers only translate between HTTP and these calls.

pub mod admin;
pub mod auth;
pub mod categories;
pub mod menu_items;
pub mod ownership;
pub mod public;
pub mod restaurants;

use std::sync::Arc;

use crate::{
    api::models::{
        admin::SystemStats, categories::CategoryResponse, menu_items::MenuItemResponse, public::PublicRestaurant,
        restaurants::RestaurantResponse,
    },
    cache::{TtlCache, keys},
    db::models::restaurants::RestaurantDBResponse,
    types::CategoryId,
};

/// Everything the application keeps in its [`TtlCache`]
#[derive(Debug, Clone)]
pub enum CachedValue {
    PublicMenu(Arc<PublicRestaurant>),
    Restaurants(Arc<Vec<RestaurantResponse>>),
    Categories(Arc<Vec<CategoryResponse>>),
    MenuItems(Arc<Vec<MenuItemResponse>>),
    SystemStats(Arc<SystemStats>),
}

pub type AppCache = TtlCache<CachedValue>;

/// Drop every cached view that shows `restaurant` or anything inside it.
///
/// `categories` lists the categories whose item lists changed.
pub(crate) async fn invalidate_restaurant(cache: &AppCache, restaurant: &RestaurantDBResponse, categories: &[CategoryId]) {
    cache.delete(&keys::public_menu(&restaurant.slug)).await;
    cache.delete(&keys::restaurant_categories(restaurant.id)).await;
    cache.delete_by_pattern(&keys::owner_prefix(restaurant.owner_id)).await;
    cache.delete(keys::ADMIN_STATS).await;

    for category_id in categories {
        cache.delete(&keys::category_items(*category_id)).await;
    }
}
