//! Ownership checks for the owner-facing resources.
//!
//! Every check resolves the whole chain (item -> category -> restaurant) before comparing owners,
//! so a missing resource is always reported as 404, even to a caller who wouldn't own it.

use crate::{
    auth::tenant::TenantContext,
    db::{
        handlers::Storage,
        models::{categories::CategoryDBResponse, menu_items::MenuItemDBResponse, restaurants::RestaurantDBResponse},
    },
    errors::{Error, Result},
    types::{CategoryId, MenuItemId, Operation, RestaurantId},
};

fn ensure_owner(restaurant: &RestaurantDBResponse, tenant: &TenantContext, action: Operation, resource: &str) -> Result<()> {
    if restaurant.owner_id == tenant.user_id() {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            action,
            resource: resource.to_string(),
        })
    }
}

/// Load a restaurant owned by the current tenant
pub async fn owned_restaurant(storage: &dyn Storage, id: RestaurantId, action: Operation) -> Result<RestaurantDBResponse> {
    let tenant = TenantContext::get_or_fail()?;
    let restaurant = storage
        .get_restaurant(id)
        .await?
        .ok_or_else(|| Error::not_found("Restaurant", id))?;

    ensure_owner(&restaurant, &tenant, action, "this restaurant")?;
    Ok(restaurant)
}

/// Load a category whose restaurant is owned by the current tenant
pub async fn owned_category(
    storage: &dyn Storage,
    id: CategoryId,
    action: Operation,
) -> Result<(CategoryDBResponse, RestaurantDBResponse)> {
    let tenant = TenantContext::get_or_fail()?;
    let category = storage
        .get_category(id)
        .await?
        .ok_or_else(|| Error::not_found("Category", id))?;
    let restaurant = storage
        .get_restaurant(category.restaurant_id)
        .await?
        .ok_or_else(|| Error::not_found("Restaurant", category.restaurant_id))?;

    ensure_owner(&restaurant, &tenant, action, "this category")?;
    Ok((category, restaurant))
}

/// Load a menu item whose category's restaurant is owned by the current tenant
pub async fn owned_menu_item(
    storage: &dyn Storage,
    id: MenuItemId,
    action: Operation,
) -> Result<(MenuItemDBResponse, RestaurantDBResponse)> {
    let tenant = TenantContext::get_or_fail()?;
    let item = storage
        .get_menu_item(id)
        .await?
        .ok_or_else(|| Error::not_found("Menu item", id))?;
    let category = storage
        .get_category(item.category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", item.category_id))?;
    let restaurant = storage
        .get_restaurant(category.restaurant_id)
        .await?
        .ok_or_else(|| Error::not_found("Restaurant", category.restaurant_id))?;

    ensure_owner(&restaurant, &tenant, action, "this menu item")?;
    Ok((item, restaurant))
}
