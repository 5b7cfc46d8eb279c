//! Menu item management for owners.

use std::sync::Arc;

use tracing::instrument;

use super::{
    CachedValue, invalidate_restaurant,
    ownership::{owned_category, owned_menu_item},
};
use crate::{
    AppState,
    api::models::menu_items::{MenuItemCreate, MenuItemResponse, MenuItemUpdate},
    cache::keys,
    db::models::menu_items::{MenuItemCreateDBRequest, MenuItemUpdateDBRequest},
    errors::{Error, Result},
    types::{CategoryId, MenuItemId, Operation, abbrev_uuid},
};

pub struct MenuItemService<'a> {
    state: &'a AppState,
}

impl<'a> MenuItemService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    #[instrument(skip_all, fields(category_id = %abbrev_uuid(&category_id)))]
    pub async fn list_by_category(&self, category_id: CategoryId) -> Result<Arc<Vec<MenuItemResponse>>> {
        owned_category(self.state.storage.as_ref(), category_id, Operation::Read).await?;

        let key = keys::category_items(category_id);
        if let Some(CachedValue::MenuItems(cached)) = self.state.cache.get(&key).await {
            return Ok(cached);
        }

        let items: Vec<MenuItemResponse> = self
            .state
            .storage
            .list_menu_items(category_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        let items = Arc::new(items);
        self.state
            .cache
            .set(
                key,
                CachedValue::MenuItems(items.clone()),
                Some(self.state.config.cache.owner_data_ttl),
            )
            .await;

        Ok(items)
    }

    #[instrument(skip_all, fields(item_id = %abbrev_uuid(&id)))]
    pub async fn get(&self, id: MenuItemId) -> Result<MenuItemResponse> {
        let (item, _) = owned_menu_item(self.state.storage.as_ref(), id, Operation::Read).await?;
        Ok(item.into())
    }

    #[instrument(skip_all, fields(category_id = %abbrev_uuid(&request.category_id)))]
    pub async fn create(&self, request: MenuItemCreate) -> Result<MenuItemResponse> {
        let (category, restaurant) = owned_category(self.state.storage.as_ref(), request.category_id, Operation::Update).await?;

        let item = self
            .state
            .storage
            .create_menu_item(&MenuItemCreateDBRequest {
                category_id: category.id,
                name: request.name.trim().to_string(),
                description: request.description,
                price: request.price.round_dp(2),
                image_url: request.image_url,
                is_available: request.is_available,
                sort_order: request.sort_order,
            })
            .await?;

        invalidate_restaurant(&self.state.cache, &restaurant, &[category.id]).await;
        Ok(item.into())
    }

    /// Moving the item to another category requires owning that category too
    #[instrument(skip_all, fields(item_id = %abbrev_uuid(&id)))]
    pub async fn update(&self, id: MenuItemId, update: MenuItemUpdate) -> Result<MenuItemResponse> {
        let (before, restaurant) = owned_menu_item(self.state.storage.as_ref(), id, Operation::Update).await?;

        let update = MenuItemUpdateDBRequest::from(update);
        let target = match update.category_id.filter(|target| *target != before.category_id) {
            Some(target) => Some(owned_category(self.state.storage.as_ref(), target, Operation::Update).await?),
            None => None,
        };

        let item = self.state.storage.update_menu_item(id, &update).await?;

        invalidate_restaurant(&self.state.cache, &restaurant, &[before.category_id, item.category_id]).await;
        if let Some((_, target_restaurant)) = target.filter(|(_, r)| r.id != restaurant.id) {
            invalidate_restaurant(&self.state.cache, &target_restaurant, &[item.category_id]).await;
        }

        Ok(item.into())
    }

    #[instrument(skip_all, fields(item_id = %abbrev_uuid(&id)))]
    pub async fn delete(&self, id: MenuItemId) -> Result<()> {
        let (item, restaurant) = owned_menu_item(self.state.storage.as_ref(), id, Operation::Delete).await?;

        if !self.state.storage.delete_menu_item(id).await? {
            return Err(Error::not_found("Menu item", id));
        }

        invalidate_restaurant(&self.state.cache, &restaurant, &[item.category_id]).await;
        Ok(())
    }
}
