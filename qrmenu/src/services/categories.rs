//! Category management for owners.

use std::{collections::HashMap, sync::Arc};

use tracing::instrument;

use super::{
    CachedValue, invalidate_restaurant,
    ownership::{owned_category, owned_restaurant},
};
use crate::{
    AppState,
    api::models::{
        categories::{CategoryCreate, CategoryResponse, CategoryUpdate},
        menu_items::MenuItemResponse,
    },
    cache::keys,
    db::models::{
        categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest},
        menu_items::MenuItemDBResponse,
    },
    errors::{Error, Result},
    types::{CategoryId, Operation, RestaurantId, abbrev_uuid},
};

const NAME_TAKEN: &str = "Category with this name already exists in this restaurant";

/// Attach each item to its category, keeping the order storage returned for both
pub(crate) fn with_items(categories: Vec<CategoryDBResponse>, items: Vec<MenuItemDBResponse>) -> Vec<CategoryResponse> {
    let mut by_category: HashMap<CategoryId, Vec<MenuItemResponse>> = HashMap::new();
    for item in items {
        by_category.entry(item.category_id).or_default().push(item.into());
    }

    categories
        .into_iter()
        .map(|category| {
            let items = by_category.remove(&category.id).unwrap_or_default();
            CategoryResponse::new(category, items)
        })
        .collect()
}

pub struct CategoryService<'a> {
    state: &'a AppState,
}

impl<'a> CategoryService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    async fn ensure_name_free(&self, restaurant_id: RestaurantId, name: &str, except: Option<CategoryId>) -> Result<()> {
        let existing = self.state.storage.find_category_by_name(restaurant_id, name).await?;
        if existing.is_some_and(|c| Some(c.id) != except) {
            return Err(Error::Conflict {
                message: NAME_TAKEN.to_string(),
            });
        }
        Ok(())
    }

    /// Categories of a restaurant with their items, both ordered by sort order
    #[instrument(skip_all, fields(restaurant_id = %abbrev_uuid(&restaurant_id)))]
    pub async fn list_by_restaurant(&self, restaurant_id: RestaurantId) -> Result<Arc<Vec<CategoryResponse>>> {
        owned_restaurant(self.state.storage.as_ref(), restaurant_id, Operation::Read).await?;

        let key = keys::restaurant_categories(restaurant_id);
        if let Some(CachedValue::Categories(cached)) = self.state.cache.get(&key).await {
            return Ok(cached);
        }

        let categories = self.state.storage.list_categories(restaurant_id).await?;
        let ids: Vec<CategoryId> = categories.iter().map(|c| c.id).collect();
        let items = self.state.storage.list_menu_items_in(&ids).await?;

        let categories = Arc::new(with_items(categories, items));
        self.state
            .cache
            .set(
                key,
                CachedValue::Categories(categories.clone()),
                Some(self.state.config.cache.owner_data_ttl),
            )
            .await;

        Ok(categories)
    }

    #[instrument(skip_all, fields(category_id = %abbrev_uuid(&id)))]
    pub async fn get(&self, id: CategoryId) -> Result<CategoryResponse> {
        let (category, _) = owned_category(self.state.storage.as_ref(), id, Operation::Read).await?;
        let items = self.state.storage.list_menu_items(id).await?;
        Ok(CategoryResponse::new(category, items.into_iter().map(Into::into).collect()))
    }

    #[instrument(skip_all, fields(restaurant_id = %abbrev_uuid(&request.restaurant_id)))]
    pub async fn create(&self, request: CategoryCreate) -> Result<CategoryResponse> {
        let restaurant = owned_restaurant(self.state.storage.as_ref(), request.restaurant_id, Operation::Update).await?;

        let name = request.name.trim().to_string();
        self.ensure_name_free(restaurant.id, &name, None).await?;

        let category = self
            .state
            .storage
            .create_category(&CategoryCreateDBRequest {
                restaurant_id: restaurant.id,
                name,
                description: request.description,
                sort_order: request.sort_order,
                is_active: request.is_active,
            })
            .await?;

        invalidate_restaurant(&self.state.cache, &restaurant, &[]).await;
        Ok(CategoryResponse::new(category, Vec::new()))
    }

    #[instrument(skip_all, fields(category_id = %abbrev_uuid(&id)))]
    pub async fn update(&self, id: CategoryId, update: CategoryUpdate) -> Result<CategoryResponse> {
        let (before, restaurant) = owned_category(self.state.storage.as_ref(), id, Operation::Update).await?;

        let update = CategoryUpdateDBRequest::from(update);
        if let Some(name) = update.name.as_deref().filter(|name| *name != before.name) {
            self.ensure_name_free(restaurant.id, name, Some(id)).await?;
        }

        let category = self.state.storage.update_category(id, &update).await?;
        let items = self.state.storage.list_menu_items(id).await?;

        invalidate_restaurant(&self.state.cache, &restaurant, &[id]).await;
        Ok(CategoryResponse::new(category, items.into_iter().map(Into::into).collect()))
    }

    /// Removes the category and its items
    #[instrument(skip_all, fields(category_id = %abbrev_uuid(&id)))]
    pub async fn delete(&self, id: CategoryId) -> Result<()> {
        let (_, restaurant) = owned_category(self.state.storage.as_ref(), id, Operation::Delete).await?;

        if !self.state.storage.delete_category(id).await? {
            return Err(Error::not_found("Category", id));
        }

        invalidate_restaurant(&self.state.cache, &restaurant, &[id]).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::tenant::TenantContext,
        db::models::menu_items::MenuItemCreateDBRequest,
        test_utils::{create_test_restaurant, create_test_state, create_test_user, tenant_of},
        types::Role,
    };
    use rust_decimal::Decimal;

    fn create_request(restaurant_id: RestaurantId, name: &str, sort_order: i32) -> CategoryCreate {
        CategoryCreate {
            restaurant_id,
            name: name.to_string(),
            description: None,
            sort_order,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_list_orders_categories_and_nests_items() {
        let state = create_test_state();
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let restaurant = create_test_restaurant(&state, &owner, "ordered").await;

        TenantContext::scope(tenant_of(&owner), async {
            let service = CategoryService::new(&state);
            let desserts = service.create(create_request(restaurant.id, "Desserts", 2)).await.unwrap();
            let starters = service.create(create_request(restaurant.id, "Starters", 0)).await.unwrap();

            for (name, sort_order) in [("Tart", 1), ("Mousse", 0)] {
                state
                    .storage
                    .create_menu_item(&MenuItemCreateDBRequest {
                        category_id: desserts.id,
                        name: name.to_string(),
                        description: None,
                        price: Decimal::new(650, 2),
                        image_url: None,
                        is_available: true,
                        sort_order,
                    })
                    .await
                    .unwrap();
            }

            let listed = service.list_by_restaurant(restaurant.id).await.unwrap();
            let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, ["Starters", "Desserts"]);
            assert_eq!(listed[0].id, starters.id);
            assert!(listed[0].items.is_empty());

            let items: Vec<&str> = listed[1].items.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(items, ["Mousse", "Tart"]);
        })
        .await;
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_within_restaurant_only() {
        let state = create_test_state();
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let first = create_test_restaurant(&state, &owner, "first").await;
        let second = create_test_restaurant(&state, &owner, "second").await;

        TenantContext::scope(tenant_of(&owner), async {
            let service = CategoryService::new(&state);
            service.create(create_request(first.id, "Mains", 0)).await.unwrap();

            let err = service.create(create_request(first.id, " Mains ", 1)).await.unwrap_err();
            assert_eq!(err.user_message(), NAME_TAKEN);

            assert!(service.create(create_request(second.id, "Mains", 0)).await.is_ok());
        })
        .await;
    }

    #[tokio::test]
    async fn test_update_can_keep_its_own_name() {
        let state = create_test_state();
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let restaurant = create_test_restaurant(&state, &owner, "bistro").await;

        TenantContext::scope(tenant_of(&owner), async {
            let service = CategoryService::new(&state);
            let mains = service.create(create_request(restaurant.id, "Mains", 0)).await.unwrap();
            service.create(create_request(restaurant.id, "Sides", 1)).await.unwrap();

            let same = CategoryUpdate {
                name: Some("Mains".to_string()),
                is_active: Some(false),
                ..Default::default()
            };
            let updated = service.update(mains.id, same).await.unwrap();
            assert!(!updated.is_active);

            let clash = CategoryUpdate {
                name: Some("Sides".to_string()),
                ..Default::default()
            };
            assert!(matches!(service.update(mains.id, clash).await.unwrap_err(), Error::Conflict { .. }));
        })
        .await;
    }

    #[tokio::test]
    async fn test_foreign_category_is_forbidden() {
        let state = create_test_state();
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let intruder = create_test_user(&state, "intruder@example.com", Role::Owner).await;
        let restaurant = create_test_restaurant(&state, &owner, "guarded").await;

        let category = TenantContext::scope(tenant_of(&owner), async {
            CategoryService::new(&state)
                .create(create_request(restaurant.id, "Mains", 0))
                .await
                .unwrap()
        })
        .await;

        TenantContext::scope(tenant_of(&intruder), async {
            let service = CategoryService::new(&state);
            for err in [
                service.get(category.id).await.unwrap_err(),
                service.delete(category.id).await.unwrap_err(),
                service.list_by_restaurant(restaurant.id).await.map(|_| ()).unwrap_err(),
                service.create(create_request(restaurant.id, "Sneaky", 0)).await.map(|_| ()).unwrap_err(),
            ] {
                assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
            }
        })
        .await;
    }

    #[tokio::test]
    async fn test_delete_invalidates_cached_list() {
        let state = create_test_state();
        let owner = create_test_user(&state, "owner@example.com", Role::Owner).await;
        let restaurant = create_test_restaurant(&state, &owner, "cached").await;

        TenantContext::scope(tenant_of(&owner), async {
            let service = CategoryService::new(&state);
            let category = service.create(create_request(restaurant.id, "Mains", 0)).await.unwrap();
            assert_eq!(service.list_by_restaurant(restaurant.id).await.unwrap().len(), 1);
            assert!(state.cache.has(&keys::restaurant_categories(restaurant.id)));

            service.delete(category.id).await.unwrap();
            assert!(!state.cache.has(&keys::restaurant_categories(restaurant.id)));
            assert!(service.list_by_restaurant(restaurant.id).await.unwrap().is_empty());

            let err = service.get(category.id).await.unwrap_err();
            assert_eq!(err.user_message(), "Category not found");
        })
        .await;
    }
}
