//! Restaurant management for owners.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use super::{CachedValue, invalidate_restaurant, ownership::owned_restaurant};
use crate::{
    AppState,
    activity::{ActivityLevel, RequestMeta},
    api::models::restaurants::{OwnerStats, RestaurantCreate, RestaurantResponse, RestaurantUpdate},
    auth::tenant::TenantContext,
    cache::keys,
    db::models::{
        restaurants::{RestaurantCreateDBRequest, RestaurantDBResponse},
        stats::MonthWindow,
    },
    errors::{Error, Result},
    types::{Operation, RestaurantId, abbrev_uuid},
};

const SLUG_TAKEN: &str = "Restaurant with this slug already exists";

/// Path of the QR code image served for a restaurant
pub fn qr_code_path(id: RestaurantId) -> String {
    format!("/qr-codes/{id}.png")
}

pub struct RestaurantService<'a> {
    state: &'a AppState,
}

impl<'a> RestaurantService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn response(&self, db: RestaurantDBResponse) -> RestaurantResponse {
        let menu_url = self.state.config.public_menu_url(&db.slug);
        RestaurantResponse::new(db, menu_url)
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<RestaurantId>) -> Result<()> {
        let existing = self.state.storage.get_restaurant_by_slug(slug).await?;
        if existing.is_some_and(|r| Some(r.id) != except) {
            return Err(Error::Conflict {
                message: SLUG_TAKEN.to_string(),
            });
        }
        Ok(())
    }

    /// The caller's restaurants, newest first
    #[instrument(skip_all)]
    pub async fn list_mine(&self) -> Result<Arc<Vec<RestaurantResponse>>> {
        let tenant = TenantContext::get_or_fail()?;
        let key = keys::owner_restaurants(tenant.user_id());

        if let Some(CachedValue::Restaurants(cached)) = self.state.cache.get(&key).await {
            return Ok(cached);
        }

        let restaurants: Vec<RestaurantResponse> = self
            .state
            .storage
            .list_restaurants_by_owner(tenant.user_id())
            .await?
            .into_iter()
            .map(|db| self.response(db))
            .collect();

        let restaurants = Arc::new(restaurants);
        self.state
            .cache
            .set(
                key,
                CachedValue::Restaurants(restaurants.clone()),
                Some(self.state.config.cache.owner_data_ttl),
            )
            .await;

        Ok(restaurants)
    }

    #[instrument(skip_all, fields(restaurant_id = %abbrev_uuid(&id)))]
    pub async fn get(&self, id: RestaurantId) -> Result<RestaurantResponse> {
        let restaurant = owned_restaurant(self.state.storage.as_ref(), id, Operation::Read).await?;
        Ok(self.response(restaurant))
    }

    #[instrument(skip_all, fields(slug = %request.slug))]
    pub async fn create(&self, request: RestaurantCreate, meta: &RequestMeta) -> Result<RestaurantResponse> {
        let tenant = TenantContext::get_or_fail()?;
        self.ensure_slug_free(&request.slug, None).await?;

        let id = Uuid::new_v4();
        let restaurant = self
            .state
            .storage
            .create_restaurant(&RestaurantCreateDBRequest {
                id,
                owner_id: tenant.user_id(),
                name: request.name.trim().to_string(),
                slug: request.slug,
                qr_code_url: Some(qr_code_path(id)),
            })
            .await?;

        invalidate_restaurant(&self.state.cache, &restaurant, &[]).await;

        info!(restaurant_id = %abbrev_uuid(&restaurant.id), "Restaurant created");
        self.state.activity.record(
            ActivityLevel::Success,
            "Restaurant Created",
            Some(&tenant.email),
            format!("Created restaurant {} ({})", restaurant.name, restaurant.slug),
            meta,
        );

        Ok(self.response(restaurant))
    }

    #[instrument(skip_all, fields(restaurant_id = %abbrev_uuid(&id)))]
    pub async fn update(&self, id: RestaurantId, update: RestaurantUpdate) -> Result<RestaurantResponse> {
        let before = owned_restaurant(self.state.storage.as_ref(), id, Operation::Update).await?;

        if let Some(slug) = update.slug.as_deref().filter(|slug| *slug != before.slug) {
            self.ensure_slug_free(slug, Some(id)).await?;
        }

        let after = self.state.storage.update_restaurant(id, &update.into()).await?;

        // Both the old and the new slug may have a cached menu
        invalidate_restaurant(&self.state.cache, &before, &[]).await;
        invalidate_restaurant(&self.state.cache, &after, &[]).await;

        Ok(self.response(after))
    }

    /// Removes the restaurant with its categories, items and scans
    #[instrument(skip_all, fields(restaurant_id = %abbrev_uuid(&id)))]
    pub async fn delete(&self, id: RestaurantId, meta: &RequestMeta) -> Result<()> {
        let tenant = TenantContext::get_or_fail()?;
        let restaurant = owned_restaurant(self.state.storage.as_ref(), id, Operation::Delete).await?;
        let categories: Vec<_> = self
            .state
            .storage
            .list_categories(id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        if !self.state.storage.delete_restaurant(id).await? {
            return Err(Error::not_found("Restaurant", id));
        }

        invalidate_restaurant(&self.state.cache, &restaurant, &categories).await;

        info!(restaurant_id = %abbrev_uuid(&id), "Restaurant deleted");
        self.state.activity.record(
            ActivityLevel::Warning,
            "Restaurant Deleted",
            Some(&tenant.email),
            format!("Deleted restaurant {} ({})", restaurant.name, restaurant.slug),
            meta,
        );

        Ok(())
    }

    /// Dashboard counters; scans count only the current calendar month
    #[instrument(skip_all)]
    pub async fn owner_stats(&self) -> Result<OwnerStats> {
        let tenant = TenantContext::get_or_fail()?;
        let window = MonthWindow::current();
        let stats = self
            .state
            .storage
            .owner_stats(tenant.user_id(), window.this_month_start)
            .await?;
        Ok(stats.into())
    }
}
