//! The anonymous menu page reached by scanning a QR code.

use std::sync::Arc;

use tracing::{instrument, warn};

use super::{CachedValue, categories::with_items};
use crate::{
    AppState,
    activity::RequestMeta,
    api::models::{public::PublicRestaurant, rules},
    cache::keys,
    db::models::scans::ScanCreateDBRequest,
    errors::{Error, FieldError, Result},
    types::{CategoryId, RestaurantId},
};

pub struct PublicMenuService<'a> {
    state: &'a AppState,
}

impl<'a> PublicMenuService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Active categories with their available items. Every call counts as a scan, cached or not.
    #[instrument(skip_all, fields(slug = %slug))]
    pub async fn menu_by_slug(&self, slug: &str, client: &RequestMeta) -> Result<Arc<PublicRestaurant>> {
        rules::slug(slug).map_err(|e| Error::Validation {
            details: vec![FieldError::new(
                "slug",
                e.message.map(|m| m.to_string()).unwrap_or_else(|| "Invalid slug".to_string()),
            )],
        })?;

        let key = keys::public_menu(slug);
        let menu = match self.state.cache.get(&key).await {
            Some(CachedValue::PublicMenu(menu)) => menu,
            _ => {
                let menu = Arc::new(self.load(slug).await?);
                self.state
                    .cache
                    .set(
                        key,
                        CachedValue::PublicMenu(menu.clone()),
                        Some(self.state.config.cache.public_menu_ttl),
                    )
                    .await;
                menu
            }
        };

        self.record_scan(menu.id, client).await;
        Ok(menu)
    }

    async fn load(&self, slug: &str) -> Result<PublicRestaurant> {
        let restaurant = self
            .state
            .storage
            .get_restaurant_by_slug(slug)
            .await?
            .ok_or_else(|| Error::not_found("Restaurant", slug))?;

        let categories: Vec<_> = self
            .state
            .storage
            .list_categories(restaurant.id)
            .await?
            .into_iter()
            .filter(|c| c.is_active)
            .collect();
        let ids: Vec<CategoryId> = categories.iter().map(|c| c.id).collect();
        let items = self
            .state
            .storage
            .list_menu_items_in(&ids)
            .await?
            .into_iter()
            .filter(|i| i.is_available)
            .collect();

        let menu_url = self.state.config.public_menu_url(&restaurant.slug);
        Ok(PublicRestaurant::new(restaurant, menu_url, with_items(categories, items)))
    }

    /// A lost scan never fails the page
    async fn record_scan(&self, restaurant_id: RestaurantId, client: &RequestMeta) {
        let scan = ScanCreateDBRequest {
            restaurant_id,
            ip_address: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        };

        if let Err(e) = self.state.storage.record_scan(&scan).await {
            warn!(error = %e, "Failed to record QR scan");
        }
    }
}
