//! Platform oversight for administrators. Routes are gated by the role guard, not ownership.

use std::sync::Arc;

use tracing::{info, instrument};

use super::{CachedValue, categories::with_items};
use crate::{
    AppState,
    activity::{ActivityLevel, ActivityLogEntry, RequestMeta},
    api::models::{
        admin::{AdminRestaurantDetail, AdminRestaurantSummary, RestaurantStats, SystemStats},
        pagination::{Paginated, Pagination},
        users::{UserResponse, UserSummaryResponse},
    },
    auth::tenant::TenantContext,
    cache::keys,
    db::models::stats::MonthWindow,
    errors::{Error, Result},
    types::{CategoryId, RestaurantId, Role, UserId, abbrev_uuid},
};

pub struct AdminService<'a> {
    state: &'a AppState,
}

impl<'a> AdminService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    #[instrument(skip_all)]
    pub async fn system_stats(&self) -> Result<Arc<SystemStats>> {
        if let Some(CachedValue::SystemStats(cached)) = self.state.cache.get(keys::ADMIN_STATS).await {
            return Ok(cached);
        }

        let counts = self.state.storage.system_counts(&MonthWindow::current()).await?;
        let stats = Arc::new(SystemStats::from(counts));

        self.state
            .cache
            .set(
                keys::ADMIN_STATS,
                CachedValue::SystemStats(stats.clone()),
                Some(self.state.config.cache.admin_stats_ttl),
            )
            .await;

        Ok(stats)
    }

    #[instrument(skip_all)]
    pub async fn restaurant_stats(&self) -> Result<Vec<RestaurantStats>> {
        let window = MonthWindow::current();
        let stats = self.state.storage.restaurant_stats(window.this_month_start).await?;
        Ok(stats.into_iter().map(Into::into).collect())
    }

    #[instrument(skip_all)]
    pub async fn list_users(&self, pagination: &Pagination) -> Result<Paginated<UserSummaryResponse>> {
        let (skip, limit) = pagination.params();
        let users = self.state.storage.list_users(skip, limit).await?;
        let total = self.state.storage.count_users().await?;

        Ok(Paginated::new(users.into_iter().map(Into::into).collect(), total, skip, limit))
    }

    /// Admins may not demote themselves, so the platform can't lose its last admin by accident
    #[instrument(skip_all, fields(user_id = %abbrev_uuid(&user_id), role = %role))]
    pub async fn update_user_role(&self, user_id: UserId, role: Role, meta: &RequestMeta) -> Result<UserResponse> {
        let tenant = TenantContext::get_or_fail()?;

        let user = self
            .state
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found("User", user_id))?;

        if user.id == tenant.user_id() && role != Role::Admin {
            return Err(Error::BadRequest {
                message: "Cannot remove your own admin role".to_string(),
            });
        }

        let updated = self
            .state
            .storage
            .update_user_role(user_id, role)
            .await?
            .ok_or_else(|| Error::not_found("User", user_id))?;

        info!(from = %user.role, to = %role, "User role changed");
        self.state.activity.record(
            ActivityLevel::Info,
            "User Role Updated",
            Some(&tenant.email),
            format!("Changed role of {} from {} to {}", updated.email, user.role, role),
            meta,
        );

        Ok(updated.into())
    }

    #[instrument(skip_all)]
    pub async fn list_restaurants(&self, pagination: &Pagination) -> Result<Paginated<AdminRestaurantSummary>> {
        let (skip, limit) = pagination.params();
        let restaurants = self.state.storage.list_restaurant_summaries(skip, limit).await?;
        let total = self.state.storage.count_restaurants().await?;

        Ok(Paginated::new(restaurants.into_iter().map(Into::into).collect(), total, skip, limit))
    }

    /// Any restaurant with its owner and full menu, including inactive categories
    #[instrument(skip_all, fields(restaurant_id = %abbrev_uuid(&id)))]
    pub async fn get_restaurant(&self, id: RestaurantId) -> Result<AdminRestaurantDetail> {
        let restaurant = self
            .state
            .storage
            .get_restaurant(id)
            .await?
            .ok_or_else(|| Error::not_found("Restaurant", id))?;
        let owner = self.state.storage.get_user(restaurant.owner_id).await?;

        let categories = self.state.storage.list_categories(id).await?;
        let ids: Vec<CategoryId> = categories.iter().map(|c| c.id).collect();
        let items = self.state.storage.list_menu_items_in(&ids).await?;

        Ok(AdminRestaurantDetail::new(
            restaurant,
            owner.map(|o| o.email),
            with_items(categories, items),
        ))
    }

    pub fn logs(&self, limit: usize) -> Vec<ActivityLogEntry> {
        self.state.activity.recent(limit)
    }
}
