//! PostgreSQL storage backend.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::Storage;
use crate::{
    db::{
        errors::{DbError, Result},
        models::{
            categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest},
            menu_items::{MenuItemCreateDBRequest, MenuItemDBResponse, MenuItemUpdateDBRequest},
            restaurants::{RestaurantCreateDBRequest, RestaurantDBResponse, RestaurantSummaryDBResponse, RestaurantUpdateDBRequest},
            scans::{ScanCreateDBRequest, ScanDBResponse},
            stats::{MonthWindow, OwnerStatsDBResponse, RestaurantStatsDBResponse, SystemCountsDBResponse},
            users::{UserCreateDBRequest, UserDBResponse, UserSummaryDBResponse},
        },
    },
    types::{CategoryId, MenuItemId, RestaurantId, Role, UserId, abbrev_uuid},
};

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Storage for PostgresStorage {
    #[instrument(skip(self, request), err)]
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, email), err)]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update_user_role(&self, id: UserId, role: Role) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, password_hash), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update_user_password(&self, id: UserId, password_hash: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<UserSummaryDBResponse>> {
        let users = sqlx::query_as::<_, UserSummaryDBResponse>(
            r#"
            SELECT u.id, u.email, u.role, u.created_at, u.updated_at,
                   (SELECT COUNT(*) FROM restaurants r WHERE r.owner_id = u.id) AS restaurant_count
            FROM users u
            ORDER BY u.created_at DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn count_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    async fn create_restaurant(&self, request: &RestaurantCreateDBRequest) -> Result<RestaurantDBResponse> {
        let restaurant = sqlx::query_as::<_, RestaurantDBResponse>(
            r#"
            INSERT INTO restaurants (id, owner_id, name, slug, qr_code_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.owner_id)
        .bind(&request.name)
        .bind(&request.slug)
        .bind(&request.qr_code_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(restaurant)
    }

    #[instrument(skip(self), fields(restaurant_id = %abbrev_uuid(&id)), err)]
    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<RestaurantDBResponse>> {
        let restaurant = sqlx::query_as::<_, RestaurantDBResponse>("SELECT * FROM restaurants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(restaurant)
    }

    #[instrument(skip(self), err)]
    async fn get_restaurant_by_slug(&self, slug: &str) -> Result<Option<RestaurantDBResponse>> {
        let restaurant = sqlx::query_as::<_, RestaurantDBResponse>("SELECT * FROM restaurants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(restaurant)
    }

    #[instrument(skip(self), fields(owner_id = %abbrev_uuid(&owner_id)), err)]
    async fn list_restaurants_by_owner(&self, owner_id: UserId) -> Result<Vec<RestaurantDBResponse>> {
        let restaurants =
            sqlx::query_as::<_, RestaurantDBResponse>("SELECT * FROM restaurants WHERE owner_id = $1 ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(restaurants)
    }

    #[instrument(skip(self, request), fields(restaurant_id = %abbrev_uuid(&id)), err)]
    async fn update_restaurant(&self, id: RestaurantId, request: &RestaurantUpdateDBRequest) -> Result<RestaurantDBResponse> {
        let restaurant = sqlx::query_as::<_, RestaurantDBResponse>(
            r#"
            UPDATE restaurants SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                location = COALESCE($4, location),
                contact_email = COALESCE($5, contact_email),
                contact_phone = COALESCE($6, contact_phone),
                primary_color = COALESCE($7, primary_color),
                background_color = COALESCE($8, background_color),
                logo_url = COALESCE($9, logo_url),
                header_image_url = COALESCE($10, header_image_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.slug)
        .bind(&request.location)
        .bind(&request.contact_email)
        .bind(&request.contact_phone)
        .bind(&request.primary_color)
        .bind(&request.background_color)
        .bind(&request.logo_url)
        .bind(&request.header_image_url)
        .fetch_optional(&self.pool)
        .await?;

        restaurant.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(restaurant_id = %abbrev_uuid(&id)), err)]
    async fn delete_restaurant(&self, id: RestaurantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM restaurants WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn list_restaurant_summaries(&self, skip: i64, limit: i64) -> Result<Vec<RestaurantSummaryDBResponse>> {
        let restaurants = sqlx::query_as::<_, RestaurantSummaryDBResponse>(
            r#"
            SELECT r.id, r.owner_id, u.email AS owner_email, r.name, r.slug, r.qr_code_url,
                   r.created_at, r.updated_at,
                   (SELECT COUNT(*) FROM categories c WHERE c.restaurant_id = r.id) AS category_count
            FROM restaurants r
            LEFT JOIN users u ON u.id = r.owner_id
            ORDER BY r.created_at DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }

    async fn count_restaurants(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM restaurants")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(restaurant_id = %abbrev_uuid(&request.restaurant_id)), err)]
    async fn create_category(&self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse> {
        let category = sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            INSERT INTO categories (id, restaurant_id, name, description, sort_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.restaurant_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.sort_order)
        .bind(request.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryDBResponse>> {
        let category = sqlx::query_as::<_, CategoryDBResponse>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    #[instrument(skip(self), fields(restaurant_id = %abbrev_uuid(&restaurant_id)), err)]
    async fn find_category_by_name(&self, restaurant_id: RestaurantId, name: &str) -> Result<Option<CategoryDBResponse>> {
        let category = sqlx::query_as::<_, CategoryDBResponse>("SELECT * FROM categories WHERE restaurant_id = $1 AND name = $2")
            .bind(restaurant_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    #[instrument(skip(self), fields(restaurant_id = %abbrev_uuid(&restaurant_id)), err)]
    async fn list_categories(&self, restaurant_id: RestaurantId) -> Result<Vec<CategoryDBResponse>> {
        let categories = sqlx::query_as::<_, CategoryDBResponse>(
            "SELECT * FROM categories WHERE restaurant_id = $1 ORDER BY sort_order ASC, created_at ASC",
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    #[instrument(skip(self, request), fields(category_id = %abbrev_uuid(&id)), err)]
    async fn update_category(&self, id: CategoryId, request: &CategoryUpdateDBRequest) -> Result<CategoryDBResponse> {
        let category = sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                sort_order = COALESCE($4, sort_order),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.sort_order)
        .bind(request.is_active)
        .fetch_optional(&self.pool)
        .await?;

        category.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id)), err)]
    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(category_id = %abbrev_uuid(&request.category_id)), err)]
    async fn create_menu_item(&self, request: &MenuItemCreateDBRequest) -> Result<MenuItemDBResponse> {
        let item = sqlx::query_as::<_, MenuItemDBResponse>(
            r#"
            INSERT INTO menu_items (id, category_id, name, description, price, image_url, is_available, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.category_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.image_url)
        .bind(request.is_available)
        .bind(request.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&id)), err)]
    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItemDBResponse>> {
        let item = sqlx::query_as::<_, MenuItemDBResponse>("SELECT * FROM menu_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&category_id)), err)]
    async fn list_menu_items(&self, category_id: CategoryId) -> Result<Vec<MenuItemDBResponse>> {
        let items = sqlx::query_as::<_, MenuItemDBResponse>(
            "SELECT * FROM menu_items WHERE category_id = $1 ORDER BY sort_order ASC, created_at ASC",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    #[instrument(skip(self, category_ids), fields(count = category_ids.len()), err)]
    async fn list_menu_items_in(&self, category_ids: &[CategoryId]) -> Result<Vec<MenuItemDBResponse>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }

        let items = sqlx::query_as::<_, MenuItemDBResponse>(
            "SELECT * FROM menu_items WHERE category_id = ANY($1) ORDER BY sort_order ASC, created_at ASC",
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    #[instrument(skip(self, request), fields(item_id = %abbrev_uuid(&id)), err)]
    async fn update_menu_item(&self, id: MenuItemId, request: &MenuItemUpdateDBRequest) -> Result<MenuItemDBResponse> {
        let item = sqlx::query_as::<_, MenuItemDBResponse>(
            r#"
            UPDATE menu_items SET
                category_id = COALESCE($2, category_id),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                image_url = COALESCE($6, image_url),
                is_available = COALESCE($7, is_available),
                sort_order = COALESCE($8, sort_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.category_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.image_url)
        .bind(request.is_available)
        .bind(request.sort_order)
        .fetch_optional(&self.pool)
        .await?;

        item.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&id)), err)]
    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(restaurant_id = %abbrev_uuid(&request.restaurant_id)), err)]
    async fn record_scan(&self, request: &ScanCreateDBRequest) -> Result<ScanDBResponse> {
        let scan = sqlx::query_as::<_, ScanDBResponse>(
            r#"
            INSERT INTO qr_scans (id, restaurant_id, ip_address, user_agent)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.restaurant_id)
        .bind(&request.ip_address)
        .bind(&request.user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(scan)
    }

    #[instrument(skip(self), fields(owner_id = %abbrev_uuid(&owner_id)), err)]
    async fn owner_stats(&self, owner_id: UserId, scans_since: DateTime<Utc>) -> Result<OwnerStatsDBResponse> {
        let stats = sqlx::query_as::<_, OwnerStatsDBResponse>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM restaurants r WHERE r.owner_id = $1) AS restaurants,
                (SELECT COUNT(*) FROM categories c
                    JOIN restaurants r ON r.id = c.restaurant_id
                    WHERE r.owner_id = $1) AS categories,
                (SELECT COUNT(*) FROM menu_items m
                    JOIN categories c ON c.id = m.category_id
                    JOIN restaurants r ON r.id = c.restaurant_id
                    WHERE r.owner_id = $1) AS menu_items,
                (SELECT COUNT(*) FROM qr_scans s
                    JOIN restaurants r ON r.id = s.restaurant_id
                    WHERE r.owner_id = $1 AND s.scanned_at >= $2) AS qr_scans
            "#,
        )
        .bind(owner_id)
        .bind(scans_since)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    #[instrument(skip(self), err)]
    async fn system_counts(&self, window: &MonthWindow) -> Result<SystemCountsDBResponse> {
        let counts = sqlx::query_as::<_, SystemCountsDBResponse>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM restaurants) AS total_restaurants,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COUNT(*) FROM menu_items) AS total_menu_items,
                (SELECT COUNT(*) FROM qr_scans) AS total_qr_scans,
                (SELECT COUNT(*) FROM categories WHERE is_active) AS active_categories,
                (SELECT COUNT(*) FROM users WHERE created_at >= $1) AS new_users_this_month,
                (SELECT COUNT(*) FROM users WHERE created_at >= $2 AND created_at < $1) AS new_users_last_month,
                (SELECT COUNT(*) FROM qr_scans WHERE scanned_at >= $1) AS qr_scans_this_month,
                (SELECT COUNT(*) FROM qr_scans WHERE scanned_at >= $2 AND scanned_at < $1) AS qr_scans_last_month
            "#,
        )
        .bind(window.this_month_start)
        .bind(window.last_month_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    #[instrument(skip(self), err)]
    async fn restaurant_stats(&self, this_month_start: DateTime<Utc>) -> Result<Vec<RestaurantStatsDBResponse>> {
        let stats = sqlx::query_as::<_, RestaurantStatsDBResponse>(
            r#"
            SELECT r.id, r.name, r.slug, u.email AS owner_email, r.created_at,
                   (SELECT COUNT(*) FROM categories c WHERE c.restaurant_id = r.id) AS total_categories,
                   (SELECT COUNT(*) FROM menu_items m
                       JOIN categories c ON c.id = m.category_id
                       WHERE c.restaurant_id = r.id) AS total_menu_items,
                   (SELECT COUNT(*) FROM qr_scans s WHERE s.restaurant_id = r.id) AS total_scans,
                   (SELECT COUNT(*) FROM qr_scans s
                       WHERE s.restaurant_id = r.id AND s.scanned_at >= $1) AS scans_this_month
            FROM restaurants r
            LEFT JOIN users u ON u.id = r.owner_id
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(this_month_start)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }
}
