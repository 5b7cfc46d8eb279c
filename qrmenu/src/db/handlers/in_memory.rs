//! Process-local storage backend.
//!
//! All tables live behind one lock so that uniqueness checks and the insert that follows them are
//! atomic, the same guarantee a unique index gives the Postgres backend. Rows carry an insertion
//! sequence number that breaks ordering ties the way a serial column would.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
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
    types::{CategoryId, MenuItemId, RestaurantId, Role, ScanId, UserId},
};

#[derive(Debug, Clone)]
struct Stored<T> {
    seq: u64,
    row: T,
}

#[derive(Debug, Default)]
struct Tables {
    next_seq: u64,
    users: HashMap<UserId, Stored<UserDBResponse>>,
    restaurants: HashMap<RestaurantId, Stored<RestaurantDBResponse>>,
    categories: HashMap<CategoryId, Stored<CategoryDBResponse>>,
    menu_items: HashMap<MenuItemId, Stored<MenuItemDBResponse>>,
    scans: HashMap<ScanId, Stored<ScanDBResponse>>,
}

fn foreign_key(table: &str, constraint: &str) -> DbError {
    DbError::ForeignKeyViolation {
        constraint: Some(constraint.to_string()),
        table: Some(table.to_string()),
        message: format!("insert or update on table \"{table}\" violates foreign key constraint \"{constraint}\""),
    }
}

fn check(table: &str, constraint: &str) -> DbError {
    DbError::CheckViolation {
        constraint: Some(constraint.to_string()),
        table: Some(table.to_string()),
        message: format!("new row for relation \"{table}\" violates check constraint \"{constraint}\""),
    }
}

fn check_sort_order(table: &str, sort_order: i32) -> Result<()> {
    if sort_order < 0 {
        return Err(check(table, &format!("{table}_sort_order_check")));
    }
    Ok(())
}

fn check_price(price: Decimal) -> Result<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(check("menu_items", "menu_items_price_check"));
    }
    Ok(())
}

/// Sorts by `sort_order`, then creation time, then insertion order
fn by_position<T, F>(rows: &mut [&Stored<T>], key: F)
where
    F: Fn(&T) -> (i32, DateTime<Utc>),
{
    rows.sort_by(|a, b| key(&a.row).cmp(&key(&b.row)).then(a.seq.cmp(&b.seq)));
}

/// Sorts newest first
fn newest_first<T, F>(rows: &mut [&Stored<T>], created_at: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by(|a, b| created_at(&b.row).cmp(&created_at(&a.row)).then(b.seq.cmp(&a.seq)));
}

fn page<T>(rows: Vec<T>, skip: i64, limit: i64) -> Vec<T> {
    let skip = usize::try_from(skip.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(limit).collect()
}

impl Tables {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn category_ids_of(&self, restaurant_id: RestaurantId) -> Vec<CategoryId> {
        self.categories
            .values()
            .filter(|c| c.row.restaurant_id == restaurant_id)
            .map(|c| c.row.id)
            .collect()
    }

    fn count_items_in(&self, category_ids: &[CategoryId]) -> i64 {
        self.menu_items
            .values()
            .filter(|item| category_ids.contains(&item.row.category_id))
            .count() as i64
    }

    fn count_scans<F: Fn(&ScanDBResponse) -> bool>(&self, predicate: F) -> i64 {
        self.scans.values().filter(|scan| predicate(&scan.row)).count() as i64
    }

    fn slug_taken(&self, slug: &str, except: Option<RestaurantId>) -> bool {
        self.restaurants
            .values()
            .any(|r| r.row.slug == slug && Some(r.row.id) != except)
    }

    fn category_name_taken(&self, restaurant_id: RestaurantId, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| c.row.restaurant_id == restaurant_id && c.row.name == name && Some(c.row.id) != except)
    }
}

/// Storage backed by in-process hash maps
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Storage for InMemoryStorage {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.row.email == request.email) {
            return Err(DbError::unique("users", "users_email_key", request.email.clone()));
        }

        let now = Utc::now();
        let user = UserDBResponse {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            role: request.role,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.seq();
        tables.users.insert(user.id, Stored { seq, row: user.clone() });
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        Ok(self.tables.read().users.get(&id).map(|u| u.row.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.users.values().find(|u| u.row.email == email).map(|u| u.row.clone()))
    }

    async fn update_user_role(&self, id: UserId, role: Role) -> Result<Option<UserDBResponse>> {
        let mut tables = self.tables.write();
        Ok(tables.users.get_mut(&id).map(|user| {
            user.row.role = role;
            user.row.updated_at = Utc::now();
            user.row.clone()
        }))
    }

    async fn update_user_password(&self, id: UserId, password_hash: &str) -> Result<Option<UserDBResponse>> {
        let mut tables = self.tables.write();
        Ok(tables.users.get_mut(&id).map(|user| {
            user.row.password_hash = password_hash.to_string();
            user.row.updated_at = Utc::now();
            user.row.clone()
        }))
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<UserSummaryDBResponse>> {
        let tables = self.tables.read();
        let mut users: Vec<_> = tables.users.values().collect();
        newest_first(&mut users, |u| u.created_at);

        let summaries = users
            .into_iter()
            .map(|u| UserSummaryDBResponse {
                id: u.row.id,
                email: u.row.email.clone(),
                role: u.row.role,
                created_at: u.row.created_at,
                updated_at: u.row.updated_at,
                restaurant_count: tables.restaurants.values().filter(|r| r.row.owner_id == u.row.id).count() as i64,
            })
            .collect();
        Ok(page(summaries, skip, limit))
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(self.tables.read().users.len() as i64)
    }

    async fn create_restaurant(&self, request: &RestaurantCreateDBRequest) -> Result<RestaurantDBResponse> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&request.owner_id) {
            return Err(foreign_key("restaurants", "restaurants_owner_id_fkey"));
        }
        if tables.slug_taken(&request.slug, None) {
            return Err(DbError::unique("restaurants", "restaurants_slug_key", request.slug.clone()));
        }

        let now = Utc::now();
        let restaurant = RestaurantDBResponse {
            id: request.id,
            owner_id: request.owner_id,
            name: request.name.clone(),
            slug: request.slug.clone(),
            location: None,
            contact_email: None,
            contact_phone: None,
            primary_color: None,
            background_color: None,
            logo_url: None,
            header_image_url: None,
            qr_code_url: request.qr_code_url.clone(),
            created_at: now,
            updated_at: now,
        };
        let seq = tables.seq();
        tables.restaurants.insert(restaurant.id, Stored { seq, row: restaurant.clone() });
        Ok(restaurant)
    }

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<RestaurantDBResponse>> {
        Ok(self.tables.read().restaurants.get(&id).map(|r| r.row.clone()))
    }

    async fn get_restaurant_by_slug(&self, slug: &str) -> Result<Option<RestaurantDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.restaurants.values().find(|r| r.row.slug == slug).map(|r| r.row.clone()))
    }

    async fn list_restaurants_by_owner(&self, owner_id: UserId) -> Result<Vec<RestaurantDBResponse>> {
        let tables = self.tables.read();
        let mut restaurants: Vec<_> = tables.restaurants.values().filter(|r| r.row.owner_id == owner_id).collect();
        newest_first(&mut restaurants, |r| r.created_at);
        Ok(restaurants.into_iter().map(|r| r.row.clone()).collect())
    }

    async fn update_restaurant(&self, id: RestaurantId, request: &RestaurantUpdateDBRequest) -> Result<RestaurantDBResponse> {
        let mut tables = self.tables.write();
        if let Some(slug) = request.slug.as_deref().filter(|slug| tables.slug_taken(slug, Some(id))) {
            return Err(DbError::unique("restaurants", "restaurants_slug_key", slug));
        }

        let restaurant = tables.restaurants.get_mut(&id).ok_or(DbError::NotFound)?;
        restaurant.row.apply(request, Utc::now());
        Ok(restaurant.row.clone())
    }

    async fn delete_restaurant(&self, id: RestaurantId) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.restaurants.remove(&id).is_none() {
            return Ok(false);
        }

        let category_ids = tables.category_ids_of(id);
        tables.categories.retain(|_, c| c.row.restaurant_id != id);
        tables.menu_items.retain(|_, item| !category_ids.contains(&item.row.category_id));
        tables.scans.retain(|_, scan| scan.row.restaurant_id != id);
        Ok(true)
    }

    async fn list_restaurant_summaries(&self, skip: i64, limit: i64) -> Result<Vec<RestaurantSummaryDBResponse>> {
        let tables = self.tables.read();
        let mut restaurants: Vec<_> = tables.restaurants.values().collect();
        newest_first(&mut restaurants, |r| r.created_at);

        let summaries = restaurants
            .into_iter()
            .map(|r| RestaurantSummaryDBResponse {
                id: r.row.id,
                owner_id: r.row.owner_id,
                owner_email: tables.users.get(&r.row.owner_id).map(|u| u.row.email.clone()),
                name: r.row.name.clone(),
                slug: r.row.slug.clone(),
                qr_code_url: r.row.qr_code_url.clone(),
                created_at: r.row.created_at,
                updated_at: r.row.updated_at,
                category_count: tables.category_ids_of(r.row.id).len() as i64,
            })
            .collect();
        Ok(page(summaries, skip, limit))
    }

    async fn count_restaurants(&self) -> Result<i64> {
        Ok(self.tables.read().restaurants.len() as i64)
    }

    async fn create_category(&self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse> {
        check_sort_order("categories", request.sort_order)?;

        let mut tables = self.tables.write();
        if !tables.restaurants.contains_key(&request.restaurant_id) {
            return Err(foreign_key("categories", "categories_restaurant_id_fkey"));
        }
        if tables.category_name_taken(request.restaurant_id, &request.name, None) {
            return Err(DbError::unique(
                "categories",
                "categories_restaurant_id_name_key",
                request.name.clone(),
            ));
        }

        let now = Utc::now();
        let category = CategoryDBResponse {
            id: Uuid::new_v4(),
            restaurant_id: request.restaurant_id,
            name: request.name.clone(),
            description: request.description.clone(),
            sort_order: request.sort_order,
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.seq();
        tables.categories.insert(category.id, Stored { seq, row: category.clone() });
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryDBResponse>> {
        Ok(self.tables.read().categories.get(&id).map(|c| c.row.clone()))
    }

    async fn find_category_by_name(&self, restaurant_id: RestaurantId, name: &str) -> Result<Option<CategoryDBResponse>> {
        let tables = self.tables.read();
        Ok(tables
            .categories
            .values()
            .find(|c| c.row.restaurant_id == restaurant_id && c.row.name == name)
            .map(|c| c.row.clone()))
    }

    async fn list_categories(&self, restaurant_id: RestaurantId) -> Result<Vec<CategoryDBResponse>> {
        let tables = self.tables.read();
        let mut categories: Vec<_> = tables
            .categories
            .values()
            .filter(|c| c.row.restaurant_id == restaurant_id)
            .collect();
        by_position(&mut categories, |c| (c.sort_order, c.created_at));
        Ok(categories.into_iter().map(|c| c.row.clone()).collect())
    }

    async fn update_category(&self, id: CategoryId, request: &CategoryUpdateDBRequest) -> Result<CategoryDBResponse> {
        if let Some(sort_order) = request.sort_order {
            check_sort_order("categories", sort_order)?;
        }

        let mut tables = self.tables.write();
        let restaurant_id = tables.categories.get(&id).ok_or(DbError::NotFound)?.row.restaurant_id;
        if let Some(name) = request
            .name
            .as_deref()
            .filter(|name| tables.category_name_taken(restaurant_id, name, Some(id)))
        {
            return Err(DbError::unique("categories", "categories_restaurant_id_name_key", name));
        }

        let category = tables.categories.get_mut(&id).ok_or(DbError::NotFound)?;
        category.row.apply(request, Utc::now());
        Ok(category.row.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        tables.menu_items.retain(|_, item| item.row.category_id != id);
        Ok(true)
    }

    async fn create_menu_item(&self, request: &MenuItemCreateDBRequest) -> Result<MenuItemDBResponse> {
        check_sort_order("menu_items", request.sort_order)?;
        check_price(request.price)?;

        let mut tables = self.tables.write();
        if !tables.categories.contains_key(&request.category_id) {
            return Err(foreign_key("menu_items", "menu_items_category_id_fkey"));
        }

        let now = Utc::now();
        let item = MenuItemDBResponse {
            id: Uuid::new_v4(),
            category_id: request.category_id,
            name: request.name.clone(),
            description: request.description.clone(),
            price: request.price,
            image_url: request.image_url.clone(),
            is_available: request.is_available,
            sort_order: request.sort_order,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.seq();
        tables.menu_items.insert(item.id, Stored { seq, row: item.clone() });
        Ok(item)
    }

    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItemDBResponse>> {
        Ok(self.tables.read().menu_items.get(&id).map(|item| item.row.clone()))
    }

    async fn list_menu_items(&self, category_id: CategoryId) -> Result<Vec<MenuItemDBResponse>> {
        self.list_menu_items_in(&[category_id]).await
    }

    async fn list_menu_items_in(&self, category_ids: &[CategoryId]) -> Result<Vec<MenuItemDBResponse>> {
        let tables = self.tables.read();
        let mut items: Vec<_> = tables
            .menu_items
            .values()
            .filter(|item| category_ids.contains(&item.row.category_id))
            .collect();
        by_position(&mut items, |item| (item.sort_order, item.created_at));
        Ok(items.into_iter().map(|item| item.row.clone()).collect())
    }

    async fn update_menu_item(&self, id: MenuItemId, request: &MenuItemUpdateDBRequest) -> Result<MenuItemDBResponse> {
        if let Some(sort_order) = request.sort_order {
            check_sort_order("menu_items", sort_order)?;
        }
        if let Some(price) = request.price {
            check_price(price)?;
        }

        let mut tables = self.tables.write();
        if !tables.menu_items.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        if request.category_id.is_some_and(|category_id| !tables.categories.contains_key(&category_id)) {
            return Err(foreign_key("menu_items", "menu_items_category_id_fkey"));
        }

        let item = tables.menu_items.get_mut(&id).ok_or(DbError::NotFound)?;
        item.row.apply(request, Utc::now());
        Ok(item.row.clone())
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool> {
        Ok(self.tables.write().menu_items.remove(&id).is_some())
    }

    async fn record_scan(&self, request: &ScanCreateDBRequest) -> Result<ScanDBResponse> {
        let mut tables = self.tables.write();
        if !tables.restaurants.contains_key(&request.restaurant_id) {
            return Err(foreign_key("qr_scans", "qr_scans_restaurant_id_fkey"));
        }

        let scan = ScanDBResponse {
            id: Uuid::new_v4(),
            restaurant_id: request.restaurant_id,
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            scanned_at: Utc::now(),
        };
        let seq = tables.seq();
        tables.scans.insert(scan.id, Stored { seq, row: scan.clone() });
        Ok(scan)
    }

    async fn owner_stats(&self, owner_id: UserId, scans_since: DateTime<Utc>) -> Result<OwnerStatsDBResponse> {
        let tables = self.tables.read();
        let restaurant_ids: Vec<RestaurantId> = tables
            .restaurants
            .values()
            .filter(|r| r.row.owner_id == owner_id)
            .map(|r| r.row.id)
            .collect();
        let category_ids: Vec<CategoryId> = restaurant_ids.iter().flat_map(|id| tables.category_ids_of(*id)).collect();

        Ok(OwnerStatsDBResponse {
            restaurants: restaurant_ids.len() as i64,
            categories: category_ids.len() as i64,
            menu_items: tables.count_items_in(&category_ids),
            qr_scans: tables.count_scans(|scan| restaurant_ids.contains(&scan.restaurant_id) && scan.scanned_at >= scans_since),
        })
    }

    async fn system_counts(&self, window: &MonthWindow) -> Result<SystemCountsDBResponse> {
        let tables = self.tables.read();
        let this_month = |at: DateTime<Utc>| at >= window.this_month_start;
        let last_month = |at: DateTime<Utc>| at >= window.last_month_start && at < window.this_month_start;

        Ok(SystemCountsDBResponse {
            total_users: tables.users.len() as i64,
            total_restaurants: tables.restaurants.len() as i64,
            total_categories: tables.categories.len() as i64,
            total_menu_items: tables.menu_items.len() as i64,
            total_qr_scans: tables.scans.len() as i64,
            active_categories: tables.categories.values().filter(|c| c.row.is_active).count() as i64,
            new_users_this_month: tables.users.values().filter(|u| this_month(u.row.created_at)).count() as i64,
            new_users_last_month: tables.users.values().filter(|u| last_month(u.row.created_at)).count() as i64,
            qr_scans_this_month: tables.count_scans(|scan| this_month(scan.scanned_at)),
            qr_scans_last_month: tables.count_scans(|scan| last_month(scan.scanned_at)),
        })
    }

    async fn restaurant_stats(&self, this_month_start: DateTime<Utc>) -> Result<Vec<RestaurantStatsDBResponse>> {
        let tables = self.tables.read();
        let mut restaurants: Vec<_> = tables.restaurants.values().collect();
        newest_first(&mut restaurants, |r| r.created_at);

        Ok(restaurants
            .into_iter()
            .map(|r| {
                let category_ids = tables.category_ids_of(r.row.id);
                RestaurantStatsDBResponse {
                    id: r.row.id,
                    name: r.row.name.clone(),
                    slug: r.row.slug.clone(),
                    owner_email: tables.users.get(&r.row.owner_id).map(|u| u.row.email.clone()),
                    created_at: r.row.created_at,
                    total_categories: category_ids.len() as i64,
                    total_menu_items: tables.count_items_in(&category_ids),
                    total_scans: tables.count_scans(|scan| scan.restaurant_id == r.row.id),
                    scans_this_month: tables
                        .count_scans(|scan| scan.restaurant_id == r.row.id && scan.scanned_at >= this_month_start),
                }
            })
            .collect())
    }
}
