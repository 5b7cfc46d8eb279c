//! API models for the admin surface: platform statistics, user and restaurant oversight, and the
//! activity log.

use crate::activity::ActivityLogEntry;
use crate::api::models::categories::CategoryResponse;
use crate::db::models::restaurants::{RestaurantDBResponse, RestaurantSummaryDBResponse};
use crate::db::models::stats::{RestaurantStatsDBResponse, SystemCountsDBResponse};
use crate::types::{RestaurantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Owner email shown when a restaurant's owner can't be resolved
pub const UNKNOWN_OWNER: &str = "Unknown";

pub const DEFAULT_LOG_LIMIT: usize = 100;
pub const MAX_LOG_LIMIT: usize = 1000;

/// Rounded percentage change; 0 when there is no baseline
fn growth(this: i64, last: i64) -> i64 {
    if last == 0 {
        return 0;
    }
    (((this - last) as f64 / last as f64) * 100.0).round() as i64
}

/// Ratio to one decimal place; 0 when the denominator is 0
fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64 * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: i64,
    pub total_restaurants: i64,
    pub total_categories: i64,
    pub total_menu_items: i64,
    #[serde(rename = "totalQRScans")]
    pub total_qr_scans: i64,
    #[serde(rename = "qrScansThisMonth")]
    pub qr_scans_this_month: i64,
    pub new_users_this_month: i64,
    pub active_categories: i64,
    /// Percentage change in new users versus last month
    pub user_growth: i64,
    /// Percentage change in QR scans versus last month
    pub scan_growth: i64,
    pub avg_categories_per_restaurant: f64,
    pub avg_items_per_category: f64,
    pub avg_scans_per_restaurant: f64,
}

impl From<SystemCountsDBResponse> for SystemStats {
    fn from(db: SystemCountsDBResponse) -> Self {
        Self {
            total_users: db.total_users,
            total_restaurants: db.total_restaurants,
            total_categories: db.total_categories,
            total_menu_items: db.total_menu_items,
            total_qr_scans: db.total_qr_scans,
            qr_scans_this_month: db.qr_scans_this_month,
            new_users_this_month: db.new_users_this_month,
            active_categories: db.active_categories,
            user_growth: growth(db.new_users_this_month, db.new_users_last_month),
            scan_growth: growth(db.qr_scans_this_month, db.qr_scans_last_month),
            avg_categories_per_restaurant: ratio(db.total_categories, db.total_restaurants),
            avg_items_per_category: ratio(db.total_menu_items, db.total_categories),
            avg_scans_per_restaurant: ratio(db.total_qr_scans, db.total_restaurants),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantStats {
    #[schema(value_type = String, format = "uuid")]
    pub id: RestaurantId,
    pub name: String,
    pub slug: String,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    pub total_categories: i64,
    pub total_menu_items: i64,
    pub total_scans: i64,
    pub scans_this_month: i64,
}

impl From<RestaurantStatsDBResponse> for RestaurantStats {
    fn from(db: RestaurantStatsDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            slug: db.slug,
            owner_email: db.owner_email.unwrap_or_else(|| UNKNOWN_OWNER.to_string()),
            created_at: db.created_at,
            total_categories: db.total_categories,
            total_menu_items: db.total_menu_items,
            total_scans: db.total_scans,
            scans_this_month: db.scans_this_month,
        }
    }
}

/// A restaurant on the admin listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminRestaurantSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: RestaurantId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub owner_email: String,
    pub name: String,
    pub slug: String,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_count: i64,
}

impl From<RestaurantSummaryDBResponse> for AdminRestaurantSummary {
    fn from(db: RestaurantSummaryDBResponse) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            owner_email: db.owner_email.unwrap_or_else(|| UNKNOWN_OWNER.to_string()),
            name: db.name,
            slug: db.slug,
            qr_code_url: db.qr_code_url,
            created_at: db.created_at,
            updated_at: db.updated_at,
            category_count: db.category_count,
        }
    }
}

/// One restaurant with its owner and full menu, regardless of who owns it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminRestaurantDetail {
    #[schema(value_type = String, format = "uuid")]
    pub id: RestaurantId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub owner_email: String,
    pub name: String,
    pub slug: String,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub categories: Vec<CategoryResponse>,
}

impl AdminRestaurantDetail {
    pub fn new(db: RestaurantDBResponse, owner_email: Option<String>, categories: Vec<CategoryResponse>) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            owner_email: owner_email.unwrap_or_else(|| UNKNOWN_OWNER.to_string()),
            name: db.name,
            slug: db.slug,
            qr_code_url: db.qr_code_url,
            created_at: db.created_at,
            updated_at: db.updated_at,
            categories,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminRestaurantBody {
    pub restaurant: AdminRestaurantDetail,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LogsQuery {
    /// Number of entries to return (default: 100, max: 1000)
    #[param(default = 100, minimum = 1, maximum = 1000)]
    pub limit: Option<usize>,
}

impl LogsQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogList {
    pub logs: Vec<ActivityLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth() {
        assert_eq!(growth(15, 10), 50);
        assert_eq!(growth(5, 10), -50);
        assert_eq!(growth(7, 3), 133);
        assert_eq!(growth(12, 0), 0);
    }

    #[test]
    fn test_ratio_one_decimal() {
        assert_eq!(ratio(10, 3), 3.3);
        assert_eq!(ratio(2, 3), 0.7);
        assert_eq!(ratio(5, 0), 0.0);
    }

    #[test]
    fn test_system_stats_from_counts() {
        let stats = SystemStats::from(SystemCountsDBResponse {
            total_users: 4,
            total_restaurants: 2,
            total_categories: 5,
            total_menu_items: 12,
            total_qr_scans: 9,
            active_categories: 4,
            new_users_this_month: 3,
            new_users_last_month: 1,
            qr_scans_this_month: 6,
            qr_scans_last_month: 0,
        });

        assert_eq!(stats.user_growth, 200);
        assert_eq!(stats.scan_growth, 0);
        assert_eq!(stats.avg_categories_per_restaurant, 2.5);
        assert_eq!(stats.avg_items_per_category, 2.4);
        assert_eq!(stats.avg_scans_per_restaurant, 4.5);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalQRScans"], 9);
        assert_eq!(json["qrScansThisMonth"], 6);
        assert_eq!(json["avgItemsPerCategory"], 2.4);
    }

    #[test]
    fn test_missing_owner_is_unknown() {
        let stats = RestaurantStats::from(RestaurantStatsDBResponse {
            id: uuid::Uuid::new_v4(),
            name: "Orphan".to_string(),
            slug: "orphan".to_string(),
            owner_email: None,
            created_at: Utc::now(),
            total_categories: 0,
            total_menu_items: 0,
            total_scans: 0,
            scans_this_month: 0,
        });
        assert_eq!(stats.owner_email, UNKNOWN_OWNER);
    }

    #[test]
    fn test_logs_limit() {
        assert_eq!(LogsQuery::default().limit(), DEFAULT_LOG_LIMIT);
        assert_eq!(LogsQuery { limit: Some(5000) }.limit(), MAX_LOG_LIMIT);
        assert_eq!(LogsQuery { limit: Some(0) }.limit(), 1);
    }
}
