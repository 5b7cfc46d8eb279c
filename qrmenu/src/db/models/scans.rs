//! Database models for QR scan records. Scans are append-only.

use crate::types::{RestaurantId, ScanId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ScanCreateDBRequest {
    pub restaurant_id: RestaurantId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ScanDBResponse {
    pub id: ScanId,
    pub restaurant_id: RestaurantId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub scanned_at: DateTime<Utc>,
}
