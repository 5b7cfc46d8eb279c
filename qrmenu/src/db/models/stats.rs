//! Aggregation results used by the owner dashboard and the admin statistics endpoints.

use crate::types::RestaurantId;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::FromRow;

/// Calendar month boundaries (UTC) used by "this month" / "last month" counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub this_month_start: DateTime<Utc>,
    pub last_month_start: DateTime<Utc>,
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl MonthWindow {
    pub fn containing(now: DateTime<Utc>) -> Self {
        let (last_year, last_month) = if now.month() == 1 {
            (now.year() - 1, 12)
        } else {
            (now.year(), now.month() - 1)
        };

        Self {
            this_month_start: first_of_month(now.year(), now.month()),
            last_month_start: first_of_month(last_year, last_month),
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct OwnerStatsDBResponse {
    pub restaurants: i64,
    pub categories: i64,
    pub menu_items: i64,
    /// Scans since the start of the current month
    pub qr_scans: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct SystemCountsDBResponse {
    pub total_users: i64,
    pub total_restaurants: i64,
    pub total_categories: i64,
    pub total_menu_items: i64,
    pub total_qr_scans: i64,
    pub active_categories: i64,
    pub new_users_this_month: i64,
    pub new_users_last_month: i64,
    pub qr_scans_this_month: i64,
    pub qr_scans_last_month: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct RestaurantStatsDBResponse {
    pub id: RestaurantId,
    pub name: String,
    pub slug: String,
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_categories: i64,
    pub total_menu_items: i64,
    pub total_scans: i64,
    pub scans_this_month: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_window_mid_year() {
        let now = Utc.with_ymd_and_hms(2024, 6, 17, 13, 45, 0).unwrap();
        let window = MonthWindow::containing(now);

        assert_eq!(window.this_month_start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(window.last_month_start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_window_january_wraps_year() {
        let now = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        let window = MonthWindow::containing(now);

        assert_eq!(window.this_month_start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.last_month_start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
    }
}
