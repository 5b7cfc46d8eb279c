//! Bounded in-memory log of notable user actions, surfaced to admins at `/api/v1/admin/logs`.
//!
//! Entries are not persisted and are lost on restart.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: ActivityLevel,
    pub action: String,
    /// Email of the acting user, when known
    pub user: Option<String>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Where a request came from
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityLogEntry>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn record(&self, level: ActivityLevel, action: &str, user: Option<&str>, details: impl Into<String>, meta: &RequestMeta) {
        let entry = ActivityLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            action: action.to_string(),
            user: user.map(str::to_string),
            details: details.into(),
            ip_address: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
        };

        let mut entries = self.entries.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<ActivityLogEntry> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_is_newest_first() {
        let log = ActivityLog::new(10);
        log.record(ActivityLevel::Info, "First", None, "one", &RequestMeta::default());
        log.record(ActivityLevel::Success, "Second", Some("a@example.com"), "two", &RequestMeta::default());

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "Second");
        assert_eq!(recent[0].user.as_deref(), Some("a@example.com"));
        assert_eq!(recent[1].action, "First");

        assert_eq!(log.recent(1).len(), 1);
    }

    #[test]
    fn test_ring_is_bounded() {
        let log = ActivityLog::new(3);
        for i in 0..5 {
            log.record(ActivityLevel::Info, &format!("action-{i}"), None, "", &RequestMeta::default());
        }

        assert_eq!(log.len(), 3);
        let actions: Vec<_> = log.recent(10).into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["action-4", "action-3", "action-2"]);
    }

    #[test]
    fn test_entry_serialization() {
        let log = ActivityLog::new(1);
        let meta = RequestMeta {
            ip: Some("203.0.113.1".to_string()),
            user_agent: None,
        };
        log.record(ActivityLevel::Warning, "Login Failed", Some("x@example.com"), "bad password", &meta);

        let json = serde_json::to_value(&log.recent(1)[0]).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["ipAddress"], "203.0.113.1");
        assert!(json.get("userAgent").is_none());
    }
}
