use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use consolekit_core::{TimeRange, UserId, contains_keyword};

use crate::request::{ClientInfo, OperationType, infer_page_path};
use crate::sanitize::sanitize;

/// Records older than this are eligible for cleanup.
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Success,
    Failure,
}

/// One completed user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
    pub id: Uuid,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    /// What was done, e.g. `create`, `delete`.
    pub operation: String,
    pub operation_type: Option<OperationType>,
    /// Human-readable module label (menu title) the action belongs to.
    pub module: String,
    pub page_path: Option<String>,
    /// Request method, e.g. `POST`.
    pub method: Option<String>,
    pub request_url: Option<String>,
    /// Request parameters with sensitive fields masked.
    pub params: Option<Value>,
    pub status: OperationStatus,
    pub error: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl OperationLog {
    /// A successful record stamped at `at`.
    pub fn new(operation: impl Into<String>, module: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: None,
            username: None,
            operation: operation.into(),
            operation_type: None,
            module: module.into(),
            page_path: None,
            method: None,
            request_url: None,
            params: None,
            status: OperationStatus::Success,
            error: None,
            ip: None,
            user_agent: None,
            browser: None,
            os: None,
            duration_ms: 0,
            created_at: at,
        }
    }

    pub fn by(mut self, user_id: UserId, username: impl Into<String>) -> Self {
        self.user_id = Some(user_id);
        self.username = Some(username.into());
        self
    }

    pub fn on_page(mut self, page_path: impl Into<String>) -> Self {
        self.page_path = Some(page_path.into());
        self
    }

    /// Record the API call behind the action.
    ///
    /// Classifies the operation, fills `page_path` from the URL when no page
    /// was given, and masks sensitive fields in `params`.
    pub fn with_request(
        mut self,
        method: impl Into<String>,
        url: impl Into<String>,
        params: Option<Value>,
    ) -> Self {
        let method = method.into();
        let url = url.into();
        self.operation_type = Some(OperationType::infer(&url, Some(&method)));
        if self.page_path.as_deref().is_none_or(|p| p.trim().is_empty()) {
            self.page_path = Some(infer_page_path(&url));
        }
        self.method = Some(method);
        self.request_url = Some(url);
        self.params = params.map(sanitize);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        if let Some(client) = ClientInfo::from_user_agent(&user_agent) {
            self.browser = Some(client.browser);
            self.os = Some(client.os);
        }
        self.user_agent = Some(user_agent);
        self
    }

    pub fn from_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn took(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Mark the action as failed with `error`.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = OperationStatus::Failure;
        self.error = Some(error.into());
        self
    }
}

/// Filter for browsing the log. Every set field must match; the time range is
/// inclusive at both ends. `username` and `search` (over the request URL)
/// are case-insensitive substring matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub operation_type: Option<OperationType>,
    pub module: Option<String>,
    pub status: Option<OperationStatus>,
    pub created: TimeRange,
    pub search: Option<String>,
}

impl LogQuery {
    pub fn matches(&self, log: &OperationLog) -> bool {
        self.user_id.as_ref().is_none_or(|u| log.user_id.as_ref() == Some(u))
            && self
                .username
                .as_deref()
                .is_none_or(|n| contains_keyword(log.username.as_deref().unwrap_or_default(), n))
            && self.operation_type.is_none_or(|t| log.operation_type == Some(t))
            && self.module.as_deref().is_none_or(|m| log.module == m)
            && self.status.is_none_or(|s| log.status == s)
            && self.created.contains(log.created_at)
            && self
                .search
                .as_deref()
                .is_none_or(|q| contains_keyword(log.request_url.as_deref().unwrap_or_default(), q))
    }
}

/// Cutoff before which records fall outside the default retention window.
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(DEFAULT_RETENTION_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_fields_combine() {
        let now = Utc::now();
        let log = OperationLog::new("delete", "Users", now)
            .by(UserId::from("u-1"), "alice")
            .failed("menu has children");

        assert!(LogQuery::default().matches(&log));
        assert!(LogQuery { status: Some(OperationStatus::Failure), ..Default::default() }.matches(&log));
        assert!(!LogQuery { module: Some("Roles".to_string()), ..Default::default() }.matches(&log));
        assert!(!LogQuery { user_id: Some(UserId::from("u-2")), ..Default::default() }.matches(&log));
        let exact = TimeRange { from: Some(now), to: Some(now) };
        assert!(LogQuery { created: exact, ..Default::default() }.matches(&log));
        let later = TimeRange { from: Some(now + Duration::seconds(1)), to: None };
        assert!(!LogQuery { created: later, ..Default::default() }.matches(&log));
    }

    #[test]
    fn request_details_are_classified_and_masked() {
        let log = OperationLog::new("Edit user", "Users", Utc::now()).with_request(
            "PUT",
            "/system/user/edit/42",
            Some(serde_json::json!({ "name": "alice", "password": "hunter2" })),
        );
        assert_eq!(log.operation_type, Some(OperationType::Edit));
        assert_eq!(log.page_path.as_deref(), Some("/system/user"));
        assert_eq!(log.params, Some(serde_json::json!({ "name": "alice", "password": "***" })));

        let explicit = OperationLog::new("Export", "Users", Utc::now())
            .on_page("/system/user")
            .with_request("GET", "/api/user/export", None);
        assert_eq!(explicit.operation_type, Some(OperationType::Export));
        assert_eq!(explicit.page_path.as_deref(), Some("/system/user"));
    }

    #[test]
    fn user_agent_fills_browser_and_os() {
        let log = OperationLog::new("login", "Auth", Utc::now())
            .with_user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0");
        assert_eq!(log.browser.as_deref(), Some("Firefox"));
        assert_eq!(log.os.as_deref(), Some("Linux"));
    }

    #[test]
    fn query_by_username_type_and_url() {
        let log = OperationLog::new("Delete menu", "Menus", Utc::now())
            .by(UserId::from("u-1"), "Alice")
            .with_request("DELETE", "/system/menu/9", None);

        assert!(LogQuery { username: Some("ali".to_string()), ..Default::default() }.matches(&log));
        assert!(LogQuery { operation_type: Some(OperationType::Delete), ..Default::default() }.matches(&log));
        assert!(!LogQuery { operation_type: Some(OperationType::View), ..Default::default() }.matches(&log));
        assert!(LogQuery { search: Some("MENU/9".to_string()), ..Default::default() }.matches(&log));
        assert!(!LogQuery { search: Some("/role".to_string()), ..Default::default() }.matches(&log));
    }

    #[test]
    fn serializes_camel_case() {
        let log = OperationLog::new("create", "Menus", Utc::now()).took(12);
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["durationMs"], serde_json::json!(12));
        assert_eq!(json["status"], serde_json::json!("success"));
    }

    #[test]
    fn retention_is_ninety_days() {
        let now = Utc::now();
        assert_eq!(now - retention_cutoff(now), Duration::days(90));
    }
}
