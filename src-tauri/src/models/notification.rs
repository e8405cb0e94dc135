use super::issue::{Issue, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewIssue,
    HighSeverityAlert,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::NewIssue => "new_issue",
            NotificationKind::HighSeverityAlert => "high_severity_alert",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new_issue" => Some(NotificationKind::NewIssue),
            "high_severity_alert" => Some(NotificationKind::HighSeverityAlert),
            _ => None,
        }
    }
}

/// Maintenance inbox entry. `issue` is the report as it was when filed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceNotification {
    #[serde(default)]
    pub id: i64,
    pub kind: NotificationKind,
    pub issue_id: String,
    pub issue: Option<Issue>,
    pub severity: Severity,
    pub message: String,
    pub read: bool,
    pub created_at: i64,
    pub read_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total: usize,
    pub unread: usize,
    pub read: usize,
}
