use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [
        IssueStatus::Pending,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(IssueStatus::Pending),
            "in-progress" | "in_progress" => Some(IssueStatus::InProgress),
            "resolved" => Some(IssueStatus::Resolved),
            _ => None,
        }
    }
}

/// A user-submitted accessibility report. Serialized field names follow the
/// document schema the web view already speaks (`type`, `createdAt`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub location: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub reporter: String,
    #[serde(default)]
    pub created_at: i64, // unix seconds
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub status_notes: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Set when the status becomes resolved, cleared when it leaves resolved.
    #[serde(default)]
    pub resolved_at: Option<i64>,
}

/// Report form payload submitted from the web view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueFilter {
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default, rename = "type")]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Inclusive lower bound on `created_at`, unix seconds.
    #[serde(default)]
    pub start_date: Option<i64>,
    /// Inclusive upper bound on `created_at`, unix seconds.
    #[serde(default)]
    pub end_date: Option<i64>,
    /// Case-insensitive substring of the free-text location.
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResult {
    pub success: bool,
    pub issue: Option<Issue>,
    pub message: String,
}

impl IssueResult {
    pub fn ok(issue: Option<Issue>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            issue,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            issue: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
    Updated,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::Updated => "updated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(AuditAction::Created),
            "status_changed" => Some(AuditAction::StatusChanged),
            "updated" => Some(AuditAction::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(default)]
    pub id: i64,
    pub issue_id: String,
    pub action: AuditAction,
    pub from_status: Option<IssueStatus>,
    pub to_status: Option<IssueStatus>,
    pub by: String,
    pub notes: Option<String>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_uses_hyphenated_wire_names() {
        assert_eq!(
            serde_json::to_value(IssueStatus::InProgress).unwrap(),
            json!("in-progress")
        );
        assert_eq!(IssueStatus::parse("in_progress"), Some(IssueStatus::InProgress));
        assert_eq!(IssueStatus::parse("closed"), None);
    }

    #[test]
    fn issue_deserializes_sparse_documents_with_defaults() {
        let issue: Issue = serde_json::from_value(json!({
            "id": "issue_1",
            "type": "broken-ramp",
            "location": "Library",
            "description": "Ramp tiles cracked"
        }))
        .unwrap();

        assert_eq!(issue.severity, Severity::Low);
        assert_eq!(issue.status, IssueStatus::Pending);
        assert!(issue.tags.is_empty());
        assert_eq!(issue.latitude, None);
    }
}
