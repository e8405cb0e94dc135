use crate::models::issue::Issue;
use serde::Serialize;
use std::path::Path;
use tauri::{AppHandle, Emitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueEventKind {
    Created,
    Updated,
    Deleted,
    Cleared,
}

impl IssueEventKind {
    pub fn event_name(self) -> &'static str {
        match self {
            IssueEventKind::Created => "issue_created",
            IssueEventKind::Updated => "issue_updated",
            IssueEventKind::Deleted => "issue_deleted",
            IssueEventKind::Cleared => "issues_cleared",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueEvent {
    pub kind: IssueEventKind,
    pub issue_id: Option<String>,
    pub issue: Option<Issue>,
}

impl IssueEvent {
    pub fn new(kind: IssueEventKind, issue_id: Option<String>, issue: Option<Issue>) -> Self {
        Self {
            kind,
            issue_id,
            issue,
        }
    }
}

/// Tells the web view about a register change so it can refresh markers and toast.
/// Delivery is best-effort; failures are logged only.
pub fn notify_issue_change(app: &AppHandle, data_dir: &Path, event: IssueEvent) {
    let enabled = crate::commands::settings::load_effective_preferences(data_dir)
        .map(|prefs| prefs.notifications_enabled)
        .unwrap_or(true);

    if !enabled {
        log::debug!("notifications disabled, dropping {}", event.kind.event_name());
        return;
    }

    if let Err(e) = app.emit(event.kind.event_name(), &event) {
        log::warn!("failed to emit {}: {e}", event.kind.event_name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_payload_uses_camel_case_fields() {
        let event = IssueEvent::new(IssueEventKind::Deleted, Some("issue_1".to_string()), None);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["kind"], json!("deleted"));
        assert_eq!(value["issueId"], json!("issue_1"));
        assert_eq!(event.kind.event_name(), "issue_deleted");
    }
}
