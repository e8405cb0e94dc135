use crate::commands::db;
use crate::commands::events::{notify_issue_change, IssueEvent, IssueEventKind};
use crate::models::app_state::AppState;
use crate::models::issue::*;
use crate::models::notification::{MaintenanceNotification, NotificationKind};
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;

const ISSUE_ID_PREFIX: &str = "issue_";
const ANONYMOUS_REPORTER: &str = "Anonymous";
/// Stamped by the backend; ignored in save payloads.
const SERVER_OWNED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "resolvedAt"];

#[tauri::command]
pub async fn create_issue(
    form: NewIssue,
    state: tauri::State<'_, AppState>,
    app: tauri::AppHandle,
) -> Result<IssueResult, String> {
    let result = create_issue_internal(&state.data_dir, form)?;
    if let Some(issue) = &result.issue {
        notify_issue_change(
            &app,
            &state.data_dir,
            IssueEvent::new(IssueEventKind::Created, Some(issue.id.clone()), Some(issue.clone())),
        );
    }
    Ok(result)
}

#[tauri::command]
pub async fn save_issue(
    issue: Value,
    state: tauri::State<'_, AppState>,
    app: tauri::AppHandle,
) -> Result<Issue, String> {
    let saved = save_issue_internal(&state.data_dir, issue)?;
    notify_issue_change(
        &app,
        &state.data_dir,
        IssueEvent::new(IssueEventKind::Updated, Some(saved.id.clone()), Some(saved.clone())),
    );
    Ok(saved)
}

#[tauri::command]
pub async fn update_issue_status(
    issue_id: String,
    status: IssueStatus,
    notes: Option<String>,
    updated_by: Option<String>,
    state: tauri::State<'_, AppState>,
    app: tauri::AppHandle,
) -> Result<IssueResult, String> {
    let result = update_issue_status_internal(
        &state.data_dir,
        &issue_id,
        status,
        notes.as_deref(),
        updated_by.as_deref(),
    )?;
    if let Some(issue) = &result.issue {
        notify_issue_change(
            &app,
            &state.data_dir,
            IssueEvent::new(IssueEventKind::Updated, Some(issue.id.clone()), Some(issue.clone())),
        );
    }
    Ok(result)
}

#[tauri::command]
pub async fn delete_issue(
    issue_id: String,
    state: tauri::State<'_, AppState>,
    app: tauri::AppHandle,
) -> Result<IssueResult, String> {
    let result = delete_issue_internal(&state.data_dir, &issue_id)?;
    if result.success {
        notify_issue_change(
            &app,
            &state.data_dir,
            IssueEvent::new(IssueEventKind::Deleted, Some(issue_id), None),
        );
    }
    Ok(result)
}

#[tauri::command]
pub async fn get_issue(
    issue_id: String,
    state: tauri::State<'_, AppState>,
) -> Result<Option<Issue>, String> {
    let conn = db::open_store(&state.data_dir)?;
    db::load_issue(&conn, &issue_id).map_err(|e| format!("Read error: {e}"))
}

#[tauri::command]
pub async fn list_issues(
    filter: Option<IssueFilter>,
    state: tauri::State<'_, AppState>,
) -> Result<Vec<Issue>, String> {
    list_issues_internal(&state.data_dir, &filter.unwrap_or_default())
}

#[tauri::command]
pub async fn get_audit_trail(
    issue_id: String,
    state: tauri::State<'_, AppState>,
) -> Result<Vec<AuditEntry>, String> {
    let conn = db::open_store(&state.data_dir)?;
    db::load_audit_trail(&conn, &issue_id).map_err(|e| format!("Read error: {e}"))
}

#[tauri::command]
pub async fn clear_all_issues(
    state: tauri::State<'_, AppState>,
    app: tauri::AppHandle,
) -> Result<usize, String> {
    let removed = clear_all_issues_internal(&state.data_dir)?;
    notify_issue_change(
        &app,
        &state.data_dir,
        IssueEvent::new(IssueEventKind::Cleared, None, None),
    );
    Ok(removed)
}

pub fn new_issue_id() -> String {
    format!("{ISSUE_ID_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

fn validate_fields(
    issue_type: &str,
    location: &str,
    description: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(), String> {
    if issue_type.trim().is_empty() {
        return Err("Issue type is required".to_string());
    }
    if location.trim().is_empty() {
        return Err("Location is required".to_string());
    }
    if description.trim().is_empty() {
        return Err("Description is required".to_string());
    }
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => crate::analysis::geo::validate_coordinate(lat, lon),
        (None, None) => Ok(()),
        _ => Err("Latitude and longitude must be provided together".to_string()),
    }
}

fn validate_form(form: &NewIssue) -> Result<(), String> {
    validate_fields(
        &form.issue_type,
        &form.location,
        &form.description,
        form.latitude,
        form.longitude,
    )
}

/// Same rules as the report form, applied to stored records (save, import).
pub fn validate_issue(issue: &Issue) -> Result<(), String> {
    validate_fields(
        &issue.issue_type,
        &issue.location,
        &issue.description,
        issue.latitude,
        issue.longitude,
    )
}

/// Keeps `resolved_at` consistent with the status: stamped with `at` on
/// entering resolved, kept while resolved, cleared otherwise.
pub fn stamp_resolution(issue: &mut Issue, at: i64) {
    if issue.status == IssueStatus::Resolved {
        issue.resolved_at.get_or_insert(at);
    } else {
        issue.resolved_at = None;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn maintenance_notification(issue: &Issue) -> MaintenanceNotification {
    let (kind, message) = if issue.severity == Severity::High {
        (
            NotificationKind::HighSeverityAlert,
            format!("High Priority: {} at {}", issue.issue_type, issue.location),
        )
    } else {
        (
            NotificationKind::NewIssue,
            format!("New issue: {} at {}", issue.issue_type, issue.location),
        )
    };

    MaintenanceNotification {
        id: 0,
        kind,
        issue_id: issue.id.clone(),
        issue: Some(issue.clone()),
        severity: issue.severity,
        message,
        read: false,
        created_at: issue.created_at,
        read_at: None,
    }
}

pub fn create_issue_internal(data_dir: &Path, form: NewIssue) -> Result<IssueResult, String> {
    if let Err(reason) = validate_form(&form) {
        log::info!("rejected issue report: {reason}");
        return Ok(IssueResult::failed(reason));
    }

    let prefs = crate::commands::settings::load_effective_preferences(data_dir)?;
    let now = chrono::Utc::now().timestamp();

    let issue = Issue {
        id: new_issue_id(),
        issue_type: form.issue_type.trim().to_string(),
        location: form.location.trim().to_string(),
        latitude: form.latitude,
        longitude: form.longitude,
        description: form.description.trim().to_string(),
        severity: form.severity.unwrap_or_default(),
        status: IssueStatus::Pending,
        reporter: non_blank(form.reporter).unwrap_or(prefs.default_reporter),
        created_at: now,
        updated_at: now,
        status_notes: None,
        building: non_blank(form.building),
        floor: non_blank(form.floor),
        tags: form.tags,
        attachments: form.attachments,
        resolved_at: None,
    };

    let conn = db::open_store(data_dir)?;
    insert_with_audit(&conn, &issue, true).map_err(|e| {
        log::error!("failed to store issue {}: {e}", issue.id);
        format!("Insert error: {e}")
    })?;

    log::info!("issue {} reported at {}", issue.id, issue.location);
    Ok(IssueResult::ok(Some(issue), "Issue reported successfully!"))
}

fn insert_with_audit(conn: &Connection, issue: &Issue, notify_maintenance: bool) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    db::insert_issue(&tx, issue)?;
    db::append_audit(
        &tx,
        &AuditEntry {
            id: 0,
            issue_id: issue.id.clone(),
            action: AuditAction::Created,
            from_status: None,
            to_status: Some(issue.status),
            by: issue.reporter.clone(),
            notes: Some(format!("Issue created by {}", issue.reporter)),
            timestamp: issue.created_at,
        },
    )?;
    if notify_maintenance {
        db::insert_notification(&tx, &maintenance_notification(issue))?;
    }
    tx.commit()
}

/// Upsert from a possibly partial payload. For a known id only the fields
/// present in `patch` overwrite the stored record; an unknown or missing id
/// is inserted with defaults filled in.
pub fn save_issue_internal(data_dir: &Path, patch: Value) -> Result<Issue, String> {
    let conn = db::open_store(data_dir)?;
    save_issue_with_conn(&conn, patch)
}

pub(crate) fn save_issue_with_conn(conn: &Connection, patch: Value) -> Result<Issue, String> {
    let Value::Object(fields) = patch else {
        return Err("Invalid issue: expected an object".to_string());
    };
    let now = chrono::Utc::now().timestamp();

    let id = fields
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let existing = match id.as_deref() {
        Some(id) => db::load_issue(conn, id).map_err(|e| format!("Read error: {e}"))?,
        None => None,
    };

    let Some(current) = existing else {
        let mut issue: Issue = serde_json::from_value(Value::Object(fields))
            .map_err(|e| format!("Invalid issue: {e}"))?;
        issue.id = id.unwrap_or_else(new_issue_id);
        if issue.reporter.trim().is_empty() {
            issue.reporter = ANONYMOUS_REPORTER.to_string();
        }
        if issue.created_at <= 0 {
            issue.created_at = now;
        }
        if issue.updated_at < issue.created_at {
            issue.updated_at = issue.created_at;
        }
        validate_issue(&issue).map_err(|reason| format!("Invalid issue: {reason}"))?;
        let stamped_at = issue.updated_at;
        stamp_resolution(&mut issue, stamped_at);

        insert_with_audit(conn, &issue, false).map_err(|e| format!("Insert error: {e}"))?;
        return Ok(issue);
    };

    let mut merged = serde_json::to_value(&current).map_err(|e| format!("Serialize error: {e}"))?;
    if let Some(target) = merged.as_object_mut() {
        for (key, value) in fields {
            if !SERVER_OWNED_FIELDS.contains(&key.as_str()) {
                target.insert(key, value);
            }
        }
    }
    let mut issue: Issue =
        serde_json::from_value(merged).map_err(|e| format!("Invalid issue: {e}"))?;
    validate_issue(&issue).map_err(|reason| format!("Invalid issue: {reason}"))?;
    if issue.reporter.trim().is_empty() {
        issue.reporter = ANONYMOUS_REPORTER.to_string();
    }
    issue.updated_at = now;
    stamp_resolution(&mut issue, now);

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| format!("Transaction error: {e}"))?;
    db::update_issue(&tx, &issue).map_err(|e| format!("Update error: {e}"))?;
    db::append_audit(
        &tx,
        &AuditEntry {
            id: 0,
            issue_id: issue.id.clone(),
            action: AuditAction::Updated,
            from_status: Some(current.status),
            to_status: Some(issue.status),
            by: issue.reporter.clone(),
            notes: None,
            timestamp: now,
        },
    )
    .map_err(|e| format!("Audit error: {e}"))?;
    tx.commit().map_err(|e| format!("Commit error: {e}"))?;

    Ok(issue)
}

pub fn update_issue_status_internal(
    data_dir: &Path,
    issue_id: &str,
    status: IssueStatus,
    notes: Option<&str>,
    updated_by: Option<&str>,
) -> Result<IssueResult, String> {
    let conn = db::open_store(data_dir)?;
    let Some(mut issue) = db::load_issue(&conn, issue_id).map_err(|e| format!("Read error: {e}"))?
    else {
        return Ok(IssueResult::failed("Issue not found"));
    };

    let previous = issue.status;
    let now = chrono::Utc::now().timestamp();
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());

    issue.status = status;
    issue.updated_at = now;
    stamp_resolution(&mut issue, now);
    if let Some(notes) = notes {
        issue.status_notes = Some(notes.to_string());
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| format!("Transaction error: {e}"))?;
    db::update_issue(&tx, &issue).map_err(|e| format!("Update error: {e}"))?;
    db::append_audit(
        &tx,
        &AuditEntry {
            id: 0,
            issue_id: issue.id.clone(),
            action: AuditAction::StatusChanged,
            from_status: Some(previous),
            to_status: Some(status),
            by: updated_by
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .unwrap_or(ANONYMOUS_REPORTER)
                .to_string(),
            notes: notes.map(str::to_string),
            timestamp: now,
        },
    )
    .map_err(|e| format!("Audit error: {e}"))?;
    tx.commit().map_err(|e| format!("Commit error: {e}"))?;

    log::info!(
        "issue {} status {} -> {}",
        issue.id,
        previous.as_str(),
        status.as_str()
    );
    let message = format!("Issue status updated to {}", status.as_str());
    Ok(IssueResult::ok(Some(issue), message))
}

pub fn delete_issue_internal(data_dir: &Path, issue_id: &str) -> Result<IssueResult, String> {
    let conn = db::open_store(data_dir)?;
    let removed = db::delete_issue(&conn, issue_id).map_err(|e| format!("Delete error: {e}"))?;
    if removed == 0 {
        return Ok(IssueResult::failed("Issue not found"));
    }

    log::info!("issue {issue_id} deleted");
    Ok(IssueResult::ok(None, "Issue deleted successfully"))
}

pub fn list_issues_internal(data_dir: &Path, filter: &IssueFilter) -> Result<Vec<Issue>, String> {
    let conn = db::open_store(data_dir)?;
    db::list_issues(&conn, filter).map_err(|e| format!("Query error: {e}"))
}

pub fn load_all_issues(data_dir: &Path) -> Result<Vec<Issue>, String> {
    list_issues_internal(data_dir, &IssueFilter::default())
}

pub fn get_audit_trail_internal(data_dir: &Path, issue_id: &str) -> Result<Vec<AuditEntry>, String> {
    let conn = db::open_store(data_dir)?;
    db::load_audit_trail(&conn, issue_id).map_err(|e| format!("Read error: {e}"))
}

pub fn clear_all_issues_internal(data_dir: &Path) -> Result<usize, String> {
    let conn = db::open_store(data_dir)?;
    let removed = db::clear_issues(&conn).map_err(|e| format!("Delete error: {e}"))?;
    log::warn!("cleared {removed} issues from the register");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> NewIssue {
        NewIssue {
            issue_type: "broken-ramp".to_string(),
            location: "Library".to_string(),
            description: "Ramp surface cracked".to_string(),
            latitude: Some(-0.4133),
            longitude: Some(34.5620),
            ..NewIssue::default()
        }
    }

    #[test]
    fn validation_requires_core_fields() {
        assert!(validate_form(&form()).is_ok());

        let blank_location = NewIssue {
            location: "  ".to_string(),
            ..form()
        };
        assert_eq!(validate_form(&blank_location).unwrap_err(), "Location is required");

        let half_coordinate = NewIssue {
            longitude: None,
            ..form()
        };
        assert!(validate_form(&half_coordinate).is_err());

        let bad_latitude = NewIssue {
            latitude: Some(120.0),
            ..form()
        };
        assert!(validate_form(&bad_latitude).is_err());
    }

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = new_issue_id();
        let b = new_issue_id();
        assert!(a.starts_with(ISSUE_ID_PREFIX));
        assert_ne!(a, b);
    }

    fn memory_store() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        db::initialize_schema(&conn).expect("schema init");
        conn
    }

    #[test]
    fn save_fills_defaults_then_merges_on_second_save() {
        let conn = memory_store();

        let draft = json!({
            "type": "lift-out-of-order",
            "location": "Science Building",
            "description": "Lift stuck on level 2",
            "severity": "high",
            "floor": "2"
        });
        let saved = save_issue_with_conn(&conn, draft).expect("first save");
        assert!(saved.id.starts_with(ISSUE_ID_PREFIX));
        assert_eq!(saved.reporter, "Anonymous");
        assert!(saved.created_at > 0);

        let edit = json!({
            "id": saved.id,
            "description": "Lift stuck on levels 2 and 3",
            "createdAt": 1
        });
        let resaved = save_issue_with_conn(&conn, edit).expect("second save");
        assert_eq!(resaved.created_at, saved.created_at);
        assert_eq!(resaved.description, "Lift stuck on levels 2 and 3");

        let trail = db::load_audit_trail(&conn, &saved.id).expect("audit");
        let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Created, AuditAction::Updated]);
    }

    #[test]
    fn partial_save_keeps_fields_it_does_not_mention() {
        let conn = memory_store();
        let original = save_issue_with_conn(
            &conn,
            json!({
                "type": "broken-ramp",
                "location": "Library",
                "description": "Ramp surface cracked",
                "severity": "high",
                "status": "resolved",
                "latitude": -0.4133,
                "longitude": 34.5620,
                "statusNotes": "Resurfaced by estates"
            }),
        )
        .expect("seed");
        assert!(original.resolved_at.is_some());

        let edited = save_issue_with_conn(
            &conn,
            json!({
                "id": original.id,
                "type": "broken-ramp",
                "location": "Library east entrance",
                "description": "Ramp surface cracked near the door"
            }),
        )
        .expect("partial save");

        assert_eq!(edited.location, "Library east entrance");
        assert_eq!(edited.status, IssueStatus::Resolved);
        assert_eq!(edited.severity, Severity::High);
        assert_eq!(edited.latitude, Some(-0.4133));
        assert_eq!(edited.longitude, Some(34.5620));
        assert_eq!(edited.status_notes.as_deref(), Some("Resurfaced by estates"));
        assert_eq!(edited.resolved_at, original.resolved_at);

        let stored = db::load_issue(&conn, &original.id).expect("load").expect("row");
        assert_eq!(stored, edited);
    }

    #[test]
    fn save_rejects_blank_fields_and_bad_coordinates() {
        let conn = memory_store();
        let seeded = save_issue_with_conn(
            &conn,
            json!({"type": "no-ramp", "location": "Hall 3", "description": "Steps only"}),
        )
        .expect("seed");

        let blank = save_issue_with_conn(&conn, json!({"id": seeded.id, "description": "   "}));
        assert_eq!(blank.unwrap_err(), "Invalid issue: Description is required");

        let off_globe = save_issue_with_conn(
            &conn,
            json!({"type": "no-ramp", "location": "Hall 3", "description": "x", "latitude": 200.0, "longitude": 0.0}),
        );
        assert!(off_globe.is_err());

        assert!(save_issue_with_conn(&conn, json!(["not", "an", "object"])).is_err());

        let stored = db::load_issue(&conn, &seeded.id).expect("load").expect("row");
        assert_eq!(stored.description, "Steps only");
        assert_eq!(db::list_issues(&conn, &IssueFilter::default()).expect("list").len(), 1);
    }

    #[test]
    fn resolution_stamp_follows_status() {
        let conn = memory_store();
        let issue = save_issue_with_conn(
            &conn,
            json!({"type": "no-ramp", "location": "Hall 3", "description": "Steps only"}),
        )
        .expect("seed");
        assert_eq!(issue.resolved_at, None);

        let mut resolved = issue.clone();
        resolved.status = IssueStatus::Resolved;
        stamp_resolution(&mut resolved, 500);
        assert_eq!(resolved.resolved_at, Some(500));

        stamp_resolution(&mut resolved, 900);
        assert_eq!(resolved.resolved_at, Some(500));

        resolved.status = IssueStatus::InProgress;
        stamp_resolution(&mut resolved, 900);
        assert_eq!(resolved.resolved_at, None);
    }

    #[test]
    fn created_issues_land_in_the_maintenance_inbox() {
        let dir = tempfile::tempdir().expect("tempdir");
        let urgent = create_issue_internal(
            dir.path(),
            NewIssue {
                severity: Some(Severity::High),
                ..form()
            },
        )
        .expect("create");
        assert!(urgent.success);
        create_issue_internal(dir.path(), form()).expect("create");

        let conn = db::open_store(dir.path()).expect("store");
        let inbox = db::load_unread_notifications(&conn).expect("inbox");
        assert_eq!(inbox.len(), 2);

        let alert = inbox
            .iter()
            .find(|n| n.kind == NotificationKind::HighSeverityAlert)
            .expect("high severity alert");
        assert_eq!(alert.message, "High Priority: broken-ramp at Library");
        assert_eq!(alert.issue_id, urgent.issue.expect("issue").id);
        assert!(inbox.iter().any(|n| n.kind == NotificationKind::NewIssue));
    }
}
