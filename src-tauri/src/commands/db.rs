use crate::models::issue::{AuditAction, AuditEntry, Issue, IssueFilter, IssueStatus, Severity};
use crate::models::location::LocationPing;
use crate::models::notification::{MaintenanceNotification, NotificationKind, NotificationStats};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result, Row};
use std::path::Path;
use std::time::Duration;

const DB_SCHEMA_VERSION: i64 = 5;
const DB_FILE_NAME: &str = "campus.db";

const ISSUE_COLUMNS: &str = "id, issue_type, location, latitude, longitude, description, severity, status, reporter, created_at, updated_at, status_notes, building, floor, tags, attachments, resolved_at";

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 3 {
        apply_migration_3(conn)?;
        version = 3;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 4 {
        apply_migration_4(conn)?;
        version = 4;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 5 {
        apply_migration_5(conn)?;
        version = 5;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("database schema v{version} is newer than this build (v{DB_SCHEMA_VERSION})");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS issues (
            id TEXT PRIMARY KEY,
            issue_type TEXT NOT NULL,
            location TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            description TEXT NOT NULL,
            severity TEXT NOT NULL CHECK(severity IN ('low', 'medium', 'high')) DEFAULT 'low',
            status TEXT NOT NULL CHECK(status IN ('pending', 'in-progress', 'resolved')) DEFAULT 'pending',
            reporter TEXT NOT NULL DEFAULT 'Anonymous',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            status_notes TEXT,
            attachments TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS audit_trail (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
            action TEXT NOT NULL CHECK(action IN ('created', 'status_changed', 'updated')),
            from_status TEXT,
            to_status TEXT,
            actor TEXT NOT NULL,
            notes TEXT,
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS active_locations (
            user_id TEXT PRIMARY KEY,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            accuracy REAL,
            last_seen INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS location_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            accuracy REAL,
            timestamp INTEGER NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "issues", "building TEXT")?;
    add_column_if_missing(conn, "issues", "floor TEXT")?;
    add_column_if_missing(conn, "issues", "tags TEXT NOT NULL DEFAULT '[]'")?;
    Ok(())
}

fn apply_migration_3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
        CREATE INDEX IF NOT EXISTS idx_issues_created_at ON issues(created_at);
        CREATE INDEX IF NOT EXISTS idx_audit_trail_issue ON audit_trail(issue_id);
        CREATE INDEX IF NOT EXISTS idx_active_locations_last_seen ON active_locations(last_seen);
        CREATE INDEX IF NOT EXISTS idx_location_history_timestamp ON location_history(timestamp);
        ",
    )
}

fn apply_migration_4(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "issues", "resolved_at INTEGER")?;
    // Best guess for rows resolved before the column existed.
    conn.execute(
        "UPDATE issues SET resolved_at = updated_at WHERE status = 'resolved' AND resolved_at IS NULL",
        [],
    )?;
    Ok(())
}

fn apply_migration_5(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK(kind IN ('new_issue', 'high_severity_alert')),
            issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
            issue_snapshot TEXT,
            severity TEXT NOT NULL,
            message TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            read_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_read ON notifications(read, created_at);
        ",
    )
}

fn add_column_if_missing(conn: &Connection, table: &str, column_def: &str) -> Result<()> {
    let column_name = column_def
        .split_whitespace()
        .next()
        .unwrap_or(column_def)
        .to_string();

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|res| res.ok())
        .any(|name| name == column_name);

    if !exists {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column_def}"), [])?;
    }

    Ok(())
}

pub fn get_db_connection(data_dir: &Path) -> Result<Connection> {
    let conn = Connection::open(data_dir.join(DB_FILE_NAME))?;
    conn.busy_timeout(Duration::from_secs(5))?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Opens the store for a command, creating the data directory on first use.
pub fn open_store(data_dir: &Path) -> std::result::Result<Connection, String> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| format!("Failed to create data directory {}: {e}", data_dir.display()))?;
    get_db_connection(data_dir).map_err(|e| format!("DB error: {e}"))
}

fn issue_from_row(row: &Row<'_>) -> Result<Issue> {
    let severity: String = row.get(6)?;
    let status: String = row.get(7)?;
    let tags: String = row.get(14)?;
    let attachments: String = row.get(15)?;

    Ok(Issue {
        id: row.get(0)?,
        issue_type: row.get(1)?,
        location: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        description: row.get(5)?,
        severity: Severity::parse(&severity).unwrap_or_default(),
        status: IssueStatus::parse(&status).unwrap_or_default(),
        reporter: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        status_notes: row.get(11)?,
        building: row.get(12)?,
        floor: row.get(13)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        attachments: serde_json::from_str(&attachments).unwrap_or_default(),
        resolved_at: row.get(16)?,
    })
}

fn to_json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

pub fn insert_issue(conn: &Connection, issue: &Issue) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO issues ({ISSUE_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)"),
        params![
            &issue.id,
            &issue.issue_type,
            &issue.location,
            issue.latitude,
            issue.longitude,
            &issue.description,
            issue.severity.as_str(),
            issue.status.as_str(),
            &issue.reporter,
            issue.created_at,
            issue.updated_at,
            issue.status_notes.as_deref(),
            issue.building.as_deref(),
            issue.floor.as_deref(),
            to_json_list(&issue.tags),
            to_json_list(&issue.attachments),
            issue.resolved_at,
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column; returns the number of rows touched.
pub fn update_issue(conn: &Connection, issue: &Issue) -> Result<usize> {
    conn.execute(
        "UPDATE issues SET issue_type=?2, location=?3, latitude=?4, longitude=?5, description=?6, severity=?7, status=?8, reporter=?9, created_at=?10, updated_at=?11, status_notes=?12, building=?13, floor=?14, tags=?15, attachments=?16, resolved_at=?17 WHERE id=?1",
        params![
            &issue.id,
            &issue.issue_type,
            &issue.location,
            issue.latitude,
            issue.longitude,
            &issue.description,
            issue.severity.as_str(),
            issue.status.as_str(),
            &issue.reporter,
            issue.created_at,
            issue.updated_at,
            issue.status_notes.as_deref(),
            issue.building.as_deref(),
            issue.floor.as_deref(),
            to_json_list(&issue.tags),
            to_json_list(&issue.attachments),
            issue.resolved_at,
        ],
    )
}

pub fn load_issue(conn: &Connection, id: &str) -> Result<Option<Issue>> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
        params![id],
        issue_from_row,
    )
    .optional()
}

/// Newest first.
pub fn list_issues(conn: &Connection, filter: &IssueFilter) -> Result<Vec<Issue>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(SqlValue::Text(status.as_str().to_string()));
    }
    if let Some(issue_type) = filter.issue_type.as_deref().filter(|t| !t.is_empty()) {
        clauses.push("issue_type = ?");
        values.push(SqlValue::Text(issue_type.to_string()));
    }
    if let Some(severity) = filter.severity {
        clauses.push("severity = ?");
        values.push(SqlValue::Text(severity.as_str().to_string()));
    }
    if let Some(start) = filter.start_date {
        clauses.push("created_at >= ?");
        values.push(SqlValue::Integer(start));
    }
    if let Some(end) = filter.end_date {
        clauses.push("created_at <= ?");
        values.push(SqlValue::Integer(end));
    }
    if let Some(location) = filter.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        clauses.push("LOWER(location) LIKE ? ESCAPE '\\'");
        values.push(SqlValue::Text(format!("%{}%", escape_like(&location.to_lowercase()))));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues{where_clause} ORDER BY created_at DESC, id DESC"
    ))?;
    let issues = stmt
        .query_map(params_from_iter(values), issue_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(issues)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Audit rows go with the issue through the cascade.
pub fn delete_issue(conn: &Connection, id: &str) -> Result<usize> {
    conn.execute("DELETE FROM issues WHERE id = ?1", params![id])
}

pub fn clear_issues(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM issues", [])
}

pub fn append_audit(conn: &Connection, entry: &AuditEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO audit_trail (issue_id, action, from_status, to_status, actor, notes, timestamp) VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            &entry.issue_id,
            entry.action.as_str(),
            entry.from_status.map(IssueStatus::as_str),
            entry.to_status.map(IssueStatus::as_str),
            &entry.by,
            entry.notes.as_deref(),
            entry.timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Oldest first.
pub fn load_audit_trail(conn: &Connection, issue_id: &str) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, issue_id, action, from_status, to_status, actor, notes, timestamp FROM audit_trail WHERE issue_id = ?1 ORDER BY timestamp ASC, id ASC",
    )?;

    let entries = stmt
        .query_map(params![issue_id], |row| {
            let action: String = row.get(2)?;
            let from_status: Option<String> = row.get(3)?;
            let to_status: Option<String> = row.get(4)?;
            Ok(AuditEntry {
                id: row.get(0)?,
                issue_id: row.get(1)?,
                action: AuditAction::parse(&action).unwrap_or(AuditAction::Updated),
                from_status: from_status.as_deref().and_then(IssueStatus::parse),
                to_status: to_status.as_deref().and_then(IssueStatus::parse),
                by: row.get(5)?,
                notes: row.get(6)?,
                timestamp: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(entries)
}

pub fn upsert_active_location(conn: &Connection, ping: &LocationPing) -> Result<()> {
    conn.execute(
        "
        INSERT INTO active_locations (user_id, latitude, longitude, accuracy, last_seen)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id) DO UPDATE SET
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            accuracy = excluded.accuracy,
            last_seen = excluded.last_seen
        ",
        params![&ping.user_id, ping.latitude, ping.longitude, ping.accuracy, ping.timestamp],
    )?;
    Ok(())
}

pub fn append_location_history(conn: &Connection, ping: &LocationPing) -> Result<()> {
    conn.execute(
        "INSERT INTO location_history (user_id, latitude, longitude, accuracy, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&ping.user_id, ping.latitude, ping.longitude, ping.accuracy, ping.timestamp],
    )?;
    Ok(())
}

fn ping_from_row(row: &Row<'_>) -> Result<LocationPing> {
    Ok(LocationPing {
        user_id: row.get(0)?,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        accuracy: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

/// Users seen at or after `since` (unix seconds).
pub fn load_active_locations(conn: &Connection, since: i64) -> Result<Vec<LocationPing>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, latitude, longitude, accuracy, last_seen FROM active_locations WHERE last_seen >= ?1 ORDER BY user_id ASC",
    )?;
    let pings = stmt
        .query_map(params![since], ping_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(pings)
}

pub fn load_location_history(conn: &Connection, since: i64) -> Result<Vec<LocationPing>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, latitude, longitude, accuracy, timestamp FROM location_history WHERE timestamp >= ?1 ORDER BY timestamp ASC",
    )?;
    let pings = stmt
        .query_map(params![since], ping_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(pings)
}

/// History pings with `since <= timestamp <= until`.
pub fn load_location_history_between(conn: &Connection, since: i64, until: i64) -> Result<Vec<LocationPing>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, latitude, longitude, accuracy, timestamp FROM location_history WHERE timestamp >= ?1 AND timestamp <= ?2 ORDER BY timestamp ASC",
    )?;
    let pings = stmt
        .query_map(params![since, until], ping_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(pings)
}

pub fn prune_location_history(conn: &Connection, before: i64) -> Result<usize> {
    conn.execute("DELETE FROM location_history WHERE timestamp < ?1", params![before])
}

pub fn remove_active_location(conn: &Connection, user_id: &str) -> Result<usize> {
    conn.execute("DELETE FROM active_locations WHERE user_id = ?1", params![user_id])
}

pub fn prune_active_locations(conn: &Connection, before: i64) -> Result<usize> {
    conn.execute("DELETE FROM active_locations WHERE last_seen < ?1", params![before])
}

pub fn insert_notification(conn: &Connection, notification: &MaintenanceNotification) -> Result<i64> {
    let snapshot = notification
        .issue
        .as_ref()
        .and_then(|issue| serde_json::to_string(issue).ok());
    conn.execute(
        "INSERT INTO notifications (kind, issue_id, issue_snapshot, severity, message, read, created_at, read_at) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            notification.kind.as_str(),
            &notification.issue_id,
            snapshot,
            notification.severity.as_str(),
            &notification.message,
            notification.read,
            notification.created_at,
            notification.read_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn notification_from_row(row: &Row<'_>) -> Result<MaintenanceNotification> {
    let kind: String = row.get(1)?;
    let snapshot: Option<String> = row.get(3)?;
    let severity: String = row.get(4)?;
    Ok(MaintenanceNotification {
        id: row.get(0)?,
        kind: NotificationKind::parse(&kind).unwrap_or(NotificationKind::NewIssue),
        issue_id: row.get(2)?,
        issue: snapshot.and_then(|raw| serde_json::from_str(&raw).ok()),
        severity: Severity::parse(&severity).unwrap_or_default(),
        message: row.get(5)?,
        read: row.get(6)?,
        created_at: row.get(7)?,
        read_at: row.get(8)?,
    })
}

/// Newest first.
pub fn load_unread_notifications(conn: &Connection) -> Result<Vec<MaintenanceNotification>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, issue_id, issue_snapshot, severity, message, read, created_at, read_at FROM notifications WHERE read = 0 ORDER BY created_at DESC, id DESC",
    )?;
    let notifications = stmt
        .query_map([], notification_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(notifications)
}

/// Marking twice keeps the first `read_at`.
pub fn mark_notification_read(conn: &Connection, id: i64, at: i64) -> Result<usize> {
    conn.execute(
        "UPDATE notifications SET read = 1, read_at = COALESCE(read_at, ?2) WHERE id = ?1",
        params![id, at],
    )
}

pub fn notification_stats(conn: &Connection) -> Result<NotificationStats> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN read = 0 THEN 1 ELSE 0 END), 0) FROM notifications",
        [],
        |row| {
            let total: i64 = row.get(0)?;
            let unread: i64 = row.get(1)?;
            Ok(NotificationStats {
                total: total as usize,
                unread: unread as usize,
                read: (total - unread) as usize,
            })
        },
    )
}
