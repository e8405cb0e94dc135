use crate::analysis::stats;
use crate::commands::{db, issues, settings};
use crate::models::app_state::AppState;
use crate::models::export::*;
use crate::models::issue::{AuditAction, AuditEntry, Issue, IssueFilter, IssueStatus};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

const EXPORTS_DIR: &str = "exports";
const NO_ISSUES: &str = "No issues to export";

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Campus Accessibility Report</title>
<style>
  body { font-family: sans-serif; margin: 2rem; color: #222; }
  .stats { display: flex; gap: 1rem; margin-bottom: 1.5rem; }
  .stat { border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem 1rem; }
  .stat strong { display: block; font-size: 1.5rem; }
  table { border-collapse: collapse; width: 100%; }
  th, td { border: 1px solid #ddd; padding: 6px 8px; text-align: left; }
  th { background: #f4f4f4; }
  .badge { color: #fff; border-radius: 4px; padding: 2px 6px; }
</style>
</head>
<body>
<h1>Campus Accessibility Report</h1>
<p>Generated {{ generated }}</p>
<div class="stats">
  <div class="stat"><strong>{{ stats.total }}</strong>Total issues</div>
  <div class="stat"><strong>{{ stats.resolved }}</strong>Resolved</div>
  <div class="stat"><strong>{{ stats.inProgress }}</strong>In progress</div>
  <div class="stat"><strong>{{ stats.pending }}</strong>Pending</div>
  <div class="stat"><strong>{{ score }}</strong>Accessibility score</div>
</div>
{% if status_breakdown %}
<h2>Status breakdown</h2>
<ul>
{% for row in status_breakdown %}  <li><span class="badge" style="background: {{ row.color }}">{{ row.status }}</span> {{ row.count }}</li>
{% endfor %}</ul>
{% endif %}
<h2>Issues</h2>
<table>
  <thead>
    <tr><th>ID</th><th>Type</th><th>Location</th><th>Severity</th><th>Status</th><th>Reporter</th><th>Created</th><th>Description</th></tr>
  </thead>
  <tbody>
{% for row in rows %}    <tr>
      <td>{{ row.id }}</td>
      <td>{{ row.type }}</td>
      <td>{{ row.location }}</td>
      <td><span class="badge" style="background: {{ row.severityColor }}">{{ row.severity }}</span></td>
      <td><span class="badge" style="background: {{ row.statusColor }}">{{ row.status }}</span></td>
      <td>{{ row.reporter }}</td>
      <td>{{ row.created }}</td>
      <td>{{ row.description }}</td>
    </tr>
{% endfor %}  </tbody>
</table>
</body>
</html>
"#;

#[tauri::command]
pub async fn export_issues(
    format: Option<ExportFormat>,
    destination: Option<String>,
    state: tauri::State<'_, AppState>,
) -> Result<ExportResult, String> {
    export_issues_internal(
        &state.data_dir,
        format.unwrap_or_default(),
        destination.as_deref().map(Path::new),
    )
}

#[tauri::command]
pub async fn export_filtered(
    filter: IssueFilter,
    format: Option<ExportFormat>,
    destination: Option<String>,
    state: tauri::State<'_, AppState>,
) -> Result<ExportResult, String> {
    export_filtered_internal(
        &state.data_dir,
        &filter,
        format.unwrap_or_default(),
        destination.as_deref().map(Path::new),
    )
}

#[tauri::command]
pub async fn export_analytics_summary(
    destination: Option<String>,
    state: tauri::State<'_, AppState>,
) -> Result<ExportResult, String> {
    export_analytics_summary_internal(&state.data_dir, destination.as_deref().map(Path::new))
}

#[tauri::command]
pub async fn generate_report(
    include_status_breakdown: Option<bool>,
    destination: Option<String>,
    state: tauri::State<'_, AppState>,
) -> Result<ExportResult, String> {
    generate_report_internal(
        &state.data_dir,
        include_status_breakdown.unwrap_or(true),
        destination.as_deref().map(Path::new),
    )
}

#[tauri::command]
pub async fn export_backup(
    destination: Option<String>,
    state: tauri::State<'_, AppState>,
) -> Result<ExportResult, String> {
    export_backup_internal(&state.data_dir, destination.as_deref().map(Path::new))
}

#[tauri::command]
pub async fn import_backup(
    path: String,
    state: tauri::State<'_, AppState>,
) -> Result<ImportResult, String> {
    import_backup_internal(&state.data_dir, Path::new(&path))
}

/// Renders ordered rows as CSV. The header comes from the first row's keys;
/// every cell is quoted.
pub fn convert_to_csv(rows: &[Vec<(String, Value)>]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        first
            .iter()
            .map(|(key, _)| quote_cell(key))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        lines.push(
            row.iter()
                .map(|(_, value)| quote_cell(&cell_text(value)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

fn quote_cell(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

pub fn format_date_time(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

pub fn issue_csv_row(issue: &Issue) -> Vec<(String, Value)> {
    let cells: Vec<(&str, Value)> = vec![
        ("Issue ID", json!(issue.id)),
        ("Type", json!(issue.issue_type)),
        ("Location", json!(issue.location)),
        ("Description", json!(issue.description)),
        ("Severity", json!(issue.severity.as_str())),
        ("Status", json!(issue.status.as_str())),
        ("Reporter", json!(issue.reporter)),
        ("Latitude", json!(issue.latitude)),
        ("Longitude", json!(issue.longitude)),
        ("Created Date", json!(format_date_time(issue.created_at))),
        ("Updated Date", json!(format_date_time(issue.updated_at))),
        ("Building", json!(issue.building)),
        ("Floor", json!(issue.floor)),
        ("Attachments", json!(issue.attachments.len())),
        ("Notes", json!(issue.status_notes)),
        ("Tags", json!(issue.tags.join("; "))),
    ];
    cells
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn today_stamp() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn resolve_destination(data_dir: &Path, destination: Option<&Path>) -> Result<PathBuf, String> {
    let dir = destination
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(EXPORTS_DIR));
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create export dir: {e}"))?;
    Ok(dir)
}

fn write_export(dir: &Path, filename: String, contents: &str, count: usize) -> Result<ExportResult, String> {
    let path = dir.join(&filename);
    fs::write(&path, contents).map_err(|e| {
        log::error!("failed to write {}: {e}", path.display());
        format!("Failed to write export: {e}")
    })?;

    log::info!("exported {count} record(s) to {}", path.display());
    Ok(ExportResult {
        success: true,
        filename,
        path: path.to_string_lossy().to_string(),
        count,
    })
}

fn render_issues(issues: &[Issue], format: ExportFormat) -> Result<String, String> {
    match format {
        ExportFormat::Csv => {
            let rows: Vec<_> = issues.iter().map(issue_csv_row).collect();
            Ok(convert_to_csv(&rows))
        }
        ExportFormat::Json => {
            serde_json::to_string_pretty(issues).map_err(|e| format!("Serialize error: {e}"))
        }
    }
}

pub fn export_issues_internal(
    data_dir: &Path,
    format: ExportFormat,
    destination: Option<&Path>,
) -> Result<ExportResult, String> {
    let issues = issues::load_all_issues(data_dir)?;
    if issues.is_empty() {
        return Err(NO_ISSUES.to_string());
    }

    let filename = match format {
        ExportFormat::Csv => format!("campus_issues_{}.csv", today_stamp()),
        ExportFormat::Json => format!("campus_issues_backup_{}.json", today_stamp()),
    };
    let contents = render_issues(&issues, format)?;
    let dir = resolve_destination(data_dir, destination)?;
    write_export(&dir, filename, &contents, issues.len())
}

/// Reduces free text to `[A-Za-z0-9_-]` so it is safe inside a file name.
fn filename_slug(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub fn filtered_filename(filter: &IssueFilter, format: ExportFormat) -> String {
    let mut name = String::from("campus_issues");
    if let Some(status) = filter.status {
        name.push('_');
        name.push_str(status.as_str());
    }
    if let Some(issue_type) = filter.issue_type.as_deref().filter(|t| !t.trim().is_empty()) {
        name.push('_');
        name.push_str(&filename_slug(issue_type));
    }
    if let Some(severity) = filter.severity {
        name.push('_');
        name.push_str(severity.as_str());
    }
    format!("{name}_{}.{}", today_stamp(), format.extension())
}

pub fn export_filtered_internal(
    data_dir: &Path,
    filter: &IssueFilter,
    format: ExportFormat,
    destination: Option<&Path>,
) -> Result<ExportResult, String> {
    let issues = issues::list_issues_internal(data_dir, filter)?;
    if issues.is_empty() {
        return Err(NO_ISSUES.to_string());
    }

    let contents = render_issues(&issues, format)?;
    let dir = resolve_destination(data_dir, destination)?;
    write_export(&dir, filtered_filename(filter, format), &contents, issues.len())
}

pub fn export_analytics_summary_internal(
    data_dir: &Path,
    destination: Option<&Path>,
) -> Result<ExportResult, String> {
    let issues = issues::load_all_issues(data_dir)?;
    if issues.is_empty() {
        return Err(NO_ISSUES.to_string());
    }

    let summary = stats::analytics_summary(&issues);
    let contents =
        serde_json::to_string_pretty(&summary).map_err(|e| format!("Serialize error: {e}"))?;
    let dir = resolve_destination(data_dir, destination)?;
    write_export(
        &dir,
        format!("campus_analytics_{}.json", today_stamp()),
        &contents,
        issues.len(),
    )
}

pub fn render_report(issues: &[Issue], include_status_breakdown: bool) -> Result<String, String> {
    let mut tera = tera::Tera::default();
    tera.add_raw_template("report.html", REPORT_TEMPLATE)
        .map_err(|e| format!("Template error: {e}"))?;

    let rows: Vec<Value> = issues
        .iter()
        .map(|issue| {
            json!({
                "id": issue.id,
                "type": issue.issue_type,
                "location": issue.location,
                "severity": issue.severity.as_str(),
                "severityColor": stats::severity_color(issue.severity),
                "status": issue.status.as_str(),
                "statusColor": stats::status_color(issue.status),
                "reporter": issue.reporter,
                "created": format_date_time(issue.created_at),
                "description": issue.description,
            })
        })
        .collect();

    let mut context = tera::Context::new();
    context.insert("generated", &Utc::now().to_rfc3339());
    context.insert("stats", &stats::issue_stats(issues));
    context.insert("score", &stats::accessibility_score(issues));
    context.insert("rows", &rows);

    let breakdown: Vec<Value> = if include_status_breakdown {
        IssueStatus::ALL
            .iter()
            .map(|status| {
                json!({
                    "status": status.as_str(),
                    "color": stats::status_color(*status),
                    "count": issues.iter().filter(|i| i.status == *status).count(),
                })
            })
            .collect()
    } else {
        Vec::new()
    };
    context.insert("status_breakdown", &breakdown);

    tera.render("report.html", &context)
        .map_err(|e| format!("Render error: {e}"))
}

pub fn generate_report_internal(
    data_dir: &Path,
    include_status_breakdown: bool,
    destination: Option<&Path>,
) -> Result<ExportResult, String> {
    let issues = issues::load_all_issues(data_dir)?;
    if issues.is_empty() {
        return Err(NO_ISSUES.to_string());
    }

    let html = render_report(&issues, include_status_breakdown)?;
    let dir = resolve_destination(data_dir, destination)?;
    write_export(
        &dir,
        format!("campus_report_{}.html", today_stamp()),
        &html,
        issues.len(),
    )
}

pub fn export_backup_internal(
    data_dir: &Path,
    destination: Option<&Path>,
) -> Result<ExportResult, String> {
    let issues = issues::load_all_issues(data_dir)?;
    let backup = Backup {
        analytics: Some(stats::compute_analytics(&issues)),
        preferences: Some(settings::load_preferences_from_disk(data_dir)?),
        exported_at: Some(Utc::now().to_rfc3339()),
        issues,
    };

    let contents =
        serde_json::to_string_pretty(&backup).map_err(|e| format!("Serialize error: {e}"))?;
    let dir = resolve_destination(data_dir, destination)?;
    write_export(
        &dir,
        format!("campus_access_data_{}.json", today_stamp()),
        &contents,
        backup.issues.len(),
    )
}

/// Upserts every issue in the backup inside one transaction. Preferences are
/// replaced only when the backup carries them.
pub fn import_backup_internal(data_dir: &Path, path: &Path) -> Result<ImportResult, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("Failed to read backup: {e}"))?;
    let backup: Backup =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid backup file: {e}"))?;

    let conn = db::open_store(data_dir)?;
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| format!("Transaction error: {e}"))?;

    let now = Utc::now().timestamp();
    let mut imported = 0;
    let mut skipped = 0;
    for mut issue in backup.issues {
        if let Err(reason) = issues::validate_issue(&issue) {
            log::warn!("skipping backup issue {:?}: {reason}", issue.id);
            skipped += 1;
            continue;
        }
        if issue.id.trim().is_empty() {
            issue.id = issues::new_issue_id();
        }
        if issue.created_at <= 0 {
            issue.created_at = now;
        }
        if issue.updated_at < issue.created_at {
            issue.updated_at = issue.created_at;
        }
        let updated_at = issue.updated_at;
        issues::stamp_resolution(&mut issue, updated_at);

        let exists = db::load_issue(&tx, &issue.id)
            .map_err(|e| format!("Read error: {e}"))?
            .is_some();
        if exists {
            db::update_issue(&tx, &issue).map_err(|e| format!("Update error: {e}"))?;
        } else {
            db::insert_issue(&tx, &issue).map_err(|e| format!("Insert error: {e}"))?;
        }
        db::append_audit(
            &tx,
            &AuditEntry {
                id: 0,
                issue_id: issue.id.clone(),
                action: if exists {
                    AuditAction::Updated
                } else {
                    AuditAction::Created
                },
                from_status: None,
                to_status: Some(issue.status),
                by: issue.reporter.clone(),
                notes: Some("Imported from backup".to_string()),
                timestamp: now,
            },
        )
        .map_err(|e| format!("Audit error: {e}"))?;
        imported += 1;
    }
    tx.commit().map_err(|e| format!("Commit error: {e}"))?;

    let preferences_replaced = match backup.preferences {
        Some(prefs) if prefs.is_object() => {
            settings::replace_preferences_on_disk(data_dir, prefs)?;
            true
        }
        _ => false,
    };

    log::info!(
        "imported {imported} issue(s), skipped {skipped}, from {} (preferences replaced: {preferences_replaced})",
        path.display()
    );
    Ok(ImportResult {
        imported_issues: imported,
        skipped_issues: skipped,
        preferences_replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::Severity;

    fn sample_issue() -> Issue {
        Issue {
            id: "issue_1".to_string(),
            issue_type: "blocked-path".to_string(),
            location: "Main Gate".to_string(),
            latitude: Some(-0.4145),
            longitude: None,
            description: "Said \"closed\", no detour".to_string(),
            severity: Severity::Medium,
            status: IssueStatus::InProgress,
            reporter: "Anonymous".to_string(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            status_notes: None,
            building: None,
            floor: None,
            tags: vec!["gate".to_string(), "detour".to_string()],
            attachments: vec!["a.jpg".to_string()],
            resolved_at: None,
        }
    }

    #[test]
    fn csv_quotes_every_cell_and_doubles_quotes() {
        let rows = vec![vec![
            ("name".to_string(), json!("a \"b\"")),
            ("n".to_string(), json!(3)),
            ("missing".to_string(), Value::Null),
            ("nested".to_string(), json!({"k": 1})),
        ]];

        let csv = convert_to_csv(&rows);
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines[0], r#""name","n","missing","nested""#);
        assert_eq!(lines[1], r#""a ""b""","3","","{""k"":1}""#);
    }

    #[test]
    fn csv_of_nothing_is_empty() {
        assert_eq!(convert_to_csv(&[]), "");
    }

    #[test]
    fn issue_row_flattens_lists_and_dates() {
        let row = issue_csv_row(&sample_issue());
        let headers: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(headers.first(), Some(&"Issue ID"));
        assert_eq!(headers.last(), Some(&"Tags"));
        assert_eq!(headers.len(), 16);

        let lookup = |key: &str| row.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        assert_eq!(lookup("Tags"), Some(json!("gate; detour")));
        assert_eq!(lookup("Attachments"), Some(json!(1)));
        assert_eq!(lookup("Status"), Some(json!("in-progress")));
        assert_eq!(lookup("Created Date"), Some(json!("2023-11-14 22:13:20")));
        assert_eq!(lookup("Longitude"), Some(Value::Null));
    }

    #[test]
    fn filtered_filename_lists_active_filters() {
        let filter = IssueFilter {
            status: Some(IssueStatus::Resolved),
            severity: Some(Severity::High),
            ..IssueFilter::default()
        };
        let name = filtered_filename(&filter, ExportFormat::Json);
        assert!(name.starts_with("campus_issues_resolved_high_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn filtered_filename_slugs_free_text_types() {
        let filter = IssueFilter {
            issue_type: Some("stairs/steps ../x".to_string()),
            ..IssueFilter::default()
        };
        let name = filtered_filename(&filter, ExportFormat::Csv);
        assert!(name.starts_with("campus_issues_stairs-steps----x_"));
        assert!(!name.contains('/'));
        assert!(!name.contains(' '));
        assert_eq!(filename_slug("no-ramp_2"), "no-ramp_2");
    }

    #[test]
    fn import_skips_rows_that_fail_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = Issue {
            longitude: Some(34.5620),
            ..sample_issue()
        };
        let blank = Issue {
            id: "issue_blank".to_string(),
            description: "  ".to_string(),
            ..good.clone()
        };
        let off_globe = Issue {
            id: "issue_far".to_string(),
            latitude: Some(123.0),
            ..good.clone()
        };
        let resolved = Issue {
            id: "issue_done".to_string(),
            status: IssueStatus::Resolved,
            updated_at: 1_700_003_600,
            ..good.clone()
        };
        let backup = Backup {
            issues: vec![good, blank, off_globe, resolved],
            preferences: None,
            analytics: None,
            exported_at: None,
        };
        let path = dir.path().join("backup.json");
        fs::write(&path, serde_json::to_string(&backup).expect("serialize")).expect("write");

        let result = import_backup_internal(dir.path(), &path).expect("import");
        assert_eq!(result.imported_issues, 2);
        assert_eq!(result.skipped_issues, 2);

        let stored = issues::load_all_issues(dir.path()).expect("list");
        assert_eq!(stored.len(), 2);
        let done = stored.iter().find(|i| i.id == "issue_done").expect("resolved row");
        assert_eq!(done.resolved_at, Some(1_700_003_600));
    }

    #[test]
    fn report_escapes_markup_and_toggles_breakdown() {
        let mut issue = sample_issue();
        issue.description = "<script>alert(1)</script>".to_string();

        let html = render_report(&[issue.clone()], false).expect("render");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Status breakdown"));

        let with_breakdown = render_report(&[issue], true).expect("render");
        assert!(with_breakdown.contains("Status breakdown"));
        assert!(with_breakdown.contains("#17a2b8"));
    }
}
