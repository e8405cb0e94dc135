use crate::commands::db;
use crate::models::app_state::AppState;
use crate::models::notification::{MaintenanceNotification, NotificationStats};
use std::path::Path;

#[tauri::command]
pub async fn get_unread_notifications(
    state: tauri::State<'_, AppState>,
) -> Result<Vec<MaintenanceNotification>, String> {
    get_unread_notifications_internal(&state.data_dir)
}

#[tauri::command]
pub async fn mark_notification_read(id: i64, state: tauri::State<'_, AppState>) -> Result<bool, String> {
    mark_notification_read_internal(&state.data_dir, id)
}

#[tauri::command]
pub async fn get_notification_stats(state: tauri::State<'_, AppState>) -> Result<NotificationStats, String> {
    get_notification_stats_internal(&state.data_dir)
}

/// Newest first.
pub fn get_unread_notifications_internal(data_dir: &Path) -> Result<Vec<MaintenanceNotification>, String> {
    let conn = db::open_store(data_dir)?;
    db::load_unread_notifications(&conn).map_err(|e| format!("Query error: {e}"))
}

/// Returns false for an unknown id. Marking twice keeps the first read time.
pub fn mark_notification_read_internal(data_dir: &Path, id: i64) -> Result<bool, String> {
    let conn = db::open_store(data_dir)?;
    let now = chrono::Utc::now().timestamp();
    let updated = db::mark_notification_read(&conn, id, now).map_err(|e| format!("Update error: {e}"))?;
    if updated > 0 {
        log::debug!("notification {id} marked read");
    }
    Ok(updated > 0)
}

pub fn get_notification_stats_internal(data_dir: &Path) -> Result<NotificationStats, String> {
    let conn = db::open_store(data_dir)?;
    db::notification_stats(&conn).map_err(|e| format!("Query error: {e}"))
}
