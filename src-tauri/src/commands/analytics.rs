use crate::analysis::stats;
use crate::commands::issues::load_all_issues;
use crate::models::analytics::*;
use crate::models::app_state::AppState;
use chrono::Utc;
use std::path::Path;

const DEFAULT_AREA_LIMIT: usize = 5;
const DEFAULT_TREND_DAYS: u32 = 7;
const MAX_TREND_DAYS: u32 = 365;

#[tauri::command]
pub async fn get_issue_analytics(state: tauri::State<'_, AppState>) -> Result<IssueAnalytics, String> {
    get_issue_analytics_internal(&state.data_dir)
}

#[tauri::command]
pub async fn get_issue_stats(state: tauri::State<'_, AppState>) -> Result<IssueStats, String> {
    let issues = load_all_issues(&state.data_dir)?;
    Ok(stats::issue_stats(&issues))
}

#[tauri::command]
pub async fn get_accessibility_score(state: tauri::State<'_, AppState>) -> Result<u32, String> {
    let issues = load_all_issues(&state.data_dir)?;
    Ok(stats::accessibility_score(&issues))
}

#[tauri::command]
pub async fn get_most_affected_areas(
    limit: Option<usize>,
    state: tauri::State<'_, AppState>,
) -> Result<Vec<AreaCount>, String> {
    let issues = load_all_issues(&state.data_dir)?;
    Ok(stats::most_affected_areas(
        &issues,
        limit.unwrap_or(DEFAULT_AREA_LIMIT),
    ))
}

#[tauri::command]
pub async fn get_report_trend(
    days: Option<u32>,
    state: tauri::State<'_, AppState>,
) -> Result<Vec<TrendPoint>, String> {
    get_report_trend_internal(&state.data_dir, days)
}

pub fn get_issue_analytics_internal(data_dir: &Path) -> Result<IssueAnalytics, String> {
    let issues = load_all_issues(data_dir)?;
    Ok(stats::compute_analytics(&issues))
}

pub fn get_report_trend_internal(data_dir: &Path, days: Option<u32>) -> Result<Vec<TrendPoint>, String> {
    let days = days.unwrap_or(DEFAULT_TREND_DAYS).clamp(1, MAX_TREND_DAYS);
    let issues = load_all_issues(data_dir)?;
    Ok(stats::report_trend(&issues, days, Utc::now().date_naive()))
}
