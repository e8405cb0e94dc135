use crate::analysis::density;
use crate::analysis::geo::validate_coordinate;
use crate::commands::{db, settings};
use crate::models::app_state::AppState;
use crate::models::location::*;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;

const ANONYMOUS_USER: &str = "anonymous";
/// Radius used for "am I in a crowd" checks, meters.
pub const CROWD_CHECK_RADIUS_M: f64 = 100.0;
const DEFAULT_CROWDED_CELL_THRESHOLD: usize = 3;
/// Longest selectable popular-areas window; older history is never read.
pub const HISTORY_RETENTION_SECS: i64 = 168 * 3600;

#[tauri::command]
pub async fn record_location(
    update: LocationUpdate,
    state: tauri::State<'_, AppState>,
) -> Result<LocationPing, String> {
    record_location_internal(&state.data_dir, update)
}

#[tauri::command]
pub async fn stop_tracking(
    user_id: Option<String>,
    state: tauri::State<'_, AppState>,
) -> Result<bool, String> {
    stop_tracking_internal(&state.data_dir, user_id.as_deref().unwrap_or(ANONYMOUS_USER))
}

#[tauri::command]
pub async fn get_crowd_density(
    latitude: f64,
    longitude: f64,
    radius: Option<f64>,
    state: tauri::State<'_, AppState>,
) -> Result<CrowdDensity, String> {
    get_crowd_density_internal(&state.data_dir, Coordinate::new(latitude, longitude), radius)
}

#[tauri::command]
pub async fn is_in_crowded_area(
    latitude: f64,
    longitude: f64,
    state: tauri::State<'_, AppState>,
) -> Result<bool, String> {
    is_in_crowded_area_internal(&state.data_dir, Coordinate::new(latitude, longitude))
}

#[tauri::command]
pub async fn get_heatmap_points(
    bounds: Bounds,
    state: tauri::State<'_, AppState>,
) -> Result<Vec<HeatPoint>, String> {
    get_heatmap_points_internal(&state.data_dir, &bounds)
}

#[tauri::command]
pub async fn get_popular_areas(
    hours: Option<u32>,
    state: tauri::State<'_, AppState>,
) -> Result<Vec<GridCell>, String> {
    get_popular_areas_internal(&state.data_dir, hours)
}

#[tauri::command]
pub async fn get_crowded_areas(
    threshold: Option<usize>,
    state: tauri::State<'_, AppState>,
) -> Result<Vec<GridCell>, String> {
    get_crowded_areas_internal(&state.data_dir, threshold)
}

#[tauri::command]
pub async fn get_historical_traffic(
    start: i64,
    end: i64,
    state: tauri::State<'_, AppState>,
) -> Result<BTreeMap<String, usize>, String> {
    get_historical_traffic_internal(&state.data_dir, start, end)
}

#[tauri::command]
pub async fn analyze_traffic(
    bounds: Bounds,
    state: tauri::State<'_, AppState>,
) -> Result<TrafficAnalysis, String> {
    analyze_traffic_internal(&state.data_dir, &bounds)
}

pub fn record_location_internal(data_dir: &Path, update: LocationUpdate) -> Result<LocationPing, String> {
    validate_coordinate(update.latitude, update.longitude)?;

    let prefs = settings::load_effective_preferences(data_dir)?;
    let now = Utc::now().timestamp();
    let ping = LocationPing {
        user_id: update
            .user_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
        latitude: update.latitude,
        longitude: update.longitude,
        accuracy: update.accuracy,
        timestamp: now,
    };

    let conn = db::open_store(data_dir)?;
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| format!("Transaction error: {e}"))?;
    db::upsert_active_location(&tx, &ping).map_err(|e| format!("Insert error: {e}"))?;
    db::append_location_history(&tx, &ping).map_err(|e| format!("Insert error: {e}"))?;
    let pruned = db::prune_active_locations(&tx, active_cutoff(now, prefs.active_window_minutes))
        .map_err(|e| format!("Delete error: {e}"))?;
    let expired = db::prune_location_history(&tx, now - HISTORY_RETENTION_SECS)
        .map_err(|e| format!("Delete error: {e}"))?;
    tx.commit().map_err(|e| format!("Commit error: {e}"))?;

    if pruned > 0 {
        log::debug!("pruned {pruned} stale active location(s)");
    }
    if expired > 0 {
        log::debug!("dropped {expired} location history row(s) past retention");
    }
    Ok(ping)
}

pub fn stop_tracking_internal(data_dir: &Path, user_id: &str) -> Result<bool, String> {
    let conn = db::open_store(data_dir)?;
    let removed = db::remove_active_location(&conn, user_id).map_err(|e| format!("Delete error: {e}"))?;
    log::info!("location tracking stopped for {user_id}");
    Ok(removed > 0)
}

fn active_cutoff(now: i64, window_minutes: u32) -> i64 {
    now - i64::from(window_minutes) * 60
}

/// Pings from users seen within the active window.
pub fn active_pings(data_dir: &Path) -> Result<Vec<LocationPing>, String> {
    let prefs = settings::load_effective_preferences(data_dir)?;
    let conn = db::open_store(data_dir)?;
    let since = active_cutoff(Utc::now().timestamp(), prefs.active_window_minutes);
    db::load_active_locations(&conn, since).map_err(|e| format!("Query error: {e}"))
}

pub fn get_crowd_density_internal(
    data_dir: &Path,
    center: Coordinate,
    radius: Option<f64>,
) -> Result<CrowdDensity, String> {
    validate_coordinate(center.latitude, center.longitude)?;
    let radius = match radius {
        Some(r) if r > 0.0 => r,
        _ => settings::load_effective_preferences(data_dir)?.crowd_radius_meters,
    };
    let pings = active_pings(data_dir)?;
    Ok(density::crowd_density(center, &pings, radius))
}

pub fn is_in_crowded_area_internal(data_dir: &Path, point: Coordinate) -> Result<bool, String> {
    let threshold = settings::load_effective_preferences(data_dir)?.crowded_threshold;
    let crowd = get_crowd_density_internal(data_dir, point, Some(CROWD_CHECK_RADIUS_M))?;
    Ok(crowd.density >= threshold)
}

pub fn get_heatmap_points_internal(data_dir: &Path, bounds: &Bounds) -> Result<Vec<HeatPoint>, String> {
    let pings = active_pings(data_dir)?;
    Ok(density::heatmap_points(&pings, bounds))
}

pub fn get_popular_areas_internal(data_dir: &Path, hours: Option<u32>) -> Result<Vec<GridCell>, String> {
    let hours = match hours {
        Some(h) if h > 0 => h,
        _ => settings::load_effective_preferences(data_dir)?.popular_window_hours,
    };
    let since = Utc::now().timestamp() - i64::from(hours) * 3600;

    let conn = db::open_store(data_dir)?;
    let history = db::load_location_history(&conn, since).map_err(|e| format!("Query error: {e}"))?;
    Ok(density::popular_areas(&history))
}

pub fn get_crowded_areas_internal(data_dir: &Path, threshold: Option<usize>) -> Result<Vec<GridCell>, String> {
    let areas = get_popular_areas_internal(data_dir, None)?;
    Ok(density::crowded_areas(
        areas,
        threshold.unwrap_or(DEFAULT_CROWDED_CELL_THRESHOLD),
    ))
}

/// Pings recorded between `start` and `end` (unix seconds, inclusive), counted per hour of day.
pub fn get_historical_traffic_internal(
    data_dir: &Path,
    start: i64,
    end: i64,
) -> Result<BTreeMap<String, usize>, String> {
    if start > end {
        return Err("Start must not be after end".to_string());
    }
    let conn = db::open_store(data_dir)?;
    let history =
        db::load_location_history_between(&conn, start, end).map_err(|e| format!("Query error: {e}"))?;
    Ok(density::bucket_by_hour(&history))
}

pub fn analyze_traffic_internal(data_dir: &Path, bounds: &Bounds) -> Result<TrafficAnalysis, String> {
    let prefs = settings::load_effective_preferences(data_dir)?;
    let on_campus = get_heatmap_points_internal(data_dir, bounds)?.len();
    let popular = get_popular_areas_internal(data_dir, None)?;
    let crowded = density::crowded_areas(popular.clone(), DEFAULT_CROWDED_CELL_THRESHOLD);

    Ok(TrafficAnalysis {
        total_people_on_campus: on_campus,
        crowded_areas_count: crowded.len(),
        crowded_areas: crowded,
        popular_routes: popular,
        timestamp: Utc::now().to_rfc3339(),
        analysis_window: format!("{} hours", prefs.popular_window_hours),
    })
}
