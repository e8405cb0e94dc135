use crate::analysis::{campus, geo, travel};
use crate::commands::tracking;
use crate::models::app_state::AppState;
use crate::models::location::{CampusLocation, Coordinate};
use crate::models::route::{Route, RouteOptions};
use std::path::Path;

#[tauri::command]
pub async fn get_route(
    start: Coordinate,
    end: Coordinate,
    options: Option<RouteOptions>,
    state: tauri::State<'_, AppState>,
) -> Result<Route, String> {
    get_route_internal(&state.data_dir, start, end, options.unwrap_or_default())
}

#[tauri::command]
pub async fn get_accessible_route(
    start: Coordinate,
    end: Coordinate,
    avoid_crowded: Option<bool>,
    state: tauri::State<'_, AppState>,
) -> Result<Route, String> {
    get_accessible_route_internal(&state.data_dir, start, end, avoid_crowded.unwrap_or(false))
}

#[tauri::command]
pub fn search_campus_locations(query: String) -> Vec<CampusLocation> {
    campus::search_locations(&query)
}

#[tauri::command]
pub fn get_campus_location(name: String) -> Option<CampusLocation> {
    campus::location_by_name(&name)
}

#[tauri::command]
pub fn list_campus_locations() -> Vec<CampusLocation> {
    campus::campus_locations()
}

/// Great-circle distance in meters.
#[tauri::command]
pub fn calculate_distance(from: Coordinate, to: Coordinate) -> Result<f64, String> {
    geo::validate_coordinate(from.latitude, from.longitude)?;
    geo::validate_coordinate(to.latitude, to.longitude)?;
    Ok(geo::haversine_distance_meters(&from, &to))
}

pub fn get_route_internal(
    data_dir: &Path,
    start: Coordinate,
    end: Coordinate,
    options: RouteOptions,
) -> Result<Route, String> {
    geo::validate_coordinate(start.latitude, start.longitude)?;
    geo::validate_coordinate(end.latitude, end.longitude)?;

    let crowded = if options.avoid_crowded {
        let mid = geo::midpoint(&start, &end);
        tracking::is_in_crowded_area_internal(data_dir, mid)?
    } else {
        false
    };

    let route = travel::build_route(start, end, options, crowded);
    log::debug!(
        "route {}m, {} min (wheelchair: {}, crowded: {})",
        route.distance,
        route.time_minutes,
        route.wheelchair,
        route.is_crowded
    );
    Ok(route)
}

pub fn get_accessible_route_internal(
    data_dir: &Path,
    start: Coordinate,
    end: Coordinate,
    avoid_crowded: bool,
) -> Result<Route, String> {
    let options = RouteOptions {
        wheelchair: true,
        avoid_crowded,
    };
    let mut route = get_route_internal(data_dir, start, end, options)?;
    route.accessibility = Some(travel::accessible_profile());
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessible_route_is_slower_and_carries_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let library = Coordinate::new(-0.4133, 34.5620);
        let sports = Coordinate::new(-0.4150, 34.5640);

        let walking = get_route_internal(dir.path(), library, sports, RouteOptions::default())
            .expect("walking route");
        let wheelchair = get_accessible_route_internal(dir.path(), library, sports, false)
            .expect("accessible route");

        assert_eq!(walking.distance, wheelchair.distance);
        assert!(wheelchair.time_seconds > walking.time_seconds);
        assert!(walking.accessibility.is_none());
        assert!(wheelchair.accessibility.is_some());
        assert!(wheelchair.wheelchair);
    }

    #[test]
    fn distance_rejects_invalid_points() {
        let ok = Coordinate::new(0.0, 0.0);
        let bad = Coordinate::new(0.0, 200.0);
        assert!(calculate_distance(ok, bad).is_err());
        assert_eq!(calculate_distance(ok, ok), Ok(0.0));
    }
}
