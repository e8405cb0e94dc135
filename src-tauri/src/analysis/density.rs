use crate::analysis::geo::haversine_distance_meters;
use crate::models::location::*;
use chrono::{DateTime, Timelike, Utc};
use std::collections::{BTreeMap, HashMap};

/// About 50 m at campus latitudes.
pub const GRID_CELL_DEGREES: f64 = 0.0005;
pub const POPULAR_AREA_LIMIT: usize = 20;

/// Head count of pings within `radius_m` of `center`.
pub fn crowd_density(center: Coordinate, pings: &[LocationPing], radius_m: f64) -> CrowdDensity {
    let density = pings
        .iter()
        .filter(|ping| haversine_distance_meters(&center, &ping.coordinate()) <= radius_m)
        .count();

    CrowdDensity {
        density,
        radius: radius_m,
        center,
        level: DensityLevel::for_radius_count(density),
    }
}

pub fn heatmap_points(pings: &[LocationPing], bounds: &Bounds) -> Vec<HeatPoint> {
    pings
        .iter()
        .filter(|ping| bounds.contains(ping.latitude, ping.longitude))
        .map(|ping| HeatPoint {
            lat: ping.latitude,
            lng: ping.longitude,
            weight: 1.0,
        })
        .collect()
}

/// Histogram of pings per grid cell, busiest first, at most `limit` cells.
pub fn bucket_into_grid(pings: &[LocationPing], cell_degrees: f64, limit: usize) -> Vec<GridCell> {
    let mut counts: HashMap<(i64, i64), usize> = HashMap::new();
    for ping in pings {
        let key = (
            (ping.latitude / cell_degrees).floor() as i64,
            (ping.longitude / cell_degrees).floor() as i64,
        );
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut cells: Vec<((i64, i64), usize)> = counts.into_iter().collect();
    cells.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    cells.truncate(limit);

    cells
        .into_iter()
        .map(|((row, col), count)| GridCell {
            lat: row as f64 * cell_degrees,
            lng: col as f64 * cell_degrees,
            count,
            level: DensityLevel::for_cell_count(count),
        })
        .collect()
}

pub fn popular_areas(pings: &[LocationPing]) -> Vec<GridCell> {
    bucket_into_grid(pings, GRID_CELL_DEGREES, POPULAR_AREA_LIMIT)
}

pub fn crowded_areas(areas: Vec<GridCell>, threshold: usize) -> Vec<GridCell> {
    areas
        .into_iter()
        .filter(|area| area.count >= threshold)
        .collect()
}

/// Ping counts per UTC hour of day, keyed "HH:00". Hours with no pings are absent.
pub fn bucket_by_hour(pings: &[LocationPing]) -> BTreeMap<String, usize> {
    let mut hours = BTreeMap::new();
    for ping in pings {
        let Some(at) = DateTime::<Utc>::from_timestamp(ping.timestamp, 0) else {
            continue;
        };
        *hours.entry(format!("{:02}:00", at.hour())).or_insert(0) += 1;
    }
    hours
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(user: &str, latitude: f64, longitude: f64) -> LocationPing {
        LocationPing {
            user_id: user.to_string(),
            latitude,
            longitude,
            accuracy: None,
            timestamp: 0,
        }
    }

    #[test]
    fn density_counts_only_pings_inside_radius() {
        let center = Coordinate::new(-0.4133, 34.5620);
        let pings = vec![
            ping("a", -0.4133, 34.5620),
            ping("b", -0.41335, 34.56205),
            ping("c", -0.4150, 34.5640), // ~300 m away
        ];

        let density = crowd_density(center, &pings, 50.0);
        assert_eq!(density.density, 2);
        assert_eq!(density.level, DensityLevel::Low);
    }

    #[test]
    fn density_levels_follow_thresholds() {
        assert_eq!(DensityLevel::for_radius_count(2), DensityLevel::Low);
        assert_eq!(DensityLevel::for_radius_count(3), DensityLevel::Medium);
        assert_eq!(DensityLevel::for_radius_count(10), DensityLevel::High);
        assert_eq!(DensityLevel::for_cell_count(4), DensityLevel::Low);
        assert_eq!(DensityLevel::for_cell_count(14), DensityLevel::Medium);
        assert_eq!(DensityLevel::for_cell_count(15), DensityLevel::High);
    }

    #[test]
    fn heatmap_keeps_points_on_the_boundary() {
        let bounds = Bounds {
            north: 1.0,
            south: 0.0,
            east: 1.0,
            west: 0.0,
        };
        let pings = vec![ping("a", 1.0, 0.5), ping("b", 0.5, 1.5)];
        let points = heatmap_points(&pings, &bounds);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].weight, 1.0);
    }

    #[test]
    fn grid_groups_nearby_pings_and_orders_by_count() {
        let pings = vec![
            ping("a", 0.00010, 0.00010),
            ping("b", 0.00020, 0.00040),
            ping("c", 0.00060, 0.00010),
        ];

        let cells = bucket_into_grid(&pings, GRID_CELL_DEGREES, 10);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].count, 2);
        assert_eq!(cells[0].lat, 0.0);
        assert_eq!(cells[1].count, 1);
        assert!((cells[1].lat - GRID_CELL_DEGREES).abs() < 1e-12);
    }

    #[test]
    fn negative_coordinates_floor_into_the_southern_cell() {
        let cells = bucket_into_grid(&[ping("a", -0.0001, -0.0001)], GRID_CELL_DEGREES, 10);
        assert!((cells[0].lat + GRID_CELL_DEGREES).abs() < 1e-12);
        assert!((cells[0].lng + GRID_CELL_DEGREES).abs() < 1e-12);
    }

    #[test]
    fn crowded_areas_apply_threshold() {
        let pings: Vec<LocationPing> = (0..4)
            .map(|i| ping(&i.to_string(), 0.0001, 0.0001))
            .chain(std::iter::once(ping("x", 0.01, 0.01)))
            .collect();
        let crowded = crowded_areas(popular_areas(&pings), 3);
        assert_eq!(crowded.len(), 1);
        assert_eq!(crowded[0].count, 4);
    }

    #[test]
    fn hourly_buckets_use_zero_padded_utc_hours() {
        let at = |timestamp| LocationPing {
            timestamp,
            ..ping("a", 0.0, 0.0)
        };
        // 1970-01-01 09:15, 09:59, 14:00 and the next day's 09:30
        let pings = vec![at(33_300), at(35_940), at(50_400), at(86_400 + 34_200)];

        let hours = bucket_by_hour(&pings);
        assert_eq!(hours.len(), 2);
        assert_eq!(hours.get("09:00"), Some(&3));
        assert_eq!(hours.get("14:00"), Some(&1));
        assert_eq!(hours.keys().next().map(String::as_str), Some("09:00"));
    }
}
