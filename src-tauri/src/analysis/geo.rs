use crate::models::location::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const COMPASS_POINTS: [&str; 8] = [
    "North",
    "Northeast",
    "East",
    "Southeast",
    "South",
    "Southwest",
    "West",
    "Northwest",
];

/// Great-circle distance in meters (haversine).
pub fn haversine_distance_meters(from: &Coordinate, to: &Coordinate) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial bearing from `from` to `to`, degrees clockwise from north in [0, 360).
pub fn bearing_degrees(from: &Coordinate, to: &Coordinate) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// 8-point compass heading; each sector spans 45° centered on its heading.
pub fn compass_direction(bearing: f64) -> &'static str {
    let normalized = bearing.rem_euclid(360.0);
    let index = (normalized / 45.0).round() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

/// Planar midpoint; good enough at campus scale.
pub fn midpoint(a: &Coordinate, b: &Coordinate) -> Coordinate {
    Coordinate::new(
        (a.latitude + b.latitude) / 2.0,
        (a.longitude + b.longitude) / 2.0,
    )
}

pub fn validate_coordinate(latitude: f64, longitude: f64) -> Result<(), String> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("Latitude out of range: {latitude}"));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("Longitude out of range: {longitude}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_campus_landmarks_is_plausible() {
        let main_gate = Coordinate::new(-0.4145, 34.5610);
        let library = Coordinate::new(-0.4133, 34.5620);
        let d = haversine_distance_meters(&main_gate, &library);
        // ~0.0012° lat and ~0.001° lon near the equator
        assert!(d > 150.0 && d < 190.0, "unexpected distance {d}");
        assert_eq!(haversine_distance_meters(&library, &library), 0.0);
    }

    #[test]
    fn bearing_points_along_axes() {
        let origin = Coordinate::new(0.0, 0.0);
        assert!((bearing_degrees(&origin, &Coordinate::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &Coordinate::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &Coordinate::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &Coordinate::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn compass_sectors_are_centered() {
        assert_eq!(compass_direction(0.0), "North");
        assert_eq!(compass_direction(22.0), "North");
        assert_eq!(compass_direction(23.0), "Northeast");
        assert_eq!(compass_direction(90.0), "East");
        assert_eq!(compass_direction(225.0), "Southwest");
        assert_eq!(compass_direction(350.0), "North");
        assert_eq!(compass_direction(-90.0), "West");
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(validate_coordinate(-0.41, 34.56).is_ok());
        assert!(validate_coordinate(91.0, 0.0).is_err());
        assert!(validate_coordinate(0.0, -181.0).is_err());
        assert!(validate_coordinate(f64::NAN, 0.0).is_err());
    }
}
