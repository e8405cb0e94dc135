use crate::analysis::geo::{bearing_degrees, compass_direction, haversine_distance_meters};
use crate::models::location::Coordinate;
use crate::models::route::*;

pub const WALKING_SPEED_MPS: f64 = 1.4;
pub const WHEELCHAIR_SPEED_MPS: f64 = 0.9;
/// Crowded areas slow everyone down by 30%.
pub const CROWD_PENALTY: f64 = 1.3;

pub fn estimate_travel_time(distance_m: f64, wheelchair: bool, crowded: bool) -> TravelEstimate {
    let base_speed = if wheelchair {
        WHEELCHAIR_SPEED_MPS
    } else {
        WALKING_SPEED_MPS
    };
    let crowd_penalty = if crowded { CROWD_PENALTY } else { 1.0 };
    let time_seconds = (distance_m / base_speed) * crowd_penalty;

    TravelEstimate {
        distance: distance_m.round() as u64,
        time_seconds: time_seconds.round() as u64,
        time_minutes: (time_seconds / 60.0).ceil() as u64,
        is_crowded: crowded,
        base_speed,
        crowd_penalty,
    }
}

/// Straight-line route; street-level routing is left to the map provider.
pub fn build_route(start: Coordinate, end: Coordinate, options: RouteOptions, crowded: bool) -> Route {
    let distance = haversine_distance_meters(&start, &end);
    let estimate = estimate_travel_time(distance, options.wheelchair, crowded);

    Route {
        start,
        end,
        distance: estimate.distance,
        time_minutes: estimate.time_minutes,
        time_seconds: estimate.time_seconds,
        is_crowded: estimate.is_crowded,
        wheelchair: options.wheelchair,
        waypoints: vec![
            Waypoint {
                lat: start.latitude,
                lng: start.longitude,
                description: "Start".to_string(),
            },
            Waypoint {
                lat: end.latitude,
                lng: end.longitude,
                description: "Destination".to_string(),
            },
        ],
        instructions: generate_instructions(&start, &end, distance),
        accessibility: None,
    }
}

pub fn accessible_profile() -> AccessibilityProfile {
    AccessibilityProfile {
        wheelchair_friendly: true,
        ramps: true,
        elevators: true,
        tactile_guides: false,
        audio_beacons: false,
    }
}

fn generate_instructions(start: &Coordinate, end: &Coordinate, distance: f64) -> Vec<Instruction> {
    let heading = compass_direction(bearing_degrees(start, end));

    vec![
        Instruction {
            instruction: format!("Start heading {heading}"),
            distance: None,
            landmark: None,
        },
        Instruction {
            instruction: "Continue for the destination".to_string(),
            distance: Some(distance),
            landmark: Some("Destination ahead".to_string()),
        },
    ]
}
