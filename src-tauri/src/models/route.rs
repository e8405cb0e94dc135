use super::location::Coordinate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptions {
    #[serde(default)]
    pub wheelchair: bool,
    #[serde(default)]
    pub avoid_crowded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelEstimate {
    pub distance: u64, // meters
    pub time_seconds: u64,
    pub time_minutes: u64,
    pub is_crowded: bool,
    pub base_speed: f64, // m/s
    pub crowd_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub instruction: String,
    pub distance: Option<f64>,
    pub landmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityProfile {
    pub wheelchair_friendly: bool,
    pub ramps: bool,
    pub elevators: bool,
    pub tactile_guides: bool,
    pub audio_beacons: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub start: Coordinate,
    pub end: Coordinate,
    pub distance: u64,
    pub time_minutes: u64,
    pub time_seconds: u64,
    pub is_crowded: bool,
    pub wheelchair: bool,
    pub waypoints: Vec<Waypoint>,
    pub instructions: Vec<Instruction>,
    pub accessibility: Option<AccessibilityProfile>,
}
