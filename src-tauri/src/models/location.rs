use serde::{Deserialize, Serialize};

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPing {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub timestamp: i64,
}

impl LocationPing {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Position update sent by the web view's geolocation watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    #[serde(default)]
    pub user_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.south
            && latitude <= self.north
            && longitude >= self.west
            && longitude <= self.east
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityLevel {
    Low,
    Medium,
    High,
}

impl DensityLevel {
    /// Level for a head count around a point.
    pub fn for_radius_count(count: usize) -> Self {
        if count < 3 {
            DensityLevel::Low
        } else if count < 10 {
            DensityLevel::Medium
        } else {
            DensityLevel::High
        }
    }

    /// Level for the ping count of one heatmap grid cell.
    pub fn for_cell_count(count: usize) -> Self {
        if count < 5 {
            DensityLevel::Low
        } else if count < 15 {
            DensityLevel::Medium
        } else {
            DensityLevel::High
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            DensityLevel::Low => "#28a745",
            DensityLevel::Medium => "#ffc107",
            DensityLevel::High => "#dc3545",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdDensity {
    pub density: usize,
    pub radius: f64,
    pub center: Coordinate,
    pub level: DensityLevel,
}

/// One grid cell of the traffic histogram, anchored at its south-west corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub lat: f64,
    pub lng: f64,
    pub count: usize,
    pub level: DensityLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficAnalysis {
    pub total_people_on_campus: usize,
    pub crowded_areas_count: usize,
    pub crowded_areas: Vec<GridCell>,
    pub popular_routes: Vec<GridCell>,
    pub timestamp: String,
    pub analysis_window: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampusLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub building: String,
    #[serde(rename = "type")]
    pub location_type: String,
}

impl CampusLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}
