use crate::models::location::CampusLocation;

// name, lat, lon, building, type
const CAMPUS_DIRECTORY: &[(&str, f64, f64, &str, &str)] = &[
    ("Main Gate", -0.4145, 34.5610, "Entrance", "gate"),
    ("Library", -0.4133, 34.5620, "Central Library", "building"),
    ("Student Center", -0.4120, 34.5630, "Student Hub", "building"),
    ("Dining Hall", -0.4125, 34.5615, "Food Court", "facility"),
    ("Medical Clinic", -0.4135, 34.5635, "Health Center", "facility"),
    ("Sports Complex", -0.4150, 34.5640, "Athletics", "facility"),
    ("Science Building", -0.4110, 34.5625, "Science Labs", "building"),
    ("Engineering Hall", -0.4108, 34.5618, "Engineering", "building"),
    ("Arts Center", -0.4140, 34.5645, "Arts & Culture", "building"),
    ("Parking Lot A", -0.4155, 34.5650, "Parking", "parking"),
];

const MIN_QUERY_LEN: usize = 2;

pub fn campus_locations() -> Vec<CampusLocation> {
    CAMPUS_DIRECTORY
        .iter()
        .map(|(name, lat, lon, building, kind)| CampusLocation {
            name: name.to_string(),
            lat: *lat,
            lon: *lon,
            building: building.to_string(),
            location_type: kind.to_string(),
        })
        .collect()
}

/// Case-insensitive substring match on name or building.
pub fn search_locations(query: &str) -> Vec<CampusLocation> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_LEN {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    campus_locations()
        .into_iter()
        .filter(|loc| {
            loc.name.to_lowercase().contains(&needle) || loc.building.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn location_by_name(name: &str) -> Option<CampusLocation> {
    let name = name.trim().to_lowercase();
    campus_locations()
        .into_iter()
        .find(|loc| loc.name.to_lowercase() == name)
}
