use crate::models::app_state::AppState;
use crate::models::issue::Severity;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const PREFERENCES_SCHEMA_VERSION: i64 = 2;
const PREFERENCES_FILE: &str = "preferences.json";

/// Typed view of the preferences consumed by the backend.
#[derive(Debug, Clone)]
pub struct EffectivePreferences {
    pub show_resolved_issues: bool,
    pub selected_severities: Vec<Severity>,
    pub map_zoom: u64,
    pub tracking_interval_secs: u64,
    pub crowd_radius_meters: f64,
    pub crowded_threshold: usize,
    pub popular_window_hours: u32,
    pub active_window_minutes: u32,
    pub notifications_enabled: bool,
    pub default_reporter: String,
}

#[tauri::command]
pub async fn get_preferences(state: tauri::State<'_, AppState>) -> Result<Value, String> {
    load_preferences_from_disk(&state.data_dir)
}

#[tauri::command]
pub async fn save_preferences(
    preferences: Value,
    state: tauri::State<'_, AppState>,
) -> Result<Value, String> {
    save_preferences_to_disk(&state.data_dir, preferences)
}

pub fn load_effective_preferences(data_dir: &Path) -> Result<EffectivePreferences, String> {
    let prefs = load_preferences_from_disk(data_dir)?;
    Ok(effective_from_value(&prefs))
}

fn effective_from_value(prefs: &Value) -> EffectivePreferences {
    let selected_severities = prefs
        .get("selectedSeverities")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Severity::parse)
                .collect::<Vec<_>>()
        })
        .filter(|severities| !severities.is_empty())
        .unwrap_or_else(|| Severity::ALL.to_vec());

    EffectivePreferences {
        show_resolved_issues: prefs["showResolvedIssues"].as_bool().unwrap_or(false),
        selected_severities,
        map_zoom: prefs["mapZoom"].as_u64().unwrap_or(17),
        tracking_interval_secs: prefs["trackingIntervalSecs"].as_u64().unwrap_or(30),
        crowd_radius_meters: prefs["crowdRadiusMeters"].as_f64().unwrap_or(50.0),
        crowded_threshold: prefs["crowdedThreshold"].as_u64().unwrap_or(5) as usize,
        popular_window_hours: prefs["popularWindowHours"].as_u64().unwrap_or(24) as u32,
        active_window_minutes: prefs["activeWindowMinutes"].as_u64().unwrap_or(10) as u32,
        notifications_enabled: prefs["notificationsEnabled"].as_bool().unwrap_or(true),
        default_reporter: prefs["defaultReporter"]
            .as_str()
            .unwrap_or("Anonymous")
            .to_string(),
    }
}

pub fn load_preferences_from_disk(data_dir: &Path) -> Result<Value, String> {
    let path = preferences_path(data_dir);
    ensure_data_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {PREFERENCES_FILE}: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("{PREFERENCES_FILE} is not valid JSON, resetting to defaults: {e}");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_preferences(original.clone());
    if migrated != original || !path.exists() {
        write_preferences_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_preferences_to_disk(data_dir: &Path, preferences: Value) -> Result<Value, String> {
    let path = preferences_path(data_dir);
    ensure_data_dir(data_dir)?;

    let mut merged = load_preferences_from_disk(data_dir).unwrap_or_else(|_| default_preferences());
    merge_preferences(&mut merged, &preferences);

    let migrated = migrate_preferences(merged);
    write_preferences_file(&path, &migrated)?;
    Ok(migrated)
}

/// Replaces the stored preferences wholesale (backup import).
pub fn replace_preferences_on_disk(data_dir: &Path, preferences: Value) -> Result<Value, String> {
    let path = preferences_path(data_dir);
    ensure_data_dir(data_dir)?;

    let migrated = migrate_preferences(preferences);
    write_preferences_file(&path, &migrated)?;
    Ok(migrated)
}

fn preferences_path(data_dir: &Path) -> PathBuf {
    data_dir.join(PREFERENCES_FILE)
}

fn ensure_data_dir(data_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("Failed to create data directory: {e}"))
}

fn write_preferences_file(path: &Path, preferences: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(preferences)
        .map_err(|e| format!("Failed to serialize preferences: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write {PREFERENCES_FILE}: {e}"))
}

fn migrate_preferences(input: Value) -> Value {
    let defaults = default_preferences();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    deep_merge_defaults(&mut out, &defaults);

    if version < 1 {
        migrate_tracking_interval_from_millis(&mut out);
    }

    if version < 2 {
        // V1 stored the severity filter as a comma-separated string.
        migrate_severities_from_string(&mut out);
    }

    sanitize_preferences(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(PREFERENCES_SCHEMA_VERSION));
    }

    out
}

fn default_preferences() -> Value {
    json!({
        "schema_version": PREFERENCES_SCHEMA_VERSION,
        "showResolvedIssues": false,
        "selectedSeverities": ["low", "medium", "high"],
        "mapZoom": 17,
        "lastLocation": null,
        "trackingIntervalSecs": 30,
        "crowdRadiusMeters": 50,
        "crowdedThreshold": 5,
        "popularWindowHours": 24,
        "activeWindowMinutes": 10,
        "notificationsEnabled": true,
        "defaultReporter": "Anonymous"
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_preferences(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                // lastLocation is replaced, never merged field by field.
                if key == "lastLocation" {
                    target_obj.insert(key.clone(), value.clone());
                } else if let Some(existing) = target_obj.get_mut(key) {
                    merge_preferences(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn migrate_tracking_interval_from_millis(prefs: &mut Value) {
    let Some(obj) = prefs.as_object_mut() else {
        return;
    };

    if let Some(millis) = obj.remove("trackingInterval").and_then(|v| v.as_u64()) {
        obj.insert("trackingIntervalSecs".to_string(), json!(millis / 1000));
    }
}

fn migrate_severities_from_string(prefs: &mut Value) {
    let Some(raw) = prefs
        .get("selectedSeverities")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return;
    };

    let list: Vec<Value> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| json!(s))
        .collect();
    prefs["selectedSeverities"] = Value::Array(list);
}

fn sanitize_preferences(prefs: &mut Value) {
    let Some(obj) = prefs.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "mapZoom", 1, 20, 17);
    clamp_u64(obj, "trackingIntervalSecs", 5, 600, 30);
    clamp_u64(obj, "crowdRadiusMeters", 10, 500, 50);
    clamp_u64(obj, "crowdedThreshold", 1, 100, 5);
    clamp_u64(obj, "popularWindowHours", 1, 168, 24);
    clamp_u64(obj, "activeWindowMinutes", 1, 120, 10);

    ensure_bool(obj, "showResolvedIssues", false);
    ensure_bool(obj, "notificationsEnabled", true);

    sanitize_severities(obj);
    sanitize_last_location(obj);

    let reporter = obj
        .get("defaultReporter")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Anonymous")
        .to_string();
    obj.insert("defaultReporter".to_string(), json!(reporter));
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map
        .get(key)
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64)))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn ensure_bool(map: &mut Map<String, Value>, key: &str, default: bool) {
    let value = map.get(key).and_then(Value::as_bool).unwrap_or(default);
    map.insert(key.to_string(), json!(value));
}

fn sanitize_severities(map: &mut Map<String, Value>) {
    let mut selected: Vec<&'static str> = Vec::new();
    let requested = map
        .get("selectedSeverities")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter_map(Severity::parse);
    for severity in requested {
        if !selected.contains(&severity.as_str()) {
            selected.push(severity.as_str());
        }
    }

    if selected.is_empty() {
        selected = Severity::ALL.iter().map(|s| s.as_str()).collect();
    }
    map.insert("selectedSeverities".to_string(), json!(selected));
}

fn sanitize_last_location(map: &mut Map<String, Value>) {
    let valid = map
        .get("lastLocation")
        .and_then(Value::as_object)
        .and_then(|loc| {
            let lat = loc.get("lat").and_then(Value::as_f64)?;
            let lng = loc.get("lng").and_then(Value::as_f64)?;
            crate::analysis::geo::validate_coordinate(lat, lng).ok()?;
            Some(json!({ "lat": lat, "lng": lng }))
        });
    map.insert("lastLocation".to_string(), valid.unwrap_or(Value::Null));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_legacy_millisecond_interval() {
        let migrated = migrate_preferences(json!({ "trackingInterval": 60000 }));

        assert_eq!(migrated["trackingIntervalSecs"], json!(60));
        assert!(migrated.get("trackingInterval").is_none());
        assert_eq!(migrated["schema_version"], json!(PREFERENCES_SCHEMA_VERSION));
        assert_eq!(migrated["crowdedThreshold"], json!(5));
    }

    #[test]
    fn migrates_comma_separated_severities() {
        let migrated = migrate_preferences(json!({
            "schema_version": 1,
            "selectedSeverities": "high, medium"
        }));
        assert_eq!(migrated["selectedSeverities"], json!(["high", "medium"]));
    }

    #[test]
    fn sanitizes_out_of_range_values() {
        let migrated = migrate_preferences(json!({
            "schema_version": 2,
            "mapZoom": 99,
            "trackingIntervalSecs": 1,
            "selectedSeverities": ["critical"],
            "lastLocation": { "lat": 123.0, "lng": 0.0 },
            "notificationsEnabled": "yes",
            "defaultReporter": "   "
        }));

        assert_eq!(migrated["mapZoom"], json!(20));
        assert_eq!(migrated["trackingIntervalSecs"], json!(5));
        assert_eq!(migrated["selectedSeverities"], json!(["low", "medium", "high"]));
        assert_eq!(migrated["lastLocation"], Value::Null);
        assert_eq!(migrated["notificationsEnabled"], json!(true));
        assert_eq!(migrated["defaultReporter"], json!("Anonymous"));
    }

    #[test]
    fn merges_partial_preferences_without_losing_existing_values() {
        let mut existing = default_preferences();
        existing["lastLocation"] = json!({ "lat": -0.41, "lng": 34.56 });
        merge_preferences(
            &mut existing,
            &json!({ "mapZoom": 15, "lastLocation": { "lat": -0.42, "lng": 34.57 } }),
        );
        let migrated = migrate_preferences(existing);

        assert_eq!(migrated["mapZoom"], json!(15));
        assert_eq!(migrated["crowdRadiusMeters"], json!(50));
        assert_eq!(migrated["lastLocation"], json!({ "lat": -0.42, "lng": 34.57 }));
    }

    #[test]
    fn effective_view_reads_typed_values() {
        let prefs = migrate_preferences(json!({ "crowdedThreshold": 8, "selectedSeverities": ["high"] }));
        let effective = effective_from_value(&prefs);

        assert_eq!(effective.crowded_threshold, 8);
        assert_eq!(effective.selected_severities, vec![Severity::High]);
        assert_eq!(effective.crowd_radius_meters, 50.0);
        assert!(effective.notifications_enabled);
    }
}
