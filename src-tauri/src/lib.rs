pub mod analysis;
pub mod commands;
pub mod models;

use commands::{
    analytics::{
        get_accessibility_score, get_issue_analytics, get_issue_stats, get_most_affected_areas,
        get_report_trend,
    },
    directions::{
        calculate_distance, get_accessible_route, get_campus_location, get_route,
        list_campus_locations, search_campus_locations,
    },
    export::{
        export_analytics_summary, export_backup, export_filtered, export_issues, generate_report,
        import_backup,
    },
    issues::{
        clear_all_issues, create_issue, delete_issue, get_audit_trail, get_issue, list_issues,
        save_issue, update_issue_status,
    },
    notifications::{get_notification_stats, get_unread_notifications, mark_notification_read},
    settings::{get_preferences, save_preferences},
    tracking::{
        analyze_traffic, get_crowd_density, get_crowded_areas, get_heatmap_points,
        get_historical_traffic, get_popular_areas, is_in_crowded_area, record_location,
        stop_tracking,
    },
};
use models::app_state::AppState;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            std::fs::create_dir_all(&data_dir)?;
            // Fail fast on a broken store instead of on the first command.
            commands::db::open_store(&data_dir)?;
            log::info!("campus data directory: {}", data_dir.display());
            app.manage(AppState::new(data_dir));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            create_issue,
            save_issue,
            update_issue_status,
            delete_issue,
            get_issue,
            list_issues,
            get_audit_trail,
            clear_all_issues,
            get_unread_notifications,
            mark_notification_read,
            get_notification_stats,
            get_preferences,
            save_preferences,
            export_issues,
            export_filtered,
            export_analytics_summary,
            generate_report,
            export_backup,
            import_backup,
            get_route,
            get_accessible_route,
            search_campus_locations,
            get_campus_location,
            list_campus_locations,
            calculate_distance,
            record_location,
            stop_tracking,
            get_crowd_density,
            is_in_crowded_area,
            get_heatmap_points,
            get_popular_areas,
            get_crowded_areas,
            analyze_traffic,
            get_historical_traffic,
            get_issue_analytics,
            get_issue_stats,
            get_accessibility_score,
            get_most_affected_areas,
            get_report_trend,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
