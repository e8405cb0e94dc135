use crate::models::analytics::*;
use crate::models::issue::{Issue, IssueStatus, Severity};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};

pub const HOT_SPOT_LIMIT: usize = 10;

pub fn compute_analytics(issues: &[Issue]) -> IssueAnalytics {
    let mut analytics = IssueAnalytics {
        total_reports: issues.len(),
        resolved_count: count_status(issues, IssueStatus::Resolved),
        last_updated: Utc::now().to_rfc3339(),
        ..IssueAnalytics::default()
    };

    for issue in issues {
        *analytics.by_type.entry(issue.issue_type.clone()).or_insert(0) += 1;
        *analytics
            .by_severity
            .entry(issue.severity.as_str().to_string())
            .or_insert(0) += 1;
        *analytics
            .by_status
            .entry(issue.status.as_str().to_string())
            .or_insert(0) += 1;
    }

    analytics
}

pub fn issue_stats(issues: &[Issue]) -> IssueStats {
    IssueStats {
        total: issues.len(),
        resolved: count_status(issues, IssueStatus::Resolved),
        pending: count_status(issues, IssueStatus::Pending),
        in_progress: count_status(issues, IssueStatus::InProgress),
        high_severity: issues
            .iter()
            .filter(|issue| issue.severity == Severity::High)
            .count(),
    }
}

/// 0–100: share of resolved issues minus a 30% weighted pending penalty.
/// An empty register scores 100.
pub fn accessibility_score(issues: &[Issue]) -> u32 {
    let stats = issue_stats(issues);
    if stats.total == 0 {
        return 100;
    }

    let total = stats.total as f64;
    let resolved_percentage = stats.resolved as f64 / total * 100.0;
    let pending_penalty = stats.pending as f64 / total * 30.0;

    (resolved_percentage - pending_penalty).clamp(0.0, 100.0).round() as u32
}

pub fn count_by_location(issues: &[Issue]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.location.clone()).or_insert(0) += 1;
    }
    counts
}

/// Locations with the most reports, ties broken alphabetically.
pub fn most_affected_areas(issues: &[Issue], limit: usize) -> Vec<AreaCount> {
    let mut areas: Vec<AreaCount> = count_by_location(issues)
        .into_iter()
        .map(|(location, count)| AreaCount { location, count })
        .collect();
    areas.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));
    areas.truncate(limit);
    areas
}

/// Reports per UTC day for the `days` days ending on `today`, zero-filled.
pub fn report_trend(issues: &[Issue], days: u32, today: NaiveDate) -> Vec<TrendPoint> {
    if days == 0 {
        return Vec::new();
    }

    let first_day = today - Duration::days(i64::from(days) - 1);
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for issue in issues {
        if let Some(created) = DateTime::<Utc>::from_timestamp(issue.created_at, 0) {
            let day = created.date_naive();
            if day >= first_day && day <= today {
                *per_day.entry(day).or_insert(0) += 1;
            }
        }
    }

    first_day
        .iter_days()
        .take(days as usize)
        .map(|day| TrendPoint {
            date: day.format("%Y-%m-%d").to_string(),
            count: per_day.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

pub fn response_stats(issues: &[Issue]) -> ResponseStats {
    let stats = issue_stats(issues);
    let resolution_rate = if stats.resolved > 0 {
        format!("{:.2}%", stats.resolved as f64 / stats.total as f64 * 100.0)
    } else {
        "0%".to_string()
    };

    ResponseStats {
        resolved: stats.resolved,
        in_progress: stats.in_progress,
        pending: stats.pending,
        resolution_rate,
    }
}

/// Mean created-to-resolved time in hours, one decimal. Issues without a
/// resolution stamp are skipped.
pub fn average_resolution_hours(issues: &[Issue]) -> Option<f64> {
    let durations: Vec<i64> = issues
        .iter()
        .filter(|issue| issue.status == IssueStatus::Resolved)
        .filter_map(|issue| issue.resolved_at.map(|at| (at - issue.created_at).max(0)))
        .collect();

    if durations.is_empty() {
        return None;
    }

    let mean_secs = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
    Some((mean_secs / 3600.0 * 10.0).round() / 10.0)
}

pub fn analytics_summary(issues: &[Issue]) -> AnalyticsSummary {
    let analytics = compute_analytics(issues);

    AnalyticsSummary {
        report_generated: Utc::now().to_rfc3339(),
        total_issues: issues.len(),
        by_status: analytics.by_status,
        by_type: analytics.by_type,
        by_severity: analytics.by_severity,
        by_location: count_by_location(issues),
        response_stats: response_stats(issues),
        hot_spots: most_affected_areas(issues, HOT_SPOT_LIMIT),
        average_resolution_time: average_resolution_hours(issues)
            .map(|hours| format!("{hours} hours"))
            .unwrap_or_else(|| "N/A".to_string()),
    }
}

pub fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "#28a745",
        Severity::Medium => "#ffc107",
        Severity::High => "#dc3545",
    }
}

pub fn status_color(status: IssueStatus) -> &'static str {
    match status {
        IssueStatus::Pending => "#ffc107",
        IssueStatus::InProgress => "#17a2b8",
        IssueStatus::Resolved => "#28a745",
    }
}

fn count_status(issues: &[Issue], status: IssueStatus) -> usize {
    issues.iter().filter(|issue| issue.status == status).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: &str, location: &str, severity: Severity, status: IssueStatus, created_at: i64) -> Issue {
        Issue {
            id: id.to_string(),
            issue_type: "broken-ramp".to_string(),
            location: location.to_string(),
            latitude: None,
            longitude: None,
            description: "test".to_string(),
            severity,
            status,
            reporter: "Anonymous".to_string(),
            created_at,
            updated_at: created_at,
            status_notes: None,
            building: None,
            floor: None,
            tags: Vec::new(),
            attachments: Vec::new(),
            resolved_at: None,
        }
    }

    #[test]
    fn analytics_count_each_dimension() {
        let issues = vec![
            issue("1", "Library", Severity::High, IssueStatus::Pending, 0),
            issue("2", "Library", Severity::Low, IssueStatus::Resolved, 0),
            issue("3", "Gym", Severity::High, IssueStatus::InProgress, 0),
        ];

        let analytics = compute_analytics(&issues);
        assert_eq!(analytics.total_reports, 3);
        assert_eq!(analytics.resolved_count, 1);
        assert_eq!(analytics.by_type["broken-ramp"], 3);
        assert_eq!(analytics.by_severity["high"], 2);
        assert_eq!(analytics.by_status["in-progress"], 1);

        let stats = issue_stats(&issues);
        assert_eq!(stats.high_severity, 2);
        assert_eq!(stats.pending, 1);
    }

    #[test]
    fn accessibility_score_rewards_resolution() {
        assert_eq!(accessibility_score(&[]), 100);

        let all_resolved = vec![issue("1", "A", Severity::Low, IssueStatus::Resolved, 0)];
        assert_eq!(accessibility_score(&all_resolved), 100);

        let all_pending = vec![issue("1", "A", Severity::Low, IssueStatus::Pending, 0)];
        assert_eq!(accessibility_score(&all_pending), 0);

        // 50% resolved, 50% pending: 50 - 15
        let mixed = vec![
            issue("1", "A", Severity::Low, IssueStatus::Resolved, 0),
            issue("2", "A", Severity::Low, IssueStatus::Pending, 0),
        ];
        assert_eq!(accessibility_score(&mixed), 35);
    }

    #[test]
    fn most_affected_areas_sorts_and_limits() {
        let issues = vec![
            issue("1", "Gym", Severity::Low, IssueStatus::Pending, 0),
            issue("2", "Library", Severity::Low, IssueStatus::Pending, 0),
            issue("3", "Library", Severity::Low, IssueStatus::Pending, 0),
            issue("4", "Arts", Severity::Low, IssueStatus::Pending, 0),
        ];
        let areas = most_affected_areas(&issues, 2);
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0], AreaCount { location: "Library".to_string(), count: 2 });
        assert_eq!(areas[1].location, "Arts");
    }

    #[test]
    fn report_trend_is_zero_filled_and_ends_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let noon = |d: u32| {
            NaiveDate::from_ymd_opt(2024, 3, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                .and_utc()
                .timestamp()
        };
        let issues = vec![
            issue("1", "A", Severity::Low, IssueStatus::Pending, noon(10)),
            issue("2", "A", Severity::Low, IssueStatus::Pending, noon(10)),
            issue("3", "A", Severity::Low, IssueStatus::Pending, noon(8)),
            issue("4", "A", Severity::Low, IssueStatus::Pending, noon(1)),
        ];

        let trend = report_trend(&issues, 3, today);
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0], TrendPoint { date: "2024-03-08".to_string(), count: 1 });
        assert_eq!(trend[1].count, 0);
        assert_eq!(trend[2], TrendPoint { date: "2024-03-10".to_string(), count: 2 });
        assert!(report_trend(&issues, 0, today).is_empty());
    }

    #[test]
    fn resolution_metrics_use_resolved_issues_only() {
        let mut fast = issue("1", "A", Severity::Low, IssueStatus::Resolved, 0);
        fast.resolved_at = Some(2 * 3600);
        let mut slow = issue("2", "A", Severity::Low, IssueStatus::Resolved, 0);
        slow.resolved_at = Some(4 * 3600 + 720);
        // Edited long after resolution; the edit must not move the average.
        slow.updated_at = 90 * 3600;
        let open = issue("3", "A", Severity::Low, IssueStatus::Pending, 0);
        let issues = vec![fast, slow, open];

        assert_eq!(average_resolution_hours(&issues), Some(3.1));
        assert_eq!(analytics_summary(&issues).average_resolution_time, "3.1 hours");
        assert_eq!(response_stats(&issues).resolution_rate, "66.67%");

        let pending_only = vec![issue("4", "A", Severity::Low, IssueStatus::Pending, 0)];
        assert_eq!(average_resolution_hours(&pending_only), None);
        assert_eq!(response_stats(&pending_only).resolution_rate, "0%");
        assert_eq!(analytics_summary(&pending_only).average_resolution_time, "N/A");
    }
}
