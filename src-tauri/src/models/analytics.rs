use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueAnalytics {
    pub total_reports: usize,
    pub resolved_count: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub high_severity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaCount {
    pub location: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String, // YYYY-MM-DD, UTC
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseStats {
    #[serde(rename = "Resolved")]
    pub resolved: usize,
    #[serde(rename = "In Progress")]
    pub in_progress: usize,
    #[serde(rename = "Pending")]
    pub pending: usize,
    #[serde(rename = "Resolution Rate")]
    pub resolution_rate: String,
}

/// Layout of the downloadable analytics summary file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    #[serde(rename = "Report Generated")]
    pub report_generated: String,
    #[serde(rename = "Total Issues")]
    pub total_issues: usize,
    #[serde(rename = "Total by Status")]
    pub by_status: BTreeMap<String, usize>,
    #[serde(rename = "Total by Type")]
    pub by_type: BTreeMap<String, usize>,
    #[serde(rename = "Total by Severity")]
    pub by_severity: BTreeMap<String, usize>,
    #[serde(rename = "Total by Location")]
    pub by_location: BTreeMap<String, usize>,
    #[serde(rename = "Response Statistics")]
    pub response_stats: ResponseStats,
    #[serde(rename = "Hot Spots")]
    pub hot_spots: Vec<AreaCount>,
    #[serde(rename = "Average Resolution Time")]
    pub average_resolution_time: String,
}
