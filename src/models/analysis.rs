// Analysis output: detected issues and the derived overall status

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Operational,
    Warning,
    Critical,
}

impl OverallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Operational => "operational",
            OverallStatus::Warning => "warning",
            OverallStatus::Critical => "critical",
        }
    }
}

/// One detected anomaly class. `occurrences` is capped; `count` and the
/// first/last timestamps always cover every occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub label: String,
    pub explanation: String,
    pub severity: Severity,
    pub count: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub occurrences: Vec<i64>,
}

impl Issue {
    pub fn new(
        label: impl Into<String>,
        explanation: impl Into<String>,
        severity: Severity,
        timestamps: &[i64],
        max_occurrences: usize,
    ) -> Self {
        Self {
            label: label.into(),
            explanation: explanation.into(),
            severity,
            count: timestamps.len(),
            first_timestamp: timestamps.iter().min().copied(),
            last_timestamp: timestamps.iter().max().copied(),
            occurrences: timestamps.iter().take(max_occurrences).copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub records_analyzed: usize,
    pub issues: Vec<Issue>,
    pub critical_count: usize,
    pub warning_count: usize,
    pub overall_status: OverallStatus,
}

impl AnalysisResult {
    /// Counts and status are derived from the issue list and nothing else.
    pub fn from_issues(records_analyzed: usize, issues: Vec<Issue>) -> Self {
        let critical_count = issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count();
        let warning_count = issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count();
        let overall_status = if critical_count > 0 {
            OverallStatus::Critical
        } else if warning_count > 0 {
            OverallStatus::Warning
        } else {
            OverallStatus::Operational
        };
        Self {
            records_analyzed,
            issues,
            critical_count,
            warning_count,
            overall_status,
        }
    }
}
