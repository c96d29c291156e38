// Health analysis: ordered detector passes over the complete, time-ordered record set of one dump.
// Never fails; missing or bad data shows up as issues.

pub mod detectors;
pub mod stats;
pub mod summary;

use tracing::debug;

use crate::layout;
use crate::models::{AnalysisResult, Field, Issue, Severity, TelemetryRecord};
pub use summary::{FieldSummary, summarize};

pub const DEFAULT_MAX_OCCURRENCES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Timestamps kept per issue; `count` always covers all of them.
    pub max_occurrences: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }
}

/// Read-only view handed to every detector pass.
pub struct Context<'a> {
    records: &'a [TelemetryRecord],
    max_occurrences: usize,
}

impl<'a> Context<'a> {
    pub fn new(records: &'a [TelemetryRecord], config: &AnalysisConfig) -> Self {
        Self {
            records,
            max_occurrences: config.max_occurrences,
        }
    }

    pub fn records(&self) -> &'a [TelemetryRecord] {
        self.records
    }

    /// Records whose device type reports `field` at all.
    pub fn carrying(&self, field: Field) -> impl Iterator<Item = &'a TelemetryRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| layout::carries(r.device_type, field))
    }

    /// `(timestamp, value)` of carrying records with a finite value inside `[min, max]`.
    pub fn valid(&self, field: Field, min: f64, max: f64) -> Vec<(i64, f64)> {
        self.carrying(field)
            .filter_map(|r| {
                r.get(field)
                    .filter(|v| v.is_finite() && *v >= min && *v <= max)
                    .map(|v| (r.timestamp, v))
            })
            .collect()
    }

    pub fn issue(
        &self,
        label: impl Into<String>,
        explanation: impl Into<String>,
        severity: Severity,
        timestamps: &[i64],
    ) -> Issue {
        Issue::new(label, explanation, severity, timestamps, self.max_occurrences)
    }
}

/// One named pass of the catalogue.
pub struct Detector {
    pub name: &'static str,
    pub run: fn(&Context<'_>, &mut Vec<Issue>),
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Run every detector in catalogue order. Call only with the full series of a dump:
    /// thresholds, clusters and trends are relative to the whole set.
    pub fn analyze(&self, records: &[TelemetryRecord]) -> AnalysisResult {
        let ctx = Context::new(records, &self.config);
        let mut issues = Vec::new();
        for detector in detectors::CATALOGUE {
            let before = issues.len();
            (detector.run)(&ctx, &mut issues);
            let emitted = issues.len() - before;
            if emitted > 0 {
                debug!(detector = detector.name, issues = emitted, "detector emitted issues");
            }
        }
        let result = AnalysisResult::from_issues(records.len(), issues);
        debug!(
            records = records.len(),
            issues = result.issues.len(),
            status = result.overall_status.as_str(),
            "analysis complete"
        );
        result
    }
}

/// Analyze with default settings.
pub fn analyze(records: &[TelemetryRecord]) -> AnalysisResult {
    Analyzer::default().analyze(records)
}
