// Per-field min/max/mean over a decoded dump, for the report.

use serde::{Deserialize, Serialize};

use super::stats;
use crate::models::{Field, TelemetryRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub field: Field,
    /// Records with a value for this field.
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// One summary per field that has at least one value, in `Field::ALL` order.
pub fn summarize(records: &[TelemetryRecord]) -> Vec<FieldSummary> {
    Field::ALL
        .iter()
        .filter_map(|&field| summarize_field(records, field))
        .collect()
}

fn summarize_field(records: &[TelemetryRecord], field: Field) -> Option<FieldSummary> {
    let values: Vec<f64> = records.iter().filter_map(|r| r.get(field)).collect();
    let mean = stats::mean(&values)?;
    Some(FieldSummary {
        field,
        count: values.len(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
    })
}
