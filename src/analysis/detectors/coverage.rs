// Whole-dump data coverage.

use crate::analysis::Context;
use crate::layout;
use crate::models::{Issue, Severity};

/// One critical issue when no record carries a usable value for any field its device
/// reports, including a dump with no records at all.
pub(super) fn no_valid_data(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let records = ctx.records();
    let any_value = records.iter().any(|r| {
        layout::layout(r.device_type)
            .iter()
            .any(|spec| r.get(spec.field).is_some_and(f64::is_finite))
    });
    if any_value {
        return;
    }
    let explanation = if records.is_empty() {
        "the dump contains no records".to_string()
    } else {
        format!(
            "none of {} records carried a usable value for any field",
            records.len()
        )
    };
    let stamps: Vec<i64> = records.iter().map(|r| r.timestamp).collect();
    issues.push(ctx.issue(
        "No valid telemetry data",
        explanation,
        Severity::Critical,
        &stamps,
    ));
}
