// Gamma count rate outside the expected formation band.

use crate::analysis::Context;
use crate::models::{Field, Issue, Severity};

const WINDOW: (f64, f64) = (0.0, 1_000.0);
const LOW_BELOW: f64 = 15.0;
const HIGH_ABOVE: f64 = 45.0;

pub(super) fn gamma_levels(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let valid = ctx.valid(Field::Gamma, WINDOW.0, WINDOW.1);
    let low: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v < LOW_BELOW)
        .map(|&(ts, _)| ts)
        .collect();
    let high: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v > HIGH_ABOVE)
        .map(|&(ts, _)| ts)
        .collect();

    if !low.is_empty() {
        issues.push(ctx.issue(
            "Low gamma count rate",
            format!("{} samples below {LOW_BELOW} cps", low.len()),
            Severity::Info,
            &low,
        ));
    }
    if !high.is_empty() {
        issues.push(ctx.issue(
            "High gamma count rate",
            format!("{} samples above {HIGH_ABOVE} cps", high.len()),
            Severity::Warning,
            &high,
        ));
    }
}
