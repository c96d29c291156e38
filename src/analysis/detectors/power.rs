// Battery voltage, reset ratio, per-rail voltage stability.

use super::{percent, timestamps, values};
use crate::analysis::Context;
use crate::analysis::stats;
use crate::models::{Field, Issue, Severity};

const BATTERY_WINDOW: (f64, f64) = (0.0, 50.0);
const BATTERY_LOW: f64 = 11.5;
const BATTERY_HIGH: f64 = 15.5;

const RESET_RATIO: f64 = 0.10;

const RAIL_WINDOW: (f64, f64) = (0.0, 10.0);
const RAIL_CV_WARNING: f64 = 10.0;
const RAIL_CV_CRITICAL: f64 = 20.0;

pub(super) fn battery_voltage(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let valid = ctx.valid(Field::BatteryVoltage, BATTERY_WINDOW.0, BATTERY_WINDOW.1);
    let low: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v < BATTERY_LOW)
        .map(|&(ts, _)| ts)
        .collect();
    let high: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v > BATTERY_HIGH)
        .map(|&(ts, _)| ts)
        .collect();

    if !low.is_empty() {
        issues.push(ctx.issue(
            "Low battery voltage",
            format!("{} samples below {BATTERY_LOW} V", low.len()),
            Severity::Critical,
            &low,
        ));
    }
    if !high.is_empty() {
        issues.push(ctx.issue(
            "High battery voltage",
            format!("{} samples above {BATTERY_HIGH} V", high.len()),
            Severity::Warning,
            &high,
        ));
    }
}

pub(super) fn reset_events(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let flagged: Vec<(i64, bool)> = ctx
        .carrying(Field::Reset)
        .filter_map(|r| r.readings.reset.map(|reset| (r.timestamp, reset)))
        .collect();
    if flagged.is_empty() {
        return;
    }
    let resets: Vec<i64> = flagged
        .iter()
        .filter(|&&(_, reset)| reset)
        .map(|&(ts, _)| ts)
        .collect();
    if resets.len() as f64 / flagged.len() as f64 > RESET_RATIO {
        issues.push(ctx.issue(
            "Excessive reset events",
            format!(
                "{} resets in {} samples ({:.1}%)",
                resets.len(),
                flagged.len(),
                percent(resets.len(), flagged.len())
            ),
            Severity::Critical,
            &resets,
        ));
    }
}

/// Each rail on its own: coefficient of variation against fixed bands, 2σ points as occurrences.
pub(super) fn rail_instability(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    for rail in Field::SYSTEM_RAILS {
        let valid = ctx.valid(rail, RAIL_WINDOW.0, RAIL_WINDOW.1);
        if valid.len() < 2 {
            continue;
        }
        let series = values(&valid);
        let (Some(mean), Some(sd), Some(cv)) = (
            stats::mean(&series),
            stats::std_dev(&series),
            stats::coefficient_of_variation(&series),
        ) else {
            continue;
        };
        let severity = if cv > RAIL_CV_CRITICAL {
            Severity::Critical
        } else if cv > RAIL_CV_WARNING {
            Severity::Warning
        } else {
            continue;
        };

        let outliers: Vec<i64> = valid
            .iter()
            .filter(|&&(_, v)| (v - mean).abs() > 2.0 * sd)
            .map(|&(ts, _)| ts)
            .collect();
        let occurrences = if outliers.is_empty() {
            timestamps(&valid)
        } else {
            outliers
        };
        issues.push(ctx.issue(
            format!("{} instability", rail.label()),
            format!("voltage varies {cv:.1}% around a mean of {mean:.3} V"),
            severity,
            &occurrences,
        ));
    }
}
