// Motor current spikes, flow/motor cross-check, efficiency trend.

use super::values;
use crate::analysis::Context;
use crate::analysis::stats;
use crate::models::{Field, Issue, Severity};

const CURRENT_WINDOW: (f64, f64) = (0.0, 20.0);
const SPIKE_ABOVE: f64 = 2.0;
const FLOW_OFF_CURRENT_ABOVE: f64 = 1.2;
const EFFICIENCY_MIN_SAMPLES: usize = 8;
const EFFICIENCY_WARNING_DROP: f64 = 0.15;
const EFFICIENCY_CRITICAL_DROP: f64 = 0.25;

pub(super) fn current_spikes(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let spikes: Vec<i64> = ctx
        .valid(Field::MotorAvg, CURRENT_WINDOW.0, CURRENT_WINDOW.1)
        .into_iter()
        .filter(|&(_, v)| v > SPIKE_ABOVE)
        .map(|(ts, _)| ts)
        .collect();
    if spikes.is_empty() {
        return;
    }
    issues.push(ctx.issue(
        "Motor current spikes",
        format!("{} samples above {SPIKE_ABOVE} A", spikes.len()),
        Severity::Warning,
        &spikes,
    ));
}

/// Current drawn while flow reads off points at a sensor or electrical fault.
pub(super) fn flow_motor_mismatch(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let mismatched: Vec<i64> = ctx
        .carrying(Field::FlowStatus)
        .filter(|r| r.readings.flow_on == Some(false))
        .filter(|r| {
            r.get(Field::MotorAvg).is_some_and(|v| {
                v.is_finite() && v <= CURRENT_WINDOW.1 && v > FLOW_OFF_CURRENT_ABOVE
            })
        })
        .map(|r| r.timestamp)
        .collect();
    if mismatched.is_empty() {
        return;
    }
    issues.push(ctx.issue(
        "Flow/motor mismatch",
        format!(
            "motor drew more than {FLOW_OFF_CURRENT_ABOVE} A with flow off in {} samples",
            mismatched.len()
        ),
        Severity::Warning,
        &mismatched,
    ));
}

/// Efficiency 1/(current·actuation time), first quarter against last quarter.
pub(super) fn efficiency_trend(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let samples: Vec<(i64, f64)> = ctx
        .carrying(Field::MotorAvg)
        .filter_map(|r| {
            let current = r.get(Field::MotorAvg).filter(|v| v.is_finite() && *v > 0.0)?;
            let time = r.get(Field::ActuationTime).filter(|v| v.is_finite() && *v > 0.0)?;
            Some((r.timestamp, 1.0 / (current * time)))
        })
        .collect();
    if samples.len() < EFFICIENCY_MIN_SAMPLES {
        return;
    }
    let Some(trend) = stats::degradation(&values(&samples)) else {
        return;
    };
    let severity = if trend.drop > EFFICIENCY_CRITICAL_DROP {
        Severity::Critical
    } else if trend.drop > EFFICIENCY_WARNING_DROP {
        Severity::Warning
    } else {
        return;
    };
    let quarter = samples.len() / 4;
    let last_quarter: Vec<i64> = samples[samples.len() - quarter..]
        .iter()
        .map(|&(ts, _)| ts)
        .collect();
    issues.push(ctx.issue(
        "Motor efficiency degradation",
        format!(
            "efficiency fell {:.1}% from the first to the last quarter of the run",
            trend.drop * 100.0
        ),
        severity,
        &last_quarter,
    ));
}
