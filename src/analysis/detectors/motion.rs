// Shock magnitude, vibration pattern, rotation speed.

use super::{percent, timestamps, values};
use crate::analysis::Context;
use crate::analysis::stats;
use crate::models::{Field, Issue, Severity, TelemetryRecord};

const SHOCK_WINDOW: f64 = 500.0;
const SHOCK_FLOOR_G: f64 = 8.0;
const SHOCK_CRITICAL_PEAK_G: f64 = 20.0;
const SHOCK_CRITICAL_PER_100: f64 = 5.0;
/// Events at most this many samples apart belong to one episode.
const SHOCK_EPISODE_GAP: usize = 5;

const VIBRATION_WINDOW: f64 = 100.0;
const VIBRATION_FACTOR: f64 = 1.5;
const VIBRATION_RATIO: f64 = 0.05;

const RPM_WINDOW: (f64, f64) = (0.0, 5_000.0);
const RPM_HIGH: f64 = 4_000.0;
const RPM_CRITICAL_PEAK: f64 = 4_500.0;
const RPM_HIGH_CRITICAL_RATIO: f64 = 0.10;
const RPM_LOW: f64 = 500.0;
const RPM_LOW_RATIO: f64 = 0.15;
const SPREAD_INFO: f64 = 0.15;
const SPREAD_WARNING: f64 = 0.3;
const SPREAD_CRITICAL: f64 = 0.5;

/// `(timestamp, |v|)` for carrying records with all three axes finite and within `±window`.
fn magnitudes(ctx: &Context<'_>, axes: [Field; 3], window: f64) -> Vec<(i64, f64)> {
    let axis = |r: &TelemetryRecord, field: Field| {
        r.get(field).filter(|v| v.is_finite() && v.abs() <= window)
    };
    ctx.carrying(axes[0])
        .filter_map(|r| {
            let x = axis(r, axes[0])?;
            let y = axis(r, axes[1])?;
            let z = axis(r, axes[2])?;
            Some((r.timestamp, (x * x + y * y + z * z).sqrt()))
        })
        .collect()
}

pub(super) fn shock(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let samples = magnitudes(ctx, [Field::ShockX, Field::ShockY, Field::ShockZ], SHOCK_WINDOW);
    if samples.is_empty() {
        return;
    }
    let threshold = stats::dynamic_threshold(&values(&samples), SHOCK_FLOOR_G);
    let event_indices: Vec<usize> = samples
        .iter()
        .enumerate()
        .filter(|&(_, &(_, g))| g > threshold)
        .map(|(i, _)| i)
        .collect();
    if event_indices.is_empty() {
        return;
    }
    let events: Vec<(i64, f64)> = event_indices.iter().map(|&i| samples[i]).collect();
    let episodes = stats::cluster_by_index(&event_indices, SHOCK_EPISODE_GAP).len();
    let peak = events.iter().map(|&(_, g)| g).fold(0.0, f64::max);
    let per_100 = percent(events.len(), samples.len());
    let severity = if peak > SHOCK_CRITICAL_PEAK_G || per_100 > SHOCK_CRITICAL_PER_100 {
        Severity::Critical
    } else {
        Severity::Warning
    };
    issues.push(ctx.issue(
        "Shock events",
        format!(
            "{} shocks in {episodes} episodes above {threshold:.1} g (peak {peak:.1} g, \
             {per_100:.1} per 100 samples)",
            events.len()
        ),
        severity,
        &timestamps(&events),
    ));
}

/// Each magnitude against 1.5× the running mean of the magnitudes before it.
pub(super) fn vibration(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let samples = magnitudes(
        ctx,
        [Field::VibrationX, Field::VibrationY, Field::VibrationZ],
        VIBRATION_WINDOW,
    );
    if samples.is_empty() {
        return;
    }
    let mut sum = 0.0;
    let mut exceeding = Vec::new();
    for (k, &(ts, magnitude)) in samples.iter().enumerate() {
        if k > 0 {
            let running = sum / k as f64;
            if running > 0.0 && magnitude > VIBRATION_FACTOR * running {
                exceeding.push(ts);
            }
        }
        sum += magnitude;
    }
    if exceeding.len() as f64 / samples.len() as f64 > VIBRATION_RATIO {
        issues.push(ctx.issue(
            "Abnormal vibration pattern",
            format!(
                "{:.1}% of samples exceeded {VIBRATION_FACTOR}x the running average magnitude",
                percent(exceeding.len(), samples.len())
            ),
            Severity::Warning,
            &exceeding,
        ));
    }
}

pub(super) fn rotation(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    high_rpm(ctx, issues);
    low_rpm(ctx, issues);
    rpm_variability(ctx, issues);
}

fn high_rpm(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let valid = ctx.valid(Field::RpmMax, RPM_WINDOW.0, RPM_WINDOW.1);
    let high: Vec<(i64, f64)> = valid
        .iter()
        .copied()
        .filter(|&(_, v)| v > RPM_HIGH)
        .collect();
    if high.is_empty() {
        return;
    }
    let peak = high.iter().map(|&(_, v)| v).fold(0.0, f64::max);
    let ratio = high.len() as f64 / valid.len() as f64;
    let severity = if peak > RPM_CRITICAL_PEAK || ratio > RPM_HIGH_CRITICAL_RATIO {
        Severity::Critical
    } else {
        Severity::Warning
    };
    issues.push(ctx.issue(
        "High rotation speed",
        format!(
            "{} samples above {RPM_HIGH} RPM (peak {peak:.0} RPM)",
            high.len()
        ),
        severity,
        &timestamps(&high),
    ));
}

fn low_rpm(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let valid = ctx.valid(Field::RpmAvg, RPM_WINDOW.0, RPM_WINDOW.1);
    if valid.is_empty() {
        return;
    }
    let low: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v < RPM_LOW)
        .map(|&(ts, _)| ts)
        .collect();
    if low.len() as f64 / valid.len() as f64 > RPM_LOW_RATIO {
        issues.push(ctx.issue(
            "Low rotation speed",
            format!(
                "{:.1}% of samples below {RPM_LOW} RPM average",
                percent(low.len(), valid.len())
            ),
            Severity::Warning,
            &low,
        ));
    }
}

/// Per-sample spread (max − min) / avg.
fn rpm_variability(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let in_window = |r: &TelemetryRecord, field: Field| {
        r.get(field)
            .filter(|v| v.is_finite() && *v >= RPM_WINDOW.0 && *v <= RPM_WINDOW.1)
    };
    let spreads: Vec<(i64, f64)> = ctx
        .carrying(Field::RpmAvg)
        .filter_map(|r| {
            let max = in_window(r, Field::RpmMax)?;
            let min = in_window(r, Field::RpmMin)?;
            let avg = in_window(r, Field::RpmAvg).filter(|v| *v > 0.0)?;
            Some((r.timestamp, (max - min) / avg))
        })
        .collect();
    let Some(mean_spread) = stats::mean(&values(&spreads)) else {
        return;
    };
    let severity = if mean_spread > SPREAD_CRITICAL {
        Severity::Critical
    } else if mean_spread > SPREAD_WARNING {
        Severity::Warning
    } else if mean_spread > SPREAD_INFO {
        Severity::Info
    } else {
        return;
    };
    let wide: Vec<i64> = spreads
        .iter()
        .filter(|&&(_, s)| s > SPREAD_INFO)
        .map(|&(ts, _)| ts)
        .collect();
    issues.push(ctx.issue(
        "Rotation speed instability",
        format!(
            "mean spread between min and max RPM is {:.0}% of the average",
            mean_spread * 100.0
        ),
        severity,
        &wide,
    ));
}
