// Temperature bands, low temperature, sensor integrity, IQR outliers (°F).

use super::{percent, timestamps, values};
use crate::analysis::Context;
use crate::analysis::stats;
use crate::models::{Field, Issue, Severity};

const WINDOW_MIN: f64 = -40.0;
const WINDOW_MAX: f64 = 400.0;
const CRITICAL_ABOVE: f64 = 200.0;
const WARNING_ABOVE: f64 = 160.0;
const LOW_BELOW: f64 = 50.0;
const LOW_RATIO: f64 = 0.10;
const CLUSTER_GAP_MS: i64 = 30_000;
const SUSTAINED_SAMPLES: usize = 3;
const INTEGRITY_CRITICAL: f64 = 0.20;
const INTEGRITY_WARNING: f64 = 0.05;
const IQR_MIN_SAMPLES: usize = 4;

pub(super) fn temperature_bands(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let carrying: Vec<i64> = ctx
        .carrying(Field::Temperature)
        .map(|r| r.timestamp)
        .collect();
    if carrying.is_empty() {
        return;
    }
    let valid = ctx.valid(Field::Temperature, WINDOW_MIN, WINDOW_MAX);
    if valid.is_empty() {
        issues.push(ctx.issue(
            "Temperature sensor failure",
            format!(
                "none of {} samples carried a usable temperature reading",
                carrying.len()
            ),
            Severity::Critical,
            &carrying,
        ));
        return;
    }

    let critical: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v > CRITICAL_ABOVE)
        .map(|&(ts, _)| ts)
        .collect();
    let elevated: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v > WARNING_ABOVE && v <= CRITICAL_ABOVE)
        .map(|&(ts, _)| ts)
        .collect();

    push_band(
        ctx,
        issues,
        &critical,
        ("Sustained critical temperature", Severity::Critical),
        ("Transient critical temperature", Severity::Warning),
        CRITICAL_ABOVE,
    );
    push_band(
        ctx,
        issues,
        &elevated,
        ("Sustained elevated temperature", Severity::Warning),
        ("Transient elevated temperature", Severity::Info),
        WARNING_ABOVE,
    );

    let low: Vec<i64> = valid
        .iter()
        .filter(|&&(_, v)| v < LOW_BELOW)
        .map(|&(ts, _)| ts)
        .collect();
    if low.len() as f64 / valid.len() as f64 > LOW_RATIO {
        issues.push(ctx.issue(
            "Low operating temperature",
            format!(
                "{:.1}% of samples below {LOW_BELOW}°F",
                percent(low.len(), valid.len())
            ),
            Severity::Warning,
            &low,
        ));
    }

    let invalid: Vec<i64> = ctx
        .carrying(Field::Temperature)
        .filter(|r| {
            !r.get(Field::Temperature)
                .is_some_and(|v| v.is_finite() && (WINDOW_MIN..=WINDOW_MAX).contains(&v))
        })
        .map(|r| r.timestamp)
        .collect();
    if !invalid.is_empty() {
        let ratio = invalid.len() as f64 / carrying.len() as f64;
        let severity = if ratio > INTEGRITY_CRITICAL {
            Severity::Critical
        } else if ratio > INTEGRITY_WARNING {
            Severity::Warning
        } else {
            Severity::Info
        };
        issues.push(ctx.issue(
            "Temperature sensor integrity",
            format!(
                "{} of {} samples missing or outside {WINDOW_MIN}..{WINDOW_MAX}°F ({:.1}%)",
                invalid.len(),
                carrying.len(),
                ratio * 100.0
            ),
            severity,
            &invalid,
        ));
    }
}

/// Cluster one band by time and emit its sustained and transient parts separately.
fn push_band(
    ctx: &Context<'_>,
    issues: &mut Vec<Issue>,
    band: &[i64],
    sustained_as: (&str, Severity),
    transient_as: (&str, Severity),
    threshold: f64,
) {
    if band.is_empty() {
        return;
    }
    let clusters = stats::cluster_by_time(band, CLUSTER_GAP_MS);
    let (sustained, transient) = stats::split_sustained(&clusters, SUSTAINED_SAMPLES);
    let sustained_runs = clusters
        .iter()
        .filter(|c| c.len() >= SUSTAINED_SAMPLES)
        .count();

    if !sustained.is_empty() {
        issues.push(ctx.issue(
            sustained_as.0,
            format!("{sustained_runs} run(s) of {SUSTAINED_SAMPLES}+ samples above {threshold}°F"),
            sustained_as.1,
            &sustained,
        ));
    }
    if !transient.is_empty() {
        issues.push(ctx.issue(
            transient_as.0,
            format!(
                "{} short excursion(s) above {threshold}°F",
                clusters.len() - sustained_runs
            ),
            transient_as.1,
            &transient,
        ));
    }
}

pub(super) fn iqr_anomalies(ctx: &Context<'_>, issues: &mut Vec<Issue>) {
    let valid = ctx.valid(Field::Temperature, WINDOW_MIN, WINDOW_MAX);
    if valid.len() < IQR_MIN_SAMPLES {
        return;
    }
    let Some((low, high)) = stats::iqr_bounds(&values(&valid)) else {
        return;
    };
    let outliers: Vec<(i64, f64)> = valid
        .into_iter()
        .filter(|&(_, v)| v < low || v > high)
        .collect();
    if outliers.is_empty() {
        return;
    }
    issues.push(ctx.issue(
        "Temperature anomalies",
        format!(
            "{} samples outside the interquartile range {low:.1}..{high:.1}°F",
            outliers.len()
        ),
        Severity::Info,
        &timestamps(&outliers),
    ));
}
