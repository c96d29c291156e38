// Detector catalogue. Each pass reads the context and appends zero or more issues.

mod coverage;
mod gamma;
mod motion;
mod motor;
mod power;
mod temperature;

use super::Detector;

/// Run order of the passes; issues are reported in this order.
pub static CATALOGUE: &[Detector] = &[
    Detector {
        name: "coverage",
        run: coverage::no_valid_data,
    },
    Detector {
        name: "temperature",
        run: temperature::temperature_bands,
    },
    Detector {
        name: "battery",
        run: power::battery_voltage,
    },
    Detector {
        name: "resets",
        run: power::reset_events,
    },
    Detector {
        name: "shock",
        run: motion::shock,
    },
    Detector {
        name: "motor_spikes",
        run: motor::current_spikes,
    },
    Detector {
        name: "gamma",
        run: gamma::gamma_levels,
    },
    Detector {
        name: "flow_motor",
        run: motor::flow_motor_mismatch,
    },
    Detector {
        name: "rails",
        run: power::rail_instability,
    },
    Detector {
        name: "vibration",
        run: motion::vibration,
    },
    Detector {
        name: "rotation",
        run: motion::rotation,
    },
    Detector {
        name: "motor_efficiency",
        run: motor::efficiency_trend,
    },
    Detector {
        name: "temperature_iqr",
        run: temperature::iqr_anomalies,
    },
];

fn timestamps(samples: &[(i64, f64)]) -> Vec<i64> {
    samples.iter().map(|&(ts, _)| ts).collect()
}

fn values(samples: &[(i64, f64)]) -> Vec<f64> {
    samples.iter().map(|&(_, v)| v).collect()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
