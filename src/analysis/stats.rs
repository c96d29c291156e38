// Statistical primitives shared by the detector passes.

/// Arithmetic mean; `None` for an empty series.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// `max(floor, mean + 2σ)`; just `floor` for an empty series.
pub fn dynamic_threshold(values: &[f64], floor: f64) -> f64 {
    match (mean(values), std_dev(values)) {
        (Some(m), Some(sd)) => floor.max(m + 2.0 * sd),
        _ => floor,
    }
}

/// σ / mean · 100. Undefined for an empty series or a non-positive mean.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    Some(std_dev(values)? / m * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Tukey fences: `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`.
    pub fn fences(&self) -> (f64, f64) {
        let iqr = self.iqr();
        (self.q1 - 1.5 * iqr, self.q3 + 1.5 * iqr)
    }
}

/// Quartiles by linear interpolation between ranks of the sorted series.
/// Non-finite values are ignored.
pub fn quartiles(values: &[f64]) -> Option<Quartiles> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(Quartiles {
        q1: percentile_sorted(&sorted, 25.0),
        median: percentile_sorted(&sorted, 50.0),
        q3: percentile_sorted(&sorted, 75.0),
    })
}

/// Outlier bounds `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`.
pub fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    quartiles(values).map(|q| q.fences())
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Group ascending timestamps into runs whose consecutive gap is at most `max_gap_ms`.
pub fn cluster_by_time(timestamps: &[i64], max_gap_ms: i64) -> Vec<Vec<i64>> {
    cluster_runs(timestamps, |prev, next| next - prev <= max_gap_ms)
}

/// Group ascending sample indices into runs whose consecutive gap is at most `max_gap`.
pub fn cluster_by_index(indices: &[usize], max_gap: usize) -> Vec<Vec<usize>> {
    cluster_runs(indices, |prev, next| next - prev <= max_gap)
}

fn cluster_runs<T: Copy>(items: &[T], same_cluster: impl Fn(T, T) -> bool) -> Vec<Vec<T>> {
    let mut clusters: Vec<Vec<T>> = Vec::new();
    for &item in items {
        match clusters.last_mut() {
            Some(current) if current.last().is_some_and(|&prev| same_cluster(prev, item)) => {
                current.push(item)
            }
            _ => clusters.push(vec![item]),
        }
    }
    clusters
}

/// Split clusters into (sustained, transient) member lists by cluster length.
pub fn split_sustained<T: Copy>(clusters: &[Vec<T>], min_len: usize) -> (Vec<T>, Vec<T>) {
    let mut sustained = Vec::new();
    let mut transient = Vec::new();
    for cluster in clusters {
        if cluster.len() >= min_len {
            sustained.extend_from_slice(cluster);
        } else {
            transient.extend_from_slice(cluster);
        }
    }
    (sustained, transient)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Degradation {
    pub first_avg: f64,
    pub last_avg: f64,
    /// `(first_avg − last_avg) / first_avg`; positive means the metric fell.
    pub drop: f64,
}

/// Compare the first and last quarter of a time-ordered series. Needs at least four
/// samples and a positive first-quarter average.
pub fn degradation(series: &[f64]) -> Option<Degradation> {
    let quarter = series.len() / 4;
    if quarter == 0 {
        return None;
    }
    let first_avg = mean(&series[..quarter])?;
    let last_avg = mean(&series[series.len() - quarter..])?;
    if first_avg <= 0.0 {
        return None;
    }
    Some(Degradation {
        first_avg,
        last_avg,
        drop: (first_avg - last_avg) / first_avg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_population_std_dev() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), Some(5.0));
        assert_eq!(std_dev(&v), Some(2.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(percentile_sorted(&sorted, 50.0), 2.5);
        assert_eq!(percentile_sorted(&sorted, 100.0), 4.0);
    }
}
