// Statistical primitive tests: thresholds, quartiles, clustering, degradation

use drilldump::analysis::stats::*;

#[test]
fn dynamic_threshold_never_drops_below_floor() {
    assert_eq!(dynamic_threshold(&[], 8.0), 8.0);
    assert_eq!(dynamic_threshold(&[1.0, 1.0, 1.0], 8.0), 8.0);
    // mean 5, σ 2 → 9
    let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert_eq!(dynamic_threshold(&v, 8.0), 9.0);
    assert_eq!(dynamic_threshold(&v, 10.0), 10.0);
}

#[test]
fn coefficient_of_variation_needs_positive_mean() {
    assert_eq!(coefficient_of_variation(&[]), None);
    assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
    assert_eq!(coefficient_of_variation(&[-1.0, -3.0]), None);
    let cv = coefficient_of_variation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    assert!((cv - 40.0).abs() < 1e-9);
}

#[test]
fn quartiles_interpolate_between_ranks() {
    let q = quartiles(&[4.0, 1.0, 3.0, 2.0]).unwrap();
    assert_eq!(q.q1, 1.75);
    assert_eq!(q.median, 2.5);
    assert_eq!(q.q3, 3.25);
    assert_eq!(q.iqr(), 1.5);
    assert_eq!(iqr_bounds(&[4.0, 1.0, 3.0, 2.0]), Some((-0.5, 5.5)));

    let single = quartiles(&[7.0]).unwrap();
    assert_eq!((single.q1, single.median, single.q3), (7.0, 7.0, 7.0));
    assert_eq!(quartiles(&[]), None);
    assert_eq!(quartiles(&[f64::NAN]), None);
}

#[test]
fn time_clusters_split_on_gaps_over_the_window() {
    let ts = [0, 10_000, 40_000, 71_000, 72_000, 200_000];
    let clusters = cluster_by_time(&ts, 30_000);
    assert_eq!(
        clusters,
        vec![vec![0, 10_000, 40_000], vec![71_000, 72_000], vec![200_000]]
    );
    assert!(cluster_by_time(&[], 30_000).is_empty());
}

#[test]
fn clustering_is_idempotent() {
    let ts = [0, 1_000, 2_000, 50_000, 51_000, 120_000, 121_000, 122_000, 123_000];
    let first = cluster_by_time(&ts, 30_000);
    let flattened: Vec<i64> = first.iter().flatten().copied().collect();
    assert_eq!(flattened, ts);
    assert_eq!(cluster_by_time(&flattened, 30_000), first);
    for cluster in &first {
        assert_eq!(cluster_by_time(cluster, 30_000), vec![cluster.clone()]);
    }

    let idx = [1, 2, 3, 10, 11, 40];
    let first = cluster_by_index(&idx, 5);
    assert_eq!(first, vec![vec![1, 2, 3], vec![10, 11], vec![40]]);
    let flattened: Vec<usize> = first.iter().flatten().copied().collect();
    assert_eq!(cluster_by_index(&flattened, 5), first);
}

#[test]
fn split_sustained_by_cluster_length() {
    let clusters = vec![vec![1, 2, 3], vec![10], vec![20, 21, 22, 23], vec![30, 31]];
    let (sustained, transient) = split_sustained(&clusters, 3);
    assert_eq!(sustained, vec![1, 2, 3, 20, 21, 22, 23]);
    assert_eq!(transient, vec![10, 30, 31]);
}

#[test]
fn degradation_compares_first_and_last_quarter() {
    let series = [4.0, 4.0, 3.0, 3.0, 3.0, 3.0, 2.0, 2.0];
    let d = degradation(&series).unwrap();
    assert_eq!(d.first_avg, 4.0);
    assert_eq!(d.last_avg, 2.0);
    assert_eq!(d.drop, 0.5);

    assert_eq!(degradation(&[1.0, 2.0, 3.0]), None);
    assert_eq!(degradation(&[0.0, 0.0, 1.0, 1.0]), None);
    // Improvement is a negative drop.
    assert!(degradation(&[1.0, 1.0, 2.0, 2.0]).unwrap().drop < 0.0);
}
