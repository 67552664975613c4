//! Cluster quality metrics and sweeps over the cluster count.
//!
//! The elbow sweep records K-Means inertia for `k = 1..=k_max`; the
//! silhouette sweep records the mean silhouette coefficient for
//! `k = 2..=k_max`. Both report one step per `k` through a
//! [`ProgressCallback`].

use std::sync::Arc;

use landslide_map_analytics_models::{
    ClusterAssignment, ClusteringMethod, CurveMetric, EvaluationCurve, EvaluationPoint, Linkage,
    LinkageComparison,
};
use landslide_map_source::progress::ProgressCallback;

use crate::cluster::{Agglomerative, Dendrogram, KMeans, KMeansFit, cluster};
use crate::distance::{condensed_distances, mean_of, pairwise_distances, squared_euclidean};
use crate::stats::pearson;
use crate::{AnalyticsError, validate_matrix};

/// Within-cluster sum of squared distances to each cluster's mean.
#[must_use]
pub fn inertia(features: &[Vec<f64>], assignment: &ClusterAssignment) -> f64 {
    (0..assignment.n_clusters())
        .map(|c| {
            let members = assignment.members(c);
            mean_of(features, &members).map_or(0.0, |centroid| {
                members
                    .iter()
                    .map(|&i| squared_euclidean(&features[i], &centroid))
                    .sum()
            })
        })
        .sum()
}

/// Mean silhouette coefficient over all rows.
///
/// For row `i` with mean intra-cluster distance `a` and smallest mean
/// distance to another cluster `b`, the coefficient is
/// `(b - a) / max(a, b)`. Rows in singleton clusters score 0. The result
/// lies in `[-1, 1]`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] unless the assignment has
/// between 2 and `n - 1` clusters and one label per row.
#[allow(clippy::cast_precision_loss)]
pub fn silhouette_score(
    features: &[Vec<f64>],
    assignment: &ClusterAssignment,
) -> Result<f64, AnalyticsError> {
    let n = features.len();
    if assignment.len() != n {
        return Err(AnalyticsError::InvalidParameter {
            name: "assignment",
            message: format!("{} labels for {n} rows", assignment.len()),
        });
    }
    let k = assignment.n_clusters();
    if k < 2 || k >= n {
        return Err(AnalyticsError::InvalidParameter {
            name: "n_clusters",
            message: format!("silhouette needs 2 <= clusters <= {}, got {k}", n.saturating_sub(1)),
        });
    }
    validate_matrix(features, 2)?;

    let dist = pairwise_distances(features);
    let labels = assignment.labels();
    let sizes = assignment.sizes();

    let total: f64 = (0..n)
        .map(|i| {
            let own = labels[i];
            if sizes[own] <= 1 {
                return 0.0;
            }
            let mut sums = vec![0.0; k];
            for (j, &label) in labels.iter().enumerate() {
                if j != i {
                    sums[label] += dist[i][j];
                }
            }
            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 && denom.is_finite() {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .sum();

    Ok(total / n as f64)
}

/// A sweep up to `k_max` needs `k_min <= k_max < rows`. Too few rows is
/// reported as `InsufficientData` with `requested = k_max + 1` rows.
fn check_sweep_bound(
    features: &[Vec<f64>],
    k_max: usize,
    k_min: usize,
) -> Result<(), AnalyticsError> {
    if k_max < k_min {
        return Err(AnalyticsError::InvalidParameter {
            name: "k_max",
            message: format!("must be at least {k_min}, got {k_max}"),
        });
    }
    if k_max >= features.len() {
        return Err(AnalyticsError::InsufficientData {
            requested: k_max + 1,
            available: features.len(),
        });
    }
    validate_matrix(features, k_max + 1)?;
    Ok(())
}

/// K-Means inertia for every `k` in `1..=k_max`.
///
/// Each `k` keeps the better of two fits: one from a fresh seeded
/// initialisation, and one warm-started from the `k - 1` centroids plus the
/// row farthest from its centroid. The warm start can only lower the
/// objective, so the curve never increases with `k`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] if `k_max >= features.len()`
/// and [`AnalyticsError::InvalidParameter`] if `k_max` is zero.
pub fn elbow_curve(
    features: &[Vec<f64>],
    k_max: usize,
    seed: u64,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<EvaluationCurve, AnalyticsError> {
    check_sweep_bound(features, k_max, 1)?;

    progress.begin("elbow", k_max as u64);
    let mut curve = EvaluationCurve::new(CurveMetric::Inertia);
    let mut previous: Option<KMeansFit> = None;

    for k in 1..=k_max {
        let seeded = KMeans::new(k).with_seed(seed).fit(features)?;

        let best = match previous {
            Some(prev) => {
                let mut centroids = prev.centroids;
                let far = farthest_row(features, &centroids, &prev.labels);
                centroids.push(features[far].clone());
                let warm = KMeans::new(k).fit_from(features, centroids)?;
                if warm.inertia < seeded.inertia {
                    log::trace!("elbow k={k}: warm start beat seeded fit");
                    warm
                } else {
                    seeded
                }
            }
            None => seeded,
        };

        curve.points.push(EvaluationPoint {
            k,
            value: best.inertia,
        });
        previous = Some(best);
        progress.advance(k);
    }

    progress.end(&format!("elbow: {k_max} fits"));
    log::debug!("Elbow curve computed for k = 1..={k_max}");
    Ok(curve)
}

/// Row with the largest squared distance to its assigned centroid (first on
/// ties).
fn farthest_row(features: &[Vec<f64>], centroids: &[Vec<f64>], labels: &[usize]) -> usize {
    features
        .iter()
        .zip(labels)
        .map(|(p, &l)| squared_euclidean(p, &centroids[l]))
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, d)| if d > best.1 { (i, d) } else { best })
        .0
}

/// Mean silhouette for every `k` in `2..=k_max`, clustering with `method`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] if `k_max >= features.len()`,
/// [`AnalyticsError::InvalidParameter`] if `k_max < 2`, or any clustering
/// error.
pub fn silhouette_curve(
    features: &[Vec<f64>],
    k_max: usize,
    method: &ClusteringMethod,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<EvaluationCurve, AnalyticsError> {
    check_sweep_bound(features, k_max, 2)?;

    // Agglomerative cuts share one dendrogram.
    let (dendrogram, method_label) = match method {
        ClusteringMethod::Agglomerative { linkage } => (
            Some(Agglomerative::new(*linkage).dendrogram(features)?),
            linkage.to_string(),
        ),
        ClusteringMethod::KMeans { .. } => (None, "kmeans".to_string()),
    };

    progress.begin(&format!("silhouette ({method_label})"), (k_max - 1) as u64);
    let mut curve = EvaluationCurve::new(CurveMetric::Silhouette);
    for k in 2..=k_max {
        let assignment = match &dendrogram {
            Some(d) => d.cut_into(k)?,
            None => cluster(features, method, k)?,
        };
        let value = silhouette_score(features, &assignment)?;
        log::trace!("silhouette k={k}: {value:.4}");
        curve.points.push(EvaluationPoint { k, value });
        progress.advance(k);
    }
    progress.end(&format!("silhouette ({method_label}): {} cuts", k_max - 1));

    Ok(curve)
}

/// Pearson correlation between a dendrogram's cophenetic distances and the
/// original pairwise distances. `None` if either set of distances is
/// constant.
#[must_use]
pub fn dendrogram_correlation(features: &[Vec<f64>], dendrogram: &Dendrogram) -> Option<f64> {
    pearson(&dendrogram.cophenetic_distances(), &condensed_distances(features))
}

/// Cophenetic correlation coefficient of `linkage` on `features`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] for fewer than three rows,
/// or any error from [`validate_matrix`].
pub fn cophenetic_correlation(
    features: &[Vec<f64>],
    linkage: Linkage,
) -> Result<Option<f64>, AnalyticsError> {
    validate_matrix(features, 3)?;
    let dendrogram = Agglomerative::new(linkage).dendrogram(features)?;
    Ok(dendrogram_correlation(features, &dendrogram))
}

/// Cophenetic correlation and silhouette curve for each linkage in
/// `linkages`, in the order given.
///
/// # Errors
///
/// As [`silhouette_curve`].
pub fn compare_linkages(
    features: &[Vec<f64>],
    k_max: usize,
    linkages: &[Linkage],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<LinkageComparison>, AnalyticsError> {
    check_sweep_bound(features, k_max, 2)?;

    linkages
        .iter()
        .map(|&linkage| {
            let method = ClusteringMethod::Agglomerative { linkage };
            let silhouette = silhouette_curve(features, k_max, &method, progress)?;
            let dendrogram = Agglomerative::new(linkage).dendrogram(features)?;
            let cophenetic_correlation = dendrogram_correlation(features, &dendrogram);
            log::info!(
                "{linkage} linkage: cophenetic correlation {}, best silhouette at k = {}",
                cophenetic_correlation.map_or_else(|| "n/a".to_string(), |c| format!("{c:.4}")),
                silhouette
                    .argmax_k()
                    .map_or_else(|| "n/a".to_string(), |k| k.to_string()),
            );
            Ok(LinkageComparison {
                linkage,
                cophenetic_correlation,
                silhouette,
            })
        })
        .collect()
}

/// The `k` at the "knee" of an elbow curve: the point farthest from the
/// straight line joining the first and last points, after scaling both axes
/// to `[0, 1]`. `None` for curves with fewer than three points or no drop.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn elbow_point(curve: &EvaluationCurve) -> Option<usize> {
    let (first, last) = (curve.points.first()?, curve.points.last()?);
    if curve.points.len() < 3 {
        return None;
    }
    let k_span = (last.k - first.k) as f64;
    let v_span = first.value - last.value;
    if v_span <= 0.0 {
        return None;
    }

    curve
        .points
        .iter()
        .map(|p| {
            let x = (p.k - first.k) as f64 / k_span;
            let y = (first.value - p.value) / v_span;
            // Distance above the diagonal y = x, up to a constant factor.
            (p.k, y - x)
        })
        .fold(None::<(usize, f64)>, |best, (k, d)| match best {
            Some((_, bd)) if bd >= d => best,
            _ => Some((k, d)),
        })
        .map(|(k, _)| k)
}

#[cfg(test)]
mod tests {
    use landslide_map_source::progress::null_progress;

    use super::*;

    fn two_groups() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
        ]
    }

    fn scattered(n: i32) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let x = f64::from(i);
                vec![(x * 1.3).sin() * 4.0 + x * 0.2, (x * 0.7).cos() * 3.0]
            })
            .collect()
    }

    #[test]
    fn well_separated_groups_score_near_one() {
        let assignment = ClusterAssignment::new(vec![0, 0, 0, 1, 1, 1], 2);
        let score = silhouette_score(&two_groups(), &assignment).unwrap();
        assert!(score > 0.9, "silhouette {score}");
    }

    #[test]
    fn silhouette_curve_peaks_at_true_k() {
        let curve = silhouette_curve(
            &two_groups(),
            2,
            &ClusteringMethod::KMeans { seed: 42 },
            &null_progress(),
        )
        .unwrap();
        assert_eq!(curve.points.len(), 1);
        assert!(curve.value_at(2).unwrap() > 0.9);
    }

    #[test]
    fn silhouette_stays_in_range() {
        let data = scattered(20);
        for labels in [
            vec![0, 1].repeat(10),
            (0..20).map(|i| i % 3).collect::<Vec<_>>(),
            (0..20).map(|i| usize::from(i >= 10)).collect::<Vec<_>>(),
        ] {
            let assignment = ClusterAssignment::from_labels(&labels);
            let score = silhouette_score(&data, &assignment).unwrap();
            assert!((-1.0..=1.0).contains(&score), "silhouette {score}");
        }
    }

    #[test]
    fn singleton_clusters_score_zero() {
        let data = vec![vec![0.0], vec![0.0], vec![9.0]];
        // Row 2 is alone; rows 0 and 1 coincide so a = 0 and they score 1.
        let score = silhouette_score(&data, &ClusterAssignment::new(vec![0, 0, 1], 2)).unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn silhouette_rejects_single_cluster() {
        assert!(matches!(
            silhouette_score(&two_groups(), &ClusterAssignment::new(vec![0; 6], 1)),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn elbow_curve_never_increases() {
        let data = scattered(30);
        let curve = elbow_curve(&data, 10, 42, &null_progress()).unwrap();
        assert_eq!(curve.points.len(), 10);
        assert_eq!(curve.points[0].k, 1);
        for pair in curve.points.windows(2) {
            assert!(
                pair[1].value <= pair[0].value + 1e-9,
                "inertia rose from k={} to k={}",
                pair[0].k,
                pair[1].k
            );
        }
    }

    #[test]
    fn elbow_at_k_one_is_total_scatter() {
        let data = two_groups();
        let curve = elbow_curve(&data, 2, 0, &null_progress()).unwrap();
        let all = ClusterAssignment::new(vec![0; 6], 1);
        assert!((curve.value_at(1).unwrap() - inertia(&data, &all)).abs() < 1e-9);
        assert!(curve.value_at(2).unwrap() < 0.1);
    }

    #[test]
    fn sweep_bound_must_be_below_row_count() {
        let data = two_groups()[..5].to_vec();
        assert!(matches!(
            elbow_curve(&data, 5, 0, &null_progress()),
            Err(AnalyticsError::InsufficientData {
                requested: 6,
                available: 5
            })
        ));
        let message = elbow_curve(&data, 5, 0, &null_progress())
            .unwrap_err()
            .to_string();
        assert!(message.contains("6 rows required"), "{message}");
        assert!(matches!(
            silhouette_curve(
                &data,
                1,
                &ClusteringMethod::KMeans { seed: 0 },
                &null_progress()
            ),
            Err(AnalyticsError::InvalidParameter { name: "k_max", .. })
        ));
    }

    #[derive(Default)]
    struct Recorder {
        events: std::sync::Mutex<Vec<String>>,
    }

    impl ProgressCallback for Recorder {
        fn begin(&self, label: &str, steps: u64) {
            self.events.lock().unwrap().push(format!("begin {label} {steps}"));
        }

        fn advance(&self, k: usize) {
            self.events.lock().unwrap().push(format!("k {k}"));
        }
    }

    #[test]
    fn sweeps_report_each_k() {
        let recorder = Arc::new(Recorder::default());
        let progress: Arc<dyn ProgressCallback> = recorder.clone();
        silhouette_curve(
            &scattered(8),
            4,
            &ClusteringMethod::Agglomerative {
                linkage: Linkage::Average,
            },
            &progress,
        )
        .unwrap();

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["begin silhouette (average) 3", "k 2", "k 3", "k 4"]
        );
    }

    #[test]
    fn cophenetic_correlation_is_high_for_clear_structure() {
        for &linkage in Linkage::all() {
            let ccc = cophenetic_correlation(&two_groups(), linkage)
                .unwrap()
                .unwrap();
            assert!(ccc > 0.9, "{linkage}: {ccc}");
            assert!(ccc <= 1.0);
        }
    }

    #[test]
    fn compare_linkages_covers_each_linkage() {
        let comparisons =
            compare_linkages(&scattered(12), 4, Linkage::all(), &null_progress()).unwrap();
        assert_eq!(comparisons.len(), 4);
        for comparison in &comparisons {
            assert_eq!(comparison.silhouette.points.len(), 3);
            assert!(comparison.cophenetic_correlation.is_some());
        }
        assert_eq!(comparisons[3].linkage, Linkage::Ward);
    }

    #[test]
    fn elbow_point_finds_knee() {
        let curve = EvaluationCurve {
            metric: CurveMetric::Inertia,
            points: [100.0, 20.0, 15.0, 12.0, 10.0]
                .iter()
                .enumerate()
                .map(|(i, &value)| EvaluationPoint { k: i + 1, value })
                .collect(),
        };
        assert_eq!(elbow_point(&curve), Some(2));
    }
}
