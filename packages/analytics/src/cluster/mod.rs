//! Clustering engines and the single entry point that dispatches to them.
//!
//! ## K-Means
//!
//! Assign each point to the nearest centroid, move each centroid to the mean
//! of its points, repeat. Minimises the within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! Cluster ids are centroid indices.
//!
//! ## Agglomerative
//!
//! Start from singletons and repeatedly merge the closest pair of clusters.
//! Closeness is defined by the [`Linkage`](landslide_map_analytics_models::Linkage)
//! rule. Cluster ids are numbered by first appearance in input order.
//!
//! Both engines are deterministic: K-Means through its seed, agglomerative
//! by construction.

pub mod agglomerative;
pub mod kmeans;

pub use agglomerative::{Agglomerative, Dendrogram};
pub use kmeans::{KMeans, KMeansFit};

use landslide_map_analytics_models::{ClusterAssignment, ClusterCut, ClusteringMethod};

use crate::AnalyticsError;

/// Partitions `features` into exactly `k` clusters.
///
/// The returned ids lie in `[0, k)` and every id has at least one member.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if `k` is zero,
/// [`AnalyticsError::InsufficientData`] if there are fewer rows than `k`, or
/// [`AnalyticsError::DegenerateClustering`] if some cluster ends up empty.
pub fn cluster(
    features: &[Vec<f64>],
    method: &ClusteringMethod,
    k: usize,
) -> Result<ClusterAssignment, AnalyticsError> {
    cluster_with_cut(features, method, ClusterCut::Count(k))
}

/// Partitions `features` using either a fixed cluster count or, for
/// agglomerative clustering, a dendrogram height.
///
/// # Errors
///
/// As [`cluster`], plus [`AnalyticsError::InvalidParameter`] when a distance
/// threshold is combined with K-Means or is negative.
pub fn cluster_with_cut(
    features: &[Vec<f64>],
    method: &ClusteringMethod,
    cut: ClusterCut,
) -> Result<ClusterAssignment, AnalyticsError> {
    let assignment = match (*method, cut) {
        (ClusteringMethod::KMeans { seed }, ClusterCut::Count(k)) => {
            let fit = KMeans::new(k).with_seed(seed).fit(features)?;
            ClusterAssignment::new(fit.labels, k)
        }
        (ClusteringMethod::KMeans { .. }, ClusterCut::DistanceThreshold(_)) => {
            return Err(AnalyticsError::InvalidParameter {
                name: "distance_threshold",
                message: "only supported by agglomerative clustering".to_string(),
            });
        }
        (ClusteringMethod::Agglomerative { linkage }, ClusterCut::Count(k)) => {
            Agglomerative::new(linkage).fit(features, k)?
        }
        (ClusteringMethod::Agglomerative { linkage }, ClusterCut::DistanceThreshold(t)) => {
            Agglomerative::new(linkage)
                .dendrogram(features)?
                .cut_by_distance(t)?
        }
    };

    let assignment = ensure_populated(assignment)?;

    log::debug!(
        "Clustered {} rows into {} clusters with {:?}",
        assignment.len(),
        assignment.n_clusters(),
        method
    );

    Ok(assignment)
}

/// Fails if any id in `[0, n_clusters)` has no members.
fn ensure_populated(assignment: ClusterAssignment) -> Result<ClusterAssignment, AnalyticsError> {
    let empty_clusters = assignment.empty_clusters();
    if empty_clusters.is_empty() {
        return Ok(assignment);
    }
    log::warn!(
        "Clustering left {} of {} clusters empty",
        empty_clusters.len(),
        assignment.n_clusters()
    );
    Err(AnalyticsError::DegenerateClustering {
        empty_clusters,
        assignment,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use landslide_map_analytics_models::Linkage;

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

    fn expected_partition() -> BTreeSet<BTreeSet<usize>> {
        BTreeSet::from([BTreeSet::from([0, 1, 2]), BTreeSet::from([3, 4, 5])])
    }

    #[test]
    fn kmeans_recovers_two_groups() {
        let assignment =
            cluster(&two_groups(), &ClusteringMethod::KMeans { seed: 42 }, 2).unwrap();
        assert_eq!(assignment.partition(), expected_partition());
    }

    #[test]
    fn every_linkage_recovers_two_groups() {
        for &linkage in Linkage::all() {
            let assignment =
                cluster(&two_groups(), &ClusteringMethod::Agglomerative { linkage }, 2).unwrap();
            assert_eq!(assignment.partition(), expected_partition(), "{linkage}");
        }
    }

    #[test]
    fn label_range_is_dense() {
        let data: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![f64::from(i % 5) * 3.0, f64::from(i % 3)])
            .collect();
        for method in [
            ClusteringMethod::KMeans { seed: 9 },
            ClusteringMethod::Agglomerative {
                linkage: Linkage::Ward,
            },
        ] {
            let assignment = cluster(&data, &method, 4).unwrap();
            assert_eq!(assignment.len(), 30);
            assert!(assignment.labels().iter().all(|&l| l < 4));
            assert!(assignment.empty_clusters().is_empty());
        }
    }

    #[test]
    fn too_many_clusters_is_insufficient_data() {
        let data = two_groups()[..5].to_vec();
        assert!(matches!(
            cluster(&data, &ClusteringMethod::KMeans { seed: 0 }, 10),
            Err(AnalyticsError::InsufficientData {
                requested: 10,
                available: 5
            })
        ));
    }

    #[test]
    fn zero_clusters_is_invalid() {
        assert!(matches!(
            cluster(&two_groups(), &ClusteringMethod::KMeans { seed: 0 }, 0),
            Err(AnalyticsError::InvalidParameter { name: "k", .. })
        ));
    }

    #[test]
    fn empty_features_are_insufficient() {
        assert!(matches!(
            cluster(&[], &ClusteringMethod::KMeans { seed: 0 }, 1),
            Err(AnalyticsError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn duplicate_rows_still_fill_every_cluster() {
        let data = vec![vec![1.0, 1.0]; 3];
        let assignment = cluster(&data, &ClusteringMethod::KMeans { seed: 0 }, 2).unwrap();
        assert_eq!(assignment.sizes().iter().sum::<usize>(), 3);
        assert!(assignment.sizes().iter().all(|&s| s > 0));
    }

    #[test]
    fn empty_cluster_is_degenerate() {
        let err = ensure_populated(ClusterAssignment::new(vec![0, 0, 2], 3)).unwrap_err();
        match err {
            AnalyticsError::DegenerateClustering {
                empty_clusters,
                assignment,
            } => {
                assert_eq!(empty_clusters, vec![1]);
                assert_eq!(assignment.labels(), &[0, 0, 2]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn distance_threshold_requires_agglomerative() {
        assert!(matches!(
            cluster_with_cut(
                &two_groups(),
                &ClusteringMethod::KMeans { seed: 0 },
                ClusterCut::DistanceThreshold(1.0)
            ),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
        let assignment = cluster_with_cut(
            &two_groups(),
            &ClusteringMethod::Agglomerative {
                linkage: Linkage::Single,
            },
            ClusterCut::DistanceThreshold(1.0),
        )
        .unwrap();
        assert_eq!(assignment.partition(), expected_partition());
    }
}
