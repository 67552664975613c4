//! Per-cluster profiles and their mapping onto risk levels.
//!
//! A cluster's risk is judged on the mean landslide count of its member
//! records: below `low` is [`RiskCategory::Low`], at or above `high` is
//! [`RiskCategory::High`], anything in between is [`RiskCategory::Medium`].

use std::collections::BTreeMap;

use landslide_map_analytics_models::{ClusterAssignment, ClusterProfile, RiskThresholds};
use landslide_map_disaster_models::RiskCategory;

use crate::AnalyticsError;
use crate::distance::mean_of;
use crate::features::FeatureMatrix;
use crate::stats::mean;

/// Builds one profile per cluster id, ascending.
///
/// `features` should be the unscaled matrix so centroids read in dataset
/// units. `landslides` holds each row's (imputed) landslide count.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if `features`, `landslides`
/// and `assignment` disagree on the number of rows.
pub fn cluster_profiles(
    features: &FeatureMatrix,
    landslides: &[f64],
    assignment: &ClusterAssignment,
) -> Result<Vec<ClusterProfile>, AnalyticsError> {
    if features.len() != assignment.len() || landslides.len() != assignment.len() {
        return Err(AnalyticsError::InvalidParameter {
            name: "assignment",
            message: format!(
                "{} labels for {} feature rows and {} landslide values",
                assignment.len(),
                features.len(),
                landslides.len()
            ),
        });
    }

    Ok((0..assignment.n_clusters())
        .map(|cluster| {
            let members = assignment.members(cluster);
            let centroid = mean_of(features.rows(), &members)
                .map(|values| features.columns().iter().copied().zip(values).collect())
                .unwrap_or_default();
            let member_landslides: Vec<f64> = members.iter().map(|&i| landslides[i]).collect();

            ClusterProfile {
                cluster,
                size: members.len(),
                centroid,
                landslide_mean: mean(&member_landslides).unwrap_or(0.0),
                risk: None,
            }
        })
        .collect())
}

/// Checks that both thresholds are finite and `low <= high`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] otherwise.
pub fn validate_thresholds(thresholds: &RiskThresholds) -> Result<(), AnalyticsError> {
    if !thresholds.low.is_finite() || !thresholds.high.is_finite() {
        return Err(AnalyticsError::InvalidParameter {
            name: "thresholds",
            message: "low and high must be finite numbers".to_string(),
        });
    }
    if thresholds.low > thresholds.high {
        return Err(AnalyticsError::InvalidParameter {
            name: "thresholds",
            message: format!(
                "low ({}) must not exceed high ({})",
                thresholds.low, thresholds.high
            ),
        });
    }
    Ok(())
}

/// Risk level of a single landslide mean.
#[must_use]
pub fn risk_for(value: f64, thresholds: &RiskThresholds) -> RiskCategory {
    if value >= thresholds.high {
        RiskCategory::High
    } else if value < thresholds.low {
        RiskCategory::Low
    } else {
        RiskCategory::Medium
    }
}

/// Maps every profiled cluster to exactly one risk level.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if the thresholds are not
/// finite or `low > high`.
pub fn categorize(
    profiles: &[ClusterProfile],
    thresholds: &RiskThresholds,
) -> Result<BTreeMap<usize, RiskCategory>, AnalyticsError> {
    validate_thresholds(thresholds)?;

    let categories: BTreeMap<usize, RiskCategory> = profiles
        .iter()
        .map(|p| (p.cluster, risk_for(p.landslide_mean, thresholds)))
        .collect();

    for (cluster, risk) in &categories {
        log::debug!("Cluster {cluster} categorised as {risk}");
    }

    Ok(categories)
}

/// Writes each profile's risk from `categories`.
pub fn apply_categories(
    profiles: &mut [ClusterProfile],
    categories: &BTreeMap<usize, RiskCategory>,
) {
    for profile in profiles {
        profile.risk = categories.get(&profile.cluster).copied();
    }
}

/// Ids of the clusters categorised as [`RiskCategory::High`], ascending.
#[must_use]
pub fn high_risk_clusters(categories: &BTreeMap<usize, RiskCategory>) -> Vec<usize> {
    categories
        .iter()
        .filter(|&(_, &risk)| risk == RiskCategory::High)
        .map(|(&cluster, _)| cluster)
        .collect()
}

#[cfg(test)]
mod tests {
    use landslide_map_disaster_models::FeatureColumn;

    use super::*;

    fn profile(cluster: usize, landslide_mean: f64) -> ClusterProfile {
        ClusterProfile {
            cluster,
            size: 1,
            centroid: BTreeMap::new(),
            landslide_mean,
            risk: None,
        }
    }

    const THRESHOLDS: RiskThresholds = RiskThresholds {
        low: 10.0,
        high: 50.0,
    };

    #[test]
    fn boundaries_are_low_exclusive_high_inclusive() {
        assert_eq!(risk_for(9.99, &THRESHOLDS), RiskCategory::Low);
        assert_eq!(risk_for(10.0, &THRESHOLDS), RiskCategory::Medium);
        assert_eq!(risk_for(49.9, &THRESHOLDS), RiskCategory::Medium);
        assert_eq!(risk_for(50.0, &THRESHOLDS), RiskCategory::High);
    }

    #[test]
    fn every_cluster_gets_exactly_one_category() {
        let profiles = vec![profile(0, 3.0), profile(1, 75.0), profile(2, 20.0)];
        let categories = categorize(&profiles, &THRESHOLDS).unwrap();
        assert_eq!(categories.len(), 3);
        assert_eq!(categories[&0], RiskCategory::Low);
        assert_eq!(categories[&1], RiskCategory::High);
        assert_eq!(categories[&2], RiskCategory::Medium);
        assert_eq!(high_risk_clusters(&categories), vec![1]);
    }

    #[test]
    fn equal_thresholds_leave_no_medium_band() {
        let thresholds = RiskThresholds {
            low: 30.0,
            high: 30.0,
        };
        assert_eq!(risk_for(29.0, &thresholds), RiskCategory::Low);
        assert_eq!(risk_for(30.0, &thresholds), RiskCategory::High);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let thresholds = RiskThresholds {
            low: 60.0,
            high: 20.0,
        };
        assert!(matches!(
            categorize(&[profile(0, 1.0)], &thresholds),
            Err(AnalyticsError::InvalidParameter {
                name: "thresholds",
                ..
            })
        ));
        let nan = RiskThresholds {
            low: f64::NAN,
            high: 20.0,
        };
        assert!(validate_thresholds(&nan).is_err());
    }

    #[test]
    fn profiles_average_members_in_dataset_units() {
        let features = FeatureMatrix::new(
            vec![FeatureColumn::LandslideCount, FeatureColumn::Latitude],
            vec![vec![10.0, -6.0], vec![30.0, -7.0], vec![100.0, -8.0]],
        )
        .unwrap();
        let assignment = ClusterAssignment::new(vec![0, 0, 1], 2);
        let mut profiles =
            cluster_profiles(&features, &[10.0, 30.0, 100.0], &assignment).unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].size, 2);
        assert!((profiles[0].landslide_mean - 20.0).abs() < 1e-12);
        assert!((profiles[0].centroid[&FeatureColumn::Latitude] - -6.5).abs() < 1e-12);
        assert!((profiles[1].landslide_mean - 100.0).abs() < 1e-12);

        let categories = categorize(&profiles, &THRESHOLDS).unwrap();
        apply_categories(&mut profiles, &categories);
        assert_eq!(profiles[0].risk, Some(RiskCategory::Medium));
        assert_eq!(profiles[1].risk, Some(RiskCategory::High));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let features =
            FeatureMatrix::new(vec![FeatureColumn::Deaths], vec![vec![1.0], vec![2.0]]).unwrap();
        assert!(
            cluster_profiles(&features, &[1.0], &ClusterAssignment::new(vec![0, 0], 1)).is_err()
        );
    }
}
