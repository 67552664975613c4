#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clustering engine for landslide disaster records.
//!
//! The pipeline runs in one direction: a validated
//! [`RecordSet`](landslide_map_source::RecordSet) is projected into a
//! [`features::FeatureMatrix`], the matrix is partitioned by
//! [`cluster::cluster`], the partition is scored by [`evaluate`], and
//! [`categorize`] maps each cluster onto a risk level.
//! [`pipeline::run_pipeline`] chains those steps into a single
//! [`ClusteringReport`](landslide_map_analytics_models::ClusteringReport).
//! [`stats`] holds the descriptive statistics that sit alongside the
//! clustering output.

pub mod categorize;
pub mod cluster;
pub mod distance;
pub mod evaluate;
pub mod features;
pub mod pipeline;
pub mod stats;

use landslide_map_analytics_models::{ClusterAssignment, ConfigError};
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A requested feature column is unknown, absent from the source, or
    /// has no values in the selected records.
    #[error("Schema error: column '{column}' {reason}")]
    Schema {
        /// Column name as requested.
        column: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Fewer rows than the operation needs.
    #[error("Insufficient data: {requested} rows required but only {available} available")]
    InsufficientData {
        /// Rows the operation needs: `k` to form `k` clusters, `k_max + 1`
        /// for a sweep up to `k_max`.
        requested: usize,
        /// Number of rows on hand.
        available: usize,
    },

    /// The algorithm finished with one or more clusters that have no members.
    #[error("Degenerate clustering: clusters {empty_clusters:?} are empty")]
    DegenerateClustering {
        /// Ids of the empty clusters.
        empty_clusters: Vec<usize>,
        /// The partial assignment, for diagnostics.
        assignment: ClusterAssignment,
    },

    /// A parameter is outside its valid range.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// Rows of a feature matrix have different lengths.
    #[error("Dimension mismatch: expected {expected} features, found {found}")]
    DimensionMismatch {
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// Pipeline configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Checks that `data` is a non-empty, rectangular matrix of finite values
/// and returns its dimensionality.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] if `data` has fewer than
/// `required` rows, [`AnalyticsError::DimensionMismatch`] if rows differ in
/// length, or [`AnalyticsError::InvalidParameter`] if a value is NaN or
/// infinite.
pub fn validate_matrix(data: &[Vec<f64>], required: usize) -> Result<usize, AnalyticsError> {
    if data.is_empty() || data.len() < required {
        return Err(AnalyticsError::InsufficientData {
            requested: required.max(1),
            available: data.len(),
        });
    }

    let dim = data[0].len();
    for row in data {
        if row.len() != dim {
            return Err(AnalyticsError::DimensionMismatch {
                expected: dim,
                found: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::InvalidParameter {
                name: "features",
                message: "feature values must be finite".to_string(),
            });
        }
    }

    Ok(dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_matrix_checks_shape() {
        assert_eq!(validate_matrix(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap(), 2);
        assert!(matches!(
            validate_matrix(&[vec![1.0, 2.0], vec![3.0]], 1),
            Err(AnalyticsError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            validate_matrix(&[vec![1.0]], 3),
            Err(AnalyticsError::InsufficientData {
                requested: 3,
                available: 1
            })
        ));
        assert!(matches!(
            validate_matrix(&[], 0),
            Err(AnalyticsError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn validate_matrix_rejects_nan() {
        assert!(matches!(
            validate_matrix(&[vec![f64::NAN]], 1),
            Err(AnalyticsError::InvalidParameter {
                name: "features",
                ..
            })
        ));
    }
}
