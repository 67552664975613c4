#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clustering pipeline configuration and result types.
//!
//! Everything the analytics layer hands to the presentation layer lives
//! here as plain serializable values: cluster assignments, per-cluster
//! profiles, evaluation curves, descriptive statistics, and the combined
//! [`ClusteringReport`]. All types serialize to JSON objects with camelCase
//! field names.

pub mod config;

use std::collections::{BTreeMap, BTreeSet};

use landslide_map_disaster_models::{FeatureColumn, RiskCategory};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use config::{ConfigError, PipelineConfig, RiskThresholds};

/// Rule for measuring the distance between two clusters during
/// agglomerative merging.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Linkage {
    /// Minimum pairwise distance between members
    Single,
    /// Maximum pairwise distance between members
    Complete,
    /// Mean pairwise distance between members
    Average,
    /// Merge that minimises the increase in within-cluster variance
    Ward,
}

impl Linkage {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Single, Self::Complete, Self::Average, Self::Ward]
    }
}

/// Clustering algorithm family, as named in config files.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MethodKind {
    /// Lloyd's K-Means
    KMeans,
    /// Agglomerative hierarchical clustering
    Agglomerative,
}

/// A fully-resolved clustering algorithm with its method-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ClusteringMethod {
    /// K-Means with a seeded initialisation.
    KMeans {
        /// Random seed for centroid initialisation.
        seed: u64,
    },
    /// Agglomerative clustering with the given linkage.
    Agglomerative {
        /// Inter-cluster distance rule.
        linkage: Linkage,
    },
}

impl ClusteringMethod {
    /// The algorithm family.
    #[must_use]
    pub const fn kind(&self) -> MethodKind {
        match self {
            Self::KMeans { .. } => MethodKind::KMeans,
            Self::Agglomerative { .. } => MethodKind::Agglomerative,
        }
    }
}

/// How the number of clusters is decided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterCut {
    /// Exactly this many clusters.
    Count(usize),
    /// Cut the dendrogram at this merge height (agglomerative only).
    DistanceThreshold(f64),
}

/// A dense, zero-based cluster id for every input row, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    labels: Vec<usize>,
    n_clusters: usize,
}

impl ClusterAssignment {
    /// Wraps raw labels. `n_clusters` is the number of ids the producer
    /// intended to use, which may exceed the ids actually present.
    #[must_use]
    pub const fn new(labels: Vec<usize>, n_clusters: usize) -> Self {
        Self { labels, n_clusters }
    }

    /// Builds an assignment from arbitrary labels, renumbering them densely
    /// in order of first appearance.
    #[must_use]
    pub fn from_labels(labels: &[usize]) -> Self {
        let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
        let dense = labels
            .iter()
            .map(|&label| {
                let next = mapping.len();
                *mapping.entry(label).or_insert(next)
            })
            .collect();
        Self {
            labels: dense,
            n_clusters: mapping.len(),
        }
    }

    /// Cluster id per input row.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of cluster ids in use (`[0, n_clusters)`).
    #[must_use]
    pub const fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Cluster id of row `index`.
    #[must_use]
    pub fn cluster_of(&self, index: usize) -> Option<usize> {
        self.labels.get(index).copied()
    }

    /// Member count per cluster id.
    #[must_use]
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in &self.labels {
            if let Some(size) = sizes.get_mut(label) {
                *size += 1;
            }
        }
        sizes
    }

    /// Row indices belonging to `cluster`, ascending.
    #[must_use]
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Cluster ids in `[0, n_clusters)` with no members.
    #[must_use]
    pub fn empty_clusters(&self) -> Vec<usize> {
        self.sizes()
            .iter()
            .enumerate()
            .filter(|&(_, &size)| size == 0)
            .map(|(cluster, _)| cluster)
            .collect()
    }

    /// The assignment as a set of member sets, independent of id numbering.
    #[must_use]
    pub fn partition(&self) -> BTreeSet<BTreeSet<usize>> {
        let mut groups: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for (i, &label) in self.labels.iter().enumerate() {
            groups.entry(label).or_default().insert(i);
        }
        groups.into_values().collect()
    }
}

/// Summary of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProfile {
    /// Cluster id.
    pub cluster: usize,
    /// Number of member records.
    pub size: usize,
    /// Mean of each feature over the members, in unscaled units.
    pub centroid: BTreeMap<FeatureColumn, f64>,
    /// Mean landslide count over the members; the value risk is judged on.
    pub landslide_mean: f64,
    /// Risk level, once categorised.
    pub risk: Option<RiskCategory>,
}

/// What an [`EvaluationCurve`] measures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CurveMetric {
    /// Within-cluster sum of squared distances (elbow method).
    Inertia,
    /// Mean silhouette coefficient.
    Silhouette,
}

/// One `(k, value)` sample on an evaluation curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationPoint {
    /// Cluster count.
    pub k: usize,
    /// Metric value at `k`.
    pub value: f64,
}

/// Metric values for a range of cluster counts, ascending by `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationCurve {
    /// Metric being measured.
    pub metric: CurveMetric,
    /// Samples, strictly ascending by `k`.
    pub points: Vec<EvaluationPoint>,
}

impl EvaluationCurve {
    /// Creates an empty curve.
    #[must_use]
    pub const fn new(metric: CurveMetric) -> Self {
        Self {
            metric,
            points: Vec::new(),
        }
    }

    /// Value recorded for `k`, if any.
    #[must_use]
    pub fn value_at(&self, k: usize) -> Option<f64> {
        self.points.iter().find(|p| p.k == k).map(|p| p.value)
    }

    /// The `k` with the highest value (first one on ties).
    #[must_use]
    pub fn argmax_k(&self) -> Option<usize> {
        self.points
            .iter()
            .fold(None::<&EvaluationPoint>, |best, p| match best {
                Some(b) if b.value >= p.value => Some(b),
                _ => Some(p),
            })
            .map(|p| p.k)
    }
}

/// How many values were imputed in one feature column, and with what.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnImputation {
    /// Feature column.
    pub column: FeatureColumn,
    /// Number of missing cells that were filled.
    pub imputed: usize,
    /// Column mean over the present values, used as the fill value.
    pub fill_value: f64,
}

/// Per-column imputation counts for one feature extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImputationReport {
    /// One entry per extracted column, in feature order.
    pub columns: Vec<ColumnImputation>,
}

impl ImputationReport {
    /// Total number of imputed cells across all columns.
    #[must_use]
    pub fn total_imputed(&self) -> usize {
        self.columns.iter().map(|c| c.imputed).sum()
    }

    /// Number of imputed cells in `column`.
    #[must_use]
    pub fn imputed_for(&self, column: FeatureColumn) -> usize {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map_or(0, |c| c.imputed)
    }
}

/// One step of an agglomerative dendrogram.
///
/// Node ids follow the usual linkage-matrix convention: `0..n` are the
/// input rows, and the cluster created by merge `i` gets id `n + i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merge {
    /// Smaller node id.
    pub left: usize,
    /// Larger node id.
    pub right: usize,
    /// Linkage distance at which the two nodes merged.
    pub distance: f64,
    /// Number of rows in the merged cluster.
    pub size: usize,
}

/// Cophenetic correlation and silhouette curve for one linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkageComparison {
    /// Linkage rule.
    pub linkage: Linkage,
    /// Cophenetic correlation coefficient, `None` if undefined.
    pub cophenetic_correlation: Option<f64>,
    /// Silhouette scores for `k = 2..=k_max`.
    pub silhouette: EvaluationCurve,
}

/// Descriptive statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    /// Feature column.
    pub column: FeatureColumn,
    /// Number of present values.
    pub count: usize,
    /// Number of missing values.
    pub missing: usize,
    /// Arithmetic mean.
    pub mean: Option<f64>,
    /// Sample standard deviation (`n - 1` denominator).
    pub std: Option<f64>,
    /// Minimum.
    pub min: Option<f64>,
    /// 25th percentile.
    pub q1: Option<f64>,
    /// 50th percentile.
    pub median: Option<f64>,
    /// 75th percentile.
    pub q3: Option<f64>,
    /// Maximum.
    pub max: Option<f64>,
}

/// Pairwise Pearson correlations between columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    /// Row and column order of `values`.
    pub columns: Vec<FeatureColumn>,
    /// `values[i][j]` correlates `columns[i]` with `columns[j]`; `None` when
    /// either side has zero variance over the shared rows.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlation between `a` and `b`, if both are in the matrix and the
    /// value is defined.
    #[must_use]
    pub fn get(&self, a: FeatureColumn, b: FeatureColumn) -> Option<f64> {
        let i = self.columns.iter().position(|&c| c == a)?;
        let j = self.columns.iter().position(|&c| c == b)?;
        self.values[i][j]
    }
}

/// Landslide count of one area in a year, and its change from the year
/// before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaChange {
    /// Area name.
    pub area: String,
    /// Reporting year.
    pub year: i32,
    /// Landslide count in `year` (missing counts as zero).
    pub landslide_count: u64,
    /// Landslide count in the previous year, if the area was reported.
    pub previous_count: Option<u64>,
    /// `landslide_count - previous_count`, treating a missing previous year
    /// as zero.
    pub difference: i64,
}

/// Province-wide landslide total for a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyTotal {
    /// Reporting year.
    pub year: i32,
    /// Sum of landslide counts in `year`.
    pub total: u64,
    /// Sum for the previous year, if any records exist for it.
    pub previous_total: Option<u64>,
    /// `total - previous_total`, if the previous year exists.
    pub delta: Option<i64>,
}

/// One record's place in the clustering result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedRecord {
    /// Area name.
    pub area: String,
    /// Reporting year.
    pub year: i32,
    /// Cluster id.
    pub cluster: usize,
    /// Risk level of the cluster, if thresholds were supplied.
    pub risk: Option<RiskCategory>,
}

/// Everything one pipeline run produces, ready for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringReport {
    /// Algorithm used for the main assignment and the silhouette sweep.
    pub method: ClusteringMethod,
    /// Feature order used for clustering.
    pub feature_columns: Vec<FeatureColumn>,
    /// Whether features were z-scored before clustering.
    pub standardized: bool,
    /// Year filter applied, if any.
    pub year: Option<i32>,
    /// Number of clusters in the assignment.
    pub n_clusters: usize,
    /// Per-record cluster and risk, in input order.
    pub records: Vec<AssignedRecord>,
    /// One profile per cluster id, ascending.
    pub profiles: Vec<ClusterProfile>,
    /// Clusters categorised as [`RiskCategory::High`].
    pub high_risk_clusters: Vec<usize>,
    /// K-Means inertia for `k = 1..=k_max`.
    pub elbow: EvaluationCurve,
    /// Mean silhouette for `k = 2..=k_max`.
    pub silhouette: EvaluationCurve,
    /// Values imputed during feature extraction.
    pub imputation: ImputationReport,
    /// Mean landslide count over all records.
    pub landslide_mean: f64,
    /// Most frequent landslide count (smallest on ties).
    pub landslide_mode: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_labels_renumbers_by_first_appearance() {
        let assignment = ClusterAssignment::from_labels(&[7, 7, 3, 9, 3]);
        assert_eq!(assignment.labels(), &[0, 0, 1, 2, 1]);
        assert_eq!(assignment.n_clusters(), 3);
        assert_eq!(assignment.sizes(), vec![2, 2, 1]);
    }

    #[test]
    fn partition_ignores_id_numbering() {
        let a = ClusterAssignment::new(vec![0, 0, 1, 1], 2);
        let b = ClusterAssignment::new(vec![1, 1, 0, 0], 2);
        assert_eq!(a.partition(), b.partition());
        assert_ne!(a.labels(), b.labels());
    }

    #[test]
    fn reports_empty_clusters() {
        let assignment = ClusterAssignment::new(vec![0, 2, 2], 4);
        assert_eq!(assignment.empty_clusters(), vec![1, 3]);
        assert_eq!(assignment.members(2), vec![1, 2]);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        let curve = EvaluationCurve {
            metric: CurveMetric::Silhouette,
            points: vec![
                EvaluationPoint { k: 2, value: 0.7 },
                EvaluationPoint { k: 3, value: 0.9 },
                EvaluationPoint { k: 4, value: 0.9 },
            ],
        };
        assert_eq!(curve.argmax_k(), Some(3));
        assert_eq!(curve.value_at(4), Some(0.9));
        assert_eq!(curve.value_at(5), None);
        assert_eq!(EvaluationCurve::new(CurveMetric::Inertia).argmax_k(), None);
    }

    #[test]
    fn clustering_method_serializes_tagged() {
        let json = serde_json::to_value(ClusteringMethod::Agglomerative {
            linkage: Linkage::Average,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "method": "agglomerative", "linkage": "average" })
        );
    }

    #[test]
    fn profile_centroid_serializes_with_column_names() {
        let profile = ClusterProfile {
            cluster: 0,
            size: 2,
            centroid: BTreeMap::from([(FeatureColumn::LandslideCount, 12.5)]),
            landslide_mean: 12.5,
            risk: Some(RiskCategory::Medium),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["centroid"]["landslide_count"], 12.5);
        assert_eq!(json["risk"], "MEDIUM");
        assert_eq!(json["landslideMean"], 12.5);
    }
}
