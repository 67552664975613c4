//! Pipeline configuration, loaded from TOML or built from CLI flags.

use std::path::Path;

use landslide_map_disaster_models::FeatureColumn;
use serde::{Deserialize, Serialize};

use crate::{ClusterCut, ClusteringMethod, Linkage, MethodKind};

/// Default random seed for K-Means initialisation.
pub const DEFAULT_SEED: u64 = 42;

/// Default requested cluster count.
pub const DEFAULT_K: usize = 3;

/// Default upper bound of the elbow/silhouette sweep.
pub const DEFAULT_K_MAX: usize = 10;

/// Errors raised while loading or resolving a [`PipelineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is present but unusable.
    #[error("invalid config value {name}: {message}")]
    InvalidValue {
        /// Config key.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },
}

/// Cut-off values that map a cluster's landslide mean onto a risk level.
///
/// There is no sensible universal default: the right values depend on the
/// scale of the dataset (yearly versus multi-year totals, for example).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskThresholds {
    /// Means strictly below this are `Low`.
    pub low: f64,
    /// Means at or above this are `High`.
    pub high: f64,
}

/// Everything the clustering pipeline needs besides the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Columns projected into each feature vector, in order.
    pub feature_columns: Vec<FeatureColumn>,
    /// Clustering algorithm.
    pub method: MethodKind,
    /// Requested cluster count.
    pub k: usize,
    /// Agglomerative linkage rule. Required for `agglomerative`.
    pub linkage: Option<Linkage>,
    /// Dendrogram cut height. When set (agglomerative only) it replaces `k`.
    pub distance_threshold: Option<f64>,
    /// Upper bound of the elbow and silhouette sweeps.
    pub k_max: usize,
    /// Seed for K-Means initialisation.
    pub random_seed: u64,
    /// Z-score each feature before clustering.
    pub standardize: bool,
    /// Restrict the pipeline to one reporting year.
    pub year: Option<i32>,
    /// Risk categorisation cut-offs.
    pub thresholds: Option<RiskThresholds>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_columns: FeatureColumn::all().to_vec(),
            method: MethodKind::KMeans,
            k: DEFAULT_K,
            linkage: None,
            distance_threshold: None,
            k_max: DEFAULT_K_MAX,
            random_seed: DEFAULT_SEED,
            standardize: false,
            year: None,
            thresholds: None,
        }
    }
}

impl PipelineConfig {
    /// Parses a config from a TOML string. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the string is not valid for this
    /// schema.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("Reading pipeline config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Resolves the flat `method`/`linkage`/`random_seed` keys into a typed
    /// [`ClusteringMethod`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `method` is `agglomerative`
    /// and no `linkage` is given.
    pub fn clustering_method(&self) -> Result<ClusteringMethod, ConfigError> {
        match self.method {
            MethodKind::KMeans => {
                if let Some(linkage) = self.linkage {
                    log::warn!("Ignoring linkage '{linkage}': only used by agglomerative clustering");
                }
                Ok(ClusteringMethod::KMeans {
                    seed: self.random_seed,
                })
            }
            MethodKind::Agglomerative => {
                let linkage = self.linkage.ok_or_else(|| ConfigError::InvalidValue {
                    name: "linkage",
                    message: "required when method is 'agglomerative'".to_string(),
                })?;
                Ok(ClusteringMethod::Agglomerative { linkage })
            }
        }
    }

    /// Returns how the clustering should decide its cluster count.
    #[must_use]
    pub fn cluster_cut(&self) -> ClusterCut {
        match (self.method, self.distance_threshold) {
            (MethodKind::Agglomerative, Some(threshold)) => {
                ClusterCut::DistanceThreshold(threshold)
            }
            (MethodKind::KMeans, Some(_)) => {
                log::warn!("Ignoring distance_threshold: only used by agglomerative clustering");
                ClusterCut::Count(self.k)
            }
            _ => ClusterCut::Count(self.k),
        }
    }
}
