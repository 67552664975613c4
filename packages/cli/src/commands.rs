//! Operations shared by the subcommands and the interactive menu.
//!
//! Each operation loads the records, runs one analytics step, and returns a
//! serialisable result that the caller prints as JSON.

use std::path::{Path, PathBuf};

use clap::Args;
use landslide_map_analytics::evaluate::{
    compare_linkages, elbow_curve, elbow_point, silhouette_curve,
};
use landslide_map_analytics::pipeline::{prepare_features, run_pipeline};
use landslide_map_analytics::stats::{
    correlation_matrix, describe, landslide_mode, yearly_changes, yearly_total,
};
use landslide_map_analytics_models::{
    AreaChange, ClusteringReport, ColumnSummary, ConfigError, CorrelationMatrix, EvaluationCurve,
    Linkage, LinkageComparison, MethodKind, PipelineConfig, RiskThresholds, YearlyTotal,
};
use landslide_map_cli_utils::{MultiProgress, SweepBar};
use landslide_map_disaster_models::FeatureColumn;
use landslide_map_source::RecordSet;
use landslide_map_source::csv_file::load_csv;
use serde::Serialize;

/// Data source and pipeline settings. Flags override values from
/// `--config`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Landslide CSV export
    #[arg(long)]
    pub data: PathBuf,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Comma-separated feature columns (e.g. `landslide_count,deaths`)
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<FeatureColumn>,

    /// Clustering method: `kmeans` or `agglomerative`
    #[arg(long)]
    pub method: Option<MethodKind>,

    /// Agglomerative linkage: `single`, `complete`, `average` or `ward`
    #[arg(long)]
    pub linkage: Option<Linkage>,

    /// Number of clusters
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Cut the dendrogram at this height instead of at `k` clusters
    #[arg(long)]
    pub distance_threshold: Option<f64>,

    /// Largest `k` evaluated by the elbow and silhouette sweeps
    #[arg(long)]
    pub k_max: Option<usize>,

    /// K-Means initialisation seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Z-score features before clustering
    #[arg(long)]
    pub standardize: bool,

    /// Only use records from this year
    #[arg(long)]
    pub year: Option<i32>,

    /// Landslide mean below which a cluster is low risk
    #[arg(long, requires = "high")]
    pub low: Option<f64>,

    /// Landslide mean at or above which a cluster is high risk
    #[arg(long, requires = "low")]
    pub high: Option<f64>,
}

impl RunArgs {
    /// Args for `data` with every setting left to the config defaults.
    #[must_use]
    pub const fn for_data(data: PathBuf) -> Self {
        Self {
            data,
            config: None,
            features: Vec::new(),
            method: None,
            linkage: None,
            k: None,
            distance_threshold: None,
            k_max: None,
            seed: None,
            standardize: false,
            year: None,
            low: None,
            high: None,
        }
    }

    /// Loads `--config` (or the defaults) and applies the flag overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn resolve(&self) -> Result<PipelineConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if !self.features.is_empty() {
            config.feature_columns.clone_from(&self.features);
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if self.linkage.is_some() {
            config.linkage = self.linkage;
        }
        if let Some(k) = self.k {
            config.k = k;
        }
        if self.distance_threshold.is_some() {
            config.distance_threshold = self.distance_threshold;
        }
        if let Some(k_max) = self.k_max {
            config.k_max = k_max;
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if self.standardize {
            config.standardize = true;
        }
        if self.year.is_some() {
            config.year = self.year;
        }
        if let (Some(low), Some(high)) = (self.low, self.high) {
            config.thresholds = Some(RiskThresholds { low, high });
        }

        Ok(config)
    }
}

/// Output of the `elbow` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElbowOutput {
    pub curve: EvaluationCurve,
    pub elbow_k: Option<usize>,
}

/// Output of the `silhouette` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SilhouetteOutput {
    pub curve: EvaluationCurve,
    pub best_k: Option<usize>,
}

/// Output of the `describe` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeOutput {
    pub records: usize,
    pub years: Vec<i32>,
    pub summaries: Vec<ColumnSummary>,
    pub correlation: CorrelationMatrix,
    pub landslide_mode: Option<u64>,
}

/// Output of the `changes` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesOutput {
    pub total: YearlyTotal,
    pub changes: Vec<AreaChange>,
}

fn load(data: &Path) -> Result<RecordSet, Box<dyn std::error::Error>> {
    log::info!("Loading records from {}", data.display());
    let records = load_csv(data)?;
    log::info!(
        "Loaded {} records across {} year(s)",
        records.len(),
        records.years().len()
    );
    Ok(records)
}

/// Runs the full pipeline.
///
/// # Errors
///
/// Returns an error if loading, config resolution, or any pipeline step
/// fails.
pub fn cluster(
    args: &RunArgs,
    multi: &MultiProgress,
) -> Result<ClusteringReport, Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let records = load(&args.data)?;
    let report = run_pipeline(&records, &config, &SweepBar::attach(multi))?;
    log::info!(
        "{} clusters, {} high risk",
        report.n_clusters,
        report.high_risk_clusters.len()
    );
    Ok(report)
}

/// K-Means inertia for `k = 1..=k_max`, plus the detected elbow.
///
/// # Errors
///
/// Returns an error if loading, feature extraction, or the sweep fails.
pub fn elbow(
    args: &RunArgs,
    multi: &MultiProgress,
) -> Result<ElbowOutput, Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let records = load(&args.data)?;
    let prepared = prepare_features(&records, &config)?;

    let curve = elbow_curve(
        prepared.model.rows(),
        config.k_max,
        config.random_seed,
        &SweepBar::attach(multi),
    )?;

    Ok(ElbowOutput {
        elbow_k: elbow_point(&curve),
        curve,
    })
}

/// Silhouette of the configured method for `k = 2..=k_max`.
///
/// # Errors
///
/// Returns an error if loading, config resolution, feature extraction, or
/// the sweep fails.
pub fn silhouette(
    args: &RunArgs,
    multi: &MultiProgress,
) -> Result<SilhouetteOutput, Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let method = config.clustering_method()?;
    let records = load(&args.data)?;
    let prepared = prepare_features(&records, &config)?;

    let curve = silhouette_curve(
        prepared.model.rows(),
        config.k_max,
        &method,
        &SweepBar::attach(multi),
    )?;

    Ok(SilhouetteOutput {
        best_k: curve.argmax_k(),
        curve,
    })
}

/// Cophenetic correlation and silhouette curve for every linkage.
///
/// # Errors
///
/// Returns an error if loading, feature extraction, or any comparison
/// fails.
pub fn linkages(
    args: &RunArgs,
    multi: &MultiProgress,
) -> Result<Vec<LinkageComparison>, Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let records = load(&args.data)?;
    let prepared = prepare_features(&records, &config)?;

    Ok(compare_linkages(
        prepared.model.rows(),
        config.k_max,
        Linkage::all(),
        &SweepBar::attach(multi),
    )?)
}

/// Column summaries and correlations, optionally for a single year.
///
/// Correlations cover `columns`, or every column the file carries when
/// `columns` is empty.
///
/// # Errors
///
/// Returns an error if loading fails or a requested column is absent.
pub fn describe_records(
    data: &Path,
    year: Option<i32>,
    columns: &[FeatureColumn],
) -> Result<DescribeOutput, Box<dyn std::error::Error>> {
    let mut records = load(data)?;
    if let Some(year) = year {
        records = records.for_year(year);
    }

    let columns = if columns.is_empty() {
        records.columns().iter().copied().collect()
    } else {
        columns.to_vec()
    };

    Ok(DescribeOutput {
        records: records.len(),
        years: records.years(),
        summaries: describe(&records),
        correlation: correlation_matrix(&records, &columns)?,
        landslide_mode: landslide_mode(records.records()),
    })
}

/// Per-area landslide changes from `year - 1` to `year`.
///
/// # Errors
///
/// Returns an error if loading fails.
pub fn changes(data: &Path, year: i32) -> Result<ChangesOutput, Box<dyn std::error::Error>> {
    let records = load(data)?;
    if !records.years().contains(&year) {
        log::warn!("No records for year {year}");
    }
    Ok(ChangesOutput {
        total: yearly_total(&records, year),
        changes: yearly_changes(&records, year),
    })
}

/// Prints `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = std::env::temp_dir().join(format!("landslide_map_cli_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "method = \"agglomerative\"\nlinkage = \"ward\"\nk = 4").unwrap();

        let args = RunArgs {
            config: Some(path),
            k: Some(2),
            low: Some(5.0),
            high: Some(20.0),
            ..RunArgs::for_data(PathBuf::from("data.csv"))
        };
        let config = args.resolve().unwrap();

        assert_eq!(config.method, MethodKind::Agglomerative);
        assert_eq!(config.linkage, Some(Linkage::Ward));
        assert_eq!(config.k, 2);
        assert_eq!(
            config.thresholds,
            Some(RiskThresholds {
                low: 5.0,
                high: 20.0
            })
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn no_flags_gives_defaults() {
        let config = RunArgs::for_data(PathBuf::from("data.csv"))
            .resolve()
            .unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
