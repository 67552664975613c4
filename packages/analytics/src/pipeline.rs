//! End-to-end clustering run: filter, extract, scale, cluster, profile,
//! categorise, evaluate.

use std::borrow::Cow;
use std::sync::Arc;

use landslide_map_analytics_models::{
    AssignedRecord, ClusteringReport, CurveMetric, EvaluationCurve, ImputationReport,
    PipelineConfig,
};
use landslide_map_disaster_models::FeatureColumn;
use landslide_map_source::RecordSet;
use landslide_map_source::progress::ProgressCallback;

use crate::AnalyticsError;
use crate::categorize::{apply_categories, categorize, cluster_profiles, high_risk_clusters};
use crate::cluster::cluster_with_cut;
use crate::evaluate::{elbow_curve, elbow_point, silhouette_curve};
use crate::features::{FeatureMatrix, extract_features, impute_column, standardize};
use crate::stats::{landslide_mode, mean};

/// Records and feature matrices for one pipeline run.
pub struct PreparedFeatures<'a> {
    /// Records after the year filter.
    pub records: Cow<'a, RecordSet>,
    /// Imputed, unscaled features; profiles are computed from these.
    pub raw: FeatureMatrix,
    /// What the clustering engines see: `raw`, z-scored when requested.
    pub model: FeatureMatrix,
    /// Values filled in during extraction.
    pub imputation: ImputationReport,
}

/// Applies the year filter, feature extraction and optional
/// standardisation from `config`.
///
/// # Errors
///
/// Returns any error from [`extract_features`].
pub fn prepare_features<'a>(
    records: &'a RecordSet,
    config: &PipelineConfig,
) -> Result<PreparedFeatures<'a>, AnalyticsError> {
    let records = match config.year {
        Some(year) => {
            let filtered = records.for_year(year);
            log::info!("Filtered to {} records for year {year}", filtered.len());
            Cow::Owned(filtered)
        }
        None => Cow::Borrowed(records),
    };

    let extraction = extract_features(&records, &config.feature_columns)?;
    let model = if config.standardize {
        standardize(&extraction.features)
    } else {
        extraction.features.clone()
    };

    Ok(PreparedFeatures {
        records,
        raw: extraction.features,
        model,
        imputation: extraction.imputation,
    })
}

/// Runs the whole clustering pipeline described by `config` over `records`.
///
/// Steps, in order:
///
/// 1. Restrict to `config.year` when set.
/// 2. Extract `config.feature_columns`, imputing missing counts with the
///    column mean, and z-score them when `config.standardize` is set.
/// 3. Cluster with the configured method and cut.
/// 4. Profile each cluster in unscaled units and, when thresholds are
///    configured, categorise it.
/// 5. Sweep K-Means inertia and the configured method's silhouette over
///    `k = 1..=k_max` / `2..=k_max`. `k_max` is capped at one less than the
///    number of records; a sweep with no valid `k` yields an empty curve.
///
/// # Errors
///
/// Returns [`AnalyticsError::Config`] if the config does not resolve to a
/// clustering method, and any error from the individual steps.
pub fn run_pipeline(
    records: &RecordSet,
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ClusteringReport, AnalyticsError> {
    let method = config.clustering_method()?;
    let cut = config.cluster_cut();

    let prepared = prepare_features(records, config)?;
    log::info!(
        "Clustering {} records on {} features with {:?}",
        prepared.raw.len(),
        prepared.raw.columns().len(),
        method
    );

    let assignment = cluster_with_cut(prepared.model.rows(), &method, cut)?;

    let landslides = match prepared
        .raw
        .columns()
        .iter()
        .position(|&c| c == FeatureColumn::LandslideCount)
    {
        Some(j) => prepared.raw.column(j),
        None => impute_column(&prepared.records, FeatureColumn::LandslideCount)?.0,
    };
    let mut profiles = cluster_profiles(&prepared.raw, &landslides, &assignment)?;

    let mut high_risk = Vec::new();
    if let Some(thresholds) = &config.thresholds {
        let categories = categorize(&profiles, thresholds)?;
        apply_categories(&mut profiles, &categories);
        high_risk = high_risk_clusters(&categories);
        log::info!(
            "{} of {} clusters categorised as high risk",
            high_risk.len(),
            profiles.len()
        );
    } else {
        log::info!("No risk thresholds configured; skipping categorisation");
    }

    let k_max = sweep_bound(config.k_max, prepared.model.len());
    let elbow = if k_max >= 1 {
        elbow_curve(prepared.model.rows(), k_max, config.random_seed, progress)?
    } else {
        EvaluationCurve::new(CurveMetric::Inertia)
    };
    let silhouette = if k_max >= 2 {
        silhouette_curve(prepared.model.rows(), k_max, &method, progress)?
    } else {
        log::info!("Too few records for a silhouette sweep");
        EvaluationCurve::new(CurveMetric::Silhouette)
    };
    log_best_k(&elbow, &silhouette);

    let assigned = prepared
        .records
        .records()
        .iter()
        .zip(assignment.labels())
        .map(|(record, &cluster)| AssignedRecord {
            area: record.area.clone(),
            year: record.year,
            cluster,
            risk: profiles.get(cluster).and_then(|p| p.risk),
        })
        .collect();

    Ok(ClusteringReport {
        method,
        feature_columns: prepared.raw.columns().to_vec(),
        standardized: config.standardize,
        year: config.year,
        n_clusters: assignment.n_clusters(),
        records: assigned,
        profiles,
        high_risk_clusters: high_risk,
        elbow,
        silhouette,
        imputation: prepared.imputation,
        landslide_mean: mean(&landslides).unwrap_or(0.0),
        landslide_mode: landslide_mode(prepared.records.records()),
    })
}

/// Caps the configured sweep bound at `rows - 1`, the largest `k` the
/// sweeps accept for this many rows.
fn sweep_bound(configured: usize, rows: usize) -> usize {
    let cap = rows.saturating_sub(1);
    if configured > cap {
        log::warn!("k_max {configured} exceeds {rows} records; sweeping up to k = {cap}");
        return cap;
    }
    configured
}

fn log_best_k(elbow: &EvaluationCurve, silhouette: &EvaluationCurve) {
    if let Some(k) = elbow_point(elbow) {
        log::info!("Elbow suggests k = {k}");
    }
    if let Some(k) = silhouette.argmax_k() {
        log::info!("Silhouette peaks at k = {k}");
    }
}
