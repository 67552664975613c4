//! Feature extraction: projects records onto numeric vectors.
//!
//! Missing count cells are replaced by the mean of that column over the
//! record set being extracted (so a year-filtered set imputes from its own
//! year only). Every fill is counted in an [`ImputationReport`] and logged.

use std::collections::BTreeSet;
use std::str::FromStr as _;

use landslide_map_analytics_models::{ColumnImputation, ImputationReport};
use landslide_map_disaster_models::FeatureColumn;
use landslide_map_source::RecordSet;

use crate::AnalyticsError;

/// Rows of feature values in a fixed column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<FeatureColumn>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Wraps pre-built rows.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::DimensionMismatch`] if any row length
    /// differs from `columns.len()`.
    pub fn new(columns: Vec<FeatureColumn>, rows: Vec<Vec<f64>>) -> Result<Self, AnalyticsError> {
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(AnalyticsError::DimensionMismatch {
                expected: columns.len(),
                found: row.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Column order of every row.
    #[must_use]
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// One vector per record, in record order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of column `index` across all rows.
    #[must_use]
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// Consumes the matrix, returning the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }
}

/// Output of [`extract_features`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Imputed, unscaled feature vectors.
    pub features: FeatureMatrix,
    /// What was filled in, per column.
    pub imputation: ImputationReport,
}

/// Resolves column names (snake_case or dataset headers) to
/// [`FeatureColumn`]s.
///
/// # Errors
///
/// Returns [`AnalyticsError::Schema`] for the first name that is not a known
/// numeric column.
pub fn resolve_columns<S: AsRef<str>>(names: &[S]) -> Result<Vec<FeatureColumn>, AnalyticsError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            FeatureColumn::from_str(name.trim()).map_err(|_| AnalyticsError::Schema {
                column: name.to_string(),
                reason: "is not a numeric feature column".to_string(),
            })
        })
        .collect()
}

/// Imputed values of a single column over `records`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Schema`] if the source did not carry `column`,
/// or if `records` is non-empty and none of them has a value for it.
#[allow(clippy::cast_precision_loss)]
pub fn impute_column(
    records: &RecordSet,
    column: FeatureColumn,
) -> Result<(Vec<f64>, ColumnImputation), AnalyticsError> {
    if !records.has_column(column) {
        return Err(AnalyticsError::Schema {
            column: column.to_string(),
            reason: "is not present in the record source".to_string(),
        });
    }

    let raw: Vec<Option<f64>> = records.records().iter().map(|r| r.value(column)).collect();
    let present: Vec<f64> = raw.iter().flatten().copied().collect();

    if present.is_empty() && !raw.is_empty() {
        return Err(AnalyticsError::Schema {
            column: column.to_string(),
            reason: "has no values in the selected records".to_string(),
        });
    }

    let fill_value = if present.is_empty() {
        0.0
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    };
    let imputed = raw.len() - present.len();
    if imputed > 0 {
        log::warn!("Imputed {imputed} missing value(s) in {column} with column mean {fill_value:.3}");
    }

    let values = raw.into_iter().map(|v| v.unwrap_or(fill_value)).collect();

    Ok((
        values,
        ColumnImputation {
            column,
            imputed,
            fill_value,
        },
    ))
}

/// Projects each record onto `columns`, in order, imputing missing counts
/// with the column mean.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if `columns` is empty or
/// repeats a column, and [`AnalyticsError::Schema`] under the conditions of
/// [`impute_column`].
pub fn extract_features(
    records: &RecordSet,
    columns: &[FeatureColumn],
) -> Result<Extraction, AnalyticsError> {
    if columns.is_empty() {
        return Err(AnalyticsError::InvalidParameter {
            name: "feature_columns",
            message: "at least one feature column is required".to_string(),
        });
    }
    let mut seen = BTreeSet::new();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(**c)) {
        return Err(AnalyticsError::InvalidParameter {
            name: "feature_columns",
            message: format!("column '{dup}' is listed more than once"),
        });
    }

    let mut rows = vec![Vec::with_capacity(columns.len()); records.len()];
    let mut imputation = ImputationReport::default();

    for &column in columns {
        let (values, report) = impute_column(records, column)?;
        for (row, value) in rows.iter_mut().zip(values) {
            row.push(value);
        }
        imputation.columns.push(report);
    }

    log::debug!(
        "Extracted {} feature vectors over {} columns ({} values imputed)",
        rows.len(),
        columns.len(),
        imputation.total_imputed()
    );

    Ok(Extraction {
        features: FeatureMatrix::new(columns.to_vec(), rows)?,
        imputation,
    })
}

/// Rescales each column to zero mean and unit population variance.
///
/// Constant columns carry no information and become all zeros.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn standardize(features: &FeatureMatrix) -> FeatureMatrix {
    let n = features.len();
    if n == 0 {
        return features.clone();
    }

    let params: Vec<(f64, f64)> = (0..features.columns.len())
        .map(|j| {
            let col = features.column(j);
            let mean = col.iter().sum::<f64>() / n as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            (mean, var.sqrt())
        })
        .collect();

    let rows = features
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&params)
                .map(|(v, &(mean, std))| if std > 0.0 { (v - mean) / std } else { 0.0 })
                .collect()
        })
        .collect();

    FeatureMatrix {
        columns: features.columns.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use landslide_map_disaster_models::DisasterRecord;

    use super::*;

    fn record(area: &str, landslides: Option<u64>, deaths: u64) -> DisasterRecord {
        let mut r = DisasterRecord::new(area, 2022, -6.9, 107.6);
        r.landslide_count = landslides;
        r.deaths = Some(deaths);
        r
    }

    #[test]
    fn missing_value_is_replaced_by_column_mean() {
        let set = RecordSet::from_records(vec![
            record("A", Some(10), 1),
            record("B", Some(20), 1),
            record("C", None, 1),
            record("D", Some(30), 1),
            record("E", Some(40), 1),
        ])
        .unwrap();

        let extraction = extract_features(&set, &[FeatureColumn::LandslideCount]).unwrap();
        assert!((extraction.features.rows()[2][0] - 25.0).abs() < 1e-12);
        assert_eq!(extraction.imputation.imputed_for(FeatureColumn::LandslideCount), 1);
        assert!((extraction.imputation.columns[0].fill_value - 25.0).abs() < 1e-12);
    }

    #[test]
    fn preserves_column_and_record_order() {
        let set = RecordSet::from_records(vec![record("A", Some(3), 7), record("B", Some(4), 8)])
            .unwrap();
        let extraction =
            extract_features(&set, &[FeatureColumn::Deaths, FeatureColumn::LandslideCount])
                .unwrap();
        assert_eq!(
            extraction.features.rows(),
            &[vec![7.0, 3.0], vec![8.0, 4.0]]
        );
        assert_eq!(extraction.imputation.total_imputed(), 0);
    }

    #[test]
    fn absent_column_is_a_schema_error() {
        let set = RecordSet::new(
            vec![record("A", Some(3), 7)],
            [FeatureColumn::LandslideCount],
        )
        .unwrap();
        let err = extract_features(&set, &[FeatureColumn::Deaths]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Schema { ref column, .. } if column == "deaths"));
    }

    #[test]
    fn column_without_values_is_a_schema_error() {
        let set = RecordSet::from_records(vec![record("A", None, 1), record("B", None, 2)]).unwrap();
        assert!(matches!(
            extract_features(&set, &[FeatureColumn::LandslideCount]),
            Err(AnalyticsError::Schema { .. })
        ));
    }

    #[test]
    fn unknown_column_name_is_a_schema_error() {
        assert_eq!(
            resolve_columns(&["JUMLAH_LONGSOR", "deaths"]).unwrap(),
            vec![FeatureColumn::LandslideCount, FeatureColumn::Deaths]
        );
        assert!(matches!(
            resolve_columns(&["rainfall"]),
            Err(AnalyticsError::Schema { ref column, .. }) if column == "rainfall"
        ));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let set = RecordSet::from_records(vec![record("A", Some(1), 1)]).unwrap();
        assert!(matches!(
            extract_features(
                &set,
                &[FeatureColumn::Deaths, FeatureColumn::Deaths]
            ),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn standardize_zero_mean_unit_variance() {
        let matrix = FeatureMatrix::new(
            vec![FeatureColumn::LandslideCount, FeatureColumn::Deaths],
            vec![vec![1.0, 5.0], vec![3.0, 5.0]],
        )
        .unwrap();
        let scaled = standardize(&matrix);
        assert_eq!(scaled.rows(), &[vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }
}
