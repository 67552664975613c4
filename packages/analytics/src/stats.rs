//! Descriptive statistics over a record set.
//!
//! Quantiles use linear interpolation between order statistics, standard
//! deviations use the `n - 1` denominator, and correlations are computed
//! over the rows where both columns are present.

use std::collections::BTreeMap;

use landslide_map_analytics_models::{AreaChange, ColumnSummary, CorrelationMatrix, YearlyTotal};
use landslide_map_disaster_models::{DisasterRecord, FeatureColumn};
use landslide_map_source::RecordSet;

use crate::AnalyticsError;

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation, `None` for fewer than two values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// The `q`-th quantile (`0 <= q <= 1`) with linear interpolation.
///
/// Returns `None` for an empty slice or a `q` outside `[0, 1]`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - pos.floor();
    Some((sorted[hi] - sorted[lo]).mul_add(frac, sorted[lo]))
}

/// Pearson correlation coefficient, `None` if either side is constant or
/// the slices hold fewer than two pairs.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Summary statistics for every column the source carried, in column order.
#[must_use]
pub fn describe(records: &RecordSet) -> Vec<ColumnSummary> {
    records
        .columns()
        .iter()
        .map(|&column| {
            let values: Vec<f64> = records
                .records()
                .iter()
                .filter_map(|r| r.value(column))
                .collect();
            ColumnSummary {
                column,
                count: values.len(),
                missing: records.len() - values.len(),
                mean: mean(&values),
                std: sample_std(&values),
                min: values.iter().copied().reduce(f64::min),
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values.iter().copied().reduce(f64::max),
            }
        })
        .collect()
}

/// Pairwise Pearson correlations between `columns`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Schema`] if the source did not carry one of
/// the columns.
pub fn correlation_matrix(
    records: &RecordSet,
    columns: &[FeatureColumn],
) -> Result<CorrelationMatrix, AnalyticsError> {
    if let Some(missing) = columns.iter().find(|c| !records.has_column(**c)) {
        return Err(AnalyticsError::Schema {
            column: missing.to_string(),
            reason: "is not present in the record source".to_string(),
        });
    }

    let values = columns
        .iter()
        .map(|&a| {
            columns
                .iter()
                .map(|&b| {
                    let (xs, ys): (Vec<f64>, Vec<f64>) = records
                        .records()
                        .iter()
                        .filter_map(|r| Some((r.value(a)?, r.value(b)?)))
                        .unzip();
                    pearson(&xs, &ys)
                })
                .collect()
        })
        .collect();

    Ok(CorrelationMatrix {
        columns: columns.to_vec(),
        values,
    })
}

/// Most frequent landslide count among records that report one. Ties go to
/// the smallest count.
#[must_use]
pub fn landslide_mode(records: &[DisasterRecord]) -> Option<u64> {
    let mut freq: BTreeMap<u64, usize> = BTreeMap::new();
    for count in records.iter().filter_map(|r| r.landslide_count) {
        *freq.entry(count).or_default() += 1;
    }
    // Descending, so the last maximum max_by_key keeps is the smallest count.
    freq.into_iter()
        .rev()
        .max_by_key(|&(_, n)| n)
        .map(|(count, _)| count)
}

/// Landslide counts for `year` with the change from `year - 1`, matched by
/// area name. Sorted by difference, largest increase first; ties by area.
///
/// Missing counts are treated as zero. Areas with no record in the previous
/// year compare against zero.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn yearly_changes(records: &RecordSet, year: i32) -> Vec<AreaChange> {
    let previous: BTreeMap<&str, u64> = records
        .records()
        .iter()
        .filter(|r| r.year == year - 1)
        .map(|r| (r.area.as_str(), r.landslide_count.unwrap_or(0)))
        .collect();

    let mut changes: Vec<AreaChange> = records
        .records()
        .iter()
        .filter(|r| r.year == year)
        .map(|r| {
            let current = r.landslide_count.unwrap_or(0);
            let previous_count = previous.get(r.area.as_str()).copied();
            AreaChange {
                area: r.area.clone(),
                year,
                landslide_count: current,
                previous_count,
                difference: current as i64 - previous_count.unwrap_or(0) as i64,
            }
        })
        .collect();

    changes.sort_by(|a, b| {
        b.difference
            .cmp(&a.difference)
            .then_with(|| a.area.cmp(&b.area))
    });
    changes
}

/// Province-wide landslide total for `year`, with the previous year's total
/// when that year has records.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn yearly_total(records: &RecordSet, year: i32) -> YearlyTotal {
    let total_for = |y: i32| -> Option<u64> {
        let mut rows = records.records().iter().filter(|r| r.year == y).peekable();
        rows.peek()?;
        Some(rows.map(|r| r.landslide_count.unwrap_or(0)).sum())
    };

    let total = total_for(year).unwrap_or(0);
    let previous_total = total_for(year - 1);

    YearlyTotal {
        year,
        total,
        previous_total,
        delta: previous_total.map(|p| total as i64 - p as i64),
    }
}
