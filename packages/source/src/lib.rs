#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Landslide record source.
//!
//! Loads the provincial landslide dataset from CSV into a validated
//! [`RecordSet`]: one [`DisasterRecord`] per area-year, with unique
//! `(area, year)` keys and coordinates inside the geographic range. The
//! analytics layer only ever reads from a [`RecordSet`], so every invariant
//! the clustering pipeline relies on is checked here, once.

pub mod csv_file;
pub mod parsing;
pub mod progress;

use std::collections::{BTreeMap, BTreeSet};

use landslide_map_disaster_models::{DisasterRecord, FeatureColumn};

/// Errors that can occur while loading or validating records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A mandatory header is absent from the file.
    #[error("Missing required column '{column}'")]
    MissingColumn {
        /// Header name that was expected.
        column: String,
    },

    /// A cell could not be parsed.
    #[error("Invalid value in row {row}, column '{column}': {message}")]
    InvalidValue {
        /// 1-based line number in the source file.
        row: usize,
        /// Header name of the offending cell.
        column: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The same area appears twice for one year.
    #[error("Duplicate record for area '{area}' in year {year}")]
    DuplicateRecord {
        /// Area name.
        area: String,
        /// Reporting year.
        year: i32,
    },

    /// Latitude or longitude outside the geographic range.
    #[error("Invalid coordinate for '{area}': ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// Area name.
        area: String,
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
}

/// An ordered, validated collection of landslide records.
///
/// Records are immutable once the set is built. Filtering produces a new
/// set rather than mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    records: Vec<DisasterRecord>,
    columns: BTreeSet<FeatureColumn>,
}

impl RecordSet {
    /// Builds a record set, validating key uniqueness and coordinates.
    ///
    /// `columns` lists the feature columns the source actually carried.
    /// Latitude and longitude are always present.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::DuplicateRecord`] if an `(area, year)` pair
    /// repeats, or [`SourceError::InvalidCoordinate`] if a coordinate is out
    /// of range or not finite.
    pub fn new(
        records: Vec<DisasterRecord>,
        columns: impl IntoIterator<Item = FeatureColumn>,
    ) -> Result<Self, SourceError> {
        let mut seen: BTreeSet<(&str, i32)> = BTreeSet::new();

        for record in &records {
            if !parsing::is_valid_coordinate(record.latitude, record.longitude) {
                return Err(SourceError::InvalidCoordinate {
                    area: record.area.clone(),
                    latitude: record.latitude,
                    longitude: record.longitude,
                });
            }
            if !seen.insert((record.area.as_str(), record.year)) {
                return Err(SourceError::DuplicateRecord {
                    area: record.area.clone(),
                    year: record.year,
                });
            }
        }

        let mut columns: BTreeSet<FeatureColumn> = columns.into_iter().collect();
        columns.insert(FeatureColumn::Latitude);
        columns.insert(FeatureColumn::Longitude);

        Ok(Self { records, columns })
    }

    /// Builds a record set that declares every feature column present.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_records(records: Vec<DisasterRecord>) -> Result<Self, SourceError> {
        Self::new(records, FeatureColumn::all().iter().copied())
    }

    /// The records, in source row order.
    #[must_use]
    pub fn records(&self) -> &[DisasterRecord] {
        &self.records
    }

    /// The feature columns carried by the source.
    #[must_use]
    pub const fn columns(&self) -> &BTreeSet<FeatureColumn> {
        &self.columns
    }

    /// Whether the source carried `column`.
    #[must_use]
    pub fn has_column(&self, column: FeatureColumn) -> bool {
        self.columns.contains(&column)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years present, ascending.
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns a new set holding only the records for `year`, in the same
    /// relative order.
    #[must_use]
    pub fn for_year(&self, year: i32) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| r.year == year)
                .cloned()
                .collect(),
            columns: self.columns.clone(),
        }
    }

    /// Number of missing cells per carried count column.
    #[must_use]
    pub fn missing_counts(&self) -> BTreeMap<FeatureColumn, usize> {
        self.columns
            .iter()
            .map(|&column| {
                let missing = self
                    .records
                    .iter()
                    .filter(|r| r.value(column).is_none())
                    .count();
                (column, missing)
            })
            .collect()
    }

    /// Consumes the set, returning the records.
    #[must_use]
    pub fn into_records(self) -> Vec<DisasterRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(area: &str, year: i32) -> DisasterRecord {
        DisasterRecord::new(area, year, -6.9, 107.6).with_count(FeatureColumn::LandslideCount, 5)
    }

    #[test]
    fn rejects_duplicate_area_year() {
        let result = RecordSet::from_records(vec![record("Bandung", 2022), record("Bandung", 2022)]);
        assert!(matches!(
            result,
            Err(SourceError::DuplicateRecord { ref area, year: 2022 }) if area == "Bandung"
        ));
    }

    #[test]
    fn same_area_in_different_years_is_allowed() {
        let set =
            RecordSet::from_records(vec![record("Bandung", 2021), record("Bandung", 2022)]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.years(), vec![2021, 2022]);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let bad = DisasterRecord::new("Nowhere", 2022, 95.0, 107.0);
        assert!(matches!(
            RecordSet::from_records(vec![bad]),
            Err(SourceError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn for_year_preserves_order_and_columns() {
        let set = RecordSet::new(
            vec![
                record("Garut", 2022),
                record("Bogor", 2021),
                record("Cianjur", 2022),
            ],
            [FeatureColumn::LandslideCount],
        )
        .unwrap();

        let filtered = set.for_year(2022);
        let areas: Vec<&str> = filtered.records().iter().map(|r| r.area.as_str()).collect();
        assert_eq!(areas, vec!["Garut", "Cianjur"]);
        assert!(filtered.has_column(FeatureColumn::LandslideCount));
        assert!(filtered.has_column(FeatureColumn::Latitude));
        assert!(!filtered.has_column(FeatureColumn::Deaths));
    }

    #[test]
    fn counts_missing_cells_per_column() {
        let mut missing = record("Sumedang", 2023);
        missing.landslide_count = None;
        let set = RecordSet::new(
            vec![record("Garut", 2023), missing],
            [FeatureColumn::LandslideCount],
        )
        .unwrap();

        let counts = set.missing_counts();
        assert_eq!(counts[&FeatureColumn::LandslideCount], 1);
        assert_eq!(counts[&FeatureColumn::Latitude], 0);
    }
}
