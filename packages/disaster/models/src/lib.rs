#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Landslide disaster record types, feature columns, and risk categories.
//!
//! This crate defines the canonical row shape for one area-year of landslide
//! data, the fixed set of numeric columns that can be projected into a
//! clustering feature vector, and the ordinal risk taxonomy that clusters are
//! mapped onto.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A numeric column of a [`DisasterRecord`] that can take part in clustering.
///
/// Each column parses from both its snake_case name and the header used by
/// the provincial dataset (e.g. `JUMLAH_LONGSOR`).
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
pub enum FeatureColumn {
    /// Number of landslide events
    #[serde(alias = "JUMLAH_LONGSOR")]
    #[strum(to_string = "landslide_count", serialize = "JUMLAH_LONGSOR")]
    LandslideCount,
    /// People affected
    #[serde(alias = "JIWA_TERDAMPAK")]
    #[strum(to_string = "affected_population", serialize = "JIWA_TERDAMPAK")]
    AffectedPopulation,
    /// People killed
    #[serde(alias = "JIWA_MENINGGAL")]
    #[strum(to_string = "deaths", serialize = "JIWA_MENINGGAL")]
    Deaths,
    /// Buildings affected without classified damage
    #[serde(alias = "RUSAK_TERDAMPAK")]
    #[strum(to_string = "infrastructure_affected", serialize = "RUSAK_TERDAMPAK")]
    InfrastructureAffected,
    /// Buildings with minor damage
    #[serde(alias = "RUSAK_RINGAN")]
    #[strum(to_string = "minor_damage", serialize = "RUSAK_RINGAN")]
    MinorDamage,
    /// Buildings with moderate damage
    #[serde(alias = "RUSAK_SEDANG")]
    #[strum(to_string = "moderate_damage", serialize = "RUSAK_SEDANG")]
    ModerateDamage,
    /// Buildings with severe damage
    #[serde(alias = "RUSAK_BERAT")]
    #[strum(to_string = "severe_damage", serialize = "RUSAK_BERAT")]
    SevereDamage,
    /// Buildings buried
    #[serde(alias = "TERTIMBUN")]
    #[strum(to_string = "buried", serialize = "TERTIMBUN")]
    Buried,
    /// Area latitude in degrees
    #[serde(alias = "LATITUDE")]
    #[strum(to_string = "latitude", serialize = "LATITUDE")]
    Latitude,
    /// Area longitude in degrees
    #[serde(alias = "LONGITUDE")]
    #[strum(to_string = "longitude", serialize = "LONGITUDE")]
    Longitude,
}

impl FeatureColumn {
    /// Returns the header this column carries in the provincial CSV export.
    #[must_use]
    pub const fn csv_header(self) -> &'static str {
        match self {
            Self::LandslideCount => "JUMLAH_LONGSOR",
            Self::AffectedPopulation => "JIWA_TERDAMPAK",
            Self::Deaths => "JIWA_MENINGGAL",
            Self::InfrastructureAffected => "RUSAK_TERDAMPAK",
            Self::MinorDamage => "RUSAK_RINGAN",
            Self::ModerateDamage => "RUSAK_SEDANG",
            Self::SevereDamage => "RUSAK_BERAT",
            Self::Buried => "TERTIMBUN",
            Self::Latitude => "LATITUDE",
            Self::Longitude => "LONGITUDE",
        }
    }

    /// Whether this column holds a non-negative event/impact count (as
    /// opposed to a coordinate).
    #[must_use]
    pub const fn is_count(self) -> bool {
        !matches!(self, Self::Latitude | Self::Longitude)
    }

    /// Returns the impact/damage count columns in dataset order.
    #[must_use]
    pub const fn counts() -> &'static [Self] {
        &[
            Self::LandslideCount,
            Self::AffectedPopulation,
            Self::Deaths,
            Self::InfrastructureAffected,
            Self::MinorDamage,
            Self::ModerateDamage,
            Self::SevereDamage,
            Self::Buried,
        ]
    }

    /// Returns all variants of this enum, counts first then coordinates.
    ///
    /// This is also the default clustering feature order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::LandslideCount,
            Self::AffectedPopulation,
            Self::Deaths,
            Self::InfrastructureAffected,
            Self::MinorDamage,
            Self::ModerateDamage,
            Self::SevereDamage,
            Self::Buried,
            Self::Latitude,
            Self::Longitude,
        ]
    }
}

/// One row of landslide data for an area in a given year.
///
/// Count fields are `None` when the source left the cell empty; the
/// feature extractor imputes them before clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterRecord {
    /// Regency/city name (`KABUPATEN`).
    pub area: String,
    /// Reporting year (`TAHUN`).
    pub year: i32,
    /// Number of landslide events.
    pub landslide_count: Option<u64>,
    /// People affected.
    pub affected_population: Option<u64>,
    /// People killed.
    pub deaths: Option<u64>,
    /// Buildings affected without classified damage.
    pub infrastructure_affected: Option<u64>,
    /// Buildings with minor damage.
    pub minor_damage: Option<u64>,
    /// Buildings with moderate damage.
    pub moderate_damage: Option<u64>,
    /// Buildings with severe damage.
    pub severe_damage: Option<u64>,
    /// Buildings buried.
    pub buried: Option<u64>,
    /// Latitude in degrees, within `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub longitude: f64,
}

impl DisasterRecord {
    /// Creates a record with coordinates and no impact counts set.
    #[must_use]
    pub fn new(area: impl Into<String>, year: i32, latitude: f64, longitude: f64) -> Self {
        Self {
            area: area.into(),
            year,
            landslide_count: None,
            affected_population: None,
            deaths: None,
            infrastructure_affected: None,
            minor_damage: None,
            moderate_damage: None,
            severe_damage: None,
            buried: None,
            latitude,
            longitude,
        }
    }

    /// Returns the value of `column` as `f64`, or `None` if it is missing.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn value(&self, column: FeatureColumn) -> Option<f64> {
        let count = match column {
            FeatureColumn::Latitude => return Some(self.latitude),
            FeatureColumn::Longitude => return Some(self.longitude),
            FeatureColumn::LandslideCount => self.landslide_count,
            FeatureColumn::AffectedPopulation => self.affected_population,
            FeatureColumn::Deaths => self.deaths,
            FeatureColumn::InfrastructureAffected => self.infrastructure_affected,
            FeatureColumn::MinorDamage => self.minor_damage,
            FeatureColumn::ModerateDamage => self.moderate_damage,
            FeatureColumn::SevereDamage => self.severe_damage,
            FeatureColumn::Buried => self.buried,
        };
        match count {
            Some(v) => Some(v as f64),
            None => None,
        }
    }

    /// Sets the count stored under `column`.
    ///
    /// Coordinates are not counts; setting [`FeatureColumn::Latitude`] or
    /// [`FeatureColumn::Longitude`] through this method is a no-op.
    pub const fn set_count(&mut self, column: FeatureColumn, value: Option<u64>) {
        match column {
            FeatureColumn::LandslideCount => self.landslide_count = value,
            FeatureColumn::AffectedPopulation => self.affected_population = value,
            FeatureColumn::Deaths => self.deaths = value,
            FeatureColumn::InfrastructureAffected => self.infrastructure_affected = value,
            FeatureColumn::MinorDamage => self.minor_damage = value,
            FeatureColumn::ModerateDamage => self.moderate_damage = value,
            FeatureColumn::SevereDamage => self.severe_damage = value,
            FeatureColumn::Buried => self.buried = value,
            FeatureColumn::Latitude | FeatureColumn::Longitude => {}
        }
    }

    /// Builder-style variant of [`Self::set_count`].
    #[must_use]
    pub const fn with_count(mut self, column: FeatureColumn, value: u64) -> Self {
        self.set_count(column, Some(value));
        self
    }
}

/// Ordinal landslide-risk level assigned to a cluster.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    /// Cluster landslide mean below the low threshold
    Low,
    /// Cluster landslide mean between the low and high thresholds
    Medium,
    /// Cluster landslide mean at or above the high threshold
    High,
}

impl RiskCategory {
    /// Human-readable label for tables and legends.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low risk",
            Self::Medium => "Medium risk",
            Self::High => "High risk",
        }
    }

    /// Returns all variants of this enum, lowest risk first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn feature_column_parses_both_names() {
        for column in FeatureColumn::all() {
            let from_header = FeatureColumn::from_str(column.csv_header()).unwrap();
            let from_name = FeatureColumn::from_str(&column.to_string()).unwrap();
            assert_eq!(from_header, *column);
            assert_eq!(from_name, *column);
        }
        assert!(FeatureColumn::from_str("KABUPATEN").is_err());
    }

    #[test]
    fn counts_exclude_coordinates() {
        assert_eq!(FeatureColumn::counts().len(), 8);
        assert!(FeatureColumn::counts().iter().all(|c| c.is_count()));
        assert!(!FeatureColumn::Latitude.is_count());
        assert!(!FeatureColumn::Longitude.is_count());
    }

    #[test]
    fn record_value_reads_counts_and_coordinates() {
        let record = DisasterRecord::new("Bogor", 2022, -6.6, 106.8)
            .with_count(FeatureColumn::LandslideCount, 42)
            .with_count(FeatureColumn::Deaths, 3);

        assert_eq!(record.value(FeatureColumn::LandslideCount), Some(42.0));
        assert_eq!(record.value(FeatureColumn::Deaths), Some(3.0));
        assert_eq!(record.value(FeatureColumn::Buried), None);
        assert_eq!(record.value(FeatureColumn::Latitude), Some(-6.6));
        assert_eq!(record.value(FeatureColumn::Longitude), Some(106.8));
    }

    #[test]
    fn risk_categories_are_ordered() {
        assert!(RiskCategory::Low < RiskCategory::Medium);
        assert!(RiskCategory::Medium < RiskCategory::High);
        assert_eq!(RiskCategory::High.to_string(), "HIGH");
    }

    #[test]
    fn feature_column_serde_accepts_dataset_header() {
        #[derive(Deserialize)]
        struct Wrapper {
            column: FeatureColumn,
        }

        let parsed: Wrapper = serde_json::from_str(r#"{"column":"RUSAK_BERAT"}"#).unwrap();
        assert_eq!(parsed.column, FeatureColumn::SevereDamage);
    }
}
