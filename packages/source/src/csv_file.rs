//! CSV loader for the provincial landslide export.
//!
//! Headers are matched case-sensitively after trimming. `KABUPATEN`, `TAHUN`,
//! `LATITUDE` and `LONGITUDE` are mandatory; count columns are optional and
//! individual count cells may be empty. Unknown headers are ignored.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr as _;

use landslide_map_disaster_models::{DisasterRecord, FeatureColumn};

use crate::parsing::{parse_count, parse_degrees, parse_year};
use crate::{RecordSet, SourceError};

/// Header holding the regency/city name.
pub const AREA_HEADER: &str = "KABUPATEN";

/// Header holding the reporting year.
pub const YEAR_HEADER: &str = "TAHUN";

/// Where each recognised column lives in a CSV row.
struct HeaderLayout {
    area: usize,
    year: usize,
    columns: BTreeMap<FeatureColumn, usize>,
}

impl HeaderLayout {
    fn from_headers(headers: &[String]) -> Result<Self, SourceError> {
        let mut area = None;
        let mut year = None;
        let mut columns = BTreeMap::new();

        for (i, header) in headers.iter().enumerate() {
            match header.as_str() {
                AREA_HEADER | "area" => area = Some(i),
                YEAR_HEADER | "year" => year = Some(i),
                other => {
                    if let Ok(column) = FeatureColumn::from_str(other) {
                        columns.insert(column, i);
                    } else {
                        log::debug!("Ignoring unrecognised column '{other}'");
                    }
                }
            }
        }

        let missing = |column: &str| SourceError::MissingColumn {
            column: column.to_string(),
        };

        let area = area.ok_or_else(|| missing(AREA_HEADER))?;
        let year = year.ok_or_else(|| missing(YEAR_HEADER))?;
        for required in [FeatureColumn::Latitude, FeatureColumn::Longitude] {
            if !columns.contains_key(&required) {
                return Err(missing(required.csv_header()));
            }
        }

        Ok(Self {
            area,
            year,
            columns,
        })
    }
}

/// Loads a record set from a CSV file on disk.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read, a mandatory column is
/// missing, a cell fails to parse, or the records violate the set's
/// invariants.
pub fn load_csv(path: impl AsRef<Path>) -> Result<RecordSet, SourceError> {
    let path = path.as_ref();
    log::info!("Loading landslide records from {}", path.display());
    let file = std::fs::File::open(path)?;
    load_csv_reader(file)
}

/// Loads a record set from any CSV byte stream.
///
/// # Errors
///
/// See [`load_csv`].
pub fn load_csv_reader(reader: impl Read) -> Result<RecordSet, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let layout = HeaderLayout::from_headers(&headers)?;
    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = result?;
        // Header is line 1.
        let line = i + 2;
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim();
        let invalid = |column: &str, message: String| SourceError::InvalidValue {
            row: line,
            column: column.to_string(),
            message,
        };

        let area = cell(layout.area);
        if area.is_empty() {
            return Err(invalid(AREA_HEADER, "area name is empty".to_string()));
        }
        let year = parse_year(cell(layout.year)).map_err(|e| invalid(YEAR_HEADER, e))?;

        let lat_col = FeatureColumn::Latitude;
        let lng_col = FeatureColumn::Longitude;
        let latitude = parse_degrees(cell(layout.columns[&lat_col]))
            .map_err(|e| invalid(lat_col.csv_header(), e))?;
        let longitude = parse_degrees(cell(layout.columns[&lng_col]))
            .map_err(|e| invalid(lng_col.csv_header(), e))?;

        let mut record = DisasterRecord::new(area, year, latitude, longitude);
        for (&column, &idx) in &layout.columns {
            if !column.is_count() {
                continue;
            }
            let value = parse_count(cell(idx)).map_err(|e| invalid(column.csv_header(), e))?;
            record.set_count(column, value);
        }

        records.push(record);
    }

    log::info!("Parsed {} landslide records", records.len());

    RecordSet::new(records, layout.columns.into_keys())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
KABUPATEN,TAHUN,JUMLAH_LONGSOR,JIWA_TERDAMPAK,JIWA_MENINGGAL,RUSAK_TERDAMPAK,RUSAK_RINGAN,RUSAK_SEDANG,RUSAK_BERAT,TERTIMBUN,LATITUDE,LONGITUDE
Bogor,2022,120,3400,4,50,30,12,8,2,-6.5950,106.8167
Sukabumi,2022,98,2100,6,40,22,10,5,1,-6.9277,106.9300
Cianjur,2022,,1500,2,35,18,6,3,0,-6.8170,107.1425
";

    #[test]
    fn loads_dataset_headers() {
        let set = load_csv_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.columns().len(), FeatureColumn::all().len());

        let bogor = &set.records()[0];
        assert_eq!(bogor.area, "Bogor");
        assert_eq!(bogor.year, 2022);
        assert_eq!(bogor.landslide_count, Some(120));
        assert_eq!(bogor.buried, Some(2));
        assert!((bogor.latitude - -6.5950).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_count_cells_load_as_missing() {
        let set = load_csv_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(set.records()[2].landslide_count, None);
        assert_eq!(set.missing_counts()[&FeatureColumn::LandslideCount], 1);
    }

    #[test]
    fn optional_count_columns_may_be_absent() {
        let csv = "KABUPATEN,TAHUN,JUMLAH_LONGSOR,LATITUDE,LONGITUDE\nGarut,2021,14,-7.2,107.9\n";
        let set = load_csv_reader(csv.as_bytes()).unwrap();
        assert!(set.has_column(FeatureColumn::LandslideCount));
        assert!(!set.has_column(FeatureColumn::Deaths));
        assert_eq!(set.records()[0].deaths, None);
    }

    #[test]
    fn missing_coordinate_header_is_an_error() {
        let csv = "KABUPATEN,TAHUN,JUMLAH_LONGSOR,LATITUDE\nGarut,2021,14,-7.2\n";
        let err = load_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(
            matches!(err, SourceError::MissingColumn { ref column } if column == "LONGITUDE"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reports_line_of_bad_cell() {
        let csv = "KABUPATEN,TAHUN,JUMLAH_LONGSOR,LATITUDE,LONGITUDE\nGarut,2021,14,-7.2,107.9\nBogor,2021,-1,-6.6,106.8\n";
        let err = load_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(
            matches!(err, SourceError::InvalidValue { row: 3, ref column, .. } if column == "JUMLAH_LONGSOR"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn accepts_snake_case_headers() {
        let csv = "area,year,landslide_count,latitude,longitude\nGarut,2021,14,-7.2,107.9\n";
        let set = load_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(set.records()[0].landslide_count, Some(14));
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let csv = "KABUPATEN,TAHUN,LATITUDE,LONGITUDE\nGarut,2021,-7.2,107.9\nGarut,2021,-7.2,107.9\n";
        assert!(matches!(
            load_csv_reader(csv.as_bytes()),
            Err(SourceError::DuplicateRecord { .. })
        ));
    }
}
