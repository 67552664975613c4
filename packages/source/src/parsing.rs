//! Shared cell parsing utilities for the landslide dataset.
//!
//! Spreadsheet exports of the dataset are not consistent about number
//! formatting: counts sometimes come through as `12.0`, and missing cells
//! may be empty or spelled `NaN`.

/// Returns `true` if the cell should be treated as a missing value.
#[must_use]
pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || cell.eq_ignore_ascii_case("nan")
        || cell.eq_ignore_ascii_case("null")
        || cell == "-"
}

/// Parses a non-negative count. Returns `Ok(None)` for missing cells.
///
/// # Errors
///
/// Returns a message if the cell is negative, fractional, or not numeric.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count(cell: &str) -> Result<Option<u64>, String> {
    if is_missing(cell) {
        return Ok(None);
    }
    let cell = cell.trim();

    if let Ok(v) = cell.parse::<u64>() {
        return Ok(Some(v));
    }

    let v = cell
        .parse::<f64>()
        .map_err(|_| format!("'{cell}' is not a number"))?;
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
        return Err(format!("'{cell}' is not a non-negative whole number"));
    }

    Ok(Some(v as u64))
}

/// Parses a year. Accepts `2022` and `2022.0`.
///
/// # Errors
///
/// Returns a message if the cell is missing or not a whole number.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_year(cell: &str) -> Result<i32, String> {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<i32>() {
        return Ok(v);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < f64::from(i32::MAX) => {
            Ok(v as i32)
        }
        _ => Err(format!("'{cell}' is not a year")),
    }
}

/// Parses a coordinate in degrees. Coordinates are mandatory.
///
/// # Errors
///
/// Returns a message if the cell is missing or not numeric.
pub fn parse_degrees(cell: &str) -> Result<f64, String> {
    if is_missing(cell) {
        return Err("coordinate is missing".to_string());
    }
    let cell = cell.trim();
    cell.parse::<f64>()
        .map_err(|_| format!("'{cell}' is not a coordinate"))
}

/// Whether `(lat, lng)` lies within the geographic range.
#[must_use]
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_float_formatted_counts() {
        assert_eq!(parse_count("17").unwrap(), Some(17));
        assert_eq!(parse_count(" 17.0 ").unwrap(), Some(17));
    }

    #[test]
    fn missing_counts_are_none() {
        assert_eq!(parse_count("").unwrap(), None);
        assert_eq!(parse_count("NaN").unwrap(), None);
        assert_eq!(parse_count("  ").unwrap(), None);
    }

    #[test]
    fn rejects_negative_and_fractional_counts() {
        assert!(parse_count("-3").is_err());
        assert!(parse_count("2.5").is_err());
        assert!(parse_count("many").is_err());
    }

    #[test]
    fn parses_years() {
        assert_eq!(parse_year("2023").unwrap(), 2023);
        assert_eq!(parse_year("2023.0").unwrap(), 2023);
        assert!(parse_year("").is_err());
    }

    #[test]
    fn coordinates_are_mandatory() {
        assert!(parse_degrees("").is_err());
        let lat = parse_degrees("-6.9175").unwrap();
        assert!((lat - -6.9175).abs() < f64::EPSILON);
    }

    #[test]
    fn validates_coordinate_range() {
        assert!(is_valid_coordinate(-6.9, 107.6));
        assert!(!is_valid_coordinate(-91.0, 107.6));
        assert!(!is_valid_coordinate(-6.9, 181.0));
        assert!(!is_valid_coordinate(f64::NAN, 107.6));
    }
}
