//! Data types and associated functions and methods

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;
use validator::Validate;

/// Element codes that are counted in a summary.
///
/// Rows with any other element code still count towards the total number of records.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Element {
    /// Maximum temperature (tenths of degrees C)
    Tmax,
    /// Minimum temperature (tenths of degrees C)
    Tmin,
    /// Precipitation (tenths of mm)
    Prcp,
}

impl Element {
    /// Returns the element for a raw element code, if it is in the allow-list.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "TMAX" => Some(Self::Tmax),
            "TMIN" => Some(Self::Tmin),
            "PRCP" => Some(Self::Prcp),
            _ => None,
        }
    }
}

/// A single row of a GHCN-Daily by-year table.
///
/// The tables are headerless with eight columns. Only the first four take part in aggregation;
/// the flag columns are optional since trailing empty fields may be omitted.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Observation {
    /// Station identifier, e.g. `USW00094728`
    pub station: String,
    /// Observation date as `YYYYMMDD`
    pub date: String,
    /// Element code, e.g. `TMAX`
    pub element: String,
    /// Measured value in element-specific units
    pub value: i64,
    /// Measurement flag
    #[serde(default)]
    pub mflag: Option<String>,
    /// Quality flag
    #[serde(default)]
    pub qflag: Option<String>,
    /// Source flag
    #[serde(default)]
    pub sflag: Option<String>,
    /// Observation time as `HHMM`
    #[serde(default)]
    pub obs_time: Option<String>,
}

/// First and last observation dates in a file.
///
/// Both bounds are `None` when the file contained no observations.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Mean temperatures in whole degrees C.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TemperatureStats {
    pub avg_max_c: f64,
    pub avg_min_c: f64,
}

/// Per-file summary written to `<output_dir>/<year>.json`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SummaryRecord {
    /// Name of the source archive, e.g. `2020.csv.gz`
    pub file_name: String,
    /// Time at which the summary was derived
    pub processed_at: DateTime<Utc>,
    /// Number of rows in the table
    pub total_records: u64,
    /// Number of distinct station identifiers
    pub unique_stations: u64,
    pub date_range: DateRange,
    /// Occurrences of each counted element. Elements that never occurred are absent.
    pub measurement_counts: BTreeMap<Element, u64>,
    pub temperature_stats: TemperatureStats,
}

fn default_length() -> usize {
    10
}

/// Request body for the sum of squares endpoint
#[derive(Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct SumOfSquaresRequest {
    /// How many random numbers to generate
    #[serde(default = "default_length")]
    #[validate(range(max = 1000000, message = "length must not exceed 1000000"))]
    pub length: usize,
}

/// Response body for the sum of squares endpoint
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct SumOfSquaresResponse {
    pub sum_of_squares: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_from_code() {
        assert_eq!(Some(Element::Tmax), Element::from_code("TMAX"));
        assert_eq!(Some(Element::Tmin), Element::from_code("TMIN"));
        assert_eq!(Some(Element::Prcp), Element::from_code("PRCP"));
        assert_eq!(None, Element::from_code("SNOW"));
        assert_eq!(None, Element::from_code("tmax"));
    }

    #[test]
    fn element_display() {
        assert_eq!("TMAX", Element::Tmax.to_string());
        assert_eq!("PRCP", Element::Prcp.to_string());
    }

    #[test]
    fn summary_record_json_shape() {
        let record = SummaryRecord {
            file_name: "2020.csv.gz".to_string(),
            processed_at: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            total_records: 3,
            unique_stations: 2,
            date_range: DateRange {
                start: NaiveDate::from_ymd_opt(2020, 1, 1),
                end: NaiveDate::from_ymd_opt(2020, 1, 2),
            },
            measurement_counts: BTreeMap::from([(Element::Tmax, 1), (Element::Prcp, 1)]),
            temperature_stats: TemperatureStats {
                avg_max_c: 15.0,
                avg_min_c: 0.0,
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            serde_json::json!({
                "file_name": "2020.csv.gz",
                "processed_at": "2024-05-01T12:00:00Z",
                "total_records": 3,
                "unique_stations": 2,
                "date_range": {"start": "2020-01-01", "end": "2020-01-02"},
                "measurement_counts": {"TMAX": 1, "PRCP": 1},
                "temperature_stats": {"avg_max_c": 15.0, "avg_min_c": 0.0}
            }),
            value
        );
    }

    #[test]
    fn empty_date_range_serialises_null_bounds() {
        let value = serde_json::to_value(DateRange::default()).unwrap();
        assert_eq!(serde_json::json!({"start": null, "end": null}), value);
    }

    #[test]
    fn sum_of_squares_request_default_length() {
        let request: SumOfSquaresRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(10, request.length);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn sum_of_squares_request_too_long() {
        let request = SumOfSquaresRequest { length: 1_000_001 };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("length"));
    }
}
