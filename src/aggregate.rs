//! Streaming aggregation of GHCN-Daily by-year tables.
//!
//! A table is read in fixed-size chunks of rows. Each chunk is fully parsed before it is folded
//! into the [Accumulator], so a chunk that fails to parse never contributes partial counts. Once
//! every chunk has been consumed the accumulator is turned into a [SummaryRecord].

use crate::error::PipelineError;
use crate::models::{DateRange, Element, Observation, SummaryRecord, TemperatureStats};

use chrono::{DateTime, NaiveDate, Utc};
use hashbrown::HashSet;
use std::collections::BTreeMap;
use std::io::Read;

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Progress is logged every this many chunks.
const PROGRESS_INTERVAL: u64 = 10;

/// Running sum and count of values in tenths of a unit.
///
/// The sum is widened to `i128` so that no sequence of `i64` values shorter than `u64::MAX` can
/// overflow it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningSum {
    pub sum: i128,
    pub count: u64,
}

impl RunningSum {
    fn push(&mut self, value: i64) {
        self.sum += i128::from(value);
        self.count += 1;
    }

    fn merge(&mut self, other: RunningSum) {
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Mean converted from tenths to whole units, or zero if there were no values.
    pub fn mean_whole_units(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum as f64 / self.count as f64) / 10.0
        }
    }
}

/// Aggregates of a single chunk of rows.
#[derive(Debug, Default)]
struct ChunkAggregate<'a> {
    rows: u64,
    stations: HashSet<&'a str>,
    dates: HashSet<&'a str>,
    element_counts: BTreeMap<Element, u64>,
    tmax: RunningSum,
    tmin: RunningSum,
}

impl<'a> ChunkAggregate<'a> {
    fn new(chunk: &'a [Observation]) -> Self {
        let mut aggregate = ChunkAggregate {
            rows: chunk.len() as u64,
            ..Default::default()
        };
        for observation in chunk {
            aggregate.stations.insert(&observation.station);
            aggregate.dates.insert(&observation.date);
            if let Some(element) = Element::from_code(&observation.element) {
                *aggregate.element_counts.entry(element).or_default() += 1;
                match element {
                    Element::Tmax => aggregate.tmax.push(observation.value),
                    Element::Tmin => aggregate.tmin.push(observation.value),
                    Element::Prcp => (),
                }
            }
        }
        aggregate
    }
}

/// Running aggregates over every chunk of one table consumed so far.
#[derive(Debug, Default, PartialEq)]
pub struct Accumulator {
    total_records: u64,
    stations: HashSet<String>,
    dates: HashSet<String>,
    element_counts: BTreeMap<Element, u64>,
    tmax: RunningSum,
    tmin: RunningSum,
}

impl Accumulator {
    /// Fold one fully parsed chunk of rows into the accumulator.
    pub fn absorb(&mut self, chunk: &[Observation]) {
        let aggregate = ChunkAggregate::new(chunk);
        self.total_records += aggregate.rows;
        for station in aggregate.stations {
            if !self.stations.contains(station) {
                self.stations.insert(station.to_string());
            }
        }
        for date in aggregate.dates {
            if !self.dates.contains(date) {
                self.dates.insert(date.to_string());
            }
        }
        for (element, count) in aggregate.element_counts {
            *self.element_counts.entry(element).or_default() += count;
        }
        self.tmax.merge(aggregate.tmax);
        self.tmin.merge(aggregate.tmin);
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn unique_stations(&self) -> u64 {
        self.stations.len() as u64
    }

    pub fn element_counts(&self) -> &BTreeMap<Element, u64> {
        &self.element_counts
    }

    pub fn tmax(&self) -> RunningSum {
        self.tmax
    }

    pub fn tmin(&self) -> RunningSum {
        self.tmin
    }

    /// Earliest and latest of the distinct dates seen.
    ///
    /// Every date is parsed; an unparseable date fails the whole range.
    pub fn date_range(&self) -> Result<DateRange, PipelineError> {
        let mut range = DateRange::default();
        for raw in &self.dates {
            let date = parse_date(raw)?;
            range.start = Some(range.start.map_or(date, |start| start.min(date)));
            range.end = Some(range.end.map_or(date, |end| end.max(date)));
        }
        Ok(range)
    }

    /// Derive the summary record, consuming the accumulator.
    ///
    /// # Arguments
    ///
    /// * `file_name`: Name of the archive the rows were read from
    /// * `processed_at`: Timestamp to record in the summary
    pub fn into_summary(
        self,
        file_name: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<SummaryRecord, PipelineError> {
        let date_range = self.date_range()?;
        Ok(SummaryRecord {
            file_name: file_name.to_string(),
            processed_at,
            total_records: self.total_records,
            unique_stations: self.unique_stations(),
            date_range,
            measurement_counts: self.element_counts,
            temperature_stats: TemperatureStats {
                avg_max_c: self.tmax.mean_whole_units(),
                avg_min_c: self.tmin.mean_whole_units(),
            },
        })
    }
}

/// Parse an 8 digit `YYYYMMDD` date.
fn parse_date(raw: &str) -> Result<NaiveDate, PipelineError> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PipelineError::InvalidDate {
            date: raw.to_string(),
        });
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|source| PipelineError::DateParse {
        date: raw.to_string(),
        source,
    })
}

/// Aggregate a headerless GHCN-Daily table read from `reader`, `chunk_size` rows at a time.
///
/// Returns the accumulator after every chunk has been absorbed. Any read, decompression or parse
/// error aborts aggregation.
///
/// # Arguments
///
/// * `reader`: Source of the uncompressed table
/// * `chunk_size`: Maximum number of rows per chunk. Zero is treated as one.
pub fn aggregate<R: Read>(reader: R, chunk_size: usize) -> Result<Accumulator, PipelineError> {
    let chunk_size = chunk_size.max(1);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = csv_reader.deserialize::<Observation>();
    let mut accumulator = Accumulator::default();
    let mut chunk = Vec::with_capacity(chunk_size.min(DEFAULT_CHUNK_SIZE));
    let mut chunk_number = 0_u64;
    loop {
        chunk.clear();
        for row in rows.by_ref().take(chunk_size) {
            chunk.push(row?);
        }
        if chunk.is_empty() {
            break;
        }
        accumulator.absorb(&chunk);
        if chunk_number % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                chunk = chunk_number + 1,
                total_rows = accumulator.total_records,
                "processed chunk"
            );
        }
        chunk_number += 1;
        if chunk.len() < chunk_size {
            break;
        }
    }
    Ok(accumulator)
}
