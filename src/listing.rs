//! Directory listing of yearly archives.

use crate::error::PipelineError;
use crate::source::ArchiveSource;

use hashbrown::HashSet;
use lazy_static::lazy_static;
use regex::Regex;

/// Extension of yearly archives.
pub const ARCHIVE_EXTENSION: &str = ".csv.gz";

lazy_static! {
    // Links to yearly archives in an HTML directory index.
    static ref ARCHIVE_LINK: Regex = Regex::new(r#"href="(\d{4}\.csv\.gz)""#).unwrap();
}

/// Returns the archive name for a year, e.g. `2020.csv.gz`.
pub fn archive_name(year: i32) -> String {
    format!("{year}{ARCHIVE_EXTENSION}")
}

/// Returns the archives for `years` that are linked from `listing`.
///
/// The result follows the order of `years` and contains no duplicates. A listing without any
/// matching links yields an empty list.
///
/// # Arguments
///
/// * `listing`: HTML directory index
/// * `years`: Years of interest
pub fn filter_listing(listing: &str, years: &[i32]) -> Vec<String> {
    let links: HashSet<&str> = ARCHIVE_LINK
        .captures_iter(listing)
        .filter_map(|captures| captures.get(1))
        .map(|link| link.as_str())
        .collect();
    let mut seen = HashSet::new();
    years
        .iter()
        .map(|year| archive_name(*year))
        .filter(|name| links.contains(name.as_str()) && seen.insert(name.clone()))
        .collect()
}

/// Fetch the directory listing and return the archives available for `years`.
///
/// Transport failures are returned as errors; there is no partial result.
#[tracing::instrument(level = "DEBUG", skip(source))]
pub async fn list_files<S>(source: &S, years: &[i32]) -> Result<Vec<String>, PipelineError>
where
    S: ArchiveSource + ?Sized,
{
    let listing = source.listing().await?;
    tracing::info!(bytes = listing.len(), "fetched directory listing");
    let files = filter_listing(&listing, years);
    tracing::info!(?files, ?years, "matched archives");
    Ok(files)
}
