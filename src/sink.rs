//! Summary output.

use crate::error::PipelineError;
use crate::listing::ARCHIVE_EXTENSION;
use crate::models::SummaryRecord;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Returns the path of the summary for an archive: `<output_dir>/<year>.json`.
///
/// # Arguments
///
/// * `output_dir`: Directory holding summaries
/// * `file_name`: Archive name, e.g. `2020.csv.gz`
pub fn output_path(output_dir: &Path, file_name: &str) -> PathBuf {
    let stem = file_name
        .strip_suffix(ARCHIVE_EXTENSION)
        .unwrap_or(file_name);
    output_dir.join(format!("{stem}.json"))
}

/// Write a summary as indented JSON, creating parent directories and replacing any existing file.
///
/// The summary is written to a temporary file alongside `path` which is then renamed over it, so
/// an existing summary is only ever replaced by a complete one.
///
/// Returns the path written.
pub fn write_summary(record: &SummaryRecord, path: &Path) -> Result<PathBuf, PipelineError> {
    let write_error = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_error)?;
    let json = serde_json::to_string_pretty(record)?;
    let mut file = NamedTempFile::new_in(parent).map_err(write_error)?;
    file.write_all(json.as_bytes()).map_err(write_error)?;
    file.persist(path).map_err(|error| write_error(error.error))?;
    tracing::info!(path = %path.display(), "wrote summary");
    Ok(path.to_path_buf())
}
