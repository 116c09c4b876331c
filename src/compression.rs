//! Decompression support.

use flate2::read::MultiGzDecoder;
use std::io::{BufReader, Read};

/// Size of the buffer between the gzip decoder and the table parser.
const DECODE_BUFFER_SIZE: usize = 256 * 1024;

/// Returns a reader yielding the decompressed contents of a gzip stream.
///
/// Decompression happens lazily as the reader is consumed, so the uncompressed table is never
/// held in memory in full. Concatenated gzip members are decoded as one stream. Errors in the
/// compressed data surface as [std::io::Error]s from `read`.
///
/// # Arguments
///
/// * `data`: Compressed data
pub fn gzip_reader(data: &[u8]) -> impl Read + '_ {
    BufReader::with_capacity(DECODE_BUFFER_SIZE, MultiGzDecoder::new(data))
}
