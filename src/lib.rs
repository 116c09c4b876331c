//! This crate summarises the yearly archives of the
//! [GHCN-Daily](https://www.ncei.noaa.gov/products/land-based-station/global-historical-climatology-network-daily)
//! weather observation dataset, and serves a small sum of squares API.
//!
//! The pipeline lists the yearly `<year>.csv.gz` archives published by NOAA, downloads each
//! archive of interest, streams the decompressed table in fixed-size chunks while maintaining
//! running aggregates, and writes a JSON summary per archive. Each archive is processed by an
//! independent task; a failure in one archive does not affect the others.
//!
//! The crate is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team.
//! * [reqwest] HTTP client for downloading archives.
//! * [flate2] and [csv] for streaming decompression and parsing of the tables.
//! * [Serde](serde) performs (de)serialisation of JSON request, response and summary data.
//! * [rayon] runs the fan-out of the sum of squares computation.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod compression;
pub mod config;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod resource_manager;
pub mod server;
pub mod sink;
pub mod source;
pub mod squares;
pub mod tracing;
pub mod validated_json;
