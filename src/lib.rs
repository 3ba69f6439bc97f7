//! Diagnostics bundling for a single network appliance.
//!
//! Parses the speed test log into a time series and packs the output of
//! selected diagnostic probes into one downloadable zip archive. Also serves
//! the appliance's system summary and Pi-hole query stats.

pub mod archive;
pub mod bundler;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod log_parser;
pub mod pihole_stats;
pub mod probe_runner;
pub mod service;
pub mod system_info;
pub mod types;
pub mod window;

#[cfg(test)]
mod test_support;

pub use archive::SealedArchive;
pub use error::{ReportError, ReportResult};
pub use service::SnapshotService;
pub use types::{MeasurementRecord, ProbeRegistry, ProbeResult, ProbeSpec};
