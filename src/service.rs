use crate::archive::SealedArchive;
use crate::bundler::{self, BundleSettings};
use crate::config::Config;
use crate::csv_export;
use crate::error::{ReportError, ReportResult};
use crate::log_parser;
use crate::pihole_stats::{self, PiholeStats};
use crate::probe_runner;
use crate::system_info::{self, SystemSummary};
use crate::types::{MeasurementRecord, ProbeRegistry, ProbeResult};
use crate::window::window;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

/// Entry point for request handlers: holds the probe registry and where to
/// find the measurement log. Immutable once built, so one instance can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct SnapshotService {
    registry: ProbeRegistry,
    log_path: PathBuf,
    settings: BundleSettings,
    pihole: PiholeApi,
}

#[derive(Debug, Clone)]
struct PiholeApi {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl SnapshotService {
    pub fn new(registry: ProbeRegistry, log_path: PathBuf, settings: BundleSettings) -> Self {
        Self {
            registry,
            log_path,
            settings,
            pihole: PiholeApi {
                client: reqwest::Client::new(),
                base_url: "http://localhost".to_string(),
                api_token: None,
            },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut service = Self::new(
            config.registry(),
            config.log_path.clone(),
            BundleSettings {
                archive_dir: config.archive_dir(),
                probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            },
        );
        service.pihole.base_url = config.pihole_url.clone();
        service.pihole.api_token = config.pihole_api_token.clone();
        service
    }

    pub fn list_probe_names(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }

    pub async fn run_snapshot(&self, names: &[String]) -> ReportResult<SealedArchive> {
        info!("Snapshot requested for: {:?}", names);
        bundler::bundle(names, &self.registry, &self.settings).await
    }

    /// Run a single registered probe. `None` if the name is unknown.
    pub async fn run_probe(&self, name: &str) -> Option<ProbeResult> {
        let spec = self.registry.get(name)?;
        Some(probe_runner::run(name, spec, self.settings.probe_timeout).await)
    }

    pub async fn raw_log(&self) -> ReportResult<String> {
        tokio::fs::read_to_string(&self.log_path)
            .await
            .map_err(|source| ReportError::LogUnreadable {
                path: self.log_path.clone(),
                source,
            })
    }

    pub async fn recent_speed_history(&self, limit: usize) -> ReportResult<Vec<MeasurementRecord>> {
        let text = self.raw_log().await?;
        let records = log_parser::parse(&text);
        debug!("Parsed {} speed test records from {:?}", records.len(), self.log_path);
        Ok(window(&records, limit).to_vec())
    }

    pub async fn speed_history_csv(&self, limit: usize) -> ReportResult<String> {
        csv_export::speed_history_csv(&self.recent_speed_history(limit).await?)
    }

    pub async fn system_summary(&self) -> SystemSummary {
        system_info::collect(self.settings.probe_timeout).await
    }

    pub async fn pihole_stats(&self) -> ReportResult<PiholeStats> {
        pihole_stats::fetch(
            &self.pihole.client,
            &self.pihole.base_url,
            self.pihole.api_token.as_deref(),
        )
        .await
    }
}
