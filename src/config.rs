use crate::probe_runner::DEFAULT_PROBE_TIMEOUT;
use crate::types::{default_registry, ProbeRegistry};
use crate::window::DEFAULT_HISTORY_LIMIT;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "pi-reports", version, about)]
pub struct Cli {
    /// Path to configuration file
    #[clap(long, default_value = "./config.toml")]
    pub config: PathBuf,

    /// Override speed test log path
    #[clap(long)]
    pub log_path: Option<PathBuf>,

    /// Override directory for temporary report archives
    #[clap(long)]
    pub archive_dir: Option<PathBuf>,

    /// Override per-probe timeout in seconds
    #[clap(long)]
    pub probe_timeout_secs: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long, default_value = "info")]
    pub log_level: String,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List configured probe names
    Probes,

    /// Print recent speed test results
    Speedlog {
        /// Number of most recent records
        #[clap(long)]
        limit: Option<usize>,

        /// Print JSON instead of a table
        #[clap(long, conflicts_with = "csv")]
        json: bool,

        /// Print CSV instead of a table
        #[clap(long)]
        csv: bool,
    },

    /// Print OS, uptime, CPU, RAM and power readings as JSON
    System,

    /// Print Pi-hole query and client stats as JSON
    Stats,

    /// Run one probe and print its output
    Probe { name: String },

    /// Bundle probe outputs into a zip archive
    Bundle {
        /// Probe names to include
        names: Vec<String>,

        /// Where to save the archive
        #[clap(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print the raw speed test log
    Log,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_path: PathBuf,
    /// Defaults to the system temp dir
    pub archive_dir: Option<PathBuf>,
    pub probe_timeout_secs: u64,
    pub history_limit: usize,
    /// Base URL of the Pi-hole admin interface
    pub pihole_url: String,
    pub pihole_api_token: Option<String>,
    /// Added to (or replacing entries of) the default registry
    pub probes: ProbeRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("/var/log/net_report.log"),
            archive_dir: None,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            pihole_url: "http://localhost".to_string(),
            pihole_api_token: None,
            probes: ProbeRegistry::new(),
        }
    }
}

impl Config {
    pub fn registry(&self) -> ProbeRegistry {
        let mut registry = default_registry(&self.log_path);
        registry.extend(self.probes.clone());
        registry
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.archive_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        let config_content = fs::read_to_string(&cli.config)
            .with_context(|| format!("Failed to read config file: {:?}", cli.config))?;

        toml::from_str(&config_content).context("Failed to parse config file")?
    } else {
        info!("No config file at {:?}, using defaults", cli.config);
        Config::default()
    };

    // Apply CLI overrides
    if let Some(ref log_path) = cli.log_path {
        config.log_path = log_path.clone();
    }

    if let Some(ref archive_dir) = cli.archive_dir {
        config.archive_dir = Some(archive_dir.clone());
    }

    if let Some(probe_timeout_secs) = cli.probe_timeout_secs {
        config.probe_timeout_secs = probe_timeout_secs;
    }

    if config.probe_timeout_secs == 0 {
        anyhow::bail!("probe_timeout_secs must be greater than zero");
    }

    Ok(config)
}
