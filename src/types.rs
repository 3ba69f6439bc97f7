use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// One completed network speed test parsed from the measurement log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Label taken verbatim from the first line of the log block
    #[serde(rename = "time")]
    pub timestamp: String,
    #[serde(rename = "download")]
    pub download_mbps: f64,
    #[serde(rename = "upload")]
    pub upload_mbps: f64,
}

/// How to invoke one diagnostic probe.
///
/// With `shell` set, `command` is run as an `sh -c` script and `args` are
/// handed to it as positional parameters, never spliced into the script text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub shell: bool,
}

impl ProbeSpec {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            shell: false,
        }
    }

    pub fn shell(script: &str) -> Self {
        Self {
            command: script.to_string(),
            args: Vec::new(),
            shell: true,
        }
    }
}

pub type ProbeRegistry = BTreeMap<String, ProbeSpec>;

/// Probes available on a stock appliance.
pub fn default_registry(log_path: &Path) -> ProbeRegistry {
    let log_path = log_path.to_string_lossy().into_owned();

    let mut registry = ProbeRegistry::new();
    registry.insert("fastfetch".to_string(), ProbeSpec::new("fastfetch", &[]));
    registry.insert("stui".to_string(), ProbeSpec::new("s-tui", &["--no-interactive"]));
    registry.insert("speedtest".to_string(), ProbeSpec::new("speedtest-cli", &["--simple"]));
    registry.insert("log".to_string(), ProbeSpec::new("cat", &[log_path.as_str()]));
    registry.insert(
        "pihole".to_string(),
        ProbeSpec::new("docker", &["exec", "pihole", "pihole", "-c"]),
    );
    registry
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub name: String,
    pub succeeded: bool,
    /// stdout on success, stdout followed by stderr on failure
    pub output: String,
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn failed(name: &str, output: String, elapsed: Duration) -> Self {
        Self {
            name: name.to_string(),
            succeeded: false,
            output,
            elapsed,
        }
    }
}
