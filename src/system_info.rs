use crate::probe_runner;
use crate::types::ProbeSpec;
use log::debug;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tokio::time::{sleep, Duration};

/// Sampling window for the CPU reading.
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// At-a-glance health of the appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub os: String,
    /// `uptime -p` style, e.g. `up 2 days, 3 hours, 1 minute`
    pub uptime: String,
    /// Percent busy across all cores
    pub cpu: f32,
    /// Percent of RAM in use
    pub ram: f32,
    /// `vcgencmd measure_volts` output, or `N/A` off a Raspberry Pi
    pub power: String,
}

pub async fn collect(probe_timeout: Duration) -> SystemSummary {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu_usage();
    // CPU usage is a delta between two refreshes.
    sleep(CPU_SAMPLE_INTERVAL.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
    system.refresh_cpu_usage();

    let os = match (System::long_os_version(), System::kernel_version()) {
        (Some(os), Some(kernel)) => format!("{} (kernel {})", os, kernel),
        (Some(os), None) => os,
        (None, _) => std::env::consts::OS.to_string(),
    };

    SystemSummary {
        os,
        uptime: format_uptime(System::uptime()),
        cpu: system.global_cpu_usage(),
        ram: percent(system.used_memory(), system.total_memory()),
        power: read_power(probe_timeout).await,
    }
}

async fn read_power(probe_timeout: Duration) -> String {
    let spec = ProbeSpec::new("vcgencmd", &["measure_volts"]);
    let result = probe_runner::run("power", &spec, probe_timeout).await;
    if result.succeeded {
        result.output.trim().to_string()
    } else {
        debug!("No power reading: {}", result.output.trim());
        "N/A".to_string()
    }
}

fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 1000.0).round() as f32 / 10.0
}

pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;

    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, unit)| {
            if count == 1 {
                format!("{} {}", count, unit)
            } else {
                format!("{} {}s", count, unit)
            }
        })
        .collect();

    if parts.is_empty() {
        "up 0 minutes".to_string()
    } else {
        format!("up {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "up 0 minutes");
        assert_eq!(format_uptime(59), "up 0 minutes");
        assert_eq!(format_uptime(60), "up 1 minute");
        assert_eq!(format_uptime(3 * 3_600 + 5 * 60), "up 3 hours, 5 minutes");
        assert_eq!(format_uptime(86_400 + 3_600 + 60), "up 1 day, 1 hour, 1 minute");
        assert_eq!(format_uptime(2 * 86_400), "up 2 days");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(512, 1024), 50.0);
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(5, 0), 0.0);
    }

    #[tokio::test]
    async fn test_collect_reports_sane_values() {
        let summary = collect(Duration::from_secs(5)).await;

        assert!(!summary.os.is_empty());
        assert!(summary.uptime.starts_with("up "));
        assert!((0.0..=100.0).contains(&summary.ram));
        assert!(!summary.power.is_empty());

        let json = serde_json::to_value(&summary).unwrap();
        for key in ["os", "uptime", "cpu", "ram", "power"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
