use crate::error::ReportResult;
use chrono::{Local, TimeZone};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub time: String,
    pub queries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedPoint {
    pub time: String,
    pub blocked: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceQueries {
    pub device: String,
    pub queries: u64,
}

/// Query volume over the last day in 10 minute buckets, plus per-client totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiholeStats {
    pub queries: Vec<QueryPoint>,
    pub blocked: Vec<BlockedPoint>,
    pub devices: Vec<DeviceQueries>,
}

/// Fetch stats from the Pi-hole admin API at `base_url` (e.g. `http://localhost`).
pub async fn fetch(
    client: &reqwest::Client,
    base_url: &str,
    api_token: Option<&str>,
) -> ReportResult<PiholeStats> {
    let api_url = format!("{}/admin/api.php", base_url.trim_end_matches('/'));
    let auth: Vec<(&str, &str)> = api_token.map(|token| ("auth", token)).into_iter().collect();

    debug!("Fetching Pi-hole stats from {}", api_url);

    let over_time: Value = client
        .get(&api_url)
        .query(&[("overTimeData10mins", "true")])
        .query(&auth)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let sources: Value = client
        .get(&api_url)
        .query(&[("getQuerySources", "")])
        .query(&auth)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let stats = reshape(&over_time, &sources);
    info!(
        "Pi-hole stats: {} query buckets, {} devices",
        stats.queries.len(),
        stats.devices.len()
    );
    Ok(stats)
}

/// Turn the raw API payloads into chart-ready series.
///
/// Buckets are keyed by unix timestamp and come back oldest first. Entries
/// with non-numeric keys or counts are skipped.
pub fn reshape(over_time: &Value, sources: &Value) -> PiholeStats {
    let domains = over_time
        .get("domains_over_time")
        .or_else(|| over_time.get("over_time"));

    let queries = time_buckets(domains)
        .into_iter()
        .map(|(ts, queries)| QueryPoint {
            time: clock_label(ts),
            queries,
        })
        .collect();

    let blocked = time_buckets(over_time.get("ads_over_time"))
        .into_iter()
        .map(|(ts, blocked)| BlockedPoint {
            time: clock_label(ts),
            blocked,
        })
        .collect();

    // Newer API versions nest the map under `top_sources`.
    let sources = sources.get("top_sources").unwrap_or(sources);
    let devices = sources
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(device, count)| {
                    Some(DeviceQueries {
                        device: device.clone(),
                        queries: count.as_u64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    PiholeStats {
        queries,
        blocked,
        devices,
    }
}

fn time_buckets(value: Option<&Value>) -> Vec<(i64, u64)> {
    // An empty series is sent as `[]` rather than `{}`.
    let Some(map) = value.and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut buckets: Vec<(i64, u64)> = map
        .iter()
        .filter_map(|(ts, count)| Some((ts.parse().ok()?, count.as_u64()?)))
        .collect();
    buckets.sort_unstable_by_key(|(ts, _)| *ts);
    buckets
}

fn clock_label(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(time) => time.format("%H:%M").to_string(),
        None => ts.to_string(),
    }
}
