use crate::archive::{ReportArchive, SealedArchive};
use crate::error::{ReportError, ReportResult};
use crate::probe_runner;
use crate::types::{ProbeRegistry, ProbeResult};
use chrono::Local;
use log::{debug, error, info};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

#[derive(Debug, Clone)]
pub struct BundleSettings {
    pub archive_dir: PathBuf,
    pub probe_timeout: Duration,
}

pub fn archive_file_name(timestamp: &str) -> String {
    format!("PiReports_{}.zip", timestamp)
}

pub fn entry_name(result: &ProbeResult, timestamp: &str) -> String {
    if result.succeeded {
        format!("{}_{}.txt", result.name, timestamp)
    } else {
        format!("{}_{}_ERROR.txt", result.name, timestamp)
    }
}

/// Run the selected probes and pack their outputs into one archive.
///
/// Unknown names are skipped and repeated names run once. Probes run
/// concurrently and one probe's failure never affects another. Only archive
/// I/O errors fail the whole bundle. Dropping the returned future kills any
/// probe still running.
pub async fn bundle(
    selected: &[String],
    registry: &ProbeRegistry,
    settings: &BundleSettings,
) -> ReportResult<SealedArchive> {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let mut archive = ReportArchive::create(&settings.archive_dir, archive_file_name(&timestamp))?;

    let mut probes = JoinSet::new();
    let mut names_by_task = HashMap::new();
    let mut seen = HashSet::new();

    for name in selected {
        let Some(spec) = registry.get(name) else {
            debug!("Ignoring unknown probe: {}", name);
            continue;
        };
        if !seen.insert(name.as_str()) {
            continue;
        }

        let task_name = name.clone();
        let spec = spec.clone();
        let limit = settings.probe_timeout;
        let handle = probes.spawn(async move { probe_runner::run(&task_name, &spec, limit).await });
        names_by_task.insert(handle.id(), name.clone());
    }

    info!("Bundling {} probe(s) as {}", probes.len(), archive_file_name(&timestamp));

    // The archive has a single writer: this loop, appending as probes finish.
    // Zip I/O runs on the blocking pool so large outputs don't stall the runtime.
    while let Some(joined) = probes.join_next_with_id().await {
        let result = match joined {
            Ok((_, result)) => result,
            Err(e) => {
                let name = names_by_task.remove(&e.id()).unwrap_or_default();
                error!("Probe task for {} failed: {}", name, e);
                ProbeResult::failed(&name, format!("probe task failed: {}", e), Duration::ZERO)
            }
        };
        debug!(
            "Probe {} finished in {:?} (succeeded: {})",
            result.name, result.elapsed, result.succeeded
        );
        archive = append_blocking(archive, entry_name(&result, &timestamp), result.output).await?;
    }

    let sealed = tokio::task::spawn_blocking(move || archive.seal()).await??;
    info!("Report archive {} sealed with {} entries", sealed.file_name(), sealed.entries().len());
    Ok(sealed)
}

async fn append_blocking(
    mut archive: ReportArchive,
    name: String,
    contents: String,
) -> ReportResult<ReportArchive> {
    tokio::task::spawn_blocking(move || {
        archive.append(&name, &contents)?;
        Ok::<_, ReportError>(archive)
    })
    .await?
}
