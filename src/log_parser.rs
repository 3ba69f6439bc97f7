use crate::types::MeasurementRecord;
use log::debug;

const BLOCK_SEPARATOR: &str = "==========";
const DOWNLOAD_MARKER: &str = "Download:";
const UPLOAD_MARKER: &str = "Upload:";

/// Parse the full contents of the speed test log, oldest record first.
///
/// Blocks missing either a download or an upload line, or whose value line
/// holds no readable number, are skipped.
pub fn parse(log_text: &str) -> Vec<MeasurementRecord> {
    log_text
        .split(BLOCK_SEPARATOR)
        .filter(|block| block.contains(DOWNLOAD_MARKER) && block.contains(UPLOAD_MARKER))
        .filter_map(parse_block)
        .collect()
}

fn parse_block(block: &str) -> Option<MeasurementRecord> {
    let timestamp = block.lines().map(str::trim).find(|line| !line.is_empty())?;

    let download_mbps = rate_on_marker_line(block, DOWNLOAD_MARKER);
    let upload_mbps = rate_on_marker_line(block, UPLOAD_MARKER);

    match (download_mbps, upload_mbps) {
        (Some(download_mbps), Some(upload_mbps)) => Some(MeasurementRecord {
            timestamp: timestamp.to_string(),
            download_mbps,
            upload_mbps,
        }),
        _ => {
            debug!("Skipping log block {:?}: unreadable rate", timestamp);
            None
        }
    }
}

fn rate_on_marker_line(block: &str, marker: &str) -> Option<f64> {
    let line = block.lines().find(|line| line.contains(marker))?;
    first_number(line)?.parse().ok()
}

/// First maximal run of digits and decimal points.
fn first_number(line: &str) -> Option<&str> {
    let is_numeric = |c: char| c.is_ascii_digit() || c == '.';
    let start = line.find(is_numeric)?;
    let rest = &line[start..];
    let end = rest.find(|c: char| !is_numeric(c)).unwrap_or(rest.len());
    Some(&rest[..end])
}
