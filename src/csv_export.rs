use crate::error::ReportResult;
use crate::types::MeasurementRecord;

const HEADER: &str = "time,download,upload";

/// Speed history as CSV with a header row. Labels are written as JSON
/// strings so commas and quotes inside them survive. Empty input gives an
/// empty string.
pub fn speed_history_csv(records: &[MeasurementRecord]) -> ReportResult<String> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADER.to_string());
    for record in records {
        lines.push(format!(
            "{},{},{}",
            serde_json::to_string(&record.timestamp)?,
            record.download_mbps,
            record.upload_mbps
        ));
    }
    Ok(lines.join("\n"))
}
