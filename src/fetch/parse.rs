use csv::{ReaderBuilder, Trim};

use super::RawTable;
use crate::error::{IngestError, Result};

/// Parse comma-separated text into a `RawTable`.
///
/// Standard quoting applies (doubled quotes, commas and newlines inside
/// quotes). Rows may differ in width, cells are trimmed and blank lines are
/// skipped.
pub fn parse_csv(text: &str) -> Result<RawTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // sheets trim trailing empty cells per row
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| IngestError::malformed(format!("CSV parse error at record {idx}: {e}")))?;
        let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        if row.iter().all(|c| c.is_empty()) && row.len() <= 1 {
            continue;
        }
        rows.push(row);
    }
    Ok(RawTable::new(rows))
}
