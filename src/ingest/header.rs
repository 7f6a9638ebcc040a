// src/ingest/header.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use super::rules::HeaderRules;
use crate::error::{IngestError, Result};
use crate::fetch::RawTable;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Lowercase and drop all whitespace, so "컨택 MD" and "컨택MD" compare equal.
pub fn normalize_label(raw: &str) -> String {
    WHITESPACE.replace_all(raw, "").to_lowercase()
}

/// Number of distinct keywords found in the row's concatenated text.
pub fn keyword_score(row: &[String], keywords: &[String]) -> usize {
    let text = row.join(" ").to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty() && text.contains(&k.to_lowercase()))
        .count()
}

fn has_site_marker(row: &[String], rules: &HeaderRules) -> bool {
    rules.site_marker.as_ref().map_or(false, |marker| {
        row.get(marker.column)
            .map_or(false, |cell| cell.trim() == marker.label.trim())
    })
}

/// Index of the first row in `[min_offset, scan_rows)` that looks like a header.
pub fn locate_header(table: &RawTable, rules: &HeaderRules) -> Result<usize> {
    let end = rules.scan_rows.min(table.rows.len());
    for idx in rules.min_offset..end {
        let row = &table.rows[idx];
        let score = keyword_score(row, &rules.keywords);
        trace!(row = idx, score, "header candidate");
        if score >= rules.min_keyword_matches || has_site_marker(row, rules) {
            debug!(row = idx, score, "header row located");
            return Ok(idx);
        }
    }
    Err(IngestError::malformed(format!(
        "no header row within rows {}..{} ({} rows fetched)",
        rules.min_offset,
        rules.scan_rows,
        table.rows.len()
    )))
}
