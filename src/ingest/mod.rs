// src/ingest/mod.rs
//
// RawTable -> Vec<Record>: find the header row, map columns to canonical
// fields, then reshape every data row.

use tracing::{debug, info, instrument};

pub mod columns;
pub mod header;
pub mod record;
pub mod rules;

pub use columns::ColumnMapping;
pub use header::locate_header;
pub use record::{CanonicalField, Record};
pub use rules::{ColumnRules, FieldRule, HeaderRules, IngestRules, SiteMarker};

use crate::error::{IngestError, Result};
use crate::fetch::RawTable;

/// A row with no content, or only rule characters such as `-----`.
fn is_divider(row: &[String]) -> bool {
    row.iter().all(|cell| {
        cell.chars()
            .all(|c| c.is_whitespace() || matches!(c, '-' | '=' | '_' | '*'))
    })
}

/// Normalize `table` into records, in source order.
///
/// Fails with `MalformedSource` when no header row is found or when no row
/// carries a site name. Never returns a partial result.
#[instrument(level = "info", skip_all, fields(rows = table.len()))]
pub fn ingest(table: &RawTable, rules: &IngestRules) -> Result<Vec<Record>> {
    let header_idx = locate_header(table, &rules.header)?;
    let headers = &table.rows[header_idx];
    let mapping = ColumnMapping::build(headers, &rules.columns);

    let mut start = header_idx + 1;
    if table.rows.get(start).map_or(false, |row| is_divider(row)) {
        debug!(row = start, "skipping divider under header");
        start += 1;
    }
    let data_rows = table.rows.get(start..).unwrap_or(&[]);

    let mut records = Vec::with_capacity(data_rows.len());
    let mut dropped = 0usize;
    for (pos, row) in data_rows.iter().enumerate() {
        match normalize_row(pos + 1, row, headers, &mapping) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if records.is_empty() {
        return Err(IngestError::malformed(format!(
            "header found at row {} but none of {} data rows has a site name",
            header_idx + 1,
            data_rows.len()
        )));
    }

    info!(
        header_row = header_idx,
        records = records.len(),
        dropped,
        "ingested"
    );
    Ok(records)
}

fn normalize_row(
    id: usize,
    row: &[String],
    headers: &[String],
    mapping: &ColumnMapping,
) -> Option<Record> {
    let site_name = mapping.resolve(CanonicalField::SiteName, row)?;
    let mut record = Record::new(id, site_name);

    record.extra = headers
        .iter()
        .zip(row.iter())
        .filter(|(label, _)| !label.trim().is_empty())
        .map(|(label, cell)| (label.trim().to_string(), cell.clone()))
        .collect();

    for field in CanonicalField::ALL {
        if field == CanonicalField::SiteName {
            continue;
        }
        if let Some(value) = mapping.resolve(field, row) {
            record.set_field(field, value.to_string());
        }
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn scenario() -> RawTable {
        table(&[
            &["banner"],
            &["blank"],
            &["SiteA", "RegionA", "Owner1", "Result1"],
            &["Camp1", "Seoul", "Kim", "Entered(New)"],
            &["Camp2", "Seoul", "Lee", "Rejected"],
            &["Camp3", "Busan", "Kim", "Entered(New)"],
        ])
    }

    #[test]
    fn ingests_documented_scenario() {
        let records = ingest(&scenario(), &IngestRules::default()).unwrap();
        assert_eq!(records.len(), 3);

        let names: Vec<&str> = records.iter().map(|r| r.site_name.as_str()).collect();
        assert_eq!(names, ["Camp1", "Camp2", "Camp3"]);
        let ids: Vec<usize> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, [1, 2, 3]);

        assert_eq!(records[0].region_wide.as_deref(), Some("Seoul"));
        assert_eq!(records[0].contact_owner.as_deref(), Some("Kim"));
        assert_eq!(records[1].result.as_deref(), Some("Rejected"));
        assert_eq!(records[2].region_wide.as_deref(), Some("Busan"));
        assert_eq!(records[0].get("RegionA"), Some("Seoul"));
    }

    #[test]
    fn drops_rows_without_site_name_but_keeps_positions() {
        let t = table(&[
            &["No", "캠핑장명", "지역(광역)", "지역(시/군)", "담당 MD", "결과"],
            &["1", "솔밭", "강원", "평창", "kim", "거절"],
            &["2", "", "강원", "", "lee", "거절"],
            &["3", "  ", "", "", "", ""],
            &["4", "바다", "부산", "기장", "kim", "입점(신규)"],
        ]);
        let records = ingest(&t, &IngestRules::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.site_name.is_empty()));
        assert_eq!(records[1].id, 4);
        assert_eq!(records[1].region_detail.as_deref(), Some("기장"));
    }

    #[test]
    fn skips_exactly_one_divider_row() {
        let t = table(&[
            &["site", "region", "owner", "result"],
            &["----", "", "===", ""],
            &["", "", "", ""],
            &["Camp1", "Seoul", "Kim", "ok"],
        ]);
        let records = ingest(&t, &IngestRules::default()).unwrap();
        assert_eq!(records.len(), 1);
        // divider skipped, the blank row still occupies position 1
        assert_eq!(records[0].id, 2);
    }

    #[test]
    fn canonical_value_wins_over_colliding_label() {
        let t = table(&[
            &["site", "region", "owner", "result", "notes"],
            &["Camp1", "Seoul", "Kim", "ok", "call back"],
        ]);
        let records = ingest(&t, &IngestRules::default()).unwrap();
        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["result"], "ok");
        assert_eq!(json["notes"], "call back");
        assert_eq!(json["site"], "Camp1");
    }

    #[test]
    fn earliest_header_wins_over_later_candidates() {
        let t = table(&[
            &["title"],
            &["site", "region", "result"],
            &["region", "owner", "result", "site"],
            &["Camp1", "Seoul", "ok"],
        ]);
        let records = ingest(&t, &IngestRules::default()).unwrap();
        // the second header-looking row is treated as data
        assert_eq!(records[0].site_name, "region");
        assert_eq!(records[1].site_name, "Camp1");
    }

    #[test]
    fn no_header_is_malformed() {
        let t = table(&[&["a", "b"], &["c", "d"]]);
        let err = ingest(&t, &IngestRules::default()).unwrap_err();
        assert!(matches!(err, IngestError::MalformedSource(_)));
    }

    #[test]
    fn header_without_usable_rows_is_malformed() {
        let t = table(&[&["site", "region", "result"], &["", "Seoul", "ok"]]);
        let err = ingest(&t, &IngestRules::default()).unwrap_err();
        assert_eq!(err.kind_tag(), "malformed_source");
    }

    #[test]
    fn reingest_rebuilds_from_scratch() {
        let first = ingest(&scenario(), &IngestRules::default()).unwrap();
        let mut t = scenario();
        t.rows.insert(3, vec!["Camp0".into(), "Daegu".into(), "Park".into(), "x".into()]);
        let second = ingest(&t, &IngestRules::default()).unwrap();
        assert_eq!(second.len(), first.len() + 1);
        assert_eq!(second[0].site_name, "Camp0");
        assert_eq!(second[1].id, 2);
        assert_eq!(second[1].site_name, "Camp1");
    }
}
