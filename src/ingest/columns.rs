// src/ingest/columns.rs

use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::header::normalize_label;
use super::record::CanonicalField;
use super::rules::ColumnRules;

/// Where each canonical field lives for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Resolved column per field; `None` when neither a header nor a free
    /// default column is available.
    resolved: BTreeMap<CanonicalField, Option<usize>>,
    /// Positional fallback per field, read when the resolved cell is empty.
    fallbacks: BTreeMap<CanonicalField, Option<usize>>,
}

impl ColumnMapping {
    /// Build the mapping from the header row.
    ///
    /// A field takes the first header whose normalized text contains one of
    /// its synonyms. Without a match it takes its default index, unless
    /// another field matched that column by header.
    pub fn build(headers: &[String], rules: &ColumnRules) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_label(h)).collect();

        let mut matched: BTreeMap<CanonicalField, usize> = BTreeMap::new();
        for field in CanonicalField::ALL {
            let synonyms: Vec<String> = rules
                .get(field)
                .synonyms
                .iter()
                .map(|s| normalize_label(s))
                .filter(|s| !s.is_empty())
                .collect();
            let hit = normalized
                .iter()
                .position(|h| synonyms.iter().any(|syn| h.contains(syn.as_str())));
            if let Some(idx) = hit {
                debug!(%field, column = idx, header = %headers[idx], "matched by header");
                matched.insert(field, idx);
            }
        }

        let claimed_by_other = |field: CanonicalField, idx: usize| {
            matched.iter().any(|(&f, &taken)| f != field && taken == idx)
        };

        let mut resolved = BTreeMap::new();
        let mut fallbacks = BTreeMap::new();
        for field in CanonicalField::ALL {
            let default_index = rules.get(field).default_index;

            // a blank site name must drop the row, never borrow another cell
            let fallback = default_index.filter(|&idx| {
                field != CanonicalField::SiteName && !claimed_by_other(field, idx)
            });
            fallbacks.insert(field, fallback);

            let column = match matched.get(&field) {
                Some(&idx) => Some(idx),
                None => match default_index {
                    Some(idx) if claimed_by_other(field, idx) => {
                        warn!(
                            %field,
                            column = idx,
                            "default column already claimed; field unmapped"
                        );
                        None
                    }
                    Some(idx) => {
                        debug!(%field, column = idx, "no header match; using default column");
                        Some(idx)
                    }
                    None => None,
                },
            };
            resolved.insert(field, column);
        }

        Self {
            resolved,
            fallbacks,
        }
    }

    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.resolved.get(&field).copied().flatten()
    }

    pub fn fallback_column(&self, field: CanonicalField) -> Option<usize> {
        self.fallbacks.get(&field).copied().flatten()
    }

    /// Value of `field` in `row`: the mapped cell, or the cell at the
    /// field's default position when the mapped one is blank.
    pub fn resolve<'a>(&self, field: CanonicalField, row: &'a [String]) -> Option<&'a str> {
        let cell = |idx: usize| {
            row.get(idx)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
        };
        self.column(field)
            .and_then(cell)
            .or_else(|| self.fallback_column(field).and_then(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn maps_current_korean_layout() {
        let h = headers(&[
            "No",
            "캠핑장명",
            "지역(광역)",
            "지역(시/군/구)",
            "주소",
            "연락처",
            "홈페이지",
            "컨택일",
            "컨택 MD",
            "비고",
            "컨택 결과",
            "사유",
        ]);
        let m = ColumnMapping::build(&h, &ColumnRules::default());
        assert_eq!(m.column(CanonicalField::SiteName), Some(1));
        assert_eq!(m.column(CanonicalField::RegionWide), Some(2));
        assert_eq!(m.column(CanonicalField::RegionDetail), Some(3));
        assert_eq!(m.column(CanonicalField::ContactDate), Some(7));
        assert_eq!(m.column(CanonicalField::ContactOwner), Some(8));
        assert_eq!(m.column(CanonicalField::Notes), Some(9));
        assert_eq!(m.column(CanonicalField::Result), Some(10));
        assert_eq!(m.column(CanonicalField::Reason), Some(11));
    }

    #[test]
    fn maps_older_layout_with_different_order() {
        let h = headers(&["캠핑장 이름", "시도", "시군", "담당자", "결과", "메모"]);
        let m = ColumnMapping::build(&h, &ColumnRules::default());
        assert_eq!(m.column(CanonicalField::SiteName), Some(0));
        assert_eq!(m.column(CanonicalField::RegionWide), Some(1));
        assert_eq!(m.column(CanonicalField::RegionDetail), Some(2));
        assert_eq!(m.column(CanonicalField::ContactOwner), Some(3));
        assert_eq!(m.column(CanonicalField::Result), Some(4));
        assert_eq!(m.column(CanonicalField::Notes), Some(5));
        // no header for reason; default 11 is free
        assert_eq!(m.column(CanonicalField::Reason), Some(11));
    }

    #[test]
    fn matching_ignores_case_and_spaces() {
        let h = headers(&["SITE NAME", "Re gion", "Contact Owner"]);
        let m = ColumnMapping::build(&h, &ColumnRules::default());
        assert_eq!(m.column(CanonicalField::SiteName), Some(0));
        assert_eq!(m.column(CanonicalField::RegionWide), Some(1));
        assert_eq!(m.column(CanonicalField::ContactOwner), Some(2));
    }

    #[test]
    fn default_yields_to_header_claimed_column() {
        // RegionDetail has no header and defaults to 3, which Result claimed
        let h = headers(&["SiteA", "RegionA", "Owner1", "Result1"]);
        let m = ColumnMapping::build(&h, &ColumnRules::default());
        assert_eq!(m.column(CanonicalField::Result), Some(3));
        assert_eq!(m.column(CanonicalField::RegionDetail), None);
        assert_eq!(m.column(CanonicalField::ContactDate), Some(9));
    }

    #[test]
    fn resolve_falls_back_to_default_position() {
        let mut rules = ColumnRules::default();
        rules.result.default_index = Some(3);
        let h = headers(&["site", "결과", "", ""]);
        let m = ColumnMapping::build(&h, &rules);
        assert_eq!(m.column(CanonicalField::Result), Some(1));

        let row = headers(&["Camp", "", "", "거절"]);
        assert_eq!(m.resolve(CanonicalField::Result, &row), Some("거절"));

        let row = headers(&["Camp", "입점(신규)", "", "거절"]);
        assert_eq!(m.resolve(CanonicalField::Result, &row), Some("입점(신규)"));
    }

    #[test]
    fn site_name_and_claimed_columns_never_fall_back() {
        let h = headers(&["site", "region", "owner", "result"]);
        let m = ColumnMapping::build(&h, &ColumnRules::default());
        // SiteName defaults to 1, which holds the region
        let row = headers(&["", "Seoul", "Kim", "ok"]);
        assert_eq!(m.resolve(CanonicalField::SiteName, &row), None);
        assert_eq!(m.fallback_column(CanonicalField::SiteName), None);
        // RegionDetail defaults to 3, which holds the result
        assert_eq!(m.fallback_column(CanonicalField::RegionDetail), None);
        assert_eq!(m.resolve(CanonicalField::RegionDetail, &row), None);
    }
}
