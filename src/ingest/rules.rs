// src/ingest/rules.rs
//
// Header keywords, synonyms and fallback indices. The sheet's layout has
// drifted several times, so all of this is configuration rather than code.

use serde::{Deserialize, Serialize};

use super::record::CanonicalField;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A cell that identifies the header row on its own, whatever else the row holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMarker {
    pub column: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderRules {
    pub keywords: Vec<String>,
    pub min_keyword_matches: usize,
    /// Leading title/banner rows that can never be the header.
    pub min_offset: usize,
    /// Only rows with an absolute index below this are candidates.
    pub scan_rows: usize,
    pub site_marker: Option<SiteMarker>,
}

impl Default for HeaderRules {
    fn default() -> Self {
        Self {
            keywords: strings(&[
                "지역", "컨택", "결과", "사유", "담당", "캠핑장", "region", "contact", "result",
                "reason", "owner", "site",
            ]),
            min_keyword_matches: 3,
            min_offset: 0,
            scan_rows: 10,
            site_marker: Some(SiteMarker {
                column: 1,
                label: "캠핑장명".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub default_index: Option<usize>,
}

impl FieldRule {
    fn new(default_index: usize, synonyms: &[&str]) -> Self {
        Self {
            synonyms: strings(synonyms),
            default_index: Some(default_index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRules {
    pub site_name: FieldRule,
    pub region_wide: FieldRule,
    pub region_detail: FieldRule,
    pub contact_owner: FieldRule,
    pub contact_date: FieldRule,
    pub result: FieldRule,
    pub reason: FieldRule,
    pub notes: FieldRule,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            site_name: FieldRule::new(1, &["캠핑장", "업체명", "상호", "site", "campground"]),
            region_wide: FieldRule::new(2, &["광역", "시/도", "시도", "region", "province"]),
            region_detail: FieldRule::new(
                3,
                &["시/군", "시군", "구군", "district", "city", "county"],
            ),
            contact_owner: FieldRule::new(8, &["담당", "md", "owner", "manager"]),
            contact_date: FieldRule::new(9, &["컨택일", "연락일", "일자", "date"]),
            result: FieldRule::new(10, &["결과", "result", "status"]),
            reason: FieldRule::new(11, &["사유", "reason"]),
            notes: FieldRule::new(12, &["비고", "메모", "특이사항", "note", "memo", "comment"]),
        }
    }
}

impl ColumnRules {
    pub fn get(&self, field: CanonicalField) -> &FieldRule {
        match field {
            CanonicalField::SiteName => &self.site_name,
            CanonicalField::RegionWide => &self.region_wide,
            CanonicalField::RegionDetail => &self.region_detail,
            CanonicalField::ContactOwner => &self.contact_owner,
            CanonicalField::ContactDate => &self.contact_date,
            CanonicalField::Result => &self.result,
            CanonicalField::Reason => &self.reason,
            CanonicalField::Notes => &self.notes,
        }
    }

    pub fn get_mut(&mut self, field: CanonicalField) -> &mut FieldRule {
        match field {
            CanonicalField::SiteName => &mut self.site_name,
            CanonicalField::RegionWide => &mut self.region_wide,
            CanonicalField::RegionDetail => &mut self.region_detail,
            CanonicalField::ContactOwner => &mut self.contact_owner,
            CanonicalField::ContactDate => &mut self.contact_date,
            CanonicalField::Result => &mut self.result,
            CanonicalField::Reason => &mut self.reason,
            CanonicalField::Notes => &mut self.notes,
        }
    }
}

/// Everything `ingest` needs besides the table itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestRules {
    pub header: HeaderRules,
    pub columns: ColumnRules,
}
