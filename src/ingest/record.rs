// src/ingest/record.rs

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// The fixed set of fields the dashboard logic depends on, independent of
/// whatever the sheet happens to call its columns this month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    SiteName,
    RegionWide,
    RegionDetail,
    ContactOwner,
    ContactDate,
    Result,
    Reason,
    Notes,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::SiteName,
        CanonicalField::RegionWide,
        CanonicalField::RegionDetail,
        CanonicalField::ContactOwner,
        CanonicalField::ContactDate,
        CanonicalField::Result,
        CanonicalField::Reason,
        CanonicalField::Notes,
    ];

    /// Key used when a record is serialized.
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::SiteName => "siteName",
            CanonicalField::RegionWide => "regionWide",
            CanonicalField::RegionDetail => "regionDetail",
            CanonicalField::ContactOwner => "contactOwner",
            CanonicalField::ContactDate => "contactDate",
            CanonicalField::Result => "result",
            CanonicalField::Reason => "reason",
            CanonicalField::Notes => "notes",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        CanonicalField::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One site's outreach status, normalized from a single sheet row.
///
/// `id` is the 1-based position within the post-header slice of the fetch
/// that produced it and is meaningless across fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: usize,
    pub site_name: String,
    pub region_wide: Option<String>,
    pub region_detail: Option<String>,
    pub contact_owner: Option<String>,
    pub contact_date: Option<String>,
    pub result: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Every labelled cell of the source row, keyed by its header text, in
    /// column order.
    pub extra: Vec<(String, String)>,
}

impl Record {
    pub fn new(id: usize, site_name: impl Into<String>) -> Self {
        Self {
            id,
            site_name: site_name.into(),
            region_wide: None,
            region_detail: None,
            contact_owner: None,
            contact_date: None,
            result: None,
            reason: None,
            notes: None,
            extra: Vec::new(),
        }
    }

    /// Canonical value for `field`; `SiteName` is always present.
    pub fn field(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::SiteName => Some(self.site_name.as_str()),
            CanonicalField::RegionWide => self.region_wide.as_deref(),
            CanonicalField::RegionDetail => self.region_detail.as_deref(),
            CanonicalField::ContactOwner => self.contact_owner.as_deref(),
            CanonicalField::ContactDate => self.contact_date.as_deref(),
            CanonicalField::Result => self.result.as_deref(),
            CanonicalField::Reason => self.reason.as_deref(),
            CanonicalField::Notes => self.notes.as_deref(),
        }
    }

    pub(crate) fn set_field(&mut self, field: CanonicalField, value: String) {
        match field {
            CanonicalField::SiteName => self.site_name = value,
            CanonicalField::RegionWide => self.region_wide = Some(value),
            CanonicalField::RegionDetail => self.region_detail = Some(value),
            CanonicalField::ContactOwner => self.contact_owner = Some(value),
            CanonicalField::ContactDate => self.contact_date = Some(value),
            CanonicalField::Result => self.result = Some(value),
            CanonicalField::Reason => self.reason = Some(value),
            CanonicalField::Notes => self.notes = Some(value),
        }
    }

    /// Lookup by key: canonical keys win over raw header labels.
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(field) = CanonicalField::from_key(key) {
            if let Some(v) = self.field(field) {
                return Some(v);
            }
        }
        self.extra
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// ContactDate parsed from the handful of formats the sheet has used.
    pub fn contact_date_parsed(&self) -> Option<NaiveDate> {
        let raw = self.contact_date.as_deref()?.trim();
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact.trim_end_matches('.');
        ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(compact, fmt).ok())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;

        // raw labels first; a label that collides with a canonical key or
        // repeats later in the row is shadowed
        for (i, (key, value)) in self.extra.iter().enumerate() {
            if key == "id" || CanonicalField::from_key(key).is_some() {
                continue;
            }
            if self.extra[i + 1..].iter().any(|(k, _)| k == key) {
                continue;
            }
            map.serialize_entry(key, value)?;
        }

        for field in CanonicalField::ALL {
            if let Some(value) = self.field(field) {
                map.serialize_entry(field.key(), value)?;
            }
        }
        map.end()
    }
}
