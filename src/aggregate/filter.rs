use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ingest::Record;

/// Independent predicates, ANDed. Unset or empty predicates always pass.
/// Categorical predicates compare exactly; `search` is a case-insensitive
/// substring match over site name and notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub region: Option<String>,
    pub district: Option<String>,
    pub owner: Option<String>,
    pub result: Option<String>,
    pub reason: Option<String>,
    pub search: Option<String>,
}

fn active(pred: &Option<String>) -> Option<&str> {
    pred.as_deref().filter(|v| !v.is_empty())
}

fn equals(pred: &Option<String>, value: Option<&str>) -> bool {
    match active(pred) {
        None => true,
        Some(want) => value == Some(want),
    }
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        [
            &self.region,
            &self.district,
            &self.owner,
            &self.result,
            &self.reason,
            &self.search,
        ]
        .into_iter()
        .all(|p| active(p).is_none())
    }

    pub fn matches(&self, record: &Record) -> bool {
        equals(&self.region, record.region_wide.as_deref())
            && equals(&self.district, record.region_detail.as_deref())
            && equals(&self.owner, record.contact_owner.as_deref())
            && equals(&self.result, record.result.as_deref())
            && equals(&self.reason, record.reason.as_deref())
            && self.matches_search(record)
    }

    fn matches_search(&self, record: &Record) -> bool {
        let needle = match active(&self.search) {
            None => return true,
            Some(s) => s.to_lowercase(),
        };
        record.site_name.to_lowercase().contains(&needle)
            || record
                .notes
                .as_deref()
                .map_or(false, |n| n.to_lowercase().contains(&needle))
    }

    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Distinct values present in the unfiltered data, for filter drop-downs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub districts: Vec<String>,
    pub owners: Vec<String>,
    pub results: Vec<String>,
    pub reasons: Vec<String>,
}

pub fn filter_options(records: &[Record]) -> FilterOptions {
    let distinct = |get: fn(&Record) -> Option<&str>| -> Vec<String> {
        records
            .iter()
            .filter_map(get)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };
    FilterOptions {
        regions: distinct(|r| r.region_wide.as_deref()),
        districts: distinct(|r| r.region_detail.as_deref()),
        owners: distinct(|r| r.contact_owner.as_deref()),
        results: distinct(|r| r.result.as_deref()),
        reasons: distinct(|r| r.reason.as_deref()),
    }
}
