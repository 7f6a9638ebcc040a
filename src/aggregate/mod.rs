// src/aggregate/mod.rs
//
// Pure view-model derivation: (records, filters) -> AggregateView. Recomputed
// from scratch on every call; nothing here can fail.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod filter;
pub mod group;
pub mod insight;
pub mod ranking;

pub use filter::{filter_options, FilterOptions, FilterState};
pub use group::{GroupCount, Tally, UNSPECIFIED};
pub use insight::{InsightRules, InsightSummary, OutcomeLean};
pub use ranking::{conversion_rate, OwnerRank};

use crate::ingest::Record;
use group::{group_counts, key_or_unspecified};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateRules {
    /// Result value counted as a win.
    pub success_outcome: String,
    /// Result value whose reasons feed the top-N list.
    pub negative_outcome: String,
    pub top_reasons: usize,
    pub incentive_slots: usize,
    pub insight: InsightRules,
}

impl Default for AggregateRules {
    fn default() -> Self {
        Self {
            success_outcome: "입점(신규)".to_string(),
            negative_outcome: "거절".to_string(),
            top_reasons: 10,
            incentive_slots: 2,
            insight: InsightRules::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub total: usize,
    /// Records with a contact owner.
    pub contacts: usize,
    pub success: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictCount {
    pub region: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateView {
    pub kpis: Kpis,
    pub regions: Vec<GroupCount>,
    pub districts: Vec<DistrictCount>,
    pub owners: Vec<GroupCount>,
    pub results: Vec<GroupCount>,
    pub reasons: Vec<GroupCount>,
    pub top_reasons: Vec<GroupCount>,
    pub ranking: Vec<OwnerRank>,
    pub insights: InsightSummary,
}

impl AggregateView {
    pub fn incentive_recipients(&self) -> impl Iterator<Item = &OwnerRank> {
        self.ranking.iter().filter(|r| r.incentive)
    }
}

fn has_value(v: Option<&str>) -> bool {
    v.map_or(false, |s| !s.trim().is_empty())
}

fn is_outcome(record: &Record, outcome: &str) -> bool {
    record.result.as_deref().map(str::trim) == Some(outcome)
}

/// Derive every dashboard view from the records passing `filters`.
pub fn aggregate(
    records: &[Record],
    filters: &FilterState,
    rules: &AggregateRules,
) -> AggregateView {
    let selected = filters.apply(records);
    debug!(records = records.len(), selected = selected.len(), "aggregating");

    let mut regions = Tally::new();
    let mut districts: Tally<(String, String)> = Tally::new();
    let mut owners = Tally::new();
    let mut results = Tally::new();
    let mut reasons = Tally::new();
    let mut rejections = Tally::new();
    let mut kpis = Kpis {
        total: selected.len(),
        ..Kpis::default()
    };

    for record in &selected {
        let region = key_or_unspecified(record.region_wide.as_deref());
        districts.add((
            region.clone(),
            key_or_unspecified(record.region_detail.as_deref()),
        ));
        regions.add(region);
        owners.add(key_or_unspecified(record.contact_owner.as_deref()));
        results.add(key_or_unspecified(record.result.as_deref()));
        reasons.add(key_or_unspecified(record.reason.as_deref()));

        if has_value(record.contact_owner.as_deref()) {
            kpis.contacts += 1;
        }
        if is_outcome(record, &rules.success_outcome) {
            kpis.success += 1;
        }
        if is_outcome(record, &rules.negative_outcome) {
            kpis.negative += 1;
            if let Some(reason) = record.reason.as_deref().map(str::trim) {
                if !reason.is_empty() {
                    rejections.add(reason.to_string());
                }
            }
        }
    }

    let mut top_reasons = group_counts(rejections);
    top_reasons.truncate(rules.top_reasons);

    let districts = districts
        .into_sorted()
        .into_iter()
        .map(|((region, name), count)| DistrictCount {
            region,
            name,
            count,
        })
        .collect();

    let ranking =
        ranking::rank_owners(&selected, &rules.success_outcome, rules.incentive_slots);
    let lean = OutcomeLean::from_counts(kpis.success, kpis.negative);
    let insights = insight::summarize(&selected, lean, &rules.insight);

    AggregateView {
        kpis,
        regions: group_counts(regions),
        districts,
        owners: group_counts(owners),
        results: group_counts(results),
        reasons: group_counts(reasons),
        top_reasons,
        ranking,
        insights,
    }
}
