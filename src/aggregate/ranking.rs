// src/aggregate/ranking.rs

use serde::Serialize;
use std::collections::HashMap;

use super::group::{one_decimal, Tally, UNSPECIFIED};
use crate::ingest::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRank {
    pub rank: usize,
    pub name: String,
    pub contacts: usize,
    pub success: usize,
    /// `success / contacts * 100`, one decimal.
    pub conversion_rate: String,
    /// Top `incentive_slots` owners by success count.
    pub incentive: bool,
}

pub fn conversion_rate(success: usize, contacts: usize) -> String {
    if contacts == 0 {
        return "0.0".to_string();
    }
    one_decimal(success as f64 / contacts as f64 * 100.0)
}

/// Owners ordered by success count, descending; ties keep first-seen order.
/// Ranks are positions (1, 2, 3, ...) even across ties, and exactly the first
/// `incentive_slots` entries are flagged.
pub fn rank_owners(
    records: &[&Record],
    success_outcome: &str,
    incentive_slots: usize,
) -> Vec<OwnerRank> {
    let mut contacts: Tally<String> = Tally::new();
    let mut success: Tally<String> = Tally::new();

    for record in records {
        let owner = match record.contact_owner.as_deref().map(str::trim) {
            Some(o) if !o.is_empty() && o != UNSPECIFIED => o.to_string(),
            _ => continue,
        };
        contacts.add(owner.clone());
        let won = record.result.as_deref().map(str::trim) == Some(success_outcome);
        success.add_n(owner, usize::from(won));
    }

    // `success` saw every owner in the same order as `contacts`
    let totals: HashMap<String, usize> = contacts.into_sorted().into_iter().collect();
    success
        .into_sorted()
        .into_iter()
        .enumerate()
        .map(|(idx, (name, won))| {
            let contacts = totals.get(&name).copied().unwrap_or(0);
            OwnerRank {
                rank: idx + 1,
                conversion_rate: conversion_rate(won, contacts),
                incentive: idx < incentive_slots,
                name,
                contacts,
                success: won,
            }
        })
        .collect()
}
