// src/aggregate/group.rs

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Group key for records that lack the dimension being grouped.
pub const UNSPECIFIED: &str = "미지정";

/// `value` rounded half away from zero to one decimal, e.g. `"66.7"`.
pub fn one_decimal(value: f64) -> String {
    format!("{:.1}", (value * 10.0).round() / 10.0)
}

/// `part / whole * 100` to one decimal; `"0.0"` when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return one_decimal(0.0);
    }
    one_decimal(part as f64 / whole as f64 * 100.0)
}

/// Counter whose iteration order is first-seen key order.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, usize)>,
}

impl<K: Eq + Hash + Clone> Default for Tally<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: K, n: usize) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += n,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, n));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Entries by descending count; equal counts keep first-seen order.
    pub fn into_sorted(self) -> Vec<(K, usize)> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
    /// Share of the grouped population, one decimal.
    pub percent: String,
}

/// Sorted `GroupCount`s, with percentages against the tally's own total.
pub fn group_counts(tally: Tally<String>) -> Vec<GroupCount> {
    let whole = tally.total();
    tally
        .into_sorted()
        .into_iter()
        .map(|(name, count)| GroupCount {
            percent: percent(count, whole),
            name,
            count,
        })
        .collect()
}

/// Trimmed value, or the sentinel when absent or blank.
pub fn key_or_unspecified(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNSPECIFIED)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(one_decimal(6.25), "6.3");
        assert_eq!(one_decimal(66.666), "66.7");
        assert_eq!(one_decimal(0.0), "0.0");
        assert_eq!(percent(1, 3), "33.3");
        assert_eq!(percent(2, 3), "66.7");
        assert_eq!(percent(0, 0), "0.0");
        assert_eq!(percent(5, 5), "100.0");
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let mut t = Tally::new();
        for k in ["b", "a", "c", "a", "c", "d"] {
            t.add(k.to_string());
        }
        let sorted: Vec<(String, usize)> = t.into_sorted();
        let names: Vec<&str> = sorted.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["a", "c", "b", "d"]);
    }

    #[test]
    fn group_counts_carry_percentages() {
        let mut t = Tally::new();
        t.add_n("서울".to_string(), 3);
        t.add("부산".to_string());
        let groups = group_counts(t);
        assert_eq!(groups[0].percent, "75.0");
        assert_eq!(groups[1].percent, "25.0");
    }

    #[test]
    fn blank_values_fold_into_sentinel() {
        assert_eq!(key_or_unspecified(None), UNSPECIFIED);
        assert_eq!(key_or_unspecified(Some("  ")), UNSPECIFIED);
        assert_eq!(key_or_unspecified(Some(" 강원 ")), "강원");
    }
}
