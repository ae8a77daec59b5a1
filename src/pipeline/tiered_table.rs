//! The tiered label table carried across iterations.
//!
//! One row per distinct original description. `current_labels` holds each
//! row's latest label; every iteration freezes the pre-merge labels into a
//! `tier_<k>` column before applying new ones. Rows relabelled by an
//! accepted cluster can be settled, after which a later cluster whose word
//! happens to equal their label no longer moves them.

use std::collections::HashMap;
use std::path::Path;

use crate::core::loader::LoadedWords;
use crate::io::csv_io::{write_frame, Frame};
use crate::core::errors::Result;

/// Terminal label: rows carrying it are never relabelled or re-clustered.
pub const SKIPPED: &str = "SKIPPED";

/// Column holding the original descriptions.
pub const ORIGINAL_COLUMN: &str = "original";
/// Column holding the latest labels.
pub const CURRENT_COLUMN: &str = "current_labels";

/// Name of the column frozen at tier `k`.
pub fn tier_column(tier: u32) -> String {
    format!("tier_{tier}")
}

/// Label history for every original description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieredTable {
    originals: Vec<String>,
    tiers: Vec<(u32, Vec<Option<String>>)>,
    current: Vec<Option<String>>,
    settled: Vec<bool>,
}

impl TieredTable {
    /// Start a table from loaded words; empty cleaned words get a null label.
    pub fn from_loaded(loaded: &LoadedWords) -> Self {
        let (originals, current): (Vec<_>, Vec<_>) = loaded
            .lookup
            .iter()
            .map(|(original, word)| {
                let label = (!word.is_empty()).then(|| word.clone());
                (original.clone(), label)
            })
            .unzip();
        Self {
            settled: vec![false; originals.len()],
            originals,
            tiers: Vec::new(),
            current,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Original descriptions, row order.
    pub fn originals(&self) -> &[String] {
        &self.originals
    }

    /// Latest labels, row order.
    pub fn current_labels(&self) -> &[Option<String>] {
        &self.current
    }

    /// Tier numbers in the order their columns were added.
    pub fn tier_numbers(&self) -> Vec<u32> {
        self.tiers.iter().map(|(tier, _)| *tier).collect()
    }

    /// A frozen tier column.
    pub fn tier(&self, tier: u32) -> Option<&[Option<String>]> {
        self.tiers
            .iter()
            .find(|(k, _)| *k == tier)
            .map(|(_, column)| column.as_slice())
    }

    /// Copy the current labels into a new `tier_<k>` column.
    pub fn freeze_tier(&mut self, tier: u32) {
        self.tiers.push((tier, self.current.clone()));
    }

    /// Relabel every unsettled row whose current label is a key of `mapping`.
    ///
    /// Null and [`SKIPPED`] rows are left alone, as are empty target labels.
    /// With `settle`, every matched row is settled, including rows whose
    /// label did not change. Returns the number of rows whose label changed.
    pub fn apply_labels(&mut self, mapping: &HashMap<String, String>, settle: bool) -> usize {
        let mut changed = 0;
        for (slot, settled) in self.current.iter_mut().zip(self.settled.iter_mut()) {
            if *settled {
                continue;
            }
            let Some(label) = slot.as_ref() else {
                continue;
            };
            if label == SKIPPED {
                continue;
            }
            let Some(target) = mapping.get(label) else {
                continue;
            };
            if target.is_empty() {
                continue;
            }
            if target != label {
                *slot = Some(target.clone());
                changed += 1;
            }
            *settled = settle;
        }
        changed
    }

    /// Whether `row` was settled by an accepted cluster.
    pub fn is_settled(&self, row: usize) -> bool {
        self.settled.get(row).copied().unwrap_or(false)
    }

    /// Distinct non-null, non-[`SKIPPED`] current labels in row order.
    pub fn distinct_labels(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.current
            .iter()
            .flatten()
            .filter(|label| label.as_str() != SKIPPED)
            .filter(|label| seen.insert(label.as_str()))
            .cloned()
            .collect()
    }

    /// How many rows carry each current label.
    pub fn label_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for label in self.current.iter().flatten() {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows whose current label equals `label`.
    pub fn rows_with_label(&self, label: &str) -> Vec<usize> {
        self.current
            .iter()
            .enumerate()
            .filter(|(_, current)| current.as_deref() == Some(label))
            .map(|(row, _)| row)
            .collect()
    }

    /// Unsettled rows whose current label equals `label`.
    pub fn open_rows_with_label(&self, label: &str) -> Vec<usize> {
        self.rows_with_label(label)
            .into_iter()
            .filter(|row| !self.settled[*row])
            .collect()
    }

    /// `original, tier_…, current_labels` as a [`Frame`].
    pub fn to_frame(&self) -> Frame {
        let mut headers = vec![ORIGINAL_COLUMN.to_string()];
        headers.extend(self.tiers.iter().map(|(tier, _)| tier_column(*tier)));
        headers.push(CURRENT_COLUMN.to_string());

        let rows = (0..self.len())
            .map(|row| {
                let mut cells = Vec::with_capacity(headers.len());
                cells.push(Some(self.originals[row].clone()));
                cells.extend(self.tiers.iter().map(|(_, column)| column[row].clone()));
                cells.push(self.current[row].clone());
                cells
            })
            .collect();
        Frame { headers, rows }
    }

    /// Write the table to CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_frame(path, &self.to_frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OptimusConfig;
    use crate::core::loader::{load, CleaningRules, InputData};

    fn table(items: &[&str]) -> TieredTable {
        let rules = CleaningRules::from_config(&OptimusConfig::default()).unwrap();
        let loaded = load(&InputData::from(items.to_vec()), &rules).unwrap();
        TieredTable::from_loaded(&loaded)
    }

    fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn rows_follow_distinct_originals() {
        let table = table(&["Tea", "tea!", "Tea", "42"]);
        assert_eq!(table.originals(), ["Tea", "tea!", "42"]);
        assert_eq!(
            table.current_labels(),
            [Some("tea".to_string()), Some("tea".to_string()), None]
        );
    }

    #[test]
    fn frozen_tier_keeps_pre_merge_labels() {
        let mut table = table(&["a", "b"]);
        table.freeze_tier(1);
        let changed = table.apply_labels(&mapping(&[("a", "X")]), true);

        assert_eq!(changed, 1);
        assert_eq!(
            table.current_labels(),
            [Some("X".to_string()), Some("b".to_string())]
        );
        assert_eq!(
            table.tier(1).unwrap(),
            [Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[test]
    fn skipped_and_null_rows_are_never_relabelled() {
        let mut table = table(&["a", "123"]);
        table.current[0] = Some(SKIPPED.to_string());
        let changed = table.apply_labels(&mapping(&[(SKIPPED, "X"), ("a", "Y")]), true);
        assert_eq!(changed, 0);
        assert_eq!(table.current_labels()[1], None);
    }

    #[test]
    fn empty_target_labels_are_ignored() {
        let mut table = table(&["a"]);
        assert_eq!(table.apply_labels(&mapping(&[("a", "")]), true), 0);
        assert_eq!(table.current_labels()[0].as_deref(), Some("a"));
    }

    #[test]
    fn settled_rows_ignore_later_labels_for_the_same_word() {
        let mut table = table(&["Green tea", "Black tea", "Tea"]);
        table.apply_labels(&mapping(&[("green tea", "tea"), ("black tea", "tea")]), true);
        assert_eq!(table.rows_with_label("tea"), vec![0, 1, 2]);
        assert_eq!(table.open_rows_with_label("tea"), vec![2]);

        let changed = table.apply_labels(&mapping(&[("tea", "beverage")]), true);
        assert_eq!(changed, 1);
        assert_eq!(
            table.current_labels(),
            [
                Some("tea".to_string()),
                Some("tea".to_string()),
                Some("beverage".to_string())
            ]
        );
        assert!(table.is_settled(2));
    }

    #[test]
    fn unsettled_labels_can_merge_again() {
        let mut table = table(&["Green tea", "Tea"]);
        table.apply_labels(&mapping(&[("green tea", "tea")]), false);
        let changed = table.apply_labels(&mapping(&[("tea", "beverage")]), false);
        assert_eq!(changed, 2);
        assert!(!table.is_settled(0));
    }

    #[test]
    fn frame_has_tier_columns_in_order() {
        let mut table = table(&["a", "b"]);
        table.freeze_tier(1);
        table.freeze_tier(2);
        let frame = table.to_frame();
        assert_eq!(frame.headers, ["original", "tier_1", "tier_2", "current_labels"]);
        assert_eq!(frame.rows.len(), 2);
    }

    #[test]
    fn distinct_labels_skip_terminal_and_null() {
        let mut table = table(&["a", "b", "a!", "9"]);
        table.current[1] = Some(SKIPPED.to_string());
        assert_eq!(table.distinct_labels(), vec!["a".to_string()]);
        assert_eq!(table.label_counts().get("a"), Some(&2));
        assert_eq!(table.rows_with_label("a"), vec![0, 2]);
    }
}
