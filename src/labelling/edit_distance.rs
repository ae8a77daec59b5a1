//! Label clusters whose items are spelled almost the same.

use std::collections::HashMap;

use edit_distance::edit_distance;

use super::{LabelStrategy, StrategyKind};

/// Mean Levenshtein distance over all unordered pairs; `0.0` below two items.
pub fn mean_pairwise_distance(items: &[String]) -> f64 {
    if items.len() < 2 {
        return 0.0;
    }
    let mut total = 0usize;
    let mut pairs = 0usize;
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            total += edit_distance(a, b);
            pairs += 1;
        }
    }
    total as f64 / pairs as f64
}

/// Accepts clusters whose mean pairwise edit distance is at most the
/// threshold and labels them with their most frequent item.
#[derive(Debug, Clone)]
pub struct EditDistance {
    threshold: f64,
}

impl EditDistance {
    /// Strategy with the given `lev_threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl LabelStrategy for EditDistance {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EditDistance
    }

    fn propose(&self, cluster: &[String]) -> Option<String> {
        if cluster.is_empty() || mean_pairwise_distance(cluster) > self.threshold {
            return None;
        }
        most_frequent(cluster)
    }
}

/// Most frequent item; ties go to the item seen first.
fn most_frequent(items: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for item in items {
        let count = counts[item.as_str()];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((item.as_str(), count));
        }
    }
    best.map(|(item, _)| item.to_string())
}
