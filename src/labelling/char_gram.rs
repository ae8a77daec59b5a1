//! Label clusters by a long, frequent shared substring.

use indexmap::IndexMap;

use super::edit_distance::mean_pairwise_distance;
use super::{gram_score, LabelStrategy, StrategyKind};

const MIN_GRAM_CHARS: usize = 3;
const MAX_GRAM_CHARS: usize = 19;

/// Accepts a cluster when its best character n-gram, normalised by the
/// cluster's spelling spread and size, scores above `threshold`.
#[derive(Debug, Clone)]
pub struct CharGram {
    threshold: f64,
}

impl CharGram {
    /// Strategy with the given `ng_threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Top substring and its statistic.
    ///
    /// `None` for clusters with fewer than two items or without any
    /// substring of at least three characters. Identical items give an
    /// infinite statistic.
    pub fn statistic(cluster: &[String]) -> Option<(String, f64)> {
        if cluster.len() < 2 {
            return None;
        }

        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for item in cluster {
            let chars: Vec<char> = item.chars().collect();
            for n in MIN_GRAM_CHARS..=MAX_GRAM_CHARS.min(chars.len()) {
                for window in chars.windows(n) {
                    *counts.entry(window.iter().collect()).or_default() += 1;
                }
            }
        }

        let mut best: Option<(&String, f64)> = None;
        for (gram, &count) in &counts {
            let score = gram_score(count, gram.chars().count());
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((gram, score));
            }
        }
        let (gram, top) = best?;

        let denominator = mean_pairwise_distance(cluster) * (cluster.len() as f64).ln();
        let statistic = if denominator > 0.0 {
            top / denominator
        } else {
            f64::INFINITY
        };
        Some((gram.clone(), statistic))
    }
}

impl LabelStrategy for CharGram {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CharGram
    }

    fn propose(&self, cluster: &[String]) -> Option<String> {
        let (gram, statistic) = Self::statistic(cluster)?;
        if statistic <= self.threshold {
            return None;
        }
        let label = gram.trim();
        (!label.is_empty()).then(|| label.to_string())
    }
}
