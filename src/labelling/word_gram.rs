//! Label clusters by their most characteristic word combination.

use indexmap::IndexMap;
use unicode_segmentation::UnicodeSegmentation;

use super::{gram_score, LabelStrategy, StrategyKind};

/// Shortest longest-token length for an item to be scorable.
const MIN_TOKEN_CHARS: usize = 3;

/// Word tokens of an item: Unicode word-boundary segments without whitespace.
pub fn tokenize(item: &str) -> Vec<&str> {
    item.split_word_bounds()
        .filter(|segment| !segment.trim().is_empty())
        .collect()
}

/// Every order-preserving combination of `tokens`, shortest first and
/// lexicographic by position within each length.
fn combinations<'a>(tokens: &[&'a str]) -> Vec<Vec<&'a str>> {
    let n = tokens.len();
    let mut all = Vec::new();
    for k in 1..=n {
        let mut indices: Vec<usize> = (0..k).collect();
        loop {
            all.push(indices.iter().map(|&i| tokens[i]).collect());

            let Some(pos) = (0..k).rev().find(|&i| indices[i] != i + n - k) else {
                break;
            };
            indices[pos] += 1;
            for j in pos + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
        }
    }
    all
}

/// Accepts a cluster when its best word combination scores above
/// `threshold` per item.
#[derive(Debug, Clone)]
pub struct WordGram {
    threshold: f64,
    max_tokens: usize,
}

impl WordGram {
    /// Strategy with `wg_threshold` and the per-item token cap.
    pub fn new(threshold: f64, max_tokens: usize) -> Self {
        Self {
            threshold,
            max_tokens: max_tokens.max(1),
        }
    }

    /// Best combination and its per-item statistic, or `None` if any item
    /// is unscorable.
    pub fn best_gram(&self, cluster: &[String]) -> Option<(String, f64)> {
        if cluster.is_empty() {
            return None;
        }

        let mut counts: IndexMap<String, (usize, usize)> = IndexMap::new();
        for item in cluster {
            let mut tokens = tokenize(item);
            let longest = tokens.iter().map(|t| t.chars().count()).max()?;
            if longest < MIN_TOKEN_CHARS {
                return None;
            }
            tokens.truncate(self.max_tokens);
            for gram in combinations(&tokens) {
                let entry = counts.entry(gram.join(" ")).or_insert((0, gram.len()));
                entry.0 += 1;
            }
        }

        let mut best: Option<(&String, f64)> = None;
        for (gram, &(count, length)) in &counts {
            let score = gram_score(count, length);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((gram, score));
            }
        }
        best.map(|(gram, score)| (gram.clone(), score / cluster.len() as f64))
    }
}

impl LabelStrategy for WordGram {
    fn kind(&self) -> StrategyKind {
        StrategyKind::WordGram
    }

    fn propose(&self, cluster: &[String]) -> Option<String> {
        let (gram, statistic) = self.best_gram(cluster)?;
        (statistic > self.threshold).then_some(gram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cluster(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenizer_keeps_punctuation_drops_spaces() {
        assert_eq!(tokenize("fish, chips"), vec!["fish", ",", "chips"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn combinations_follow_position_order() {
        let combos = combinations(&["a", "b", "c"]);
        let joined: Vec<String> = combos.iter().map(|c| c.join(" ")).collect();
        assert_eq!(joined, vec!["a", "b", "c", "a b", "a c", "b c", "a b c"]);
    }

    #[test]
    fn statistic_boundary_is_exclusive() {
        let items = cluster(&["apple pie", "apple tart"]);
        let (gram, statistic) = WordGram::new(0.0, 12).best_gram(&items).unwrap();
        assert_eq!(gram, "apple");
        assert_relative_eq!(statistic, 2.0);

        assert_eq!(WordGram::new(2.0, 12).propose(&items), None);
        assert_eq!(
            WordGram::new(1.99, 12).propose(&items),
            Some("apple".to_string())
        );
    }

    #[test]
    fn longer_shared_phrases_win() {
        let items = cluster(&["frozen cheese pizza", "frozen pepperoni pizza", "frozen pizza"]);
        let (gram, _) = WordGram::new(0.0, 12).best_gram(&items).unwrap();
        assert_eq!(gram, "frozen pizza");
    }

    #[test]
    fn short_token_items_reject_the_cluster() {
        let strategy = WordGram::new(0.0, 12);
        assert_eq!(strategy.propose(&cluster(&["apple pie", "a b"])), None);
        assert_eq!(strategy.propose(&cluster(&["apple pie", ""])), None);
    }

    #[test]
    fn token_cap_limits_enumeration() {
        let long_item = (0..30).map(|i| format!("tok{i}")).collect::<Vec<_>>().join(" ");
        let items = vec![long_item.clone(), long_item];
        let (gram, _) = WordGram::new(0.0, 4).best_gram(&items).unwrap();
        assert_eq!(gram, "tok0 tok1 tok2 tok3");
    }
}
