//! Label clusters with the closest WordNet ancestor shared by their nouns.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::wordnet::WordNet;
use super::{label_in_parallel, LabelStrategy, StrategyKind, StrategyOutcome};
use crate::clustering::Cluster;

/// Hypernym strategy.
///
/// Each item contributes its last whitespace token that WordNet knows as a
/// noun. The label is the shared ancestor with the smallest summed distance
/// over the distinct nouns; ties are broken alphabetically.
pub struct Hypernyms {
    wordnet: Option<Arc<WordNet>>,
    stoppers: HashSet<String>,
    warned: AtomicBool,
}

impl Hypernyms {
    /// Strategy over an optional WordNet with the given stop labels.
    pub fn new(wordnet: Option<Arc<WordNet>>, stoppers: &[String]) -> Self {
        Self {
            wordnet,
            stoppers: stoppers.iter().map(|s| s.to_lowercase()).collect(),
            warned: AtomicBool::new(false),
        }
    }

    /// The noun WordNet would use for `item`, if any.
    pub fn noun_of<'a>(wordnet: &WordNet, item: &'a str) -> Option<&'a str> {
        item.split_whitespace()
            .rev()
            .find(|token| !wordnet.synsets(token).is_empty())
    }

    /// Best common ancestor name before stopper filtering.
    pub fn common_ancestor(wordnet: &WordNet, cluster: &[String]) -> Option<String> {
        let mut nouns: Vec<&str> = Vec::new();
        for item in cluster {
            let noun = Self::noun_of(wordnet, item)?;
            if !nouns.contains(&noun) {
                nouns.push(noun);
            }
        }

        let mut common: Option<HashMap<String, usize>> = None;
        for noun in nouns {
            let senses = wordnet.synsets(noun);
            let mut starts = senses.clone();
            for sense in &senses {
                starts.extend_from_slice(wordnet.hypernyms(*sense));
            }
            let distances = wordnet.ancestor_distances(&starts);

            common = Some(match common {
                None => distances,
                Some(mut totals) => {
                    totals.retain(|name, _| distances.contains_key(name));
                    for (name, total) in totals.iter_mut() {
                        *total += distances[name];
                    }
                    totals
                }
            });
        }

        common?
            .into_iter()
            .min_by(|(a_name, a_total), (b_name, b_total)| {
                a_total.cmp(b_total).then_with(|| a_name.cmp(b_name))
            })
            .map(|(name, _)| name.replace('_', " "))
    }
}

impl LabelStrategy for Hypernyms {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hypernyms
    }

    fn propose(&self, cluster: &[String]) -> Option<String> {
        let wordnet = self.wordnet.as_deref()?;
        let label = Self::common_ancestor(wordnet, cluster)?;
        (!self.stoppers.contains(&label)).then_some(label)
    }

    fn label(&self, clusters: Vec<Cluster>) -> StrategyOutcome {
        if self.wordnet.is_none() {
            if !self.warned.swap(true, Ordering::Relaxed) {
                warn!("No WordNet directory configured; hypernym labelling is disabled");
            }
            return StrategyOutcome {
                accepted: Vec::new(),
                rejected: clusters,
            };
        }
        label_in_parallel(self, clusters)
    }
}
