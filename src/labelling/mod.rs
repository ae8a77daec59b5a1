//! Cluster labelling strategies and the sequential rejection chain.
//!
//! Each strategy looks at one cluster at a time and either proposes a label
//! or passes. [`LabellingEnsemble`] runs the strategies in a fixed order and
//! hands every rejected cluster to the next strategy, so an accepted cluster
//! gets exactly one label from the first strategy that accepted it.

pub mod char_gram;
pub mod edit_distance;
pub mod hypernyms;
pub mod word_gram;
pub mod wordnet;

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clustering::Cluster;
use crate::core::config::OptimusConfig;

pub use char_gram::CharGram;
pub use edit_distance::EditDistance;
pub use hypernyms::Hypernyms;
pub use word_gram::WordGram;
pub use wordnet::WordNet;

/// Which strategy produced a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Mean pairwise Levenshtein distance
    EditDistance,
    /// Frequent word combinations
    WordGram,
    /// Frequent character substrings
    CharGram,
    /// Shared WordNet ancestors
    Hypernyms,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EditDistance => "edit_distance",
            Self::WordGram => "word_gram",
            Self::CharGram => "char_gram",
            Self::Hypernyms => "hypernyms",
        };
        f.write_str(name)
    }
}

/// An accepted cluster and its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelProposal {
    /// The labelled cluster
    pub cluster: Cluster,
    /// Proposed label
    pub label: String,
    /// Strategy that accepted the cluster
    pub strategy: StrategyKind,
}

/// Output of one strategy over a batch of clusters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutcome {
    /// Accepted clusters, in input order
    pub accepted: Vec<LabelProposal>,
    /// Rejected clusters, in input order
    pub rejected: Vec<Cluster>,
}

/// A labelling heuristic.
pub trait LabelStrategy: Send + Sync {
    /// Strategy identifier.
    fn kind(&self) -> StrategyKind;

    /// Label for a single cluster, or `None` to reject it.
    fn propose(&self, cluster: &[String]) -> Option<String>;

    /// Score a batch in parallel, preserving cluster order.
    fn label(&self, clusters: Vec<Cluster>) -> StrategyOutcome {
        label_in_parallel(self, clusters)
    }
}

/// Run `strategy.propose` over every cluster with rayon and split the
/// results into accepted and rejected, keeping input order.
pub fn label_in_parallel<S>(strategy: &S, clusters: Vec<Cluster>) -> StrategyOutcome
where
    S: LabelStrategy + ?Sized,
{
    let kind = strategy.kind();
    let decisions: Vec<(Cluster, Option<String>)> = clusters
        .into_par_iter()
        .map(|cluster| {
            let label = strategy.propose(&cluster);
            (cluster, label)
        })
        .collect();

    let mut outcome = StrategyOutcome::default();
    for (cluster, label) in decisions {
        match label {
            Some(label) => outcome.accepted.push(LabelProposal {
                cluster,
                label,
                strategy: kind,
            }),
            None => outcome.rejected.push(cluster),
        }
    }
    outcome
}

/// Result of running the whole chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleOutcome {
    /// Accepted clusters from every strategy, in chain order
    pub accepted: Vec<LabelProposal>,
    /// Clusters no strategy accepted
    pub rejected: Vec<Cluster>,
    /// Accepted count per strategy, in chain order
    pub per_strategy: Vec<(StrategyKind, usize)>,
}

/// Strategies composed as a sequential rejection chain.
pub struct LabellingEnsemble {
    strategies: Vec<Box<dyn LabelStrategy>>,
}

impl LabellingEnsemble {
    /// Chain the given strategies in order.
    pub fn new(strategies: Vec<Box<dyn LabelStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain: EditDistance → WordGram → CharGram → Hypernyms.
    pub fn from_config(config: &OptimusConfig, wordnet: Option<Arc<WordNet>>) -> Self {
        Self::new(vec![
            Box::new(EditDistance::new(config.lev_threshold)),
            Box::new(WordGram::new(config.wg_threshold, config.wg_max_tokens)),
            Box::new(CharGram::new(config.ng_threshold)),
            Box::new(Hypernyms::new(wordnet, &config.stoppers)),
        ])
    }

    /// Strategy order of this chain.
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run every strategy, feeding each one the previous one's rejects.
    pub fn run(&self, clusters: Vec<Cluster>) -> EnsembleOutcome {
        let mut remaining = clusters;
        let mut outcome = EnsembleOutcome::default();

        for strategy in &self.strategies {
            let step = strategy.label(remaining);
            debug!(
                "{} accepted {} clusters, rejected {}",
                strategy.kind(),
                step.accepted.len(),
                step.rejected.len()
            );
            outcome
                .per_strategy
                .push((strategy.kind(), step.accepted.len()));
            outcome.accepted.extend(step.accepted);
            remaining = step.rejected;
        }

        outcome.rejected = remaining;
        outcome
    }
}

/// Score of a candidate that occurs `count` times and has `length` units.
pub(crate) fn gram_score(count: usize, length: usize) -> f64 {
    let count = count as f64;
    count * count * (1.0 + (length as f64).ln())
}
