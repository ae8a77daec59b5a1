//! Merging accepted labels and deciding whether to iterate again.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tiered_table::{TieredTable, SKIPPED};
use crate::core::config::OptimusConfig;
use crate::labelling::EnsembleOutcome;

/// Float tolerance when comparing the distance against the cutoff.
const CUTOFF_EPSILON: f64 = 1e-9;

/// Iteration state owned by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationState {
    /// Distance threshold for the next cut
    pub distance: f64,
    /// Last tier number written
    pub tier: u32,
    /// Whether another iteration should run
    pub iterate: bool,
}

impl IterationState {
    /// State before the first iteration.
    pub fn initial(config: &OptimusConfig) -> Self {
        Self {
            distance: config.distance,
            tier: config.tier_counter,
            iterate: true,
        }
    }
}

/// What the gatekeeper decided after one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    /// State for the next iteration
    pub state: IterationState,
    /// Words to cluster next; empty when iteration stops
    pub next_words: Vec<String>,
    /// Rows whose label changed in this iteration
    pub relabelled: usize,
}

/// Collects accepted labels into the table and advances the iteration.
#[derive(Debug, Clone, Copy)]
pub struct Gatekeeper<'a> {
    config: &'a OptimusConfig,
}

impl<'a> Gatekeeper<'a> {
    /// Gatekeeper for a run with `config`.
    pub fn new(config: &'a OptimusConfig) -> Self {
        Self { config }
    }

    /// Word → label pairs from every accepted cluster. Empty labels are
    /// dropped; the first label seen for a word wins.
    pub fn accepted_pairs(outcome: &EnsembleOutcome) -> HashMap<String, String> {
        let mut pairs = HashMap::new();
        for proposal in &outcome.accepted {
            if proposal.label.is_empty() {
                continue;
            }
            for word in &proposal.cluster {
                pairs
                    .entry(word.clone())
                    .or_insert_with(|| proposal.label.clone());
            }
        }
        pairs
    }

    /// Apply one iteration's labels and compute the next state.
    pub fn advance(
        &self,
        state: IterationState,
        table: &mut TieredTable,
        outcome: &EnsembleOutcome,
        non_selected: &[String],
    ) -> GateDecision {
        let tier = state.tier + 1;
        let pairs = Self::accepted_pairs(outcome);

        table.freeze_tier(tier);
        let relabelled = table.apply_labels(&pairs, !self.config.regroup_labels);
        info!(
            "Tier {}: {} accepted clusters relabelled {} rows",
            tier,
            outcome.accepted.len(),
            relabelled
        );

        let reached_cutoff = state.distance >= self.config.cutoff - CUTOFF_EPSILON;
        let mut next = IterationState {
            distance: state.distance + self.config.stepsize,
            tier,
            iterate: !reached_cutoff,
        };

        let next_words = if reached_cutoff {
            debug!("Distance {:.3} reached cutoff {:.3}", state.distance, self.config.cutoff);
            Vec::new()
        } else if self.config.regroup_labels {
            table.distinct_labels()
        } else {
            unresolved_words(outcome, non_selected)
        };

        if next.iterate && next_words.len() < 2 {
            info!(
                "Only {} words left to cluster, stopping at tier {}",
                next_words.len(),
                tier
            );
            next.iterate = false;
        }

        GateDecision {
            state: next,
            next_words: if next.iterate { next_words } else { Vec::new() },
            relabelled,
        }
    }
}

/// Words of clusters no strategy accepted, then the non-selected words,
/// deduplicated in that order.
fn unresolved_words(outcome: &EnsembleOutcome, non_selected: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    outcome
        .rejected
        .iter()
        .flatten()
        .chain(non_selected)
        .filter(|word| word.as_str() != SKIPPED)
        .filter(|word| seen.insert(word.as_str()))
        .cloned()
        .collect()
}
