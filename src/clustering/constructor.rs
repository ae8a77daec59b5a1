//! Flat clusters from a linkage tree cut at a distance threshold.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::linkage::LinkageTree;

/// An ordered group of words produced by one cut.
pub type Cluster = Vec<String>;

/// Result of cutting a linkage tree at one threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterSet {
    /// Working clusters, most recent merge first
    pub clusters: Vec<Cluster>,
    /// Words not in any working cluster, deduplicated
    pub non_selected: Vec<String>,
}

impl ClusterSet {
    /// Total number of words across clusters and `non_selected`.
    pub fn word_count(&self) -> usize {
        self.clusters.iter().map(Vec::len).sum::<usize>() + self.non_selected.len()
    }
}

/// Cuts linkage trees into working clusters.
#[derive(Debug, Clone, Copy)]
pub struct ClusterConstructor {
    threshold: f64,
}

impl ClusterConstructor {
    /// Constructor cutting at `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Cut `tree`, whose leaves are `words` in order.
    ///
    /// Rows merging below the threshold become candidate clusters, the rest
    /// become non-selected groups. Both lists are stripped of groups that are
    /// subsets of a later merge.
    pub fn construct(&self, tree: &LinkageTree, words: &[String]) -> ClusterSet {
        debug_assert_eq!(tree.n_leaves(), words.len());

        let mut selected = Vec::new();
        let mut rejected = Vec::new();
        for (i, row) in tree.rows().iter().enumerate() {
            let Some(leaves) = resolve_leaves(tree, i) else {
                continue;
            };
            let group: Cluster = leaves.into_iter().map(|leaf| words[leaf].clone()).collect();
            if row.distance < self.threshold {
                selected.push(group);
            } else {
                rejected.push(group);
            }
        }

        let clusters = strip(selected);
        let clustered: HashSet<&str> = clusters
            .iter()
            .flat_map(|cluster| cluster.iter().map(String::as_str))
            .collect();

        let mut seen = HashSet::new();
        let non_selected = strip(rejected)
            .into_iter()
            .flatten()
            .chain(words.iter().cloned())
            .filter(|word| !clustered.contains(word.as_str()))
            .filter(|word| seen.insert(word.clone()))
            .collect();

        let set = ClusterSet {
            clusters,
            non_selected,
        };
        debug!(
            "Cut at {:.3}: {} clusters, {} non-selected words",
            self.threshold,
            set.clusters.len(),
            set.non_selected.len()
        );
        set
    }
}

/// Leaves under row `row` in left-to-right order, using an explicit stack.
///
/// Returns `None` for ids pointing past the table; [`LinkageTree`] validation
/// rules those out, so this only fires on a corrupted tree.
fn resolve_leaves(tree: &LinkageTree, row: usize) -> Option<Vec<usize>> {
    let n = tree.n_leaves();
    let rows = tree.rows();
    let mut leaves = Vec::new();
    let mut stack = vec![n + row];

    while let Some(node) = stack.pop() {
        if node < n {
            leaves.push(node);
            continue;
        }
        let Some(merge) = rows.get(node - n) else {
            debug_assert!(false, "linkage node {node} is out of range");
            warn!("Skipping malformed linkage node {}", node);
            return None;
        };
        stack.push(merge.right);
        stack.push(merge.left);
    }
    Some(leaves)
}

/// Walk groups newest first, keeping only those that are not a subset of a
/// group already kept.
fn strip(groups: Vec<Cluster>) -> Vec<Cluster> {
    let mut kept: Vec<(Cluster, HashSet<String>)> = Vec::new();
    for group in groups.into_iter().rev() {
        let members: HashSet<String> = group.iter().cloned().collect();
        if kept.iter().any(|(_, existing)| members.is_subset(existing)) {
            continue;
        }
        kept.push((group, members));
    }
    kept.into_iter().map(|(group, _)| group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::linkage::LinkageRow;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn two_pairs() -> LinkageTree {
        LinkageTree::new(
            4,
            vec![
                LinkageRow::new(0, 1, 0.5, 2),
                LinkageRow::new(2, 3, 0.7, 2),
                LinkageRow::new(4, 5, 2.0, 4),
            ],
        )
        .unwrap()
    }

    #[test]
    fn both_pairs_selected_below_root() {
        let set = ClusterConstructor::new(1.0).construct(&two_pairs(), &words(&["a", "b", "c", "d"]));
        assert_eq!(set.clusters, vec![words(&["c", "d"]), words(&["a", "b"])]);
        assert!(set.non_selected.is_empty());
    }

    #[test]
    fn unmerged_pair_is_non_selected() {
        let set = ClusterConstructor::new(0.6).construct(&two_pairs(), &words(&["a", "b", "c", "d"]));
        assert_eq!(set.clusters, vec![words(&["a", "b"])]);
        assert_eq!(set.non_selected, words(&["c", "d"]));
    }

    #[test]
    fn threshold_equal_to_distance_is_not_selected() {
        let set = ClusterConstructor::new(0.5).construct(&two_pairs(), &words(&["a", "b", "c", "d"]));
        assert!(set.clusters.is_empty());
        assert_eq!(set.non_selected.len(), 4);
    }

    #[test]
    fn nested_merges_collapse_into_one_cluster() {
        let tree = LinkageTree::new(
            4,
            vec![
                LinkageRow::new(0, 1, 0.1, 2),
                LinkageRow::new(2, 4, 0.2, 3),
                LinkageRow::new(3, 5, 0.3, 4),
            ],
        )
        .unwrap();
        let set = ClusterConstructor::new(0.5).construct(&tree, &words(&["w", "x", "y", "z"]));
        assert_eq!(set.clusters.len(), 1);
        let mut only = set.clusters[0].clone();
        only.sort();
        assert_eq!(only, words(&["w", "x", "y", "z"]));
        assert!(set.non_selected.is_empty());
    }

    #[test]
    fn leaves_resolve_left_to_right() {
        let tree = two_pairs();
        assert_eq!(resolve_leaves(&tree, 2), Some(vec![0, 1, 2, 3]));
        assert_eq!(resolve_leaves(&tree, 0), Some(vec![0, 1]));
    }

    #[test]
    fn strip_drops_subsets_of_later_groups() {
        let stripped = strip(vec![words(&["a", "b"]), words(&["c"]), words(&["a", "b", "c"])]);
        assert_eq!(stripped, vec![words(&["a", "b", "c"])]);
    }
}
