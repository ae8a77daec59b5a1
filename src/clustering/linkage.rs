//! Ward hierarchical clustering and the validated linkage table.
//!
//! The table follows the usual scipy layout: `n` leaves get ids `0..n`, row
//! `i` creates node `n + i`, rows are sorted by merge distance and the
//! smaller child id is stored first.

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::{OptimusError, Result};

/// One merge step of the linkage table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkageRow {
    /// First child id (leaf if `< n`, otherwise row `id - n`)
    pub left: usize,
    /// Second child id
    pub right: usize,
    /// Merge distance
    pub distance: f64,
    /// Number of leaves under this node
    pub size: usize,
}

impl LinkageRow {
    /// Convenience constructor.
    pub fn new(left: usize, right: usize, distance: f64, size: usize) -> Self {
        Self {
            left,
            right,
            distance,
            size,
        }
    }
}

/// A complete, validated binary merge tree over `n` leaves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkageTree {
    n_leaves: usize,
    rows: Vec<LinkageRow>,
}

impl LinkageTree {
    /// Validate and wrap a linkage table.
    ///
    /// Every child must reference a leaf or an earlier row and be used once,
    /// distances must be finite, non-negative and non-decreasing, and each
    /// size must equal the sum of its children's sizes.
    pub fn new(n_leaves: usize, rows: Vec<LinkageRow>) -> Result<Self> {
        if n_leaves < 2 {
            return Err(OptimusError::clustering(format!(
                "A linkage tree needs at least 2 leaves, got {n_leaves}"
            )));
        }
        if rows.len() != n_leaves - 1 {
            return Err(OptimusError::clustering(format!(
                "Expected {} linkage rows for {} leaves, got {}",
                n_leaves - 1,
                n_leaves,
                rows.len()
            )));
        }

        let mut sizes = vec![1usize; n_leaves];
        let mut used = vec![false; 2 * n_leaves - 1];
        let mut previous = 0.0f64;

        for (i, row) in rows.iter().enumerate() {
            let node_limit = n_leaves + i;
            for child in [row.left, row.right] {
                if child >= node_limit {
                    return Err(OptimusError::clustering(format!(
                        "Row {i} references node {child}, which does not exist yet"
                    )));
                }
                if used[child] {
                    return Err(OptimusError::clustering(format!(
                        "Row {i} reuses node {child}"
                    )));
                }
                used[child] = true;
            }
            if row.left == row.right {
                return Err(OptimusError::clustering(format!(
                    "Row {i} merges node {} with itself",
                    row.left
                )));
            }
            if !row.distance.is_finite() || row.distance < 0.0 {
                return Err(OptimusError::clustering(format!(
                    "Row {i} has invalid distance {}",
                    row.distance
                )));
            }
            if row.distance < previous {
                return Err(OptimusError::clustering(format!(
                    "Row {i} distance {} is below the previous row's {}",
                    row.distance, previous
                )));
            }
            previous = row.distance;

            let expected = sizes[row.left] + sizes[row.right];
            if row.size != expected {
                return Err(OptimusError::clustering(format!(
                    "Row {i} has size {} but its children hold {}",
                    row.size, expected
                )));
            }
            sizes.push(expected);
        }

        Ok(Self { n_leaves, rows })
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Merge rows in merge order.
    pub fn rows(&self) -> &[LinkageRow] {
        &self.rows
    }
}

/// Condensed index of the pair `(i, j)` with `i < j`.
#[inline]
fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    n * i - i * (i + 1) / 2 + j - i - 1
}

/// Pairwise Euclidean distances in condensed form, computed in parallel.
fn pairwise_distances(points: &ArrayView2<'_, f32>) -> Vec<f64> {
    let n = points.nrows();
    (0..n)
        .into_par_iter()
        .map(|i| {
            let a = points.row(i);
            ((i + 1)..n)
                .map(|j| {
                    let b = points.row(j);
                    a.iter()
                        .zip(b.iter())
                        .map(|(x, y)| {
                            let d = f64::from(*x) - f64::from(*y);
                            d * d
                        })
                        .sum::<f64>()
                        .sqrt()
                })
                .collect::<Vec<f64>>()
        })
        .flatten()
        .collect()
}

/// Ward linkage of the rows of `points`.
///
/// Uses the nearest-neighbour-chain algorithm with the Lance–Williams Ward
/// update on Euclidean distances.
pub fn ward(points: ArrayView2<'_, f32>) -> Result<LinkageTree> {
    let n = points.nrows();
    if n < 2 {
        return Err(OptimusError::clustering(format!(
            "Ward linkage needs at least 2 words, got {n}"
        )));
    }
    if points.iter().any(|v| !v.is_finite()) {
        return Err(OptimusError::clustering(
            "Embedding matrix contains non-finite values",
        ));
    }

    let mut dist = pairwise_distances(&points);
    let d = |dist: &[f64], a: usize, b: usize| -> f64 {
        if a < b {
            dist[condensed_index(n, a, b)]
        } else {
            dist[condensed_index(n, b, a)]
        }
    };

    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);

    for _ in 0..n - 1 {
        if chain.is_empty() {
            let first = active.iter().position(|a| *a).ok_or_else(|| {
                OptimusError::internal("No active cluster left during Ward linkage")
            })?;
            chain.push(first);
        }

        let (x, y, merge_distance) = loop {
            let x = chain[chain.len() - 1];
            let previous = (chain.len() >= 2).then(|| chain[chain.len() - 2]);

            let (mut nearest, mut best) = match previous {
                Some(p) => (p, d(&dist, x, p)),
                None => (usize::MAX, f64::INFINITY),
            };
            for candidate in 0..n {
                if !active[candidate] || candidate == x {
                    continue;
                }
                let candidate_distance = d(&dist, x, candidate);
                if candidate_distance < best {
                    best = candidate_distance;
                    nearest = candidate;
                }
            }

            if Some(nearest) == previous {
                chain.truncate(chain.len() - 2);
                break (x, nearest, best);
            }
            chain.push(nearest);
        };

        let (keep, drop) = if x < y { (y, x) } else { (x, y) };
        merges.push((drop, keep, merge_distance));

        let (size_drop, size_keep) = (size[drop] as f64, size[keep] as f64);
        active[drop] = false;
        for other in 0..n {
            if !active[other] || other == keep {
                continue;
            }
            let size_other = size[other] as f64;
            let total = size_drop + size_keep + size_other;
            let d_drop = d(&dist, drop, other);
            let d_keep = d(&dist, keep, other);
            let updated = (((size_drop + size_other) * d_drop * d_drop
                + (size_keep + size_other) * d_keep * d_keep
                - size_other * merge_distance * merge_distance)
                / total)
                .max(0.0)
                .sqrt();
            let idx = if keep < other {
                condensed_index(n, keep, other)
            } else {
                condensed_index(n, other, keep)
            };
            dist[idx] = updated;
        }
        size[keep] += size[drop];
    }

    merges.sort_by(|a, b| a.2.total_cmp(&b.2));
    let rows = relabel(n, &merges);
    debug!("Ward linkage built {} rows over {} words", rows.len(), n);
    LinkageTree::new(n, rows)
}

/// Turn slot-indexed merges into node ids with a union-find pass.
fn relabel(n: usize, merges: &[(usize, usize, f64)]) -> Vec<LinkageRow> {
    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut sizes = vec![1usize; 2 * n - 1];

    fn find(parent: &mut [usize], mut node: usize) -> usize {
        let mut root = node;
        while parent[root] != root {
            root = parent[root];
        }
        while parent[node] != root {
            let next = parent[node];
            parent[node] = root;
            node = next;
        }
        root
    }

    merges
        .iter()
        .enumerate()
        .map(|(i, &(a, b, distance))| {
            let ra = find(&mut parent, a);
            let rb = find(&mut parent, b);
            let (left, right) = if ra < rb { (ra, rb) } else { (rb, ra) };
            let node = n + i;
            parent[left] = node;
            parent[right] = node;
            sizes[node] = sizes[left] + sizes[right];
            LinkageRow::new(left, right, distance, sizes[node])
        })
        .collect()
}
