//! Reviewer-facing table with a writable `new_labels` column.
//!
//! This is the save/reload contract of a review tool: the tool reads the
//! tiered table, walks the kept clusters, and writes reviewer decisions into
//! `new_labels`. The engine never reads that column back.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use super::tiered_table::{TieredTable, CURRENT_COLUMN, SKIPPED};
use crate::core::errors::{OptimusError, Result};
use crate::io::csv_io::{read_frame, write_frame, Frame};

/// Column written by reviewers.
pub const NEW_LABELS_COLUMN: &str = "new_labels";

/// Where a relabel takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSource {
    /// The same label for every selected row
    Fixed(String),
    /// Each row's value from another column
    Column(String),
}

/// A table under review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTable {
    columns: IndexMap<String, Vec<Option<String>>>,
    rows: usize,
}

impl ReviewTable {
    /// Wrap a frame, which must contain `current_labels`.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        if frame.column_index(CURRENT_COLUMN).is_none() {
            return Err(OptimusError::validation_field(
                "review tables need a current_labels column",
                CURRENT_COLUMN,
            ));
        }
        let rows = frame.rows.len();
        let mut columns: IndexMap<String, Vec<Option<String>>> = frame
            .headers
            .iter()
            .map(|h| (h.clone(), Vec::with_capacity(rows)))
            .collect();
        for row in frame.rows {
            for (header, cell) in frame.headers.iter().zip(row.into_iter().chain(std::iter::repeat(None))) {
                if let Some(column) = columns.get_mut(header) {
                    column.push(cell);
                }
            }
        }
        Ok(Self { columns, rows })
    }

    /// Review a freshly produced tiered table.
    pub fn from_tiered(table: &TieredTable) -> Result<Self> {
        Self::from_frame(table.to_frame())
    }

    /// Read a table from CSV.
    pub fn read_csv(path: &Path) -> Result<Self> {
        Self::from_frame(read_frame(path)?)
    }

    /// Write the table to CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_frame(path, &self.to_frame())
    }

    /// Back to a plain frame.
    pub fn to_frame(&self) -> Frame {
        let headers: Vec<String> = self.columns.keys().cloned().collect();
        let rows = (0..self.rows)
            .map(|row| self.columns.values().map(|column| column[row].clone()).collect())
            .collect();
        Frame { headers, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Values of a column.
    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Trim current labels and add `new_labels`, marking rows of clusters
    /// smaller than `min_cluster` (and unlabelled rows) as [`SKIPPED`].
    ///
    /// Returns the kept cluster names, sorted.
    pub fn prepare(&mut self, min_cluster: usize) -> Vec<String> {
        let current: Vec<Option<String>> = self
            .columns
            .get(CURRENT_COLUMN)
            .map(|column| {
                column
                    .iter()
                    .map(|label| label.as_ref().map(|l| l.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let mut sizes: HashMap<&str, usize> = HashMap::new();
        for label in current.iter().flatten() {
            *sizes.entry(label.as_str()).or_insert(0) += 1;
        }
        let mut keep: Vec<String> = sizes
            .iter()
            .filter(|(_, size)| **size >= min_cluster)
            .map(|(label, _)| label.to_string())
            .collect();
        keep.sort();

        let new_labels = current
            .iter()
            .map(|label| match label {
                Some(label) if keep.binary_search(label).is_ok() => None,
                _ => Some(SKIPPED.to_string()),
            })
            .collect();

        debug!("Review keeps {} clusters of at least {} rows", keep.len(), min_cluster);
        self.columns.insert(CURRENT_COLUMN.to_string(), current);
        self.columns.insert(NEW_LABELS_COLUMN.to_string(), new_labels);
        keep
    }

    /// Relabel rows of `cluster`.
    ///
    /// With `indices`, only those positions within the cluster (0-based, in
    /// row order) are labelled; otherwise all of its rows are. Rows of the
    /// cluster still without a new label are then marked [`SKIPPED`].
    pub fn relabel(&mut self, cluster: &str, source: &LabelSource, indices: &[usize]) -> Result<()> {
        let members: Vec<usize> = self
            .column(CURRENT_COLUMN)
            .map(|column| {
                column
                    .iter()
                    .enumerate()
                    .filter(|(_, label)| label.as_deref() == Some(cluster))
                    .map(|(row, _)| row)
                    .collect()
            })
            .unwrap_or_default();

        let selected: Vec<usize> = if indices.is_empty() {
            members.clone()
        } else {
            members
                .iter()
                .enumerate()
                .filter(|(position, _)| indices.contains(position))
                .map(|(_, row)| *row)
                .collect()
        };

        let values: Vec<Option<String>> = match source {
            LabelSource::Fixed(label) => vec![Some(label.clone()); self.rows],
            LabelSource::Column(name) => self
                .column(name)
                .ok_or_else(|| {
                    OptimusError::validation_field(format!("unknown column '{name}'"), name.clone())
                })?
                .to_vec(),
        };

        let rows = self.rows;
        let new_labels = self
            .columns
            .entry(NEW_LABELS_COLUMN.to_string())
            .or_insert_with(|| vec![None; rows]);
        for row in selected {
            new_labels[row] = values[row].clone();
        }
        for row in members {
            if new_labels[row].is_none() {
                new_labels[row] = Some(SKIPPED.to_string());
            }
        }
        Ok(())
    }

    /// Names of the `tiers` highest-numbered tier columns, highest first.
    pub fn surfaced_tiers(&self, tiers: usize) -> Vec<String> {
        let mut numbered: Vec<(u32, &String)> = self
            .columns
            .keys()
            .filter_map(|name| {
                name.strip_prefix("tier_")
                    .and_then(|n| n.parse::<u32>().ok())
                    .map(|n| (n, name))
            })
            .collect();
        numbered.sort_by(|a, b| b.0.cmp(&a.0));
        numbered
            .into_iter()
            .take(tiers)
            .map(|(_, name)| name.clone())
            .collect()
    }
}
