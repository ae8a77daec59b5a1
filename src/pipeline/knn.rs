//! Nearest-neighbour labels for words the iterations never resolved.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::tiered_table::{TieredTable, SKIPPED};
use crate::clustering::WordEmbedder;
use crate::core::errors::Result;
use crate::io::csv_io::Frame;

/// One predicted label for one original description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnnPrediction {
    /// Original description
    pub original: String,
    /// Current (unresolved) label of that description
    pub word: String,
    /// Label voted by the nearest training rows
    pub predicted_label: String,
}

/// Convert predictions to a `original, word, predicted_label` frame.
pub fn predictions_frame(predictions: &[KnnPrediction]) -> Frame {
    Frame {
        headers: vec![
            "original".to_string(),
            "word".to_string(),
            "predicted_label".to_string(),
        ],
        rows: predictions
            .iter()
            .map(|p| {
                vec![
                    Some(p.original.clone()),
                    Some(p.word.clone()),
                    Some(p.predicted_label.clone()),
                ]
            })
            .collect(),
    }
}

/// k-nearest-neighbour classifier trained on the labels of a finished table.
pub struct NearestNeighbourFallback<'a> {
    embedder: &'a dyn WordEmbedder,
    k: usize,
}

impl<'a> NearestNeighbourFallback<'a> {
    /// Classifier consulting `k` neighbours.
    pub fn new(embedder: &'a dyn WordEmbedder, k: usize) -> Self {
        Self {
            embedder,
            k: k.max(1),
        }
    }

    /// Training labels: every row label occurring at least twice, one entry
    /// per row.
    fn training_labels(table: &TieredTable) -> Vec<String> {
        let counts = table.label_counts();
        table
            .current_labels()
            .iter()
            .flatten()
            .filter(|label| label.as_str() != SKIPPED && counts[label.as_str()] >= 2)
            .cloned()
            .collect()
    }

    /// Predict a label for each of `words` using the table's labels.
    ///
    /// Returns an empty list when the table has no repeated label.
    pub fn predict_words(&self, table: &TieredTable, words: &[String]) -> Result<Vec<(String, String)>> {
        let training = Self::training_labels(table);
        if training.is_empty() {
            warn!("No repeated labels to train the nearest-neighbour fallback on");
            return Ok(Vec::new());
        }
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut distinct: Vec<String> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        for label in &training {
            if !position.contains_key(label.as_str()) {
                position.insert(label.as_str(), distinct.len());
                distinct.push(label.clone());
            }
        }
        let label_vectors = self.embedder.embed_words(&distinct)?;
        let training_rows: Vec<usize> = training.iter().map(|l| position[l.as_str()]).collect();

        let query_vectors = self.embedder.embed_words(words)?;
        let predictions = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let label = self.vote(
                    query_vectors.row(i),
                    &label_vectors,
                    &training_rows,
                    &distinct,
                );
                (word.clone(), label)
            })
            .collect();
        Ok(predictions)
    }

    /// Predict labels for unresolved words and expand them to every
    /// unsettled original description currently carrying that word.
    pub fn predict(&self, table: &TieredTable, words: &[String]) -> Result<Vec<KnnPrediction>> {
        let predicted = self.predict_words(table, words)?;
        let mut rows = Vec::new();
        for (word, label) in predicted {
            for row in table.open_rows_with_label(&word) {
                rows.push(KnnPrediction {
                    original: table.originals()[row].clone(),
                    word: word.clone(),
                    predicted_label: label.clone(),
                });
            }
        }
        info!("Nearest-neighbour fallback labelled {} originals", rows.len());
        Ok(rows)
    }

    fn vote(
        &self,
        query: ArrayView1<'_, f32>,
        label_vectors: &Array2<f32>,
        training_rows: &[usize],
        labels: &[String],
    ) -> String {
        let label_distance: Vec<f64> = label_vectors
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(query.iter())
                    .map(|(a, b)| {
                        let d = f64::from(*a) - f64::from(*b);
                        d * d
                    })
                    .sum::<f64>()
            })
            .collect();

        let mut neighbours: Vec<(f64, usize)> = training_rows
            .iter()
            .map(|&label| (label_distance[label], label))
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbours.truncate(self.k);

        let mut votes: HashMap<usize, usize> = HashMap::new();
        for (_, label) in &neighbours {
            *votes.entry(*label).or_insert(0) += 1;
        }
        votes
            .into_iter()
            .max_by(|(a_label, a_votes), (b_label, b_votes)| {
                a_votes
                    .cmp(b_votes)
                    .then_with(|| labels[*b_label].cmp(&labels[*a_label]))
            })
            .map(|(label, _)| labels[label].clone())
            .unwrap_or_default()
    }
}
