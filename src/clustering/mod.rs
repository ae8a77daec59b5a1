//! Embedding-driven hierarchical clustering.
//!
//! [`Clusterer`] embeds a batch of words and builds its Ward linkage tree;
//! [`constructor::ClusterConstructor`] then cuts that tree into flat clusters.

pub mod constructor;
pub mod embedding;
pub mod linkage;

pub use constructor::{Cluster, ClusterConstructor, ClusterSet};
pub use embedding::{load_embedder, SubwordEmbedder, VectorFileEmbedder, WordEmbedder};
pub use linkage::{ward, LinkageRow, LinkageTree};

use tracing::debug;

use crate::core::errors::{OptimusError, Result};

/// Embeds words and links them with Ward's method.
pub struct Clusterer<'a> {
    embedder: &'a dyn WordEmbedder,
}

impl<'a> Clusterer<'a> {
    /// Clusterer using a borrowed embedding model.
    pub fn new(embedder: &'a dyn WordEmbedder) -> Self {
        Self { embedder }
    }

    /// Build the linkage tree over `words`; leaf `i` is `words[i]`.
    pub fn link(&self, words: &[String]) -> Result<LinkageTree> {
        if words.len() < 2 {
            return Err(OptimusError::clustering(format!(
                "Clustering needs at least 2 words, got {}",
                words.len()
            )));
        }
        debug!(
            "Embedding {} words with {}",
            words.len(),
            self.embedder.name()
        );
        let vectors = self.embedder.embed_words(words)?;
        ward(vectors.view())
    }

    /// Link `words` and cut the tree at `threshold` in one step.
    pub fn cluster(&self, words: &[String], threshold: f64) -> Result<ClusterSet> {
        let tree = self.link(words)?;
        Ok(ClusterConstructor::new(threshold).construct(&tree, words))
    }
}
