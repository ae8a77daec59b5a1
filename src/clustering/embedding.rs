//! Word embedding backends.
//!
//! Every backend implements [`WordEmbedder`]. The engine owns exactly one
//! boxed embedder at a time; [`load_embedder`] turns a model specification
//! from the configuration into a backend:
//!
//! * `subword:<dim>` → [`SubwordEmbedder`], hashed character n-grams, no files
//! * `*.vec` / `*.txt` → [`VectorFileEmbedder`], fastText/word2vec text vectors
//! * `fastembed:<name>` → `FastEmbedEmbedder` (requires the `semantic-models` feature)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

use crate::core::errors::{OptimusError, Result};

/// A model that maps a word (possibly several whitespace-separated tokens)
/// to a fixed-size vector.
pub trait WordEmbedder: Send + Sync {
    /// Model name for logs and error messages.
    fn name(&self) -> &str;

    /// Dimension of every produced vector.
    fn dimension(&self) -> usize;

    /// Embed a single word.
    fn embed_word(&self, word: &str) -> Result<Vec<f32>>;

    /// Embed a batch of words into a `words.len() × dimension` matrix.
    fn embed_words(&self, words: &[String]) -> Result<Array2<f32>> {
        let dimension = self.dimension();
        let vectors = words
            .par_iter()
            .map(|word| self.embed_word(word))
            .collect::<Result<Vec<_>>>()?;
        rows_to_matrix(vectors, dimension, self.name())
    }
}

/// Stack equally sized vectors into a matrix.
fn rows_to_matrix(vectors: Vec<Vec<f32>>, dimension: usize, model: &str) -> Result<Array2<f32>> {
    let rows = vectors.len();
    let mut flat = Vec::with_capacity(rows * dimension);
    for vector in vectors {
        if vector.len() != dimension {
            return Err(OptimusError::model_named(
                format!(
                    "model produced a vector of length {} instead of {}",
                    vector.len(),
                    dimension
                ),
                model,
            ));
        }
        flat.extend(vector);
    }
    Array2::from_shape_vec((rows, dimension), flat)
        .map_err(|e| OptimusError::internal(format!("Failed to build embedding matrix: {e}")))
}

/// Build an embedder from a model specification.
pub fn load_embedder(spec: &str) -> Result<Box<dyn WordEmbedder>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(OptimusError::model("An empty model specification was supplied"));
    }

    if let Some(dim) = spec.strip_prefix("subword:") {
        let dimension: usize = dim.trim().parse().map_err(|_| {
            OptimusError::model_named(format!("'{dim}' is not a valid dimension"), spec)
        })?;
        return Ok(Box::new(SubwordEmbedder::new(dimension)?));
    }

    if let Some(name) = spec.strip_prefix("fastembed:") {
        return load_fastembed(name.trim());
    }

    let path = PathBuf::from(spec);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("vec") | Some("txt") => Ok(Box::new(VectorFileEmbedder::from_path(&path)?)),
        _ => Err(OptimusError::model_named(
            "Unrecognised model: expected subword:<dim>, fastembed:<name> or a .vec/.txt vector file",
            spec,
        )),
    }
}

#[cfg(feature = "fastembed")]
fn load_fastembed(name: &str) -> Result<Box<dyn WordEmbedder>> {
    Ok(Box::new(semantic::FastEmbedEmbedder::new(name)?))
}

#[cfg(not(feature = "fastembed"))]
fn load_fastembed(name: &str) -> Result<Box<dyn WordEmbedder>> {
    Err(OptimusError::model_named(
        "sentence-embedding models need the `semantic-models` feature",
        format!("fastembed:{name}"),
    ))
}

/// Number of hash buckets shared by all character n-grams.
const SUBWORD_BUCKETS: u64 = 2_000_000;
const MIN_NGRAM: usize = 3;
const MAX_NGRAM: usize = 6;
/// Half-width of the uniform bucket components.
const BUCKET_SCALE: f64 = 1.732_050_807_568_877_2;

/// fastText-style subword embedder.
///
/// A word is wrapped as `<word>`; the whole token and its character n-grams
/// (3 to 6 characters) are hashed into a fixed bucket table and the word
/// vector is the mean of the bucket vectors. Bucket vectors are generated
/// from the bucket id, so the table is never materialised.
#[derive(Debug, Clone)]
pub struct SubwordEmbedder {
    name: String,
    dimension: usize,
}

impl SubwordEmbedder {
    /// Create an embedder with the given dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(OptimusError::model_named(
                "embedding dimension must be greater than 0",
                "subword:0",
            ));
        }
        Ok(Self {
            name: format!("subword:{dimension}"),
            dimension,
        })
    }

    /// Hash keys for the whole token and each of its character n-grams.
    fn subword_keys(word: &str) -> Vec<u64> {
        let wrapped: Vec<char> = format!("<{word}>").chars().collect();
        let mut keys = vec![xxh3_64(word.as_bytes())];
        for n in MIN_NGRAM..=MAX_NGRAM {
            if n > wrapped.len() {
                break;
            }
            for window in wrapped.windows(n) {
                let gram: String = window.iter().collect();
                keys.push(xxh3_64(gram.as_bytes()));
            }
        }
        keys
    }

    /// Add the bucket vector for `key`. Components are uniform on
    /// `[-√3, √3]` (unit variance), so two unrelated words with about 40
    /// n-grams each land roughly 2 apart at 100 dimensions and near-duplicates
    /// stay below 1.
    fn accumulate_bucket(&self, key: u64, into: &mut [f32]) {
        let bucket = key % SUBWORD_BUCKETS;
        let seed_bytes = bucket.to_le_bytes();
        for (i, value) in into.iter_mut().enumerate() {
            let h = xxh3_64_with_seed(&seed_bytes, i as u64);
            let unit = (h as f64 / u64::MAX as f64) * 2.0 - 1.0;
            *value += (unit * BUCKET_SCALE) as f32;
        }
    }
}

impl WordEmbedder for SubwordEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_word(&self, word: &str) -> Result<Vec<f32>> {
        let keys = Self::subword_keys(word);
        let mut vector = vec![0.0f32; self.dimension];
        for key in &keys {
            self.accumulate_bucket(*key, &mut vector);
        }
        let count = keys.len() as f32;
        for value in &mut vector {
            *value /= count;
        }
        Ok(vector)
    }
}

/// Embedder backed by a fastText / word2vec text vector file.
///
/// Lookups try the full string, then average its whitespace tokens; tokens
/// missing from the vocabulary use subword vectors of the same dimension.
pub struct VectorFileEmbedder {
    name: String,
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    fallback: SubwordEmbedder,
}

impl VectorFileEmbedder {
    /// Load vectors from a file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| {
            OptimusError::model_named(format!("Could not open vector file: {e}"), name.clone())
        })?;
        info!("Loading word vectors from {}", name);
        Self::from_reader(BufReader::new(file), name)
    }

    /// Parse vectors from any buffered reader.
    ///
    /// An optional `<count> <dimension>` header line is skipped.
    pub fn from_reader(reader: impl BufRead, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut vectors = HashMap::new();
        let mut dimension = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                OptimusError::model_named(format!("Failed to read vector file: {e}"), name.clone())
            })?;
            let mut parts = line.split_whitespace();
            let Some(token) = parts.next() else {
                continue;
            };
            let values: Vec<&str> = parts.collect();

            if line_no == 0 && values.len() == 1 && token.parse::<usize>().is_ok() {
                continue;
            }

            let vector = values
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| {
                    OptimusError::model_named(
                        format!("Invalid number on line {}: {e}", line_no + 1),
                        name.clone(),
                    )
                })?;

            if dimension == 0 {
                dimension = vector.len();
            } else if vector.len() != dimension {
                return Err(OptimusError::model_named(
                    format!(
                        "Line {} has {} values, expected {}",
                        line_no + 1,
                        vector.len(),
                        dimension
                    ),
                    name,
                ));
            }
            vectors.insert(token.to_string(), vector);
        }

        if vectors.is_empty() || dimension == 0 {
            return Err(OptimusError::model_named("Vector file contains no vectors", name));
        }

        debug!("Loaded {} vectors of dimension {}", vectors.len(), dimension);
        Ok(Self {
            name,
            dimension,
            vectors,
            fallback: SubwordEmbedder::new(dimension)?,
        })
    }

    /// Number of vocabulary entries.
    pub fn vocabulary_size(&self) -> usize {
        self.vectors.len()
    }
}

impl WordEmbedder for VectorFileEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_word(&self, word: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.vectors.get(word) {
            return Ok(vector.clone());
        }

        let tokens: Vec<&str> = word.split_whitespace().collect();
        if tokens.is_empty() {
            return self.fallback.embed_word(word);
        }

        let mut sum = vec![0.0f32; self.dimension];
        for token in &tokens {
            let vector = match self.vectors.get(*token) {
                Some(vector) => vector.clone(),
                None => self.fallback.embed_word(token)?,
            };
            for (acc, value) in sum.iter_mut().zip(vector) {
                *acc += value;
            }
        }
        let count = tokens.len() as f32;
        Ok(sum.into_iter().map(|v| v / count).collect())
    }
}

#[cfg(feature = "fastembed")]
mod semantic {
    use std::sync::RwLock;

    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::WordEmbedder;
    use crate::core::errors::{OptimusError, Result};

    /// Sentence-embedding model served by fastembed.
    pub struct FastEmbedEmbedder {
        name: String,
        dimension: usize,
        model: RwLock<TextEmbedding>,
    }

    impl FastEmbedEmbedder {
        /// Initialise a named model, downloading weights on first use.
        pub fn new(name: &str) -> Result<Self> {
            let (model_id, dimension) = match name.to_ascii_lowercase().as_str() {
                "all-minilm-l6-v2" | "minilm" => (EmbeddingModel::AllMiniLML6V2, 384),
                "bge-small-en-v1.5" | "bge-small" => (EmbeddingModel::BGESmallENV15, 384),
                "nomic-embed-text-v1.5" | "nomic" => (EmbeddingModel::NomicEmbedTextV15, 768),
                _ => {
                    return Err(OptimusError::model_named(
                        "Unknown fastembed model",
                        format!("fastembed:{name}"),
                    ))
                }
            };

            let model = TextEmbedding::try_new(
                InitOptions::new(model_id).with_show_download_progress(false),
            )
            .map_err(|e| {
                OptimusError::model_named(
                    format!("Failed to initialize embedding model: {e}"),
                    format!("fastembed:{name}"),
                )
            })?;

            Ok(Self {
                name: format!("fastembed:{name}"),
                dimension,
                model: RwLock::new(model),
            })
        }
    }

    impl WordEmbedder for FastEmbedEmbedder {
        fn name(&self) -> &str {
            &self.name
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn embed_word(&self, word: &str) -> Result<Vec<f32>> {
            let mut batch = self.embed_all(&[word.to_string()])?;
            batch
                .pop()
                .ok_or_else(|| OptimusError::internal("Embedding generation returned empty result"))
        }

        fn embed_words(&self, words: &[String]) -> Result<ndarray::Array2<f32>> {
            let vectors = self.embed_all(words)?;
            super::rows_to_matrix(vectors, self.dimension, &self.name)
        }
    }

    impl FastEmbedEmbedder {
        fn embed_all(&self, words: &[String]) -> Result<Vec<Vec<f32>>> {
            if words.is_empty() {
                return Ok(Vec::new());
            }
            let texts: Vec<&str> = words.iter().map(String::as_str).collect();
            let mut model = self
                .model
                .write()
                .map_err(|e| OptimusError::internal(format!("Failed to acquire model lock: {e}")))?;
            model
                .embed(texts, None)
                .map_err(|e| OptimusError::model_named(format!("Embedding failed: {e}"), self.name.clone()))
        }
    }
}
