//! # Optimus-RS: Iterative Clustering and Labelling of Short Descriptions
//!
//! Groups short free-text descriptions (commodity and goods descriptions) into
//! semantic clusters and proposes a human-readable label for each cluster.
//! The engine repeats cluster-and-label rounds at increasing distance
//! thresholds, recording every round as a tier of the label table:
//!
//! - **Clustering**: word embeddings linked with Ward's method, cut into flat clusters
//! - **Labelling**: edit distance, word grams, character grams and WordNet hypernyms,
//!   chained so each cluster is labelled by the first strategy that accepts it
//! - **Gatekeeping**: accepted labels merged into a tiered table, rejects re-clustered
//! - **Fallback**: nearest-neighbour labels for words never resolved
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         API Layer                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Core        │  Clustering  │  Labelling     │  Pipeline     │
//! │              │              │                │               │
//! │ • Config     │ • Embedding  │ • EditDistance │ • Tiers       │
//! │ • Errors     │ • Ward       │ • WordGram     │ • Gatekeeper  │
//! │ • Loader     │ • Cut        │ • CharGram     │ • KNN         │
//! │              │              │ • Hypernyms    │ • Review      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use optimus_rs::{InputData, OptimusConfig, OptimusEngine, RunOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = OptimusEngine::new(OptimusConfig::default())?;
//!     let input = InputData::from(vec!["Frozen pizza", "Cheese pizza", "Green tea"]);
//!     let output = engine.run(&input, RunOptions::default())?;
//!
//!     for (original, label) in output.labels() {
//!         println!("{original} -> {}", label.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Memory allocator selection (mutually exclusive)
#[cfg(all(feature = "mimalloc", not(feature = "jemalloc")))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(all(feature = "jemalloc", not(feature = "mimalloc")))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

// Configuration, errors and input cleaning
pub mod core {
    //! Configuration, error types and input loading.

    pub mod config;
    pub mod errors;
    pub mod loader;
}

pub mod clustering;
pub mod labelling;
pub mod pipeline;

// CSV input and output
pub mod io {
    //! Reading descriptions and writing result tables.

    pub mod csv_io;
}

// Public API and engine interface
pub mod api {
    //! High-level engine interface.

    pub mod engine;
}

// Re-export primary types for convenience
pub use api::engine::{DepthSummary, OptimusEngine, RunOptions, RunOutput};
pub use core::config::{ConfigLoader, OptimusConfig};
pub use core::errors::{OptimusError, Result, ResultExt};
pub use core::loader::InputData;
pub use pipeline::{KnnPrediction, ReviewTable, TieredTable, SKIPPED};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
