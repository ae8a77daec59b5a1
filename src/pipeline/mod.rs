//! Iteration bookkeeping: the tiered label table, the gatekeeper that merges
//! accepted labels into it, the nearest-neighbour fallback and the review
//! contract.

pub mod gatekeeper;
pub mod knn;
pub mod review;
pub mod tiered_table;

pub use gatekeeper::{GateDecision, Gatekeeper, IterationState};
pub use knn::{predictions_frame, KnnPrediction, NearestNeighbourFallback};
pub use review::{LabelSource, ReviewTable, NEW_LABELS_COLUMN};
pub use tiered_table::{tier_column, TieredTable, CURRENT_COLUMN, ORIGINAL_COLUMN, SKIPPED};
