//! Main Optimus engine implementation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clustering::{load_embedder, Clusterer, WordEmbedder};
use crate::core::config::OptimusConfig;
use crate::core::errors::{OptimusError, Result, ResultExt};
use crate::core::loader::{load, CleaningRules, InputData};
use crate::io::csv_io::{read_descriptions, write_frame};
use crate::labelling::{LabellingEnsemble, StrategyKind, WordNet};
use crate::pipeline::{
    predictions_frame, Gatekeeper, IterationState, KnnPrediction, NearestNeighbourFallback,
    TieredTable,
};

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Label leftover words with the nearest-neighbour fallback
    pub run_knn: bool,
    /// Keep the embedding model loaded after the run
    pub keep_model: bool,
}

/// What happened at one depth of the iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSummary {
    /// Tier written at this depth
    pub tier: u32,
    /// Distance threshold the tree was cut at
    pub distance: f64,
    /// Number of working clusters
    pub clusters: usize,
    /// Accepted clusters per strategy, in chain order
    pub accepted: Vec<(StrategyKind, usize)>,
    /// Words left outside every working cluster
    pub non_selected: usize,
}

impl DepthSummary {
    /// Accepted clusters over all strategies.
    pub fn total_accepted(&self) -> usize {
        self.accepted.iter().map(|(_, n)| n).sum()
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Full tiered table
    pub table: TieredTable,
    /// Nearest-neighbour predictions, empty unless requested
    pub knn: Vec<KnnPrediction>,
    /// One entry per iteration
    pub depths: Vec<DepthSummary>,
}

impl RunOutput {
    /// `(original, final label)` pairs in row order.
    pub fn labels(&self) -> Vec<(String, Option<String>)> {
        self.table
            .originals()
            .iter()
            .cloned()
            .zip(self.table.current_labels().iter().cloned())
            .collect()
    }

    /// Write the tiered table to `path`.
    pub fn write_table(&self, path: &Path) -> Result<()> {
        self.table
            .write_csv(path)
            .with_context(|| format!("Writing results to {}", path.display()))
    }

    /// Write the nearest-neighbour predictions to `path`.
    pub fn write_knn(&self, path: &Path) -> Result<()> {
        write_frame(path, &predictions_frame(&self.knn))
            .with_context(|| format!("Writing predictions to {}", path.display()))
    }
}

/// Main Optimus engine.
///
/// Owns the configuration, the single resident embedding model and the
/// WordNet database (loaded on first use).
pub struct OptimusEngine {
    config: OptimusConfig,
    model: Option<Box<dyn WordEmbedder>>,
    wordnet: Option<Arc<WordNet>>,
}

impl OptimusEngine {
    /// Create an engine; the configuration is validated first.
    pub fn new(config: OptimusConfig) -> Result<Self> {
        config.validate()?;
        info!("Initializing Optimus engine with model {}", config.model);
        Ok(Self {
            config,
            model: None,
            wordnet: None,
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &OptimusConfig {
        &self.config
    }

    /// Whether a model is resident.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Name of the resident model.
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.name())
    }

    /// Load the configured model, releasing any resident one first.
    pub fn load_model(&mut self) -> Result<()> {
        self.release_model();
        let model = load_embedder(&self.config.model)?;
        info!("Loaded model {} ({} dimensions)", model.name(), model.dimension());
        self.model = Some(model);
        Ok(())
    }

    /// Swap in another model. `None` just releases the current one.
    pub fn replace_model(&mut self, model: Option<Box<dyn WordEmbedder>>) {
        self.release_model();
        if let Some(model) = model {
            debug!("Model replaced with {}", model.name());
            self.model = Some(model);
        }
    }

    /// Drop the resident model, if any.
    pub fn release_model(&mut self) {
        if let Some(model) = self.model.take() {
            debug!("Released model {}", model.name());
        }
    }

    fn ensure_wordnet(&mut self) -> Result<Option<Arc<WordNet>>> {
        if self.wordnet.is_none() {
            if let Some(dir) = &self.config.wordnet {
                let wordnet = WordNet::load(dir)?;
                info!(
                    "Loaded {} WordNet noun synsets from {}",
                    wordnet.synset_count(),
                    dir.display()
                );
                self.wordnet = Some(Arc::new(wordnet));
            }
        }
        Ok(self.wordnet.clone())
    }

    /// Read descriptions from a header-less CSV and run on them.
    pub fn run_csv(&mut self, path: &Path, options: RunOptions) -> Result<RunOutput> {
        let input = read_descriptions(path)?;
        self.run(&input, options)
    }

    /// Cluster and label `input` until the cutoff is reached.
    ///
    /// The model is loaded if none is resident and released at the end
    /// unless `options.keep_model` is set.
    pub fn run(&mut self, input: &InputData, options: RunOptions) -> Result<RunOutput> {
        let result = self.run_inner(input, options);
        if !options.keep_model {
            self.release_model();
        }
        result
    }

    fn run_inner(&mut self, input: &InputData, options: RunOptions) -> Result<RunOutput> {
        let rules = CleaningRules::from_config(&self.config)?;
        let loaded = load(input, &rules)?;
        let mut table = TieredTable::from_loaded(&loaded);
        info!(
            "Loaded {} descriptions into {} distinct words",
            loaded.lookup.len(),
            loaded.words.len()
        );

        if loaded.words.len() < 2 {
            warn!(
                "Only {} distinct words after cleaning, nothing to cluster",
                loaded.words.len()
            );
            return Ok(RunOutput {
                table,
                knn: Vec::new(),
                depths: Vec::new(),
            });
        }

        let wordnet = self.ensure_wordnet()?;
        if self.model.is_none() {
            self.load_model()?;
        }
        let embedder = self
            .model
            .as_deref()
            .ok_or_else(|| OptimusError::internal("No model resident after loading"))?;

        let config = &self.config;
        let clusterer = Clusterer::new(embedder);
        let ensemble = LabellingEnsemble::from_config(config, wordnet);
        let gatekeeper = Gatekeeper::new(config);

        let mut state = IterationState::initial(config);
        let mut words = loaded.words;
        let mut depths = Vec::new();
        let mut leftovers: IndexSet<String> = IndexSet::new();

        while state.iterate {
            let cut = clusterer.cluster(&words, state.distance)?;
            let cluster_count = cut.clusters.len();
            let outcome = ensemble.run(cut.clusters);

            let accepted: HashSet<&str> = outcome
                .accepted
                .iter()
                .flat_map(|proposal| proposal.cluster.iter().map(String::as_str))
                .collect();
            leftovers.retain(|word| !accepted.contains(word.as_str()));
            leftovers.extend(cut.non_selected.iter().cloned());

            let decision = gatekeeper.advance(state, &mut table, &outcome, &cut.non_selected);
            let summary = DepthSummary {
                tier: decision.state.tier,
                distance: state.distance,
                clusters: cluster_count,
                accepted: outcome.per_strategy.clone(),
                non_selected: cut.non_selected.len(),
            };
            info!(
                "Depth {} at distance {:.2}: {} clusters, {} accepted ({}), {} non-selected",
                summary.tier,
                summary.distance,
                summary.clusters,
                summary.total_accepted(),
                summary
                    .accepted
                    .iter()
                    .map(|(kind, n)| format!("{kind}={n}"))
                    .collect::<Vec<_>>()
                    .join(", "),
                summary.non_selected
            );
            depths.push(summary);

            state = decision.state;
            words = decision.next_words;
        }

        let knn = if options.run_knn {
            NearestNeighbourFallback::new(embedder, config.knn_neighbours)
                .predict(&table, &leftovers.into_iter().collect::<Vec<_>>())?
        } else {
            Vec::new()
        };

        info!("Finished after {} iterations", depths.len());
        Ok(RunOutput {
            table,
            knn,
            depths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// One-dimensional embedder reading positions from a table.
    struct LineEmbedder(HashMap<&'static str, f32>);

    impl WordEmbedder for LineEmbedder {
        fn name(&self) -> &str {
            "line"
        }

        fn dimension(&self) -> usize {
            1
        }

        fn embed_word(&self, word: &str) -> Result<Vec<f32>> {
            self.0
                .get(word)
                .map(|x| vec![*x])
                .ok_or_else(|| OptimusError::model(format!("unknown word {word}")))
        }
    }

    fn line_model() -> Box<dyn WordEmbedder> {
        Box::new(LineEmbedder(HashMap::from([
            ("green tea", 0.0),
            ("green teas", 0.1),
            ("pizza", 100.0),
            ("pizzas", 100.1),
            ("zzz", 60.0),
        ])))
    }

    fn input() -> InputData {
        InputData::from(vec!["Green Tea", "green teas!", "Pizza", "PIZZAS", "zzz"])
    }

    fn label_of<'a>(output: &'a RunOutput, original: &str) -> Option<&'a str> {
        let row = output.table.originals().iter().position(|o| o == original)?;
        output.table.current_labels()[row].as_deref()
    }

    #[test]
    fn close_pairs_are_labelled_in_one_iteration() {
        let mut engine = OptimusEngine::new(OptimusConfig::default()).unwrap();
        engine.replace_model(Some(line_model()));

        let output = engine.run(&input(), RunOptions::default()).unwrap();

        assert_eq!(label_of(&output, "Green Tea"), Some("green tea"));
        assert_eq!(label_of(&output, "green teas!"), Some("green tea"));
        assert_eq!(label_of(&output, "Pizza"), Some("pizza"));
        assert_eq!(label_of(&output, "PIZZAS"), Some("pizza"));
        assert_eq!(label_of(&output, "zzz"), Some("zzz"));

        assert_eq!(output.depths.len(), 1);
        let depth = &output.depths[0];
        assert_eq!(depth.tier, 1);
        assert_eq!(depth.clusters, 2);
        assert_eq!(depth.non_selected, 1);
        assert_eq!(depth.accepted[0], (StrategyKind::EditDistance, 2));
        assert_eq!(output.table.tier(1).unwrap()[1].as_deref(), Some("green teas"));
        assert!(output.knn.is_empty());
        assert!(!engine.has_model());
    }

    #[test]
    fn leftovers_get_nearest_neighbour_labels() {
        let mut engine = OptimusEngine::new(OptimusConfig::default()).unwrap();
        engine.replace_model(Some(line_model()));

        let options = RunOptions {
            run_knn: true,
            keep_model: true,
        };
        let output = engine.run(&input(), options).unwrap();

        assert_eq!(
            output.knn,
            vec![KnnPrediction {
                original: "zzz".to_string(),
                word: "zzz".to_string(),
                predicted_label: "pizza".to_string(),
            }]
        );
        assert_eq!(engine.model_name(), Some("line"));
    }

    #[test]
    fn single_word_input_produces_no_tiers() {
        let mut engine = OptimusEngine::new(OptimusConfig::default()).unwrap();
        let output = engine
            .run(&InputData::from(vec!["Tea", "tea!"]), RunOptions::default())
            .unwrap();
        assert!(output.depths.is_empty());
        assert!(output.table.tier_numbers().is_empty());
        assert_eq!(
            output.labels(),
            vec![
                ("Tea".to_string(), Some("tea".to_string())),
                ("tea!".to_string(), Some("tea".to_string())),
            ]
        );
    }

    #[test]
    fn empty_input_is_rejected_before_embedding() {
        let mut engine = OptimusEngine::new(OptimusConfig::default()).unwrap();
        let err = engine
            .run(&InputData::Series(Vec::new()), RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, OptimusError::Input { .. }));
        assert!(!engine.has_model());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = OptimusConfig {
            stepsize: 0.0,
            ..OptimusConfig::default()
        };
        assert!(OptimusEngine::new(config).is_err());
    }

    #[test]
    fn model_lifecycle() {
        let mut engine = OptimusEngine::new(OptimusConfig::default()).unwrap();
        assert!(!engine.has_model());

        engine.load_model().unwrap();
        assert_eq!(engine.model_name(), Some("subword:100"));

        engine.replace_model(Some(line_model()));
        assert_eq!(engine.model_name(), Some("line"));

        engine.replace_model(None);
        assert!(!engine.has_model());
    }

    #[test]
    fn bad_model_spec_is_a_model_error() {
        let config = OptimusConfig {
            model: "nonsense".to_string(),
            ..OptimusConfig::default()
        };
        let mut engine = OptimusEngine::new(config).unwrap();
        assert!(matches!(
            engine.load_model().unwrap_err(),
            OptimusError::Model { .. }
        ));
    }

    #[test]
    fn outputs_are_written_as_csv() {
        let dir = TempDir::new().unwrap();
        let mut engine = OptimusEngine::new(OptimusConfig::default()).unwrap();
        engine.replace_model(Some(line_model()));
        let output = engine
            .run(
                &input(),
                RunOptions {
                    run_knn: true,
                    keep_model: false,
                },
            )
            .unwrap();

        let table_path = dir.path().join("out.csv");
        let knn_path = dir.path().join("knn.csv");
        output.write_table(&table_path).unwrap();
        output.write_knn(&knn_path).unwrap();

        let table = std::fs::read_to_string(&table_path).unwrap();
        assert!(table.starts_with("original,tier_1,current_labels"));
        let knn = std::fs::read_to_string(&knn_path).unwrap();
        assert!(knn.contains("zzz,zzz,pizza"));
    }
}
