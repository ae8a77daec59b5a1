//! Configuration types and layered loading for optimus-rs.
//!
//! A run is driven by one immutable [`OptimusConfig`]. It is assembled from
//! three layers: a base (built-in defaults or a mandatory default file), an
//! optional user file, and explicit key/value overrides. Only the iteration
//! state (distance and tier) changes during a run, and that lives in
//! [`crate::pipeline::gatekeeper::IterationState`], not here.

pub mod validation;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::core::errors::{OptimusError, Result};

pub use validation::{
    validate_bounded_usize, validate_non_negative, validate_positive_f64, validate_positive_usize,
};

/// Model specification used when none is configured.
pub const DEFAULT_MODEL: &str = "subword:100";

/// Main configuration for an optimus run.
///
/// Field names match the keys accepted in JSON/YAML config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimusConfig {
    /// Input CSV with one description per row (no header)
    pub data: Option<PathBuf>,
    /// Output path of the tiered table
    pub out: PathBuf,
    /// Initial distance threshold for cutting the linkage tree
    pub distance: f64,
    /// Threshold at which iteration stops
    pub cutoff: f64,
    /// Threshold increment between depths
    pub stepsize: f64,
    /// Minimum cluster size kept for review; smaller clusters are SKIPPED
    pub min_cluster: usize,
    /// CharGram acceptance threshold
    pub ng_threshold: f64,
    /// EditDistance acceptance threshold (mean pairwise Levenshtein)
    pub lev_threshold: f64,
    /// WordGram acceptance threshold
    pub wg_threshold: f64,
    /// Hypernym labels that are never proposed
    pub stoppers: Vec<String>,
    /// Ordered `(pattern, replacement)` cleaning substitutions
    pub regex: Vec<(String, String)>,
    /// Ordered fixed replacements applied after `regex` (keys are patterns)
    pub trouble: IndexMap<String, String>,
    /// Number of tier columns surfaced to reviewers
    pub tiers: usize,
    /// Embedding model: `subword:<dim>`, `fastembed:<name>` or a `.vec` path
    pub model: String,
    /// Encoding of the input file
    pub encoding: String,
    /// Tier number before the first depth; the first column is `tier_{n+1}`
    pub tier_counter: u32,
    /// WordNet dictionary directory used by the hypernym strategy
    pub wordnet: Option<PathBuf>,
    /// Re-cluster every current label, not just the unresolved ones
    pub regroup_labels: bool,
    /// Token cap per item for word-gram enumeration
    pub wg_max_tokens: usize,
    /// Neighbours consulted by the nearest-neighbour fallback
    pub knn_neighbours: usize,
    /// Output path for nearest-neighbour predictions
    pub knn_out: PathBuf,
}

impl Default for OptimusConfig {
    fn default() -> Self {
        Self {
            data: None,
            out: PathBuf::from("optimus_results.csv"),
            distance: 1.0,
            cutoff: 6.0,
            stepsize: 1.0,
            min_cluster: 5,
            ng_threshold: 4.0,
            lev_threshold: 3.0,
            wg_threshold: 1.5,
            stoppers: vec![
                "entity".to_string(),
                "physical entity".to_string(),
                "abstraction".to_string(),
                "object".to_string(),
                "whole".to_string(),
                "matter".to_string(),
            ],
            regex: vec![
                (r"[^a-z\s]".to_string(), " ".to_string()),
                (r"\s+".to_string(), " ".to_string()),
                (r"^\s+|\s+$".to_string(), String::new()),
            ],
            trouble: IndexMap::new(),
            tiers: 2,
            model: DEFAULT_MODEL.to_string(),
            encoding: "utf-8".to_string(),
            tier_counter: 0,
            wordnet: None,
            regroup_labels: false,
            wg_max_tokens: 12,
            knn_neighbours: 2,
            knn_out: PathBuf::from("knn.csv"),
        }
    }
}

/// Construction, I/O and validation for [`OptimusConfig`].
impl OptimusConfig {
    /// Load a configuration file (JSON or YAML by extension) on top of defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_user_file(path.as_ref()).load_strict()
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            OptimusError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        validate_positive_f64(self.distance, "distance")?;
        validate_positive_f64(self.stepsize, "stepsize")?;
        validate_positive_f64(self.cutoff, "cutoff")?;
        if self.cutoff < self.distance {
            return Err(OptimusError::config_field(
                format!(
                    "cutoff ({}) must not be below the initial distance ({})",
                    self.cutoff, self.distance
                ),
                "cutoff",
            ));
        }
        validate_non_negative(self.ng_threshold, "ng_threshold")?;
        validate_non_negative(self.lev_threshold, "lev_threshold")?;
        validate_non_negative(self.wg_threshold, "wg_threshold")?;
        validate_positive_usize(self.min_cluster, "min_cluster")?;
        validate_positive_usize(self.tiers, "tiers")?;
        validate_positive_usize(self.knn_neighbours, "knn_neighbours")?;
        validate_bounded_usize(self.wg_max_tokens, 1, 20, "wg_max_tokens")?;

        if self.model.trim().is_empty() {
            return Err(OptimusError::config_field("model must not be empty", "model"));
        }

        let encoding = self.encoding.to_ascii_lowercase().replace('_', "-");
        if encoding != "utf-8" && encoding != "utf8" {
            return Err(OptimusError::config_field(
                format!("unsupported encoding '{}', only utf-8 is read", self.encoding),
                "encoding",
            ));
        }

        for (pattern, _) in &self.regex {
            regex::Regex::new(pattern).map_err(|e| {
                OptimusError::config_field(format!("invalid pattern '{pattern}': {e}"), "regex")
            })?;
        }
        for pattern in self.trouble.keys() {
            regex::Regex::new(pattern).map_err(|e| {
                OptimusError::config_field(format!("invalid pattern '{pattern}': {e}"), "trouble")
            })?;
        }

        Ok(())
    }
}

/// Layered configuration loader: base → user file → overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    default_file: Option<PathBuf>,
    user_file: Option<PathBuf>,
    overrides: Map<String, Value>,
}

impl ConfigLoader {
    /// Loader starting from the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a default config file as the base layer. It must exist.
    pub fn with_default_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_file = Some(path.into());
        self
    }

    /// Layer a user config file over the base. Missing files fall back to
    /// the base with a warning.
    pub fn with_user_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_file = Some(path.into());
        self
    }

    /// Override a single known key.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        self.overrides.insert(key.into(), value);
        Ok(self)
    }

    /// Override several known keys at once.
    pub fn with_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Build and validate the configuration.
    pub fn load(&self) -> Result<OptimusConfig> {
        self.build(false)
    }

    /// Like [`ConfigLoader::load`] but a missing user file is an error.
    fn load_strict(&self) -> Result<OptimusConfig> {
        self.build(true)
    }

    fn build(&self, strict_user_file: bool) -> Result<OptimusConfig> {
        let mut layered = serde_json::to_value(OptimusConfig::default())?;
        if let Some(path) = &self.default_file {
            let defaults = read_value(path).map_err(|e| {
                OptimusError::config(format!(
                    "Default configs failed to load from {}: {e}",
                    path.display()
                ))
            })?;
            merge_all(&mut layered, defaults)?;
        }

        if let Some(path) = &self.user_file {
            match read_value(path) {
                Ok(user) => {
                    info!("Applying user config from {}", path.display());
                    merge_all(&mut layered, user)?;
                }
                Err(OptimusError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound && !strict_user_file =>
                {
                    warn!(
                        "User config file {} failed to load, using defaults",
                        path.display()
                    );
                }
                Err(err) => return Err(err),
            }
        } else {
            debug!("No user config provided, using defaults as base configs");
        }

        merge_known(&mut layered, &self.overrides);

        let config: OptimusConfig = serde_json::from_value(layered).map_err(|e| {
            OptimusError::config(format!("Configuration has invalid values: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Read a JSON or YAML file into a generic value.
fn read_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OptimusError::io(format!("Failed to read config file: {}", path.display()), e)
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Copy every key of `layer` into `base`.
fn merge_all(base: &mut Value, layer: Value) -> Result<()> {
    let (Value::Object(base), Value::Object(layer)) = (base, layer) else {
        return Err(OptimusError::config("Config files must contain a mapping at the top level"));
    };
    for (key, value) in layer {
        base.insert(key, value);
    }
    Ok(())
}

/// Copy only keys already present in `base`, which always carries every
/// field of [`OptimusConfig`]; unknown keys are ignored.
fn merge_known(base: &mut Value, overrides: &Map<String, Value>) {
    let Value::Object(base) = base else {
        return;
    };
    for (key, value) in overrides {
        if let Some(slot) = base.get_mut(key) {
            debug!("Config override {key} = {value}");
            *slot = value.clone();
        } else {
            debug!("Ignoring unknown config override {key}");
        }
    }
}
