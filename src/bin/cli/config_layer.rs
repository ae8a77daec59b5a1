//! Configuration Layer Management
//!
//! Layers the built-in (or a base file) defaults, a user configuration file
//! and CLI overrides into one validated [`OptimusConfig`].

use serde_json::{Map, Value};

use crate::cli::args::RunArgs;
use optimus_rs::core::config::{ConfigLoader, OptimusConfig};

/// Convert CLI arguments to partial configuration overrides
pub trait FromCliArgs<T> {
    /// Create a partial configuration from CLI arguments
    fn from_cli_args(args: &T) -> Self;
}

/// Only flags the user actually passed become overrides.
impl FromCliArgs<RunArgs> for Map<String, Value> {
    fn from_cli_args(args: &RunArgs) -> Self {
        let mut overrides = Map::new();
        let mut set = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        };

        set("data", args.data.as_ref().map(|p| Value::from(p.display().to_string())));
        set("out", args.out.as_ref().map(|p| Value::from(p.display().to_string())));
        set("distance", args.distance.map(Value::from));
        set("cutoff", args.cutoff.map(Value::from));
        set("stepsize", args.stepsize.map(Value::from));
        set("lev_threshold", args.lev_threshold.map(Value::from));
        set("wg_threshold", args.wg_threshold.map(Value::from));
        set("ng_threshold", args.ng_threshold.map(Value::from));
        set("min_cluster", args.min_cluster.map(Value::from));
        set("model", args.model.clone().map(Value::from));
        set(
            "wordnet",
            args.wordnet.as_ref().map(|p| Value::from(p.display().to_string())),
        );
        set("regroup_labels", args.regroup_labels.then_some(Value::Bool(true)));
        set(
            "knn_out",
            args.knn_out.as_ref().map(|p| Value::from(p.display().to_string())),
        );
        overrides
    }
}

/// Build the run configuration: defaults → config file → CLI flags.
pub fn load_run_config(args: &RunArgs) -> anyhow::Result<OptimusConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.default_config {
        loader = loader.with_default_file(path);
    }
    if let Some(path) = &args.config {
        loader = loader.with_user_file(path);
    }
    let config = loader
        .with_overrides(Map::from_cli_args(args))
        .load()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unset_flags_produce_no_overrides() {
        let overrides = Map::from_cli_args(&RunArgs::default());
        assert!(overrides.is_empty());
    }

    #[test]
    fn flags_override_defaults() {
        let args = RunArgs {
            data: Some(PathBuf::from("items.csv")),
            cutoff: Some(3.0),
            regroup_labels: true,
            ..RunArgs::default()
        };
        let config = load_run_config(&args).unwrap();
        assert_eq!(config.cutoff, 3.0);
        assert!(config.regroup_labels);
        assert_eq!(config.data, Some(PathBuf::from("items.csv")));
        assert_eq!(config.distance, OptimusConfig::default().distance);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let args = RunArgs {
            stepsize: Some(-1.0),
            ..RunArgs::default()
        };
        assert!(load_run_config(&args).is_err());
    }
}
