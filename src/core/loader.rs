//! Turning raw descriptions into cleaned words.
//!
//! Cleaning is lowercase → ordered `regex` substitutions → ordered `trouble`
//! substitutions. Several originals may collapse onto one cleaned word; the
//! [`LoadedWords`] value keeps both directions of that mapping.

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::core::config::OptimusConfig;
use crate::core::errors::{OptimusError, Result};

/// Raw input accepted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InputData {
    /// Single-column records; only the first cell of each record is used
    Records(Vec<Vec<String>>),
    /// A plain series of descriptions
    Series(Vec<String>),
}

impl From<Vec<String>> for InputData {
    fn from(series: Vec<String>) -> Self {
        Self::Series(series)
    }
}

impl From<Vec<Vec<String>>> for InputData {
    fn from(records: Vec<Vec<String>>) -> Self {
        Self::Records(records)
    }
}

impl From<Vec<&str>> for InputData {
    fn from(series: Vec<&str>) -> Self {
        Self::Series(series.into_iter().map(str::to_string).collect())
    }
}

/// Compiled cleaning rules.
#[derive(Debug, Clone)]
pub struct CleaningRules {
    substitutions: Vec<(Regex, String)>,
}

impl CleaningRules {
    /// Compile the `regex` and `trouble` rules of a configuration, in order.
    pub fn from_config(config: &OptimusConfig) -> Result<Self> {
        let ordered = config
            .regex
            .iter()
            .map(|(pattern, replacement)| (pattern.as_str(), replacement.as_str()))
            .chain(
                config
                    .trouble
                    .iter()
                    .map(|(pattern, replacement)| (pattern.as_str(), replacement.as_str())),
            );

        let mut substitutions = Vec::new();
        for (pattern, replacement) in ordered {
            let compiled = Regex::new(pattern).map_err(|e| {
                OptimusError::config(format!("invalid cleaning pattern '{pattern}': {e}"))
            })?;
            substitutions.push((compiled, replacement.to_string()));
        }

        Ok(Self { substitutions })
    }

    /// Clean a single raw description.
    pub fn clean(&self, raw: &str) -> String {
        let mut text = raw.to_lowercase();
        for (pattern, replacement) in &self.substitutions {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }
        text
    }
}

/// The result of loading: distinct words plus the original ↔ word mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedWords {
    /// Distinct non-empty cleaned words, first-seen order
    pub words: Vec<String>,
    /// original → cleaned word (cleaned may be empty)
    pub lookup: IndexMap<String, String>,
    /// cleaned word → every original that produced it
    pub originals: IndexMap<String, Vec<String>>,
}

impl LoadedWords {
    /// Originals that produced `word`.
    pub fn originals_of(&self, word: &str) -> &[String] {
        self.originals.get(word).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Clean raw input into [`LoadedWords`].
///
/// Fails with an input error if there are no descriptions or a record is empty.
pub fn load(input: &InputData, rules: &CleaningRules) -> Result<LoadedWords> {
    let raw: Vec<&str> = match input {
        InputData::Records(records) => {
            if records.is_empty() {
                return Err(OptimusError::input("No descriptions were provided"));
            }
            let mut firsts = Vec::with_capacity(records.len());
            for (row, record) in records.iter().enumerate() {
                let first = record.first().ok_or_else(|| {
                    OptimusError::input(format!("Record {row} has no columns"))
                })?;
                firsts.push(first.as_str());
            }
            firsts
        }
        InputData::Series(series) => {
            if series.is_empty() {
                return Err(OptimusError::input("No descriptions were provided"));
            }
            series.iter().map(String::as_str).collect()
        }
    };

    let mut loaded = LoadedWords::default();
    for original in raw {
        if loaded.lookup.contains_key(original) {
            continue;
        }
        let cleaned = rules.clean(original);
        loaded
            .lookup
            .insert(original.to_string(), cleaned.clone());
        if cleaned.is_empty() {
            continue;
        }
        let entry = loaded.originals.entry(cleaned.clone()).or_default();
        if entry.is_empty() {
            loaded.words.push(cleaned);
        }
        entry.push(original.to_string());
    }

    debug!(
        "Loaded {} originals into {} distinct words",
        loaded.lookup.len(),
        loaded.words.len()
    );
    Ok(loaded)
}
