//! Read-only WordNet noun database.
//!
//! Loads `index.noun`, `data.noun` and (optionally) `noun.exc` from a WordNet
//! 3.x `dict` directory. Only noun synsets and their hypernym and
//! instance-hypernym pointers are kept.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;

use tracing::info;

use crate::core::errors::{OptimusError, Result};

/// Synset identifier: the byte offset in `data.noun`.
pub type SynsetId = u32;

/// Detachment rules for plural nouns, tried in order.
const NOUN_SUFFIXES: [(&str, &str); 9] = [
    ("s", ""),
    ("ses", "s"),
    ("ves", "f"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

#[derive(Debug, Clone)]
struct SynsetEntry {
    name: String,
    hypernyms: Vec<SynsetId>,
}

/// In-memory noun hierarchy.
#[derive(Debug, Clone, Default)]
pub struct WordNet {
    index: HashMap<String, Vec<SynsetId>>,
    synsets: HashMap<SynsetId, SynsetEntry>,
    exceptions: HashMap<String, Vec<String>>,
}

impl WordNet {
    /// Load from a WordNet `dict` directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |file: &str| {
            let path = dir.join(file);
            fs::read_to_string(&path).map_err(|e| {
                OptimusError::io(format!("Failed to read WordNet file {}", path.display()), e)
            })
        };

        let index = read("index.noun")?;
        let data = read("data.noun")?;
        let exceptions = if dir.join("noun.exc").exists() {
            Some(read("noun.exc")?)
        } else {
            None
        };

        let wordnet = Self::from_sources(&index, &data, exceptions.as_deref())?;
        info!(
            "Loaded WordNet from {} ({} noun synsets)",
            dir.display(),
            wordnet.synset_count()
        );
        Ok(wordnet)
    }

    /// Build from the contents of the three noun files.
    pub fn from_sources(index_noun: &str, data_noun: &str, noun_exc: Option<&str>) -> Result<Self> {
        let mut wordnet = Self::default();
        wordnet.parse_index(index_noun)?;
        wordnet.parse_data(data_noun)?;
        if let Some(exc) = noun_exc {
            wordnet.parse_exceptions(exc);
        }
        Ok(wordnet)
    }

    fn parse_index(&mut self, content: &str) -> Result<()> {
        for (line_no, line) in content.lines().enumerate() {
            if line.is_empty() || line.starts_with(' ') {
                continue;
            }
            let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
            if tokens.len() < 6 {
                return Err(malformed("index.noun", line_no, "too few fields"));
            }
            let synset_count: usize = tokens[2]
                .parse()
                .map_err(|_| malformed("index.noun", line_no, "bad synset count"))?;
            let pointer_count: usize = tokens[3]
                .parse()
                .map_err(|_| malformed("index.noun", line_no, "bad pointer count"))?;
            let first_offset = 4 + pointer_count + 2;
            if tokens.len() < first_offset + synset_count {
                return Err(malformed("index.noun", line_no, "missing synset offsets"));
            }
            let offsets = tokens[first_offset..first_offset + synset_count]
                .iter()
                .map(|t| t.parse::<SynsetId>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| malformed("index.noun", line_no, "bad synset offset"))?;
            self.index.insert(normalize_lemma(tokens[0]), offsets);
        }
        Ok(())
    }

    fn parse_data(&mut self, content: &str) -> Result<()> {
        for (line_no, line) in content.lines().enumerate() {
            if line.is_empty() || line.starts_with(' ') {
                continue;
            }
            let fields = line.split_once('|').map_or(line, |(left, _)| left);
            let tokens: Vec<&str> = fields.split_ascii_whitespace().collect();
            if tokens.len() < 6 {
                return Err(malformed("data.noun", line_no, "too few fields"));
            }
            let offset: SynsetId = tokens[0]
                .parse()
                .map_err(|_| malformed("data.noun", line_no, "bad offset"))?;
            let word_count = usize::from_str_radix(tokens[3], 16)
                .map_err(|_| malformed("data.noun", line_no, "bad word count"))?;
            if word_count == 0 {
                return Err(malformed("data.noun", line_no, "synset without words"));
            }
            let pointer_at = 4 + word_count * 2;
            if tokens.len() <= pointer_at {
                return Err(malformed("data.noun", line_no, "missing pointer count"));
            }
            let name = tokens[4].to_lowercase();
            let pointer_count: usize = tokens[pointer_at]
                .parse()
                .map_err(|_| malformed("data.noun", line_no, "bad pointer count"))?;
            if tokens.len() < pointer_at + 1 + pointer_count * 4 {
                return Err(malformed("data.noun", line_no, "incomplete pointer block"));
            }

            let mut hypernyms = Vec::new();
            for pointer in tokens[pointer_at + 1..pointer_at + 1 + pointer_count * 4].chunks(4) {
                if (pointer[0] == "@" || pointer[0] == "@i") && pointer[2] == "n" {
                    let target = pointer[1]
                        .parse()
                        .map_err(|_| malformed("data.noun", line_no, "bad pointer target"))?;
                    hypernyms.push(target);
                }
            }
            self.synsets.insert(offset, SynsetEntry { name, hypernyms });
        }
        Ok(())
    }

    fn parse_exceptions(&mut self, content: &str) {
        for line in content.lines() {
            let mut tokens = line.split_ascii_whitespace();
            if let Some(inflected) = tokens.next() {
                let bases: Vec<String> = tokens.map(normalize_lemma).collect();
                if !bases.is_empty() {
                    self.exceptions.insert(normalize_lemma(inflected), bases);
                }
            }
        }
    }

    /// Number of noun synsets.
    pub fn synset_count(&self) -> usize {
        self.synsets.len()
    }

    /// Base forms of `word` present in the noun index.
    ///
    /// The exception list takes precedence over the suffix rules; the word
    /// itself is always tried first.
    pub fn morphy(&self, word: &str) -> Vec<String> {
        let word = normalize_lemma(word);
        let mut candidates = vec![word.clone()];
        match self.exceptions.get(&word) {
            Some(bases) => candidates.extend(bases.iter().cloned()),
            None => {
                for (suffix, replacement) in NOUN_SUFFIXES {
                    if let Some(stem) = word.strip_suffix(suffix) {
                        candidates.push(format!("{stem}{replacement}"));
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|form| self.index.contains_key(form))
            .filter(|form| seen.insert(form.clone()))
            .collect()
    }

    /// Noun senses of `word`, in index order.
    pub fn synsets(&self, word: &str) -> Vec<SynsetId> {
        let mut seen = HashSet::new();
        self.morphy(word)
            .iter()
            .flat_map(|form| self.index.get(form).into_iter().flatten().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Name of a synset: its first lemma, lower-cased.
    pub fn name(&self, id: SynsetId) -> Option<&str> {
        self.synsets.get(&id).map(|s| s.name.as_str())
    }

    /// Direct hypernyms and instance hypernyms of a synset.
    pub fn hypernyms(&self, id: SynsetId) -> &[SynsetId] {
        self.synsets
            .get(&id)
            .map(|s| s.hypernyms.as_slice())
            .unwrap_or(&[])
    }

    /// Minimum distance from any of `starts` to every reachable ancestor,
    /// keyed by synset name. The starts themselves are at distance 0.
    pub fn ancestor_distances(&self, starts: &[SynsetId]) -> HashMap<String, usize> {
        let mut by_id: HashMap<SynsetId, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        for &start in starts {
            if by_id.insert(start, 0).is_none() {
                queue.push_back(start);
            }
        }
        while let Some(id) = queue.pop_front() {
            let next = by_id[&id] + 1;
            for &parent in self.hypernyms(id) {
                if !by_id.contains_key(&parent) {
                    by_id.insert(parent, next);
                    queue.push_back(parent);
                }
            }
        }

        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (id, distance) in by_id {
            if let Some(name) = self.name(id) {
                let slot = by_name.entry(name.to_string()).or_insert(distance);
                *slot = (*slot).min(distance);
            }
        }
        by_name
    }
}

fn normalize_lemma(text: &str) -> String {
    text.trim().to_lowercase().replace(' ', "_")
}

fn malformed(file: &str, line_no: usize, what: &str) -> OptimusError {
    OptimusError::validation_field(
        format!("{file}:{} malformed line ({what})", line_no + 1),
        file,
    )
}


#[cfg(test)]
mod tests {
    use super::fixture;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn license_lines_are_skipped() {
        let wordnet = fixture::wordnet();
        assert_eq!(wordnet.synset_count(), 11);
        assert_eq!(wordnet.name(600), Some("biscuit"));
    }

    #[test]
    fn morphy_applies_suffix_rules_and_exceptions() {
        let wordnet = fixture::wordnet();
        assert_eq!(wordnet.morphy("biscuits"), vec!["biscuit".to_string()]);
        assert_eq!(wordnet.morphy("geese"), vec!["goose".to_string()]);
        assert_eq!(wordnet.morphy("Pizza"), vec!["pizza".to_string()]);
        assert!(wordnet.morphy("spaceship").is_empty());
    }

    #[test]
    fn synonyms_share_a_synset() {
        let wordnet = fixture::wordnet();
        assert_eq!(wordnet.synsets("cookies"), vec![600]);
        assert_eq!(wordnet.synsets("auto"), wordnet.synsets("car"));
    }

    #[test]
    fn ancestor_distances_take_the_minimum() {
        let wordnet = fixture::wordnet();
        let distances = wordnet.ancestor_distances(&[400, 300]);
        assert_eq!(distances.get("pizza"), Some(&0));
        assert_eq!(distances.get("dish"), Some(&0));
        assert_eq!(distances.get("food"), Some(&1));
        assert_eq!(distances.get("entity"), Some(&2));
        assert!(distances.get("vehicle").is_none());
    }

    #[test]
    fn instance_hypernyms_are_followed() {
        let wordnet = fixture::wordnet();
        assert_eq!(wordnet.hypernyms(975), [100u32].as_slice());
    }

    #[test]
    fn loads_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.noun"), fixture::INDEX).unwrap();
        fs::write(dir.path().join("data.noun"), fixture::DATA).unwrap();

        let wordnet = WordNet::load(dir.path()).unwrap();
        assert_eq!(wordnet.synset_count(), 11);
        assert!(wordnet.morphy("geese").is_empty());
    }

    #[test]
    fn missing_files_are_io_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            WordNet::load(dir.path()),
            Err(OptimusError::Io { .. })
        ));
    }

    #[test]
    fn malformed_data_is_reported() {
        let err = WordNet::from_sources(fixture::INDEX, "00000100 03 n zz entity 0 000\n", None)
            .unwrap_err();
        assert!(matches!(err, OptimusError::Validation { .. }));
    }
}
