use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use stop_words::{get, LANGUAGE};

use crate::config::TokenizerConfig;

/// Text tokenizer shared by index builds and query phrases
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig) -> Self {
        let stemmer = if config.stem {
            Some(Stemmer::create(Algorithm::English))
        } else {
            None
        };

        let stopwords = if config.remove_stopwords {
            get(LANGUAGE::English)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect()
        } else {
            HashSet::new()
        };

        Self {
            config: config.clone(),
            stemmer,
            stopwords,
        }
    }

    /// Tokenize text into a vector of terms
    ///
    /// Words are maximal runs of alphanumeric characters; anything else is a
    /// boundary. Tokens shorter than `min_token_length` characters are dropped.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .filter_map(|word| self.normalize(word))
            .collect()
    }

    /// Compute term frequencies for a piece of text
    pub fn compute_term_frequencies(&self, text: &str) -> HashMap<String, u32> {
        let mut freq = HashMap::new();
        for token in self.tokenize(text) {
            *freq.entry(token).or_insert(0) += 1;
        }
        freq
    }

    /// Get unique terms from text, in first-seen order
    pub fn unique_terms(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tokenize(text)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    fn normalize(&self, word: &str) -> Option<String> {
        let token = if self.config.lowercase {
            word.to_lowercase()
        } else {
            word.to_string()
        };

        if token.chars().count() < self.config.min_token_length {
            return None;
        }
        if self.stopwords.contains(&token) {
            return None;
        }

        match &self.stemmer {
            Some(stemmer) => Some(stemmer.stem(&token).to_string()),
            None => Some(token),
        }
    }
}
