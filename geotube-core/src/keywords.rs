//! # Preferred Keyword Extraction
//!
//! Derives one representative token from a user's viewing history by simple
//! frequency counting over tokenised titles.
//!
//! - Titles are lowercased and stripped of everything except letters
//!   (accented Latin letters included), digits and whitespace.
//! - Tokens shorter than [`KeywordConfig::min_token_len`] and stopwords are ignored.
//! - Counts span the whole history, not single entries.
//! - Ties are broken by ranking order: integer tokens (`"0"`, `"2024"`, no
//!   leading zeros, below 2^32 - 1) first in ascending numeric order, then
//!   every other token in first-seen order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::models::HistoryEntry;

const DEFAULT_STOPWORDS: &[&str] = &[
    "de", "el", "la", "los", "las", "un", "una", "y", "en", "con", "para", "por", "a", "del",
    "video", "videos",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub stopwords: Vec<String>,
    pub min_token_len: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            min_token_len: 3,
        }
    }
}

impl KeywordConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read keyword config: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse keyword config: {}", e))
    }

    pub fn extractor(&self) -> KeywordExtractor {
        KeywordExtractor::new(self)
    }
}

pub struct KeywordExtractor {
    stopwords: HashSet<String>,
    min_token_len: usize,
}

impl KeywordExtractor {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            stopwords: config.stopwords.iter().map(|s| s.to_lowercase()).collect(),
            min_token_len: config.min_token_len,
        }
    }

    /// Qualifying tokens of a single title, in order.
    pub fn tokens<'a>(&'a self, title: &str) -> impl Iterator<Item = String> + 'a {
        let cleaned: String = title
            .to_lowercase()
            .chars()
            .filter(|&c| is_kept_char(c))
            .collect();

        cleaned
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into_iter()
            .filter(move |token| {
                token.chars().count() >= self.min_token_len && !self.stopwords.contains(token)
            })
    }

    /// Most frequent token across all titles, or `""` when nothing qualifies.
    pub fn preferred<'t, I>(&self, titles: I) -> String
    where
        I: IntoIterator<Item = &'t str>,
    {
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for title in titles {
            for token in self.tokens(title) {
                match index.get(&token) {
                    Some(&i) => order[i].1 += 1,
                    None => {
                        index.insert(token.clone(), order.len());
                        order.push((token, 1));
                    }
                }
            }
        }

        // stable: non-integer tokens keep first-seen order
        order.sort_by_key(|(token, _)| integer_key(token).map_or((1, 0), |n| (0, n)));

        let mut best = String::new();
        let mut best_count = 0;
        for (token, count) in order {
            if count > best_count {
                best = token;
                best_count = count;
            }
        }
        best
    }

    pub fn preferred_from_history(&self, history: &[HistoryEntry]) -> String {
        self.preferred(history.iter().map(|entry| entry.title.as_str()))
    }
}

/// Canonical integer token: digits only, no leading zero, below `u32::MAX`.
fn integer_key(token: &str) -> Option<u32> {
    if !token.bytes().all(|b| b.is_ascii_digit()) || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    token.parse::<u32>().ok().filter(|&n| n != u32::MAX)
}

fn is_kept_char(c: char) -> bool {
    c.is_ascii_lowercase()
        || c.is_ascii_digit()
        || c.is_whitespace()
        || (('\u{00C0}'..='\u{024F}').contains(&c) && c.is_alphabetic())
}
