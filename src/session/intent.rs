//! Scheduling-intent detection.
//!
//! A pure classifier over utterance text: case-insensitive whole-word match
//! against a configured keyword vocabulary. No state, no side effects; the
//! same input always yields the same answer.

use regex::Regex;

/// Keyword-based intent classifier.
///
/// The vocabulary is compiled once into a single alternation pattern; the
/// detector is then shared read-only across turns.
#[derive(Debug, Clone)]
pub struct IntentDetector {
    pattern: Option<Regex>,
}

impl IntentDetector {
    /// Compile a detector from a keyword vocabulary.
    ///
    /// An empty vocabulary yields a detector that never matches.
    pub fn new(keywords: &[String]) -> Result<Self, regex::Error> {
        let escaped: Vec<String> = keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| regex::escape(k.trim()))
            .collect();

        if escaped.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", escaped.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// True if the text signals scheduling intent.
    pub fn detect(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }
}
