//! Edit-distance phrase detection tolerant of OCR noise.

use tracing::trace;

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;

use super::patterns::ANY_SPACE;
use super::Result;

/// Case-insensitive Levenshtein distance, counted in characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(&a.to_uppercase(), &b.to_uppercase())
}

/// Outcome of a phrase search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseMatch {
    /// Some window reached the threshold.
    pub matched: bool,
    /// Highest similarity seen, in percent.
    pub similarity: f64,
}

/// Slides each target phrase across the text and scores every window.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    phrases: Vec<Vec<char>>,
    threshold: f64,
}

impl FuzzyMatcher {
    /// Create a matcher for `phrases` with a similarity threshold in percent.
    pub fn new<S: AsRef<str>>(phrases: &[S], threshold: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ExtractionError::InvalidThreshold(threshold));
        }

        let phrases = phrases
            .iter()
            .map(|phrase| {
                let phrase = phrase.as_ref();
                let cleaned = clean(phrase);
                if cleaned.is_empty() {
                    Err(ExtractionError::InvalidPhrase(phrase.to_string()))
                } else {
                    Ok(cleaned.chars().collect())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { phrases, threshold })
    }

    /// Build a matcher from the extraction configuration.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Self::new(&config.target_phrases, config.similarity_threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Search `text` for any target phrase.
    ///
    /// Every window is scored so the reported similarity is the maximum;
    /// the search stops early only on an exact occurrence. Phrases longer
    /// than the text are skipped.
    pub fn best_match(&self, text: &str) -> PhraseMatch {
        let mut best = PhraseMatch {
            matched: false,
            similarity: 0.0,
        };

        let text: Vec<char> = clean(text).chars().collect();
        if text.is_empty() {
            return best;
        }

        for phrase in &self.phrases {
            let window = phrase.len();
            if text.len() < window {
                continue;
            }
            let target: String = phrase.iter().collect();

            for start in 0..=text.len() - window {
                let segment: String = text[start..start + window].iter().collect();
                let distance = strsim::levenshtein(&segment, &target);
                let similarity = (1.0 - distance as f64 / window as f64) * 100.0;

                if similarity > best.similarity {
                    best.similarity = similarity;
                }
                if similarity >= self.threshold {
                    if !best.matched {
                        trace!("'{}' matched '{}' at {:.2}%", segment, target, similarity);
                    }
                    best.matched = true;
                    if distance == 0 {
                        return best;
                    }
                }
            }
        }

        best
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        let config = ExtractionConfig::default();
        Self {
            phrases: config
                .target_phrases
                .iter()
                .map(|p| clean(p).chars().collect())
                .collect(),
            threshold: config.similarity_threshold,
        }
    }
}

/// Uppercase and collapse whitespace runs.
fn clean(text: &str) -> String {
    ANY_SPACE
        .replace_all(&text.to_uppercase(), " ")
        .trim()
        .to_string()
}
