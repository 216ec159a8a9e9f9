//! Text normalization shared by the index builder and the query executor.
//!
//! Both sides must tokenize identically or matches silently fail: a document
//! is only found when the stemmed query term equals the stemmed document
//! term. The pipeline is: Unicode word segmentation, lower-casing, Porter
//! stemming, and dropping anything that normalizes to an empty string.
//!
//! Porter stemming assumes English. Non-English text still tokenizes (word
//! segmentation is Unicode-aware), but stems degrade to near-identity and
//! relevance suffers. That is a documented limitation, not an error.

use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer applying case folding and English Porter stemming.
///
/// One instance is created per build or per query and reused for every text
/// field. The tokenizer holds no per-text state, so a single instance may be
/// shared freely.
pub struct TermTokenizer {
    stemmer: Stemmer,
}

impl Default for TermTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TermTokenizer {
    pub fn new() -> Self {
        TermTokenizer {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Produces the normalized stemmed terms of `text`, in text order.
    ///
    /// The returned iterator is lazy and finite; calling `terms` again on the
    /// same text restarts from the beginning. Punctuation-only input yields
    /// an empty sequence.
    pub fn terms<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.unicode_words()
            .map(|word| {
                let folded = word.to_lowercase();
                self.stemmer.stem(&folded).into_owned()
            })
            .filter(|term| !term.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_plural_to_root() {
        let t = TermTokenizer::new();
        assert_eq!(t.terms("dogs").collect::<Vec<_>>(), vec!["dog"]);
        assert_eq!(t.terms("dog").collect::<Vec<_>>(), vec!["dog"]);
    }

    #[test]
    fn case_folds_before_stemming() {
        let t = TermTokenizer::new();
        assert_eq!(t.terms("Running").collect::<Vec<_>>(), vec!["run"]);
        assert_eq!(t.terms("RUNNING").collect::<Vec<_>>(), vec!["run"]);
    }

    #[test]
    fn splits_on_punctuation_and_whitespace() {
        let t = TermTokenizer::new();
        let terms: Vec<String> = t.terms("The dog, ran; quickly!").collect();
        assert_eq!(terms, vec!["the", "dog", "ran", "quickli"]);
    }

    #[test]
    fn punctuation_only_input_yields_nothing() {
        let t = TermTokenizer::new();
        assert_eq!(t.terms("... !!! ---").count(), 0);
        assert_eq!(t.terms("").count(), 0);
    }

    #[test]
    fn restartable_and_deterministic() {
        let t = TermTokenizer::new();
        let first: Vec<String> = t.terms("cats sleep soundly").collect();
        let second: Vec<String> = t.terms("cats sleep soundly").collect();
        assert_eq!(first, second);
    }

    #[test]
    fn query_and_document_sides_agree() {
        // Tokenizer symmetry: a document holding exactly the stemmed form of
        // a query term must produce that same term on both sides.
        let t = TermTokenizer::new();
        let doc: Vec<String> = t.terms("dog").collect();
        let query: Vec<String> = t.terms("dogs").collect();
        assert_eq!(doc, query);
    }

    #[test]
    fn numeric_tokens_survive() {
        let t = TermTokenizer::new();
        assert_eq!(t.terms("error 404 found").collect::<Vec<_>>(), vec![
            "error", "404", "found"
        ]);
    }
}
