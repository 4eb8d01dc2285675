use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<String> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().map(|w| w.to_string()).collect()
    };
}

/// Turns raw text into the canonical term sequence both indexes are keyed by.
///
/// Documents and query fragments must go through the same rules, otherwise
/// indexed terms and looked-up terms are not comparable.
pub trait Normalizer {
    fn normalize_document(&self, text: &str) -> Vec<String>;

    fn normalize_query_fragment(&self, text: &str) -> Vec<String> {
        self.normalize_document(text)
    }
}

/// NFKC + lowercase + stop-word removal + English Snowball stemming.
#[derive(Debug, Clone, Default)]
pub struct EnglishNormalizer {
    /// `None` means the built-in list.
    stopwords: Option<HashSet<String>>,
}

impl EnglishNormalizer {
    pub fn new() -> Self { Self::default() }

    pub fn with_stopwords(stopwords: HashSet<String>) -> Self {
        Self { stopwords: Some(stopwords) }
    }

    /// Load a stop-word list with one word per line. Blank lines are ignored.
    pub fn from_stopword_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).with_context(|| format!("reading stop words from {}", path.display()))?;
        let words: HashSet<String> = String::from_utf8_lossy(&raw)
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        tracing::info!(path = %path.display(), count = words.len(), "loaded stop words");
        Ok(Self::with_stopwords(words))
    }

    fn is_stopword(&self, token: &str) -> bool {
        match &self.stopwords {
            Some(words) => words.contains(token),
            None => STOPWORDS.contains(token),
        }
    }
}

impl Normalizer for EnglishNormalizer {
    fn normalize_document(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        RE.find_iter(&normalized)
            .map(|m| m.as_str())
            .filter(|token| !self.is_stopword(token))
            .map(|token| STEMMER.stem(token).to_string())
            .collect()
    }
}

/// Tokenize text into (term, offset) with the built-in stop-word list.
/// Offsets count surviving terms only, so they are dense.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    EnglishNormalizer::new()
        .normalize_document(text)
        .into_iter()
        .enumerate()
        .map(|(pos, term)| (term, pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert!(t.iter().any(|(w, _)| w == "run"));
    }

    #[test]
    fn offsets_skip_stopwords() {
        let t = tokenize("the information of the retrieval");
        let positions: Vec<usize> = t.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(t[0].0, STEMMER.stem("information"));
    }

    #[test]
    fn query_fragment_matches_document_rules() {
        let n = EnglishNormalizer::new();
        assert_eq!(n.normalize_query_fragment("Retrieval"), n.normalize_document("retrieval"));
        assert!(n.normalize_query_fragment("the").is_empty());
    }

    #[test]
    fn custom_stopwords_replace_builtin() {
        let n = EnglishNormalizer::with_stopwords(["retrieval".to_string()].into_iter().collect());
        assert_eq!(n.normalize_document("the retrieval"), vec!["the".to_string()]);
    }

    #[test]
    fn digits_are_terms() {
        let t = tokenize("chapter 42");
        assert!(t.iter().any(|(w, _)| w == "42"));
    }
}
