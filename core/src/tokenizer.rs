use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

lazy_static! {
    static ref DEFAULT_STOPWORDS: HashSet<String> = {
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

/// Turns raw words into canonical index terms.
///
/// Indexing and querying must share one configuration: a query term stemmed or
/// filtered differently from the index can never match a posting list.
pub struct TextPipeline {
    stopwords: HashSet<String>,
    stemmer: Stemmer,
}

impl Default for TextPipeline {
    fn default() -> Self {
        Self::with_stopwords(DEFAULT_STOPWORDS.clone())
    }
}

impl TextPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stopwords(stopwords: HashSet<String>) -> Self {
        Self { stopwords, stemmer: Stemmer::create(Algorithm::English) }
    }

    /// Load a newline-delimited stop-word list, replacing the built-in one.
    pub fn from_stopwords_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let stopwords = text
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Ok(Self::with_stopwords(stopwords))
    }

    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }

    /// Normalize one raw word into a term. An empty string means "not a term".
    ///
    /// NFKC + lowercase, trim non-alphanumeric characters from both ends (inner
    /// punctuation such as hyphens survives), drop stop words, then stem.
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.nfkc().collect::<String>().to_lowercase();
        let trimmed = lowered.trim_matches(|c: char| !c.is_alphanumeric());
        if trimmed.is_empty() || self.stopwords.contains(trimmed) {
            return String::new();
        }
        self.stemmer.stem(trimmed).into_owned()
    }

    /// Normalize every whitespace-delimited token of `text`, dropping rejects.
    pub fn terms<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split_whitespace()
            .map(|word| self.normalize(word))
            .filter(|term| !term.is_empty())
    }

    /// Term -> raw frequency over the whole of `text`.
    pub fn term_frequencies(&self, text: &str) -> HashMap<String, u32> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for term in self.terms(text) {
            *counts.entry(term).or_insert(0) += 1;
        }
        counts
    }
}
