use crate::lemmatizer::lemmatize;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Which root-form transform is applied after case folding.
///
/// Exactly one variant is active per tokenizer, so stemming and lemmatization
/// can never both touch the same term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Case folding only.
    None,
    /// Snowball English stemmer.
    #[default]
    Stem,
    /// Rule-based English noun lemmatizer.
    Lemma,
}

impl std::str::FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Normalization::None),
            "stem" | "stemming" => Ok(Normalization::Stem),
            "lemma" | "lemmatize" | "lemmatization" => Ok(Normalization::Lemma),
            other => Err(format!("unknown normalization '{other}' (expected none, stem or lemma)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub normalization: Normalization,
    /// Drop common English function words before normalization.
    #[serde(default)]
    pub remove_stopwords: bool,
    /// Let tokens made only of digits through.
    #[serde(default = "default_keep_numeric")]
    pub keep_numeric: bool,
}

fn default_keep_numeric() -> bool { true }

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { normalization: Normalization::default(), remove_stopwords: false, keep_numeric: true }
    }
}

/// Turns raw text into normalized index terms.
///
/// Holds no mutable state: the same input always yields the same terms,
/// regardless of what was tokenized before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self { Self { config } }

    pub fn config(&self) -> &TokenizerConfig { &self.config }

    /// Splits on non-word characters and case-folds (NFKC, then lowercase).
    /// Stopword and numeric filters apply here; root-form normalization does not.
    pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        WORD.find_iter(text)
            .map(|m| fold_case(m.as_str()))
            .filter(move |token| self.keep(token))
    }

    /// Applies the configured root-form transform to one case-folded token.
    pub fn normalize(&self, token: &str) -> String {
        match self.config.normalization {
            Normalization::None => token.to_string(),
            Normalization::Stem => STEMMER.stem(token).into_owned(),
            Normalization::Lemma => lemmatize(token).into_owned(),
        }
    }

    /// `tokens` followed by `normalize`: the terms the index stores.
    pub fn terms<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        self.tokens(text).map(move |token| self.normalize(&token))
    }

    fn keep(&self, token: &str) -> bool {
        if self.config.remove_stopwords && STOPWORDS.contains(token) {
            return false;
        }
        if !self.config.keep_numeric && token.chars().all(|c| c.is_numeric()) {
            return false;
        }
        true
    }
}

fn fold_case(raw: &str) -> String {
    let folded: Cow<str> = if raw.is_ascii() { Cow::Borrowed(raw) } else { Cow::Owned(raw.nfkc().collect()) };
    folded.to_lowercase()
}
