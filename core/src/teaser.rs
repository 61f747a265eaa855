//! Teaser excerpts and highlight marking.
//!
//! The index only knows normalized terms ("run"), while the page shows surface
//! text ("Running"). Sentence selection therefore checks both the case-folded
//! text and the normalized tokens of each sentence, and highlighting runs an
//! exact-word pass followed by a looser substring pass.

use crate::query::QueryTerm;
use crate::tokenizer::Tokenizer;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

/// Length of the excerpt used when no sentence matches.
pub const FALLBACK_CHARS: usize = 200;
pub const SEPARATOR: &str = " ... ";
pub const ELLIPSIS: &str = "...";

/// Words kept either side of the match when a sentence is too long.
const CONTEXT_WORDS: usize = 30;
/// Terms shorter than this only get exact-word highlighting.
const MIN_PARTIAL_LEN: usize = 3;
const ABBREVIATIONS: &[&str] = &["mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs"];

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Splits text at `.`, `!` or `?` followed by whitespace or the end of input.
///
/// A single period does not end a sentence after one capital letter ("J. Smith"),
/// after dotted initialisms ("e.g.", "U.S."), or after a short title
/// abbreviation ("Dr."). Periods inside a word never qualify.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | '\u{201d}' | '\u{2019}') {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        if !chars.peek().map_or(true, |&(_, next)| next.is_whitespace()) {
            continue;
        }
        if c == '.' && end == i + 1 && ends_with_abbreviation(&text[start..i]) {
            continue;
        }
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = end;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn ends_with_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(first), None) => first.is_uppercase(),
        _ if word.contains('.') => word.split('.').all(|part| part.chars().count() == 1),
        _ => ABBREVIATIONS.contains(&word.to_lowercase().as_str()),
    }
}

/// True when `text` contains `term` as a case-folded substring or has a token
/// normalizing to it (stems such as "happi" are not substrings of "happy").
fn covers(text: &str, term: &str, tokenizer: &Tokenizer) -> bool {
    text.to_lowercase().contains(term) || tokenizer.terms(text).any(|t| t == term)
}

fn window<'a>(sentence: &'a str, term: &str, tokenizer: &Tokenizer) -> Cow<'a, str> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.len() <= 2 * CONTEXT_WORDS + 1 {
        return Cow::Borrowed(sentence);
    }
    let hit = words.iter().position(|w| covers(w, term, tokenizer)).unwrap_or(0);
    let start = hit.saturating_sub(CONTEXT_WORDS);
    let end = (hit + CONTEXT_WORDS + 1).min(words.len());
    Cow::Owned(words[start..end].join(" "))
}

fn leading_chars(content: &str) -> String {
    match content.char_indices().nth(FALLBACK_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &content[..cut]),
        None => content.to_string(),
    }
}

/// Builds a plain-text excerpt of `content` covering the normalized `terms`.
///
/// One sentence is chosen per term (the first that covers it) until all terms
/// are covered; sentences are joined with [`SEPARATOR`]. Without any match the
/// first [`FALLBACK_CHARS`] characters are used. The heading, or the title when
/// there is no heading, is cut out of the excerpt since it is displayed anyway.
pub fn build_teaser(content: &str, terms: &[&str], heading: Option<&str>, title: &str, tokenizer: &Tokenizer) -> String {
    let sentences = split_sentences(content);
    let mut covered = vec![false; terms.len()];
    let mut parts: Vec<String> = Vec::new();

    for (i, term) in terms.iter().enumerate() {
        if covered[i] {
            continue;
        }
        let Some(sentence) = sentences.iter().find(|s| covers(s, term, tokenizer)) else {
            continue;
        };
        let excerpt = window(sentence, term, tokenizer);
        covered[i] = true;
        for (j, other) in terms.iter().enumerate() {
            if !covered[j] && covers(&excerpt, other, tokenizer) {
                covered[j] = true;
            }
        }
        parts.push(collapse_whitespace(&excerpt));
        if covered.iter().all(|c| *c) {
            break;
        }
    }

    let excerpt = if parts.is_empty() { leading_chars(content) } else { parts.join(SEPARATOR) };
    remove_title(excerpt, heading, title)
}

fn remove_title(excerpt: String, heading: Option<&str>, title: &str) -> String {
    let needle = match heading.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => title.trim(),
    };
    if needle.is_empty() || !excerpt.contains(needle) {
        return excerpt;
    }
    collapse_whitespace(&excerpt.replace(needle, ""))
}

/// Wraps query matches in a pair of marker tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighter {
    open: String,
    close: String,
}

impl Default for Highlighter {
    fn default() -> Self { Self::new("<em>", "</em>") }
}

impl Highlighter {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self { open: open.into(), close: close.into() }
    }

    /// For each (word, term) pair: wrap exact whole-word matches of the word,
    /// then whole words containing the term. Text already wrapped is skipped,
    /// so applying this twice gives the same result as applying it once.
    pub fn highlight(&self, text: &str, terms: &[QueryTerm]) -> String {
        let mut out = text.to_string();
        for qt in terms {
            if let Some(re) = pattern(&format!(r"\b{}\b", regex::escape(&qt.word)), &qt.word) {
                out = self.wrap_unmarked(&out, &re);
            }
            if qt.term.chars().count() >= MIN_PARTIAL_LEN {
                if let Some(re) = pattern(&format!(r"\b\w*{}\w*\b", regex::escape(&qt.term)), &qt.term) {
                    out = self.wrap_unmarked(&out, &re);
                }
            }
        }
        out
    }

    fn wrap_unmarked(&self, text: &str, re: &Regex) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(at) = rest.find(&self.open) {
            out.push_str(&self.wrap(&rest[..at], re));
            let marked = &rest[at..];
            let Some(close_at) = marked[self.open.len()..].find(&self.close) else {
                out.push_str(marked);
                return out;
            };
            let end = self.open.len() + close_at + self.close.len();
            out.push_str(&marked[..end]);
            rest = &marked[end..];
        }
        out.push_str(&self.wrap(rest, re));
        out
    }

    fn wrap<'a>(&self, plain: &'a str, re: &Regex) -> Cow<'a, str> {
        re.replace_all(plain, |caps: &regex::Captures| format!("{}{}{}", self.open, &caps[0], self.close))
    }
}

fn pattern(source: &str, needle: &str) -> Option<Regex> {
    if needle.is_empty() {
        return None;
    }
    RegexBuilder::new(source).case_insensitive(true).build().ok()
}
