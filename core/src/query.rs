use crate::document::Field;
use crate::index::{DocId, InvertedIndex, TermPostings};
use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::collections::BTreeSet;

/// One query word paired with the index term it normalizes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTerm {
    /// Case-folded surface form, used for exact-word highlighting.
    pub word: String,
    /// Normalized form, used for matching.
    pub term: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub raw: String,
    pub terms: Vec<QueryTerm>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Normalized terms without repeats, in the order they were typed.
    pub fn distinct_terms(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.terms
            .iter()
            .map(|qt| qt.term.as_str())
            .filter(|term| seen.insert(*term))
            .collect()
    }
}

/// Splits on whitespace and normalizes each word with `tokenizer`.
///
/// The tokenizer must be the one the index was built with, otherwise stemmed
/// and unstemmed forms stop meeting and recall quietly drops.
pub fn parse_query(text: &str, tokenizer: &Tokenizer) -> ParsedQuery {
    let terms = text
        .split_whitespace()
        .flat_map(|word| tokenizer.tokens(word))
        .map(|word| {
            let term = tokenizer.normalize(&word);
            QueryTerm { word, term }
        })
        .collect();
    ParsedQuery { raw: text.to_string(), terms }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    pub term: String,
    pub field: Field,
    pub tf: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
    pub matches: Vec<FieldMatch>,
}

impl InvertedIndex {
    /// Conjunctive search: a document qualifies only if every query term occurs
    /// in at least one of its fields. Score is the sum of field weight times term
    /// frequency; equal scores keep insertion order.
    pub fn search(&self, query: &ParsedQuery) -> Vec<SearchHit> {
        let terms = query.distinct_terms();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut lists: Vec<(&str, &TermPostings)> = Vec::with_capacity(terms.len());
        for term in terms {
            match self.postings.get(term) {
                Some(tp) => lists.push((term, tp)),
                None => return Vec::new(),
            }
        }

        let mut by_size: Vec<BTreeSet<DocId>> = lists.iter().map(|(_, tp)| tp.docs()).collect();
        by_size.sort_by_key(|docs| docs.len());
        let mut sets = by_size.into_iter();
        let mut candidates = sets.next().unwrap_or_default();
        for docs in sets {
            candidates.retain(|id| docs.contains(id));
            if candidates.is_empty() {
                return Vec::new();
            }
        }

        let weights = &self.config.weights;
        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .map(|doc_id| {
                let mut score = 0.0f32;
                let mut matches = Vec::new();
                for (term, tp) in &lists {
                    for field in Field::ALL {
                        let tf = tp.tf(doc_id, field);
                        if tf > 0 {
                            score += weights.weight(field) * tf as f32;
                            matches.push(FieldMatch { term: term.to_string(), field, tf });
                        }
                    }
                }
                SearchHit { doc_id, score, matches }
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        hits
    }
}
