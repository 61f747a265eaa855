use crate::document::{Document, Field, IndexConfig};
use crate::tokenizer::Tokenizer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Dense per-URL id. Assigned on first insertion, reused on re-index, never recycled.
pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub field: Field,
    /// Occurrences of the term in this field of this document.
    pub tf: u32,
}

/// Postings of a single term, split by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPostings {
    fields: BTreeMap<Field, BTreeMap<DocId, u32>>,
}

impl TermPostings {
    pub fn field(&self, field: Field) -> impl Iterator<Item = Posting> + '_ {
        self.fields
            .get(&field)
            .into_iter()
            .flat_map(move |docs| docs.iter().map(move |(&doc_id, &tf)| Posting { doc_id, field, tf }))
    }

    /// All postings, ordered by field then doc id.
    pub fn iter(&self) -> impl Iterator<Item = Posting> + '_ {
        self.fields
            .iter()
            .flat_map(|(&field, docs)| docs.iter().map(move |(&doc_id, &tf)| Posting { doc_id, field, tf }))
    }

    /// Documents containing the term in any field.
    pub fn docs(&self) -> BTreeSet<DocId> {
        self.fields.values().flat_map(|docs| docs.keys().copied()).collect()
    }

    pub fn tf(&self, doc_id: DocId, field: Field) -> u32 {
        self.fields.get(&field).and_then(|docs| docs.get(&doc_id)).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    fn insert(&mut self, doc_id: DocId, field: Field, tf: u32) {
        self.fields.entry(field).or_default().insert(doc_id, tf);
    }

    fn remove(&mut self, doc_id: DocId, field: Field) {
        if let Some(docs) = self.fields.get_mut(&field) {
            docs.remove(&doc_id);
            if docs.is_empty() {
                self.fields.remove(&field);
            }
        }
    }
}

/// Term frequencies of one document, per field, ready to be merged into the index.
pub type FieldTerms = BTreeMap<Field, HashMap<String, u32>>;

/// Tokenizes every field of `doc` independently.
pub fn analyze(tokenizer: &Tokenizer, doc: &Document) -> FieldTerms {
    let mut out = FieldTerms::new();
    for field in Field::ALL {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for term in tokenizer.terms(doc.field(field)) {
            *counts.entry(term).or_insert(0) += 1;
        }
        if !counts.is_empty() {
            out.insert(field, counts);
        }
    }
    out
}

/// Inverted index plus the stored-field table, sharing the URL key space.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    pub config: IndexConfig,
    pub(crate) postings: HashMap<String, TermPostings>,
    pub(crate) docs: BTreeMap<DocId, Document>,
    pub(crate) doc_ids: HashMap<String, DocId>,
    pub(crate) next_doc_id: DocId,
}

impl InvertedIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn tokenizer(&self) -> Tokenizer { Tokenizer::new(self.config.tokenizer.clone()) }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn doc_id(&self, url: &str) -> Option<DocId> { self.doc_ids.get(url).copied() }

    pub fn get(&self, url: &str) -> Option<&Document> {
        self.doc_id(url).and_then(|id| self.docs.get(&id))
    }

    pub fn get_by_id(&self, doc_id: DocId) -> Option<&Document> { self.docs.get(&doc_id) }

    /// Documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.docs.iter().map(|(&id, doc)| (id, doc))
    }

    pub fn term_postings(&self, term: &str) -> Option<&TermPostings> { self.postings.get(term) }

    /// Tokenizes and inserts `doc`, replacing whatever was stored under its URL.
    pub fn add_document(&mut self, doc: Document) -> Result<DocId> {
        let terms = analyze(&self.tokenizer(), &doc);
        self.replace(doc, terms)
    }

    /// Inserts a document whose terms were computed up front with this index's tokenizer.
    pub(crate) fn replace(&mut self, doc: Document, terms: FieldTerms) -> Result<DocId> {
        if doc.url.trim().is_empty() {
            return Err(Error::InvalidDocument("document url is empty".into()));
        }
        let doc_id = match self.doc_ids.get(&doc.url) {
            Some(&id) => {
                self.remove_postings(id);
                id
            }
            None => {
                let id = self.next_doc_id;
                self.next_doc_id += 1;
                self.doc_ids.insert(doc.url.clone(), id);
                id
            }
        };
        for (field, counts) in terms {
            for (term, tf) in counts {
                self.postings.entry(term).or_default().insert(doc_id, field, tf);
            }
        }
        self.docs.insert(doc_id, doc);
        Ok(doc_id)
    }

    /// Drops every posting of `doc_id`. The stored document is re-analyzed to find
    /// its terms, which is exact because tokenization is deterministic.
    fn remove_postings(&mut self, doc_id: DocId) {
        let Some(old) = self.docs.get(&doc_id) else { return };
        let old_terms = analyze(&self.tokenizer(), old);
        for (field, counts) in old_terms {
            for term in counts.into_keys() {
                if let Some(tp) = self.postings.get_mut(&term) {
                    tp.remove(doc_id, field);
                    if tp.is_empty() {
                        self.postings.remove(&term);
                    }
                }
            }
        }
    }

    /// Checks that every posting and every URL mapping points at a stored document.
    pub fn check_integrity(&self) -> Result<()> {
        for (term, tp) in &self.postings {
            if tp.is_empty() {
                return Err(Error::Corrupt(format!("term '{term}' has no postings")));
            }
            if let Some(p) = tp.iter().find(|p| !self.docs.contains_key(&p.doc_id)) {
                return Err(Error::Corrupt(format!("term '{term}' references missing doc {}", p.doc_id)));
            }
        }
        for (url, id) in &self.doc_ids {
            match self.docs.get(id) {
                Some(doc) if &doc.url == url => {}
                _ => return Err(Error::Corrupt(format!("url {url} maps to missing doc {id}"))),
            }
            if *id >= self.next_doc_id {
                return Err(Error::Corrupt(format!("doc id {id} is beyond the id counter")));
            }
        }
        if self.doc_ids.len() != self.docs.len() {
            return Err(Error::Corrupt("stored documents and url map differ in size".into()));
        }
        Ok(())
    }
}
