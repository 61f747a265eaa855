use crate::document::{Document, IndexConfig};
use crate::index::{analyze, DocId, InvertedIndex, TermPostings};
use crate::persist::{load_index, save_index, IndexPaths};
use crate::query::{parse_query, FieldMatch, ParsedQuery, SearchHit};
use crate::teaser::{build_teaser, Highlighter};
use crate::tokenizer::Tokenizer;
use crate::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Shown when a page has neither heading nor title.
pub const NO_TITLE: &str = "No title";

/// One presented search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub doc_id: DocId,
    pub url: String,
    pub score: f32,
    /// Heading (or title) with highlight marks.
    pub title: String,
    pub keywords: Option<String>,
    pub description: Option<String>,
    /// Excerpt with highlight marks.
    pub teaser: String,
    pub matches: Vec<FieldMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub total_hits: usize,
    pub results: Vec<ResultEntry>,
}

/// Handle to one index: a single writer and any number of readers share it.
///
/// Writers tokenize outside the lock and swap a document's postings and stored
/// fields under one write guard, so readers see either the old or the new
/// version of a page, never a mix.
#[derive(Clone)]
pub struct SearchIndex {
    inner: Arc<RwLock<InvertedIndex>>,
    tokenizer: Tokenizer,
    paths: Option<IndexPaths>,
    highlighter: Highlighter,
}

impl SearchIndex {
    fn from_index(index: InvertedIndex, paths: Option<IndexPaths>) -> Self {
        Self {
            tokenizer: index.tokenizer(),
            inner: Arc::new(RwLock::new(index)),
            paths,
            highlighter: Highlighter::default(),
        }
    }

    /// An index that lives only as long as its handles.
    pub fn in_memory(config: IndexConfig) -> Self {
        Self::from_index(InvertedIndex::new(config), None)
    }

    /// Opens the index stored at `root`, or creates an empty one there.
    ///
    /// An existing index keeps the configuration it was built with; asking for a
    /// different one is an error rather than a silent tokenizer mismatch.
    pub fn open<P: AsRef<Path>>(root: P, config: IndexConfig) -> Result<Self> {
        let paths = IndexPaths::new(root);
        if paths.exists() {
            let index = load_index(&paths)?;
            if index.config != config {
                return Err(Error::ConfigMismatch { path: paths.root.clone() });
            }
            tracing::info!(root = %paths.root.display(), num_docs = index.len(), "opened index");
            return Ok(Self::from_index(index, Some(paths)));
        }
        Self::create(paths.root, config)
    }

    /// Writes an empty index at `root`, replacing any snapshot already there.
    pub fn create<P: AsRef<Path>>(root: P, config: IndexConfig) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let index = InvertedIndex::new(config);
        save_index(&paths, &index)?;
        tracing::info!(root = %paths.root.display(), "created index");
        Ok(Self::from_index(index, Some(paths)))
    }

    /// Opens an index that must already exist, using its stored configuration.
    pub fn open_existing<P: AsRef<Path>>(root: P) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let index = load_index(&paths)?;
        tracing::info!(root = %paths.root.display(), num_docs = index.len(), num_terms = index.num_terms(), "opened index");
        Ok(Self::from_index(index, Some(paths)))
    }

    pub fn with_highlighter(mut self, highlighter: Highlighter) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn config(&self) -> IndexConfig { self.inner.read().config.clone() }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    pub fn len(&self) -> usize { self.inner.read().len() }

    pub fn is_empty(&self) -> bool { self.inner.read().is_empty() }

    pub fn num_terms(&self) -> usize { self.inner.read().num_terms() }

    pub fn add_document(&self, doc: Document) -> Result<DocId> {
        let terms = analyze(&self.tokenizer, &doc);
        self.inner.write().replace(doc, terms)
    }

    pub fn get(&self, url: &str) -> Option<Document> { self.inner.read().get(url).cloned() }

    pub fn get_by_id(&self, doc_id: DocId) -> Option<Document> { self.inner.read().get_by_id(doc_id).cloned() }

    pub fn term_postings(&self, term: &str) -> Option<TermPostings> { self.inner.read().term_postings(term).cloned() }

    /// Runs `f` against a consistent view of the index.
    pub fn read<R>(&self, f: impl FnOnce(&InvertedIndex) -> R) -> R { f(&self.inner.read()) }

    /// Writes a snapshot to disk. In-memory indexes have nothing to write.
    pub fn commit(&self) -> Result<()> {
        let Some(paths) = &self.paths else { return Ok(()) };
        let guard = self.inner.read();
        save_index(paths, &guard)
    }

    /// Commits and releases this handle.
    pub fn close(self) -> Result<()> { self.commit() }

    /// Parses `query` with the index's own tokenizer.
    pub fn parse(&self, query: &str) -> ParsedQuery { parse_query(query, &self.tokenizer) }

    pub fn search(&self, query: &str, limit: usize) -> SearchResults {
        let parsed = self.parse(query);
        let (total_hits, top): (usize, Vec<(SearchHit, Document)>) = {
            let guard = self.inner.read();
            let hits = guard.search(&parsed);
            let total = hits.len();
            let top = hits
                .into_iter()
                .take(limit)
                .filter_map(|hit| guard.get_by_id(hit.doc_id).cloned().map(|doc| (hit, doc)))
                .collect();
            (total, top)
        };
        tracing::debug!(query, total_hits, "search");
        let results = top.into_iter().map(|(hit, doc)| self.present(&parsed, hit, doc)).collect();
        SearchResults { query: query.to_string(), total_hits, results }
    }

    fn present(&self, parsed: &ParsedQuery, hit: SearchHit, doc: Document) -> ResultEntry {
        let terms = parsed.distinct_terms();
        let teaser = build_teaser(&doc.content, &terms, doc.heading.as_deref(), &doc.title, &self.tokenizer);
        let title = match doc.display_title() {
            "" => NO_TITLE,
            t => t,
        };
        let title = self.highlighter.highlight(title, &parsed.terms);
        ResultEntry {
            doc_id: hit.doc_id,
            url: doc.url,
            score: hit.score,
            title,
            keywords: doc.keywords,
            description: doc.description,
            teaser: self.highlighter.highlight(&teaser, &parsed.terms),
            matches: hit.matches,
        }
    }
}
