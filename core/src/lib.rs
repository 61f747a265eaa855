//! Index, query and teaser machinery shared by the crawler, indexer and server.

pub mod document;
pub mod index;
pub mod lemmatizer;
pub mod persist;
pub mod query;
pub mod store;
pub mod teaser;
pub mod tokenizer;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use document::{Document, Field, FieldWeights, IndexConfig};
pub use index::{DocId, InvertedIndex, Posting, TermPostings};
pub use query::{parse_query, FieldMatch, ParsedQuery, QueryTerm, SearchHit};
pub use store::{ResultEntry, SearchIndex, SearchResults};
pub use teaser::{build_teaser, Highlighter};
pub use tokenizer::{Normalization, Tokenizer, TokenizerConfig};

/// Failures of the index store.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to encode index data: {0}")]
    Encode(#[from] bincode::Error),

    #[error("failed to encode index metadata: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("index is corrupt: {0}")]
    Corrupt(String),

    #[error("index at {path} was built with a different configuration")]
    ConfigMismatch { path: PathBuf },

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl Error {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io { path: path.to_path_buf(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
