//! Bounded same-origin crawler feeding a [`SearchIndex`].

pub mod crawl;
pub mod extractor;
pub mod fetcher;
pub mod frontier;

use sitesearch_core::SearchIndex;
use thiserror::Error;

pub use crawl::{CrawlConfig, CrawlReport, CrawlState, Crawler};
pub use extractor::{ExtractedPage, Extractor, HtmlExtractor};
pub use fetcher::{FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{dedup_key, resolve_link, Frontier};

/// Errors that end a crawl. Per-page fetch failures are not among them; they
/// land in [`CrawlReport::failures`].
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid seed url {url}: {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error(transparent)]
    Index(#[from] sitesearch_core::Error),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to write crawl dump: {0}")]
    Dump(#[from] std::io::Error),

    #[error("failed to encode crawl dump record: {0}")]
    DumpRecord(#[from] serde_json::Error),
}

/// Crawls from `seed` with the HTTP fetcher and HTML extractor, following
/// links at most `max_depth` hops away (`None` for no limit).
pub async fn crawl(seed: &str, max_depth: Option<usize>, index: SearchIndex) -> Result<CrawlReport, CrawlError> {
    let fetcher = HttpFetcher::new(fetcher::DEFAULT_USER_AGENT, fetcher::DEFAULT_TIMEOUT)?;
    let config = CrawlConfig { max_depth, ..CrawlConfig::default() };
    Crawler::new(fetcher, HtmlExtractor, index, config).run(seed).await
}
