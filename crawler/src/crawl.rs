use crate::extractor::{ExtractedPage, Extractor};
use crate::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::frontier::{dedup_key, Frontier};
use crate::CrawlError;
use serde::Serialize;
use sha1::{Digest, Sha1};
use sitesearch_core::{Document, SearchIndex};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Link hops from the seed; `None` follows links without limit.
    pub max_depth: Option<usize>,
    /// Stop dispatching fetches after this many.
    pub max_pages: Option<usize>,
    /// Fetches in flight at once.
    pub concurrency: usize,
    /// Commit the index after this many newly indexed pages.
    pub commit_every: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self { max_depth: Some(3), max_pages: None, concurrency: 8, commit_every: 100 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Running,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Fetch attempts, successful or not.
    pub fetched: usize,
    pub indexed: usize,
    /// Frontier entries and redirect targets dropped because they were
    /// already visited.
    pub skipped: usize,
    /// `(url, reason)` for every page that was not indexed.
    pub failures: Vec<(String, String)>,
}

/// One line of the JSONL dump; `indexer build` reads these back.
#[derive(Serialize)]
struct DumpRecord<'a> {
    id: String,
    url: &'a str,
    title: &'a str,
    heading: Option<&'a str>,
    body: &'a str,
    keywords: Option<&'a str>,
    description: Option<&'a str>,
    timestamp: String,
}

impl<'a> DumpRecord<'a> {
    fn new(doc: &'a Document) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(doc.url.as_bytes());
        Self {
            id: format!("{:x}", hasher.finalize()),
            url: &doc.url,
            title: &doc.title,
            heading: doc.heading.as_deref(),
            body: &doc.content,
            keywords: doc.keywords.as_deref(),
            description: doc.description.as_deref(),
            timestamp: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        }
    }
}

struct PageOutcome {
    url: Url,
    depth: usize,
    result: Result<(FetchedPage, ExtractedPage), FetchError>,
}

/// Crawls one origin into a [`SearchIndex`].
///
/// The `run` loop is the only owner of the frontier and the only index writer;
/// spawned tasks just fetch and extract.
pub struct Crawler<F, E> {
    fetcher: Arc<F>,
    extractor: Arc<E>,
    index: SearchIndex,
    config: CrawlConfig,
    state: CrawlState,
    dump: Option<BufWriter<File>>,
}

impl<F: Fetcher, E: Extractor> Crawler<F, E> {
    pub fn new(fetcher: F, extractor: E, index: SearchIndex, config: CrawlConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            index,
            config,
            state: CrawlState::Idle,
            dump: None,
        }
    }

    /// Also writes every indexed page to `path` as JSON lines.
    pub fn with_dump<P: AsRef<Path>>(mut self, path: P) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        self.dump = Some(BufWriter::new(File::create(path)?));
        Ok(self)
    }

    pub fn state(&self) -> CrawlState { self.state }

    pub fn index(&self) -> &SearchIndex { &self.index }

    pub async fn run(&mut self, seed: &str) -> Result<CrawlReport, CrawlError> {
        let seed = parse_seed(seed)?;
        let mut frontier = Frontier::new(seed.clone(), self.config.max_depth);
        let mut report = CrawlReport::default();
        let mut tasks: JoinSet<PageOutcome> = JoinSet::new();
        let mut dispatched = 0usize;
        let concurrency = self.config.concurrency.max(1);

        self.state = CrawlState::Running;
        info!(
            seed = %seed,
            max_depth = ?self.config.max_depth,
            max_pages = ?self.config.max_pages,
            concurrency,
            "crawl started"
        );

        // Depth of the tasks in flight. A deeper level is only started once the
        // current one has drained, so links of every page at depth d are queued
        // before any page at depth d + 1 is expanded.
        let mut level = 0usize;
        loop {
            while tasks.len() < concurrency && self.config.max_pages.map_or(true, |max| dispatched < max) {
                match frontier.next_depth() {
                    Some(depth) if tasks.is_empty() || depth == level => level = depth,
                    _ => break,
                }
                let Some((url, depth)) = frontier.pop() else { break };
                dispatched += 1;
                self.spawn_fetch(&mut tasks, url, depth);
            }
            let Some(joined) = tasks.join_next().await else { break };
            match joined {
                Ok(outcome) => self.handle(outcome, &mut frontier, &mut report)?,
                Err(err) => warn!(error = %err, "crawl task failed"),
            }
        }

        report.skipped += frontier.skipped();
        self.index.commit()?;
        if let Some(dump) = self.dump.as_mut() {
            dump.flush()?;
        }
        self.state = CrawlState::Done;
        info!(
            fetched = report.fetched,
            indexed = report.indexed,
            skipped = report.skipped,
            failed = report.failures.len(),
            pending = frontier.len(),
            "crawl done"
        );
        Ok(report)
    }

    fn spawn_fetch(&self, tasks: &mut JoinSet<PageOutcome>, url: Url, depth: usize) {
        let fetcher = Arc::clone(&self.fetcher);
        let extractor = Arc::clone(&self.extractor);
        tasks.spawn(async move {
            let result = match fetcher.fetch(&url).await {
                Ok(page) => {
                    let extracted = extractor.extract(&page.body, &page.url);
                    Ok((page, extracted))
                }
                Err(err) => Err(err),
            };
            PageOutcome { url, depth, result }
        });
    }

    fn handle(&mut self, outcome: PageOutcome, frontier: &mut Frontier, report: &mut CrawlReport) -> Result<(), CrawlError> {
        let PageOutcome { url, depth, result } = outcome;
        report.fetched += 1;

        let (page, extracted) = match result {
            Ok(ok) => ok,
            Err(err) => {
                warn!(url = %url, error = %err, "fetch failed");
                report.failures.push((url.to_string(), err.to_string()));
                return Ok(());
            }
        };

        if page.url != url {
            if !frontier.mark_visited(&page.url) {
                debug!(url = %url, final_url = %page.url, "redirect target already visited");
                report.skipped += 1;
                return Ok(());
            }
            if !frontier.same_origin(&page.url) {
                let err = FetchError::OffOrigin(page.url);
                warn!(url = %url, error = %err, "fetch failed");
                report.failures.push((url.to_string(), err.to_string()));
                return Ok(());
            }
        }

        let added = frontier.enqueue_links(&page.url, depth, &extracted.links);
        let doc = extracted.into_document(dedup_key(&page.url));
        if let Some(dump) = self.dump.as_mut() {
            serde_json::to_writer(&mut *dump, &DumpRecord::new(&doc))?;
            dump.write_all(b"\n")?;
        }
        let doc_id = self.index.add_document(doc)?;
        report.indexed += 1;
        debug!(url = %page.url, doc_id, depth, links_added = added, pending = frontier.len(), "indexed page");

        if self.config.commit_every > 0 && report.indexed % self.config.commit_every == 0 {
            self.index.commit()?;
            info!(indexed = report.indexed, visited = frontier.visited_count(), pending = frontier.len(), "progress");
        }
        Ok(())
    }
}

pub(crate) fn parse_seed(seed: &str) -> Result<Url, CrawlError> {
    let invalid = |reason: String| CrawlError::InvalidSeed { url: seed.to_string(), reason };
    let url = Url::parse(seed.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".into()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_must_be_http() {
        assert!(parse_seed("https://example.com/").is_ok());
        assert!(matches!(parse_seed("not a url"), Err(CrawlError::InvalidSeed { .. })));
        assert!(matches!(parse_seed("ftp://example.com/"), Err(CrawlError::InvalidSeed { .. })));
    }

    #[test]
    fn dump_ids_are_sha1_of_url() {
        let doc = Document::new("http://example.com/");
        let rec = DumpRecord::new(&doc);
        assert_eq!(rec.id.len(), 40);
        assert_eq!(rec.id, DumpRecord::new(&doc).id);
        assert_ne!(rec.id, DumpRecord::new(&Document::new("http://example.com/a")).id);
    }
}
