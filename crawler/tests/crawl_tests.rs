//! Crawl loop tests against an in-memory site.

use crawler::{CrawlConfig, CrawlError, CrawlState, Crawler, FetchError, FetchedPage, Fetcher, HtmlExtractor};
use parking_lot::Mutex;
use sitesearch_core::{IndexConfig, SearchIndex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const BASE: &str = "http://site.test";

enum Page {
    Html(String),
    Redirect { to: String, body: String },
    Fail(FetchError),
}

#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, Page>,
    delays: HashMap<String, Duration>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeSite {
    fn page(mut self, path: &str, title: &str, links: &[&str]) -> Self {
        let anchors: String = links.iter().map(|l| format!(r#"<a href="{l}">link</a> "#)).collect();
        let body = format!("<html><head><title>{title}</title></head><body><p>{title} page body.</p>{anchors}</body></html>");
        self.pages.insert(format!("{BASE}{path}"), Page::Html(body));
        self
    }

    fn failing(mut self, path: &str, err: FetchError) -> Self {
        self.pages.insert(format!("{BASE}{path}"), Page::Fail(err));
        self
    }

    fn redirect(mut self, path: &str, to: &str, title: &str) -> Self {
        let body = format!("<html><head><title>{title}</title></head><body>{title}</body></html>");
        self.pages.insert(format!("{BASE}{path}"), Page::Redirect { to: to.into(), body });
        self
    }

    fn slow(mut self, path: &str, millis: u64) -> Self {
        self.delays.insert(format!("{BASE}{path}"), Duration::from_millis(millis));
        self
    }

    fn log(&self) -> Arc<Mutex<Vec<String>>> { Arc::clone(&self.log) }
}

impl Fetcher for FakeSite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.log.lock().push(url.to_string());
        if let Some(delay) = self.delays.get(url.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        let ok = |final_url: &str, body: &str| -> Result<FetchedPage, FetchError> {
            Ok(FetchedPage {
                url: Url::parse(final_url).unwrap(),
                status: 200,
                content_type: "text/html".into(),
                body: body.into(),
            })
        };
        match self.pages.get(url.as_str()) {
            Some(Page::Html(body)) => ok(url.as_str(), body),
            Some(Page::Redirect { to, body }) => ok(to, body),
            Some(Page::Fail(err)) => Err(err.clone()),
            None => Err(FetchError::Status(404)),
        }
    }
}

fn cyclic_site() -> FakeSite {
    FakeSite::default()
        .page("/", "Home", &["/a", "/b", "/a#section", "http://elsewhere.test/x", "mailto:me@site.test"])
        .page("/a", "Alpha", &["/", "/b", "/c"])
        .page("/b", "Bravo", &["/a", "./a"])
        .page("/c", "Charlie", &["/d"])
        .page("/d", "Delta", &["/"])
}

fn config(max_depth: Option<usize>) -> CrawlConfig {
    CrawlConfig { max_depth, concurrency: 4, ..CrawlConfig::default() }
}

fn sorted(log: &Mutex<Vec<String>>) -> Vec<String> {
    let mut v = log.lock().clone();
    v.sort();
    v
}

fn expected(paths: &[&str]) -> Vec<String> {
    let mut v: Vec<String> = paths.iter().map(|p| format!("{BASE}{p}")).collect();
    v.sort();
    v
}

#[tokio::test]
async fn fetches_each_page_once_despite_cycles() {
    let site = cyclic_site();
    let log = site.log();
    let index = SearchIndex::in_memory(IndexConfig::default());
    let mut crawler = Crawler::new(site, HtmlExtractor, index.clone(), config(None));

    let report = crawler.run(&format!("{BASE}/")).await.unwrap();

    assert_eq!(sorted(&log), expected(&["/", "/a", "/b", "/c", "/d"]));
    assert_eq!(report.fetched, 5);
    assert_eq!(report.indexed, 5);
    assert!(report.failures.is_empty());
    assert_eq!(crawler.state(), CrawlState::Done);
    assert_eq!(index.len(), 5);
}

#[tokio::test]
async fn never_leaves_the_seed_origin() {
    let site = cyclic_site();
    let log = site.log();
    let index = SearchIndex::in_memory(IndexConfig::default());
    Crawler::new(site, HtmlExtractor, index.clone(), config(None))
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    assert!(log.lock().iter().all(|u| u.starts_with(BASE)));
    index.read(|idx| {
        assert!(idx.documents().all(|(_, doc)| doc.url.starts_with(BASE)));
    });
}

#[tokio::test]
async fn respects_max_depth() {
    let site = cyclic_site();
    let log = site.log();
    let index = SearchIndex::in_memory(IndexConfig::default());
    Crawler::new(site, HtmlExtractor, index.clone(), config(Some(1)))
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    assert_eq!(sorted(&log), expected(&["/", "/a", "/b"]));
    assert!(index.get(&format!("{BASE}/c")).is_none());
}

#[tokio::test]
async fn depth_follows_shortest_path_when_branches_finish_out_of_order() {
    // /x is two hops away through the slow /p1 but three through /p2 -> /q.
    let site = FakeSite::default()
        .page("/", "Home", &["/p1", "/p2"])
        .page("/p1", "Slow", &["/x"])
        .slow("/p1", 300)
        .page("/p2", "Fast", &["/q"])
        .page("/q", "Quick", &["/x"])
        .page("/x", "Cross", &["/y"])
        .page("/y", "Yonder", &[]);
    let log = site.log();
    let index = SearchIndex::in_memory(IndexConfig::default());
    Crawler::new(site, HtmlExtractor, index.clone(), config(Some(3)))
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    assert_eq!(sorted(&log), expected(&["/", "/p1", "/p2", "/q", "/x", "/y"]));
    assert_eq!(index.search("yonder", 10).total_hits, 1);
}

#[tokio::test]
async fn failures_are_recorded_not_fatal() {
    let site = FakeSite::default()
        .page("/", "Home", &["/broken", "/missing", "/slow", "/ok"])
        .failing("/broken", FetchError::Status(500))
        .failing("/slow", FetchError::Timeout)
        .page("/ok", "Fine", &["/broken"]);
    let log = site.log();
    let index = SearchIndex::in_memory(IndexConfig::default());
    let report = Crawler::new(site, HtmlExtractor, index.clone(), config(None))
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    assert_eq!(report.fetched, 5);
    assert_eq!(report.indexed, 2);
    let mut failed: Vec<&str> = report.failures.iter().map(|(u, _)| u.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["http://site.test/broken", "http://site.test/missing", "http://site.test/slow"]);
    assert_eq!(log.lock().iter().filter(|u| u.ends_with("/broken")).count(), 1);
    assert_eq!(index.search("fine", 10).total_hits, 1);
}

#[tokio::test]
async fn off_origin_redirects_are_not_indexed() {
    let site = FakeSite::default()
        .page("/", "Home", &["/out", "/moved"])
        .redirect("/out", "http://elsewhere.test/landing", "Elsewhere")
        .redirect("/moved", "http://site.test/new-home", "Moved")
        .page("/new-home", "Unused", &[]);
    let log = site.log();
    let index = SearchIndex::in_memory(IndexConfig::default());
    let report = Crawler::new(site, HtmlExtractor, index.clone(), config(None))
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "http://site.test/out");
    assert!(report.failures[0].1.contains("elsewhere.test"));
    assert!(index.search("elsewhere", 10).results.is_empty());
    assert_eq!(index.search("moved", 10).results[0].url, "http://site.test/new-home");
    assert!(!log.lock().iter().any(|u| u.ends_with("/new-home")));
}

#[tokio::test]
async fn redirect_to_a_visited_page_is_not_indexed_again() {
    let site = FakeSite::default()
        .page("/", "Home", &["/moved"])
        .redirect("/moved", "http://site.test/", "Moved");
    let index = SearchIndex::in_memory(IndexConfig::default());
    let cfg = CrawlConfig { concurrency: 1, ..config(None) };
    let report = Crawler::new(site, HtmlExtractor, index.clone(), cfg)
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.indexed, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.failures.is_empty());
    assert_eq!(index.len(), 1);
    assert!(index.search("moved", 10).results.is_empty());
}

#[tokio::test]
async fn max_pages_caps_fetches() {
    let site = cyclic_site();
    let log = site.log();
    let index = SearchIndex::in_memory(IndexConfig::default());
    let cfg = CrawlConfig { max_pages: Some(2), ..config(None) };
    let report = Crawler::new(site, HtmlExtractor, index, cfg).run(&format!("{BASE}/")).await.unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(log.lock().len(), 2);
}

#[tokio::test]
async fn indexed_pages_are_searchable() {
    let index = SearchIndex::in_memory(IndexConfig::default());
    Crawler::new(cyclic_site(), HtmlExtractor, index.clone(), config(None))
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    let res = index.search("charlie", 10);
    assert_eq!(res.total_hits, 1);
    assert_eq!(res.results[0].url, "http://site.test/c");
    assert_eq!(res.results[0].title, "<em>Charlie</em>");
    assert_eq!(res.results[0].teaser, "page body.");
}

#[tokio::test]
async fn writes_jsonl_dump() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("out/crawl.jsonl");
    let index = SearchIndex::in_memory(IndexConfig::default());
    let report = Crawler::new(cyclic_site(), HtmlExtractor, index, config(Some(1)))
        .with_dump(&dump)
        .unwrap()
        .run(&format!("{BASE}/"))
        .await
        .unwrap();

    let text = std::fs::read_to_string(&dump).unwrap();
    let records: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(records.len(), report.indexed);
    for rec in &records {
        assert_eq!(rec["id"].as_str().unwrap().len(), 40);
        assert!(rec["url"].as_str().unwrap().starts_with(BASE));
        assert!(rec["timestamp"].as_str().unwrap().contains('T'));
    }
}

#[tokio::test]
async fn bad_seed_is_rejected() {
    let index = SearchIndex::in_memory(IndexConfig::default());
    let err = Crawler::new(cyclic_site(), HtmlExtractor, index, config(None)).run("javascript:alert(1)").await;
    assert!(matches!(err, Err(CrawlError::InvalidSeed { .. })));
}
