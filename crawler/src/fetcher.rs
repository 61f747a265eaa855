use reqwest::{header, redirect, Client};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);
pub const DEFAULT_MAX_BODY: usize = 2 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = "sitesearch-bot/0.1 (+https://example.com/bot)";

/// A successful response body together with where it finally came from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Why a page was not fetched. None of these stop a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("http status {0}")]
    Status(u16),
    #[error("not html: {0}")]
    NotHtml(String),
    #[error("body larger than {0} bytes")]
    TooLarge(usize),
    #[error("redirected off origin to {0}")]
    OffOrigin(Url),
}

/// Retrieves one page.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// HTML-only fetcher over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body: usize,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::limited(5))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, max_body: DEFAULT_MAX_BODY })
    }

    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut resp = self.client.get(url.clone()).send().await.map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_html(&content_type) {
            return Err(FetchError::NotHtml(content_type));
        }
        if resp.content_length().is_some_and(|len| len as usize > self.max_body) {
            return Err(FetchError::TooLarge(self.max_body));
        }

        let final_url = resp.url().clone();
        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(classify)? {
            if bytes.len() + chunk.len() > self.max_body {
                return Err(FetchError::TooLarge(self.max_body));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
