use anyhow::{Context, Result};
use clap::Parser;
use crawler::{CrawlConfig, Crawler, HtmlExtractor, HttpFetcher};
use sitesearch_core::{IndexConfig, Normalization, SearchIndex, TokenizerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl one site breadth-first and index its pages")]
struct Cli {
    /// Start URL; only pages on its origin are crawled
    #[arg(long)]
    seed: String,
    /// Index directory (created if missing)
    #[arg(long, default_value = "./data/index")]
    index: PathBuf,
    /// Maximum link hops from the seed
    #[arg(long, default_value_t = 3)]
    max_depth: usize,
    /// Stop after this many fetches
    #[arg(long)]
    max_pages: Option<usize>,
    /// Word normalization for a new index: none, stem or lemma
    #[arg(long, default_value = "stem")]
    normalization: Normalization,
    /// Drop common English words when indexing
    #[arg(long, default_value_t = false)]
    remove_stopwords: bool,
    /// Concurrent fetches
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    #[arg(long, default_value = crawler::fetcher::DEFAULT_USER_AGENT)]
    user_agent: String,
    /// Commit the index every N pages
    #[arg(long, default_value_t = 100)]
    commit_every: usize,
    /// Also write extracted pages as JSONL (input for `indexer build`)
    #[arg(long)]
    dump: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let config = IndexConfig {
        tokenizer: TokenizerConfig {
            normalization: args.normalization,
            remove_stopwords: args.remove_stopwords,
            ..TokenizerConfig::default()
        },
        ..IndexConfig::default()
    };
    let index = SearchIndex::open(&args.index, config)
        .with_context(|| format!("opening index at {}", args.index.display()))?;
    let fetcher = HttpFetcher::new(&args.user_agent, Duration::from_secs(args.timeout_secs))?;
    let crawl_config = CrawlConfig {
        max_depth: Some(args.max_depth),
        max_pages: args.max_pages,
        concurrency: args.concurrency,
        commit_every: args.commit_every,
    };

    let mut crawler = Crawler::new(fetcher, HtmlExtractor, index.clone(), crawl_config);
    if let Some(path) = &args.dump {
        crawler = crawler.with_dump(path)?;
    }
    let report = crawler.run(&args.seed).await?;
    index.close()?;

    for (url, reason) in &report.failures {
        tracing::debug!(url = %url, reason = %reason, "not indexed");
    }
    tracing::info!(
        index = %args.index.display(),
        fetched = report.fetched,
        indexed = report.indexed,
        failed = report.failures.len(),
        "finished"
    );
    Ok(())
}
