use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use sitesearch_core::{Document, IndexConfig, Normalization, SearchIndex, TokenizerConfig};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One crawled page as written by `crawler --dump`. `body` is the page text.
#[derive(Debug, Deserialize)]
struct InputDoc {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    heading: Option<String>,
    #[serde(alias = "content", default)]
    body: String,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<InputDoc> for Document {
    fn from(doc: InputDoc) -> Self {
        Document {
            url: doc.url,
            title: doc.title,
            heading: doc.heading,
            content: doc.body,
            keywords: doc.keywords,
            description: doc.description,
        }
    }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect fielded search indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fresh index from JSON/JSONL crawl dumps (file or directory)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory; an existing index there is replaced
        #[arg(long)]
        output: PathBuf,
        /// Word normalization: none, stem or lemma
        #[arg(long, default_value = "stem")]
        normalization: Normalization,
        /// Drop common English words
        #[arg(long, default_value_t = false)]
        remove_stopwords: bool,
    },
    /// Print document and term counts of an index
    Stats {
        /// Index directory
        #[arg(long)]
        index: PathBuf,
        /// Also list every document with its number of distinct terms
        #[arg(long, default_value_t = false)]
        docs: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, normalization, remove_stopwords } => {
            let config = IndexConfig {
                tokenizer: TokenizerConfig { normalization, remove_stopwords, ..TokenizerConfig::default() },
                ..IndexConfig::default()
            };
            let index = build_index(&input, &output, config)?;
            tracing::info!(output = %output.display(), num_docs = index.len(), num_terms = index.num_terms(), "index build complete");
            Ok(())
        }
        Commands::Stats { index, docs } => {
            let index = SearchIndex::open_existing(&index)
                .with_context(|| format!("opening index at {}", index.display()))?;
            print!("{}", stats(&index, docs));
            Ok(())
        }
    }
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn build_index(input: &Path, output: &Path, config: IndexConfig) -> Result<SearchIndex> {
    let index = SearchIndex::create(output, config)?;
    let mut ingested = 0usize;
    for file in input_files(input) {
        let docs = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        for doc in docs {
            index.add_document(doc.into())?;
            ingested += 1;
        }
        tracing::debug!(file = %file.display(), ingested, "read input file");
    }
    index.commit()?;
    tracing::info!(ingested, "ingested documents");
    Ok(index)
}

fn read_jsonl(file: &Path) -> Result<Vec<InputDoc>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let mut docs = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str(&line).with_context(|| format!("{}:{}", file.display(), n + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<InputDoc>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => {
            arr.into_iter().map(serde_json::from_value).collect::<Result<Vec<InputDoc>, _>>()?
        }
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(docs)
}

fn stats(index: &SearchIndex, per_doc: bool) -> String {
    let config = index.config();
    let mut out = format!(
        "documents: {}\nterms: {}\nnormalization: {:?}\nremove_stopwords: {}\nweights (v{}): {}\n",
        index.len(),
        index.num_terms(),
        config.tokenizer.normalization,
        config.tokenizer.remove_stopwords,
        config.weights.version,
        config
            .weights
            .weights
            .iter()
            .map(|(field, w)| format!("{}={w}", field.name()))
            .collect::<Vec<_>>()
            .join(" "),
    );
    if per_doc {
        let tokenizer = index.tokenizer();
        index.read(|idx| {
            for (id, doc) in idx.documents() {
                let mut terms: Vec<String> = sitesearch_core::Field::ALL
                    .iter()
                    .flat_map(|f| tokenizer.terms(doc.field(*f)).collect::<Vec<_>>())
                    .collect();
                terms.sort();
                terms.dedup();
                out.push_str(&format!("{id}\t{}\t{}\n", terms.len(), doc.url));
            }
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn builds_from_jsonl_and_json() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        fs::create_dir_all(&input).unwrap();
        fs::write(
            input.join("crawl.jsonl"),
            concat!(
                r#"{"id":"1","url":"http://x/a","title":"Garden","body":"Tomatoes grow fast.","timestamp":"2024-01-01T00:00:00Z"}"#,
                "\n\n",
                r#"{"url":"http://x/b","title":"Kitchen","heading":"Cooking","body":"Tomatoes taste good."}"#,
                "\n"
            ),
        )
        .unwrap();
        fs::write(input.join("extra.json"), r#"[{"url":"http://x/c","content":"Cucumbers."}]"#).unwrap();
        fs::write(input.join("notes.txt"), "ignored").unwrap();

        let out = dir.path().join("index");
        build_index(&input, &out, IndexConfig::default()).unwrap();

        let index = SearchIndex::open_existing(&out).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.search("tomato", 10).total_hits, 2);
        assert_eq!(index.search("cucumber", 10).results[0].url, "http://x/c");
        assert_eq!(index.get("http://x/b").unwrap().heading.as_deref(), Some("Cooking"));
    }

    #[test]
    fn rebuild_replaces_previous_index() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("one.json");
        fs::write(&input, r#"{"url":"http://x/a","body":"first"}"#).unwrap();
        let out = dir.path().join("index");
        build_index(&input, &out, IndexConfig::default()).unwrap();

        fs::write(&input, r#"{"url":"http://x/z","body":"second"}"#).unwrap();
        let lemma = IndexConfig {
            tokenizer: TokenizerConfig { normalization: Normalization::Lemma, ..TokenizerConfig::default() },
            ..IndexConfig::default()
        };
        build_index(&input, &out, lemma.clone()).unwrap();

        let index = SearchIndex::open_existing(&out).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get("http://x/a").is_none());
        assert_eq!(index.config(), lemma);
    }

    #[test]
    fn stats_lists_documents() {
        let index = SearchIndex::in_memory(IndexConfig::default());
        index
            .add_document(Document { url: "http://x/a".into(), content: "red red blue".into(), ..Document::default() })
            .unwrap();
        let text = stats(&index, true);
        assert!(text.starts_with("documents: 1\nterms: 2\n"));
        assert!(text.ends_with("0\t2\thttp://x/a\n"));
    }
}
