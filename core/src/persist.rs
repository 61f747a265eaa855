use crate::document::{Document, IndexConfig};
use crate::index::{DocId, InvertedIndex, TermPostings};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    pub config: IndexConfig,
}

/// Stored-field table as written to `docs.bin`.
#[derive(Serialize, Deserialize)]
struct DocsFile {
    docs: BTreeMap<DocId, Document>,
    doc_ids: HashMap<String, DocId>,
    next_doc_id: DocId,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// An index exists once its meta file has been written.
    pub fn exists(&self) -> bool { self.meta().is_file() }
}

/// Writes `bytes` next to `path` and renames it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = BufWriter::new(File::create(&tmp).map_err(|e| Error::io(&tmp, e))?);
    f.write_all(bytes).map_err(|e| Error::io(&tmp, e))?;
    f.into_inner()
        .map_err(|e| Error::io(&tmp, e.into_error()))?
        .sync_all()
        .map_err(|e| Error::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path).map_err(|e| Error::io(path, e))?))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| Error::io(&paths.root, e))?;
    let json = serde_json::to_vec_pretty(meta)?;
    write_atomic(&paths.meta(), &json)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let meta: MetaFile = serde_json::from_reader(open(&paths.meta())?)?;
    if meta.version != FORMAT_VERSION {
        return Err(Error::Corrupt(format!(
            "index format version {} is not supported (expected {FORMAT_VERSION})",
            meta.version
        )));
    }
    Ok(meta)
}

/// Writes a full snapshot: postings and stored fields first, meta last.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| Error::io(&paths.root, e))?;

    let docs = DocsFile { docs: index.docs.clone(), doc_ids: index.doc_ids.clone(), next_doc_id: index.next_doc_id };
    write_atomic(&paths.docs(), &bincode::serialize(&docs)?)?;
    write_atomic(&paths.postings(), &bincode::serialize(&index.postings)?)?;

    let meta = MetaFile {
        num_docs: index.len() as u32,
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: FORMAT_VERSION,
        config: index.config.clone(),
    };
    save_meta(paths, &meta)?;
    tracing::debug!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "index snapshot written");
    Ok(())
}

/// Loads a snapshot and verifies it has no dangling postings.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    let docs: DocsFile = bincode::deserialize_from(open(&paths.docs())?)?;
    let postings: HashMap<String, TermPostings> = bincode::deserialize_from(open(&paths.postings())?)?;
    let index = InvertedIndex {
        config: meta.config,
        postings,
        docs: docs.docs,
        doc_ids: docs.doc_ids,
        next_doc_id: docs.next_doc_id,
    };
    index.check_integrity()?;
    Ok(index)
}
