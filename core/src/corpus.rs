use crate::{DocId, IndexBuilder, Normalizer, SearchIndex};
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

lazy_static! {
    static ref DOC_FILE: Regex = Regex::new(r"^(\d+)\.txt$").expect("valid regex");
}

/// One document file found on disk.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusEntry {
    pub doc_id: DocId,
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

impl CorpusEntry {
    /// Read the document, replacing invalid UTF-8 sequences.
    pub fn read_text(&self) -> Result<String> {
        let bytes = fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// DocumentID -> file, for presenting results.
#[derive(Debug, Default, Clone)]
pub struct DocumentCatalog {
    entries: BTreeMap<DocId, CorpusEntry>,
}

impl DocumentCatalog {
    pub fn get(&self, doc_id: DocId) -> Option<&CorpusEntry> {
        self.entries.get(&doc_id)
    }

    pub fn name(&self, doc_id: DocId) -> String {
        self.get(doc_id).map(|e| e.name.clone()).unwrap_or_else(|| format!("{doc_id}.txt"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct LoadedCorpus {
    pub index: SearchIndex,
    pub catalog: DocumentCatalog,
}

/// List `<digits>.txt` files directly inside `dir`, sorted by id.
pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Vec<CorpusEntry>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        anyhow::bail!("document directory {} does not exist", dir.display());
    }
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(doc_id) = DOC_FILE.captures(&name).and_then(|c| c[1].parse::<DocId>().ok()) else {
            tracing::debug!(file = %name, "skipping non-document file");
            continue;
        };
        entries.push(CorpusEntry { doc_id, name, path: entry.into_path() });
    }
    entries.sort_by_key(|e| e.doc_id);
    Ok(entries)
}

/// Build phase over a document directory: enumerate, normalize, index, freeze.
pub fn load<P: AsRef<Path>, N: Normalizer>(dir: P, normalizer: &N) -> Result<LoadedCorpus> {
    let dir = dir.as_ref();
    let entries = discover(dir)?;
    let mut builder = IndexBuilder::new();
    let mut catalog = DocumentCatalog::default();
    for entry in entries {
        let terms = match entry.read_text() {
            Ok(text) => normalizer.normalize_document(&text),
            Err(e) => {
                tracing::warn!(doc_id = entry.doc_id, error = %e, "unreadable document indexed as empty");
                Vec::new()
            }
        };
        // "007.txt" and "7.txt" collapse to one id; first one wins
        if let Err(e) = builder.add_document(entry.doc_id, &terms) {
            tracing::warn!(file = %entry.name, error = %e, "skipping document");
            continue;
        }
        catalog.entries.insert(entry.doc_id, entry);
    }
    tracing::info!(dir = %dir.display(), num_docs = builder.num_documents(), "ingested documents");
    Ok(LoadedCorpus { index: builder.finish(), catalog })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnglishNormalizer;
    use tempfile::tempdir;

    #[test]
    fn discovers_numbered_text_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("2.txt"), "b").unwrap();
        fs::write(dir.path().join("10.txt"), "a").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("3.md"), "x").unwrap();
        fs::create_dir(dir.path().join("4.txt")).unwrap();
        let ids: Vec<DocId> = discover(dir.path()).unwrap().iter().map(|e| e.doc_id).collect();
        assert_eq!(ids, vec![2, 10]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(discover(dir.path().join("nope")).is_err());
    }

    #[test]
    fn load_builds_both_indexes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1.txt"), "Information retrieval systems").unwrap();
        fs::write(dir.path().join("2.txt"), [0xff, 0xfe, b' ', b'r', b'u', b's', b't']).unwrap();
        let loaded = load(dir.path(), &EnglishNormalizer::new()).unwrap();
        assert_eq!(loaded.index.num_documents(), 2);
        assert_eq!(loaded.catalog.name(2), "2.txt");
        assert_eq!(loaded.index.unordered().documents_with("rust").len(), 1);
    }

    #[test]
    fn duplicate_ids_keep_first_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("007.txt"), "alpha").unwrap();
        fs::write(dir.path().join("7.txt"), "beta").unwrap();
        let loaded = load(dir.path(), &EnglishNormalizer::new()).unwrap();
        assert_eq!(loaded.index.num_documents(), 1);
        assert_eq!(loaded.catalog.len(), 1);
    }
}
