//! Flat-file embedding store
//!
//! Pending chunks and embedded chunks live as JSON files under the data
//! directory (see [`DataPaths`](crate::config::DataPaths)). The whole store
//! is loaded into memory; search is a linear scan.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::search::{self, SearchError};

// =============================================================================
// Files
// =============================================================================

/// Embedded chunks, parallel arrays of text and vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingFile {
    pub chunks: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
}

impl EmbeddingFile {
    pub fn push(&mut self, chunk: String, embedding: Vec<f32>) {
        self.chunks.push(chunk);
        self.embeddings.push(embedding);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.chunks.len() != self.embeddings.len() {
            bail!(
                "{} chunks but {} embeddings",
                self.chunks.len(),
                self.embeddings.len()
            );
        }
        Ok(())
    }
}

/// Load an embedding file; a missing file is an empty one
pub fn load_embedding_file(path: impl AsRef<Path>) -> Result<EmbeddingFile> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(EmbeddingFile::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read embedding file {}", path.display()))?;
    let file: EmbeddingFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse embedding file {}", path.display()))?;
    file.validate()
        .with_context(|| format!("Corrupt embedding file {}", path.display()))?;
    Ok(file)
}

pub fn save_embedding_file(path: impl AsRef<Path>, file: &EmbeddingFile) -> Result<()> {
    file.validate()?;
    write_atomic(path.as_ref(), &serde_json::to_vec(file)?)
}

/// Load the pending chunk queue; the file must exist
pub fn load_pending(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Chunk file {} is not a JSON array of strings", path.display()))
}

pub fn save_pending(path: impl AsRef<Path>, chunks: &[String]) -> Result<()> {
    write_atomic(path.as_ref(), &serde_json::to_vec(chunks)?)
}

/// Write to a sibling temp file, then rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Name of the embedding file paired with a chunk file: same stem, `.json` extension
pub fn embedding_file_name(chunk_file: &str) -> String {
    let stem = Path::new(chunk_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(chunk_file);
    format!("{}.json", stem)
}

// =============================================================================
// In-memory store
// =============================================================================

/// A retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub index: usize,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingStore {
    /// Load every `*.json` embedding file in `dir`, in file-name order
    ///
    /// A missing directory yields an empty store.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            info!("Embedding directory {} does not exist yet", dir.display());
            return Ok(Self::default());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut store = Self::default();
        for path in &files {
            let file = load_embedding_file(path)?;
            debug!("Loaded {} chunks from {}", file.len(), path.display());
            store.extend(file)
                .with_context(|| format!("Cannot merge {}", path.display()))?;
        }

        info!(
            "Loaded {} chunks from {} embedding files",
            store.len(),
            files.len()
        );
        Ok(store)
    }

    pub fn from_parts(chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        let mut store = Self::default();
        store.extend(EmbeddingFile { chunks, embeddings })?;
        Ok(store)
    }

    fn extend(&mut self, file: EmbeddingFile) -> Result<()> {
        file.validate()?;
        if let (Some(dim), Some(first)) = (self.dimension(), file.embeddings.first()) {
            if first.len() != dim {
                bail!("embedding dimension {} does not match store dimension {}", first.len(), dim);
            }
        }
        if let Some(first) = file.embeddings.first() {
            if let Some(bad) = file.embeddings.iter().find(|e| e.len() != first.len()) {
                bail!("mixed embedding dimensions {} and {}", first.len(), bad.len());
            }
        }

        self.chunks.extend(file.chunks);
        self.embeddings.extend(file.embeddings);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector length shared by every stored embedding
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }

    pub fn chunk(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(String::as_str)
    }

    /// The `k` chunks most similar to `query`, most similar first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        let top = search::top_k(query, &self.embeddings, k)?;
        Ok(top
            .into_iter()
            .map(|scored| ScoredChunk {
                index: scored.index,
                text: self.chunks[scored.index].clone(),
                score: scored.score,
            })
            .collect())
    }
}
