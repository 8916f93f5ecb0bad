//! Embedding pending chunks into the store
//!
//! Takes up to `count` chunks from the front of a chunk file, embeds each one
//! through the rate-limited client and appends it to the paired embedding
//! file. Chunks that fail are logged and re-queued at the back of the chunk
//! file so a later run picks them up again.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::DataPaths;
use crate::openai::OpenAiClient;
use crate::store::{self, EmbeddingFile};

/// Result of embedding one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    Embedded,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Chunks taken from the queue this run
    pub attempted: usize,
    pub embedded: usize,
    pub failed: usize,
    /// Chunks left in the queue, re-queued failures included
    pub remaining: usize,
    /// Chunks in the embedding file after this run
    pub total_embedded: usize,
}

/// Split the queue into the batch to process now and the rest
fn take_batch(mut pending: Vec<String>, count: usize) -> (Vec<String>, Vec<String>) {
    let rest = pending.split_off(count.min(pending.len()));
    (pending, rest)
}

/// One embedding run, loaded and ready to execute
///
/// Reads the chunk queue and the embedding file once; the batch size is known
/// before any call is made.
#[derive(Debug)]
pub struct EmbedRun {
    chunk_path: PathBuf,
    embedding_path: PathBuf,
    batch: Vec<String>,
    remaining: Vec<String>,
    embedded: EmbeddingFile,
}

impl EmbedRun {
    /// Load `chunks/<chunk_file>` and split off up to `count` chunks
    pub fn prepare(paths: &DataPaths, chunk_file: &str, count: usize) -> Result<Self> {
        let chunk_path = paths.chunks_dir().join(chunk_file);
        let embedding_path = paths
            .embeddings_dir()
            .join(store::embedding_file_name(chunk_file));

        let pending = store::load_pending(&chunk_path)
            .with_context(|| format!("No usable chunk file at {}", chunk_path.display()))?;
        let embedded = store::load_embedding_file(&embedding_path)?;
        let (batch, remaining) = take_batch(pending, count);

        Ok(Self {
            chunk_path,
            embedding_path,
            batch,
            remaining,
            embedded,
        })
    }

    /// Chunks this run will attempt
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// Embed the batch, then persist both files
    ///
    /// `on_chunk` is called once per attempted chunk, e.g. to drive a progress bar.
    pub async fn execute<F>(self, client: &OpenAiClient, mut on_chunk: F) -> Result<IngestReport>
    where
        F: FnMut(&str, &ChunkOutcome),
    {
        let Self {
            chunk_path,
            embedding_path,
            batch,
            mut remaining,
            mut embedded,
        } = self;

        info!(
            "Embedding {} chunks from {} ({} already embedded, {} left after this batch)",
            batch.len(),
            chunk_path.display(),
            embedded.len(),
            remaining.len()
        );

        let mut report = IngestReport {
            attempted: batch.len(),
            ..Default::default()
        };

        for chunk in batch {
            let outcome = match client.embed(&chunk).await {
                Ok(vector) => {
                    embedded.push(chunk.clone(), vector);
                    report.embedded += 1;
                    ChunkOutcome::Embedded
                }
                Err(e) => {
                    warn!("Error while processing chunk, re-queueing it: {} ({})", chunk, e);
                    report.failed += 1;
                    ChunkOutcome::Failed(e.to_string())
                }
            };

            on_chunk(&chunk, &outcome);
            if matches!(outcome, ChunkOutcome::Failed(_)) {
                remaining.push(chunk);
            }
        }

        // Embeddings first: a failed save leaves the queue intact to re-embed
        store::save_embedding_file(&embedding_path, &embedded)?;
        store::save_pending(&chunk_path, &remaining)?;

        report.remaining = remaining.len();
        report.total_embedded = embedded.len();
        info!(
            "Embedded {}/{} chunks, {} remaining to process",
            report.embedded, report.attempted, report.remaining
        );
        Ok(report)
    }
}

/// Embed up to `count` chunks from `chunks/<chunk_file>`
pub async fn embed_pending<F>(
    client: &OpenAiClient,
    paths: &DataPaths,
    chunk_file: &str,
    count: usize,
    on_chunk: F,
) -> Result<IngestReport>
where
    F: FnMut(&str, &ChunkOutcome),
{
    EmbedRun::prepare(paths, chunk_file, count)?
        .execute(client, on_chunk)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_take_batch() {
        let (batch, rest) = take_batch(queue(&["a", "b", "c"]), 2);
        assert_eq!(batch, queue(&["a", "b"]));
        assert_eq!(rest, queue(&["c"]));
    }

    #[test]
    fn test_take_batch_count_larger_than_queue() {
        let (batch, rest) = take_batch(queue(&["a"]), 10);
        assert_eq!(batch, queue(&["a"]));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_prepare_reports_batch_len() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        store::save_pending(paths.chunks_dir().join("rich.json"), &queue(&["a", "b", "c"]))
            .unwrap();

        assert_eq!(EmbedRun::prepare(&paths, "rich.json", 2).unwrap().batch_len(), 2);
        assert_eq!(EmbedRun::prepare(&paths, "rich.json", 10).unwrap().batch_len(), 3);
        assert!(EmbedRun::prepare(&paths, "missing.json", 1).is_err());
    }

    #[test]
    fn test_take_batch_zero() {
        let (batch, rest) = take_batch(queue(&["a", "b"]), 0);
        assert!(batch.is_empty());
        assert_eq!(rest.len(), 2);
    }
}
