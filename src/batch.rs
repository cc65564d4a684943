//! Batch embedding with bounded retry.
//!
//! Serialized triples are split into fixed-size chunks; each chunk is sent to
//! the provider up to `max_attempts` times with a fixed delay in between.
//! A chunk that never succeeds marks every entry in it as failed and the run
//! moves on. The output has exactly one outcome per input, in input order.

use rayon::prelude::*;
use serde::Serialize;

use crate::config::BatchConfig;
use crate::error::{IndexError, ProviderError};
use crate::index::has_direction;
use crate::provider::EmbeddingProvider;

/// An embedding that could not be produced.
#[derive(Debug, Clone)]
pub struct Failed {
    /// Index of the chunk the entry belonged to.
    pub chunk: usize,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Error from the final attempt.
    pub error: ProviderError,
}

/// Embedding-or-failure for one input string.
pub type Outcome = Result<Vec<f32>, Failed>;

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub chunks: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Attempts beyond the first, summed over all chunks.
    pub retries: usize,
}

/// Aligned outcomes plus a summary.
#[derive(Debug)]
pub struct BatchOutput {
    pub outcomes: Vec<Outcome>,
    pub report: BatchReport,
}

impl BatchOutput {
    /// Dimension of the embedded vectors, if any entry succeeded.
    pub fn dim(&self) -> Option<usize> {
        self.outcomes.iter().find_map(|o| o.as_ref().ok().map(Vec::len))
    }
}

/// Result of embedding one chunk.
struct ChunkResult {
    outcomes: Vec<Outcome>,
    attempts: u32,
}

/// Drives an [`EmbeddingProvider`] under a [`BatchConfig`] policy.
pub struct BatchEmbedder<'a> {
    provider: &'a dyn EmbeddingProvider,
    config: BatchConfig,
}

impl<'a> BatchEmbedder<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, config: BatchConfig) -> Self {
        Self { provider, config }
    }

    /// Embed every string, returning one outcome per input in input order.
    ///
    /// Fails only when two successful vectors disagree on dimension, or when
    /// the worker pool cannot be started.
    pub fn embed_all(&self, texts: &[String]) -> Result<BatchOutput, IndexError> {
        let chunk_size = self.config.chunk_size.max(1);
        let chunks: Vec<&[String]> = texts.chunks(chunk_size).collect();

        let results: Vec<ChunkResult> = if self.config.parallelism > 1 && chunks.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallelism)
                .build()
                .map_err(|e| IndexError::WorkerPool {
                    message: e.to_string(),
                })?;
            // Indexed collect keeps chunk order.
            pool.install(|| {
                chunks
                    .par_iter()
                    .enumerate()
                    .map(|(idx, chunk)| self.embed_chunk(idx, chunk))
                    .collect()
            })
        } else {
            chunks
                .iter()
                .enumerate()
                .map(|(idx, chunk)| self.embed_chunk(idx, chunk))
                .collect()
        };

        let mut report = BatchReport {
            chunks: results.len(),
            ..BatchReport::default()
        };
        let mut outcomes = Vec::with_capacity(texts.len());
        for result in results {
            report.retries += result.attempts.saturating_sub(1) as usize;
            for outcome in result.outcomes {
                match outcome {
                    Ok(_) => report.succeeded += 1,
                    Err(_) => report.failed += 1,
                }
                outcomes.push(outcome);
            }
        }

        check_dimensions(&outcomes)?;

        tracing::info!(
            chunks = report.chunks,
            succeeded = report.succeeded,
            failed = report.failed,
            retries = report.retries,
            "batch embedding finished"
        );
        Ok(BatchOutput { outcomes, report })
    }

    fn embed_chunk(&self, idx: usize, chunk: &[String]) -> ChunkResult {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.provider.embed(chunk) {
                Ok(vectors) => match validate_chunk(chunk.len(), &vectors) {
                    Ok(()) => {
                        return ChunkResult {
                            outcomes: vectors.into_iter().map(Ok).collect(),
                            attempts: attempt,
                        };
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            if attempt >= max_attempts {
                tracing::error!(
                    chunk = idx,
                    attempt,
                    entries = chunk.len(),
                    error = %error,
                    "embedding chunk failed, entries dropped"
                );
                let failed = Failed {
                    chunk: idx,
                    attempts: attempt,
                    error,
                };
                return ChunkResult {
                    outcomes: chunk.iter().map(|_| Err(failed.clone())).collect(),
                    attempts: attempt,
                };
            }

            tracing::warn!(
                chunk = idx,
                attempt,
                max_attempts,
                timeout = error.is_timeout(),
                error = %error,
                "embedding chunk failed, retrying"
            );
            std::thread::sleep(self.config.retry_delay());
        }
    }
}

/// A provider answer must carry one non-empty vector per input, each with a
/// defined cosine direction.
fn validate_chunk(expected: usize, vectors: &[Vec<f32>]) -> Result<(), ProviderError> {
    if vectors.len() != expected {
        return Err(ProviderError::Failure {
            message: format!("expected {expected} embeddings, provider returned {}", vectors.len()),
        });
    }
    if let Some(pos) = vectors.iter().position(Vec::is_empty) {
        return Err(ProviderError::Failure {
            message: format!("provider returned an empty embedding at offset {pos}"),
        });
    }
    if let Some(pos) = vectors.iter().position(|v| !has_direction(v)) {
        return Err(ProviderError::Failure {
            message: format!("provider returned a zero or non-finite embedding at offset {pos}"),
        });
    }
    Ok(())
}

/// The first successful vector fixes the corpus dimension.
fn check_dimensions(outcomes: &[Outcome]) -> Result<(), IndexError> {
    let mut expected = None;
    for (position, outcome) in outcomes.iter().enumerate() {
        let Ok(vector) = outcome else { continue };
        match expected {
            None => expected = Some(vector.len()),
            Some(dim) if dim != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dim,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
