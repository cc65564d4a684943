//! Embedding and generative text providers.
//!
//! Both are narrow synchronous contracts. The build retries provider failures
//! under the batch policy; the query path never does.

pub mod ollama;

pub use ollama::{OllamaEmbedder, OllamaGenerator};

use crate::error::ProviderError;

/// Result type for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Maps text to fixed-dimension vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed an ordered batch. Returns one vector per input, in input order,
    /// or fails as a whole.
    fn embed(&self, batch: &[String]) -> ProviderResult<Vec<Vec<f32>>>;

    /// Embed a single string.
    fn embed_one(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()])?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            n => Err(ProviderError::Failure {
                message: format!("expected 1 embedding, provider returned {n}"),
            }),
        }
    }
}

/// Maps a prompt to a response string.
pub trait GenerativeProvider: Send + Sync {
    fn generate(&self, prompt: &str) -> ProviderResult<String>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<P> {
    fn embed(&self, batch: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        (**self).embed(batch)
    }

    fn embed_one(&self, text: &str) -> ProviderResult<Vec<f32>> {
        (**self).embed_one(text)
    }
}

impl<P: GenerativeProvider + ?Sized> GenerativeProvider for std::sync::Arc<P> {
    fn generate(&self, prompt: &str) -> ProviderResult<String> {
        (**self).generate(prompt)
    }
}
