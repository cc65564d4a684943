//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use trirag::config::TriragConfig;
use trirag::error::ProviderError;
use trirag::graph::{GraphStore, Triple};
use trirag::index::IndexBuilder;
use trirag::provider::{EmbeddingProvider, GenerativeProvider};
use trirag::store::BlobStore;

type EmbedFn = Box<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

/// Deterministic embedding provider with a scripted failure queue.
///
/// Each call pops one entry from the queue: `Some(err)` fails the call,
/// `None` (or an empty queue) succeeds by mapping every input through the
/// embedding function.
pub struct ScriptedProvider {
    embed_fn: EmbedFn,
    script: Mutex<VecDeque<Option<ProviderError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(f: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        Self {
            embed_fn: Box::new(f),
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// `[1, 0]` for text containing `keyword`, `[0, 1]` otherwise.
    pub fn keyword(keyword: &'static str) -> Self {
        Self::new(move |text| {
            if text.contains(keyword) {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            }
        })
    }

    pub fn with_script(self, script: Vec<Option<ProviderError>>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        (self.embed_fn)(text)
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(Some(err)) = self.script.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(batch.iter().map(|s| (self.embed_fn)(s)).collect())
    }
}

/// Generator that records the last prompt and answers with a fixed reply.
pub struct RecordingGenerator {
    pub reply: Result<String, ProviderError>,
    pub last_prompt: Mutex<Option<String>>,
}

impl RecordingGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err(ProviderError::Failure {
                message: "generator down".into(),
            }),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

impl GenerativeProvider for RecordingGenerator {
    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.reply.clone()
    }
}

pub fn timeout() -> Option<ProviderError> {
    Some(ProviderError::Timeout {
        message: "scripted timeout".into(),
    })
}

/// Default config with retries that do not sleep.
pub fn fast_config() -> TriragConfig {
    let mut config = TriragConfig::default();
    config.batch.retry_delay_ms = 0;
    config
}

/// Index `triples` directly (no materialization) and persist into `store`.
pub fn index_triples(triples: &[Triple], provider: &ScriptedProvider, store: &dyn BlobStore) {
    let graph: GraphStore = triples.iter().cloned().collect();
    let outcomes = triples
        .iter()
        .map(|t| Ok(provider.vector_for(&t.to_string())))
        .collect();
    IndexBuilder::default()
        .build(triples, outcomes)
        .unwrap()
        .persist(&graph, store)
        .unwrap();
}
