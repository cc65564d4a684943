//! Answer composition: retrieved entities + query → generator prompt.
//!
//! Any failure on this path degrades to [`Answer::InsufficientData`] rather
//! than surfacing an error to the caller.

use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::provider::GenerativeProvider;
use crate::retrieve::{RetrievalEngine, RetrievalResult};

/// Outcome of [`answer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Answer {
    Generated { text: String, entities: usize },
    InsufficientData { message: String },
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Generated { text, .. } => text,
            Answer::InsufficientData { message } => message,
        }
    }
}

/// Build the generator prompt.
pub fn compose_prompt(
    config: &RetrievalConfig,
    query: &str,
    result: &RetrievalResult,
) -> String {
    let mut prompt = String::new();
    if !config.preamble.is_empty() {
        prompt.push_str(config.preamble.trim_end());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!("User query: '{query}'.\n"));
    prompt.push_str("Data:\n");
    prompt.push_str(&result.render_context());
    prompt.push_str("Instructions:\n");
    prompt.push_str("1. Answer only from the data above.\n");
    prompt.push_str(&format!(
        "2. If the data is insufficient, reply with: {}\n",
        config.fallback_message
    ));
    prompt
}

/// Retrieve context for `query` and generate an answer from it.
pub fn answer(
    engine: &RetrievalEngine,
    generator: &dyn GenerativeProvider,
    config: &RetrievalConfig,
    query: &str,
) -> Answer {
    let insufficient = || Answer::InsufficientData {
        message: config.fallback_message.clone(),
    };

    let result = match engine.retrieve_with(query, &engine.default_options()) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "retrieval failed, answering with fallback");
            return insufficient();
        }
    };
    if result.is_empty() {
        tracing::info!("no entities retrieved, answering with fallback");
        return insufficient();
    }

    let prompt = compose_prompt(config, query, &result);
    match generator.generate(&prompt) {
        Ok(text) if !text.trim().is_empty() => Answer::Generated {
            text,
            entities: result.entities.len(),
        },
        Ok(_) => {
            tracing::warn!("generator returned an empty response");
            insufficient()
        }
        Err(e) => {
            tracing::warn!(error = %e, "generation failed, answering with fallback");
            insufficient()
        }
    }
}
