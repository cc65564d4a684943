//! Ollama REST clients over `ureq`.
//!
//! `OllamaEmbedder` calls `POST /api/embed` with the whole batch as `input`;
//! `OllamaGenerator` calls `POST /api/generate` with `stream: false`.

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

use super::{EmbeddingProvider, GenerativeProvider, ProviderResult};

/// Embedding model used when the config leaves `model` empty.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
/// Generation model used when the config leaves `model` empty.
pub const DEFAULT_GENERATION_MODEL: &str = "llama3.2";

/// Shared HTTP plumbing for both roles.
struct OllamaClient {
    base_url: String,
    model: String,
    agent: ureq::Agent,
    timeout: Duration,
}

impl OllamaClient {
    fn new(config: &ProviderConfig, default_model: &str) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let model = if config.model.is_empty() {
            default_model.to_string()
        } else {
            config.model.clone()
        };
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            timeout,
        }
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> ProviderResult<serde_json::Value> {
        let url = format!("{}{path}", self.base_url);
        let body_str = serde_json::to_string(body).map_err(|e| ProviderError::Failure {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e| self.classify(e))?;

        let resp_str = resp.into_string().map_err(|e| {
            if is_timeout(&e) {
                ProviderError::Timeout {
                    message: format!("reading response from {url}: {e}"),
                }
            } else {
                ProviderError::Failure {
                    message: format!("reading response from {url}: {e}"),
                }
            }
        })?;

        serde_json::from_str(&resp_str).map_err(|e| ProviderError::Failure {
            message: format!("unparseable response from {url}: {e}"),
        })
    }

    fn classify(&self, err: ureq::Error) -> ProviderError {
        match err {
            ureq::Error::Status(code, resp) => {
                let url = resp.get_url().to_string();
                let body = resp.into_string().unwrap_or_default();
                ProviderError::Failure {
                    message: format!("{url} returned status {code}: {body}"),
                }
            }
            ureq::Error::Transport(transport) => {
                let timed_out = std::error::Error::source(&transport)
                    .and_then(|s| s.downcast_ref::<std::io::Error>())
                    .is_some_and(is_timeout);
                if timed_out {
                    ProviderError::Timeout {
                        message: format!("no response within {}s", self.timeout.as_secs()),
                    }
                } else {
                    ProviderError::Failure {
                        message: transport.to_string(),
                    }
                }
            }
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

/// Embedding provider backed by an Ollama server.
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: OllamaClient::new(config, DEFAULT_EMBEDDING_MODEL),
        }
    }

    /// Model name requests are sent with.
    pub fn model(&self) -> &str {
        &self.client.model
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    fn embed(&self, batch: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.client.model,
            "input": batch,
        });
        let json = self.client.post("/api/embed", &body)?;
        parse_embeddings(&json)
    }
}

fn parse_embeddings(json: &serde_json::Value) -> ProviderResult<Vec<Vec<f32>>> {
    let rows = json["embeddings"]
        .as_array()
        .ok_or_else(|| ProviderError::Failure {
            message: "missing 'embeddings' field".into(),
        })?;
    rows.iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| ProviderError::Failure {
                    message: "embedding is not an array".into(),
                })?
                .iter()
                .map(|x| {
                    x.as_f64().map(|f| f as f32).ok_or_else(|| ProviderError::Failure {
                        message: "embedding component is not a number".into(),
                    })
                })
                .collect()
        })
        .collect()
}

/// Generative provider backed by an Ollama server.
pub struct OllamaGenerator {
    client: OllamaClient,
}

impl OllamaGenerator {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: OllamaClient::new(config, DEFAULT_GENERATION_MODEL),
        }
    }

    pub fn model(&self) -> &str {
        &self.client.model
    }
}

impl GenerativeProvider for OllamaGenerator {
    fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let body = serde_json::json!({
            "model": self.client.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = self.client.post("/api/generate", &body)?;
        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::Failure {
                message: "missing 'response' field".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_selects_role_default() {
        let config = ProviderConfig::default();
        assert_eq!(OllamaEmbedder::new(&config).model(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(OllamaGenerator::new(&config).model(), DEFAULT_GENERATION_MODEL);

        let config = ProviderConfig {
            model: "mxbai-embed-large".into(),
            ..ProviderConfig::default()
        };
        assert_eq!(OllamaEmbedder::new(&config).model(), "mxbai-embed-large");
    }

    #[test]
    fn embeddings_response_is_parsed_in_order() {
        let json = serde_json::json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.5, -1.0], [0.0, 2.0]],
        });
        let vectors = parse_embeddings(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.5, -1.0], vec![0.0, 2.0]]);
    }

    #[test]
    fn malformed_embeddings_are_failures() {
        let json = serde_json::json!({ "embedding": [0.5] });
        assert!(matches!(
            parse_embeddings(&json),
            Err(ProviderError::Failure { .. })
        ));
        let json = serde_json::json!({ "embeddings": [["x"]] });
        assert!(parse_embeddings(&json).is_err());
    }

    #[test]
    fn empty_batch_skips_the_request() {
        let embedder = OllamaEmbedder::new(&ProviderConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..ProviderConfig::default()
        });
        assert!(embedder.embed(&[]).unwrap().is_empty());
    }

    #[test]
    fn unreachable_server_is_a_failure() {
        let embedder = OllamaEmbedder::new(&ProviderConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..ProviderConfig::default()
        });
        assert!(embedder.embed(&["x".to_string()]).is_err());
    }
}
