// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # trirag
//!
//! Triple-embedding retrieval over relational data.
//!
//! ## Architecture
//!
//! - **Materialization** (`materialize`): rows → RDF-style triples under a stable IRI scheme
//! - **Batch embedding** (`batch`): chunked provider calls with bounded, fixed-delay retry
//! - **Index** (`index`): lockstep compaction, HNSW in cosine space, four persisted artifacts
//! - **Retrieval** (`retrieve`): k-NN seeds, one-hop relation expansion, entity projection
//! - **Graph** (`graph`): petgraph-backed triple store with Turtle persistence via oxigraph
//! - **Storage** (`store`): blob stores over memory (DashMap), a directory, or redb
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use trirag::config::TriragConfig;
//! use trirag::pipeline::run_build;
//! use trirag::provider::OllamaEmbedder;
//! use trirag::retrieve::RetrievalEngine;
//! use trirag::source::{MemorySource, Row};
//! use trirag::store::MemBlobStore;
//!
//! let config = TriragConfig::default();
//! let source = MemorySource::new().with_table(
//!     "helplines",
//!     vec![Row::new().with("id", 1i64).with("name", "Women Helpline").with("number", 1091i64)],
//! );
//! let embedder = Arc::new(OllamaEmbedder::new(&config.embedding));
//! let store = MemBlobStore::new();
//!
//! let result = run_build(&source, embedder.as_ref(), &store, &config);
//! println!("{}", serde_json::to_string(&result).unwrap());
//!
//! let engine = RetrievalEngine::initialize(&store, embedder, &config.retrieval).unwrap();
//! let found = engine.retrieve("women helpline number", config.retrieval.k).unwrap();
//! print!("{}", found.render_context());
//! ```

pub mod answer;
pub mod batch;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod materialize;
pub mod pipeline;
pub mod provider;
pub mod retrieve;
pub mod source;
pub mod store;
