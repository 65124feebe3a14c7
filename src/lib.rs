//! # standards-check
//!
//! A retrieval-augmented code quality checker. A corpus of coding standards
//! is chunked and embedded once at startup; each submitted snippet is turned
//! into a retrieval query, matched against the standards, and reviewed by a
//! chat model that receives the closest standards as context.
//!
//! ## Pipeline
//!
//! ```text
//!        ┌──────────────┐
//!        │  Raw code    │
//!        └──────┬───────┘
//!               │ empty? ──────────────► UNKNOWN, score 0
//!               ▼
//!     ┌───────────────────┐
//!     │  Query Enhancer   │  strip comments, append
//!     │                   │  identifiers + error keywords
//!     └─────────┬─────────┘
//!               ▼
//!     ┌───────────────────┐
//!     │    Retriever      │  embed → top_k nearest
//!     │                   │  → drop distance > threshold
//!     └─────────┬─────────┘
//!               │ none left? ──────────► SAFE, score 100
//!               ▼
//!     ┌───────────────────┐
//!     │  Analysis Engine  │  chat model → JSON issues
//!     │                   │  (fallback: distance bands)
//!     └─────────┬─────────┘
//!               ▼
//!     ┌───────────────────┐
//!     │     Verdict       │  risk level + quality score
//!     └───────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration and validation
//! - [`error`] - Typed errors for startup configuration and model analysis
//! - [`models`] - Chunks, candidates, findings, reports and wire types
//! - [`chunking`] - Corpus loading and overlapping recursive splitting
//! - [`llm::embeddings`] - Hash, Ollama and OpenAI-compatible embedders
//! - [`llm::chat`] - Chat-completion client for the analysis model
//! - [`search::vector`] - In-memory vector index with disk persistence
//! - [`search::query`] - Retrieval query construction from raw code
//! - [`search::retriever`] - Embedding lookup with a distance threshold
//! - [`analysis`] - Prompting, output parsing, fallback scoring and verdicts
//! - [`api`] - Axum handlers for quality checks and health
//! - [`state`] - Shared application state built at startup

pub mod analysis;
pub mod api;
pub mod chunking;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
