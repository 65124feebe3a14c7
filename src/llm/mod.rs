//! Clients for the external models: embeddings for indexing/retrieval and
//! chat completions for analysis.

pub mod chat;
pub mod embeddings;

#[cfg(test)]
mod stub;
