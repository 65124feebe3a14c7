//! Retrieval: query construction, vector index and thresholded lookup.

pub mod query;
pub mod retriever;
pub mod vector;
