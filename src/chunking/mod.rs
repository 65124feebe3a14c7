//! Corpus loading: reads the standards document and cuts it into overlapping chunks.

pub mod splitter;

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ChunkingConfig;
use crate::error::ConfigError;
use crate::models::Chunk;

/// Read the corpus at `path` and split it into chunks.
///
/// A missing or unreadable corpus is a configuration error; the caller is
/// expected to abort startup.
pub fn load_corpus(path: &Path, config: &ChunkingConfig) -> Result<Vec<Chunk>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::CorpusMissing(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::CorpusUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let chunks = chunk_text(&text, &path.display().to_string(), config);
    tracing::info!(
        "Loaded corpus {} ({} chars) into {} chunks",
        path.display(),
        text.chars().count(),
        chunks.len()
    );
    Ok(chunks)
}

/// Split `text` into chunks tagged with `source`.
pub fn chunk_text(text: &str, source: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    splitter::split_spans(text, &config.separators, config.max_chunk_size, config.overlap)
        .into_iter()
        .enumerate()
        .map(|(i, span)| {
            let mut meta = BTreeMap::new();
            meta.insert("source".to_string(), source.to_string());
            meta.insert("chunk_index".to_string(), i.to_string());
            meta.insert("start_char".to_string(), span.start_char.to_string());
            meta.insert("overlap".to_string(), span.overlap.to_string());
            Chunk {
                text: text[span.start..span.end].to_string(),
                source_metadata: meta,
            }
        })
        .collect()
}

/// Rebuild the source text by dropping each chunk's overlap prefix.
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.extend(chunk.text.chars().skip(chunk.overlap()));
    }
    out
}
