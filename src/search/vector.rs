use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;
use xxhash_rust::xxh3::Xxh3;

use crate::error::ConfigError;
use crate::llm::embeddings::Embedder;
use crate::models::Chunk;

const INDEX_FILE: &str = "index.json";
const FORMAT_VERSION: u32 = 1;
const EMBED_BATCH: usize = 32;

/// How far apart two vectors are. Smaller is more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Sum of squared differences; in [0, 4] for unit vectors.
    SquaredL2,
    /// `1 - cosine similarity`; in [0, 2].
    Cosine,
}

impl Metric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::SquaredL2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>(),
            Metric::Cosine => (1.0 - cosine_similarity(a, b)).max(0.0),
        }
    }
}

/// A stored vector entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVector {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub entry: IndexedVector,
    pub distance: f32,
}

/// Read-only nearest-neighbour search, as seen by the retriever.
pub trait VectorSearch: Send + Sync {
    /// At most `k` entries ordered by ascending distance; equal distances
    /// keep insertion order.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Describes what a persisted index was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub built_at: DateTime<Utc>,
    pub fingerprint: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub metric: Metric,
    pub entry_count: usize,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    manifest: IndexManifest,
    entries: Vec<IndexedVector>,
}

/// In-memory, append-only vector index with brute-force search and disk
/// persistence.
pub struct VectorIndex {
    entries: RwLock<Vec<IndexedVector>>,
    dimension: usize,
    metric: Metric,
}

impl VectorIndex {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dimension,
            metric,
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Append chunks with their vectors. `vectors` must be parallel with `chunks`.
    pub fn append(&self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            anyhow::bail!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            anyhow::bail!(
                "Vector dimension mismatch: index is {}, got {}",
                self.dimension,
                bad.len()
            );
        }

        let mut entries = self.entries.write();
        entries.extend(
            chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexedVector {
                    id: Uuid::new_v4(),
                    vector,
                    chunk,
                }),
        );
        Ok(())
    }

    /// Embed `chunks` in batches (at most `concurrency` requests in flight)
    /// and index them in corpus order.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        metric: Metric,
        concurrency: usize,
    ) -> Result<Self> {
        let index = Self::new(embedder.dimension(), metric);
        let batches: Vec<Vec<Chunk>> = chunks.chunks(EMBED_BATCH).map(|b| b.to_vec()).collect();

        let embedded: Vec<(Vec<Chunk>, Vec<Vec<f32>>)> = stream::iter(batches)
            .map(|batch| async move {
                let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                let vectors = embedder.embed(&texts).await?;
                Ok::<_, anyhow::Error>((batch, vectors))
            })
            .buffered(concurrency.max(1))
            .try_collect()
            .await
            .context("Failed to embed corpus chunks")?;

        for (batch, vectors) in embedded {
            index.append(batch, vectors)?;
        }

        tracing::info!(
            "Built vector index: {} entries, dim {}, metric {:?}",
            index.len(),
            index.dimension,
            index.metric
        );
        Ok(index)
    }

    /// Persist to `<dir>/index.json` (atomic write via temp file + rename).
    pub fn save(&self, dir: &Path, fingerprint: &str, embedding_model: &str) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let entries = self.entries.read();
        let persisted = PersistedIndex {
            manifest: IndexManifest {
                version: FORMAT_VERSION,
                built_at: Utc::now(),
                fingerprint: fingerprint.to_string(),
                embedding_model: embedding_model.to_string(),
                dimension: self.dimension,
                metric: self.metric,
                entry_count: entries.len(),
            },
            entries: entries.clone(),
        };
        drop(entries);

        let path = dir.join(INDEX_FILE);
        let tmp_path = path.with_extension("json.tmp");
        let data = serde_json::to_string(&persisted)?;
        std::fs::write(&tmp_path, data)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to move index into {}", path.display()))?;
        Ok(())
    }

    /// Load a previously saved index.
    pub fn open(dir: &Path) -> Result<(Self, IndexManifest)> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Err(ConfigError::IndexMissing(dir.to_path_buf()).into());
        }

        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read vector index {}", path.display()))?;
        let persisted: PersistedIndex =
            serde_json::from_str(&data).context("Failed to parse vector index")?;

        let manifest = persisted.manifest;
        if manifest.version != FORMAT_VERSION {
            anyhow::bail!(
                "Unsupported index format version {} (expected {FORMAT_VERSION})",
                manifest.version
            );
        }

        if let Some(bad) = persisted
            .entries
            .iter()
            .find(|e| e.vector.len() != manifest.dimension)
        {
            anyhow::bail!(
                "Persisted vector {} has dimension {}, manifest says {}",
                bad.id,
                bad.vector.len(),
                manifest.dimension
            );
        }

        // Entries are restored as stored so ids survive restarts
        let index = Self {
            entries: RwLock::new(persisted.entries),
            dimension: manifest.dimension,
            metric: manifest.metric,
        };

        Ok((index, manifest))
    }

    /// Reuse the index persisted in `dir` if it was built from the same
    /// chunks, embedding model and metric; otherwise rebuild and persist it.
    pub async fn open_or_build(
        dir: &Path,
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        metric: Metric,
        concurrency: usize,
    ) -> Result<Self> {
        let fingerprint = fingerprint(&chunks, embedder.model_name(), embedder.dimension());

        match Self::open(dir) {
            Ok((index, manifest))
                if manifest.fingerprint == fingerprint && manifest.metric == metric =>
            {
                tracing::info!(
                    "Loaded persisted index from {} ({} entries, built {})",
                    dir.display(),
                    manifest.entry_count,
                    manifest.built_at
                );
                return Ok(index);
            }
            Ok(_) => tracing::info!("Persisted index is stale; rebuilding"),
            Err(e) => tracing::info!("No usable persisted index ({e:#}); building"),
        }

        let index = Self::build(chunks, embedder, metric, concurrency).await?;
        index.save(dir, &fingerprint, embedder.model_name())?;
        Ok(index)
    }
}

impl VectorSearch for VectorIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        if query.len() != self.dimension {
            anyhow::bail!(
                "Query dimension mismatch: index is {}, query is {}",
                self.dimension,
                query.len()
            );
        }

        let entries = self.entries.read();
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, self.metric.distance(query, &e.vector)))
            .collect();

        // Stable sort keeps insertion order among equal distances
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| VectorHit {
                entry: entries[i].clone(),
                distance,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Identity of an index build: chunk texts and boundaries plus the embedding model.
pub fn fingerprint(chunks: &[Chunk], embedding_model: &str, dimension: usize) -> String {
    let mut hasher = Xxh3::new();
    hasher.update(embedding_model.as_bytes());
    hasher.update(&(dimension as u64).to_le_bytes());
    for chunk in chunks {
        hasher.update(&(chunk.text.len() as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
        hasher.update(&(chunk.overlap() as u64).to_le_bytes());
    }
    format!("{:016x}", hasher.digest())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
