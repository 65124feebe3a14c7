use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::search::vector::Metric;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the persisted index is stored
    pub data_dir: PathBuf,
    /// Coding-standard corpus (UTF-8 text / markdown)
    pub corpus_path: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub retrieval: RetrievalConfig,
    pub scoring: ScoringConfig,
}

/// How the corpus is cut into retrieval units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub max_chunk_size: usize,
    /// Characters shared between consecutive chunks (upper bound)
    pub overlap: usize,
    /// Split points, highest priority first. Arbitrary character
    /// boundaries are always the last resort.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap: 100,
            separators: ["\n\n", "\n// ", "\n", "//", ";", "{", "}", " "]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "hash" (offline), "ollama" or "openai"
    pub provider: String,
    /// Base URL for the embedding API (unused by "hash")
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub dim: usize,
    /// Concurrent embedding requests while building the index
    pub build_concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            dim: 384,
            build_concurrency: 4,
        }
    }
}

/// OpenAI-compatible chat completion settings for the analysis model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    /// Without a key the model path is disabled and every analysis
    /// uses distance banding.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on a single model call, including waiting for a slot
    pub timeout_secs: u64,
    /// Model calls allowed in flight at once
    pub max_concurrent: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 3000,
            timeout_secs: 60,
            max_concurrent: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Maximum accepted distance (lower = more relevant)
    pub score_threshold: f32,
    pub metric: Metric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.6,
            metric: Metric::SquaredL2,
        }
    }
}

/// Heuristics for the distance-banded fallback and the score floor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Distances strictly below this are HIGH severity
    pub high_below: f32,
    /// Distances strictly below this (and not HIGH) are MEDIUM
    pub medium_below: f32,
    /// Minimum score when the model offered corrected code
    pub fixed_code_floor: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_below: 0.3,
            medium_below: 0.5,
            fixed_code_floor: 70,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            corpus_path: PathBuf::from("./rag_data/standards.md"),
            bind_addr: "127.0.0.1:8001".to_string(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            chat: ChatConfig::default(),
            retrieval: RetrievalConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

/// Overwrite `target` with the parsed value of `key` if it is set and parses.
fn parse_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = std::env::var(key) {
        if let Ok(v) = val.parse() {
            *target = v;
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("STANDARDS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("STANDARDS_CORPUS_PATH") {
            config.corpus_path = PathBuf::from(path);
        }
        if let Ok(addr) = std::env::var("STANDARDS_BIND_ADDR") {
            config.bind_addr = addr;
        }

        parse_env("CHUNK_MAX_SIZE", &mut config.chunking.max_chunk_size);
        parse_env("CHUNK_OVERLAP", &mut config.chunking.overlap);

        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }
        parse_env("EMBEDDING_DIM", &mut config.embedding.dim);
        parse_env(
            "EMBEDDING_BUILD_CONCURRENCY",
            &mut config.embedding.build_concurrency,
        );

        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.chat.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.chat.model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            if !key.trim().is_empty() {
                config.chat.api_key = Some(key);
            }
        }
        parse_env("LLM_TEMPERATURE", &mut config.chat.temperature);
        parse_env("LLM_MAX_TOKENS", &mut config.chat.max_tokens);
        parse_env("LLM_TIMEOUT_SECS", &mut config.chat.timeout_secs);
        parse_env("LLM_MAX_CONCURRENT", &mut config.chat.max_concurrent);

        parse_env("RETRIEVAL_TOP_K", &mut config.retrieval.top_k);
        parse_env(
            "RETRIEVAL_SCORE_THRESHOLD",
            &mut config.retrieval.score_threshold,
        );
        if let Ok(metric) = std::env::var("RETRIEVAL_METRIC") {
            match metric.as_str() {
                "squared_l2" | "l2" => config.retrieval.metric = Metric::SquaredL2,
                "cosine" => config.retrieval.metric = Metric::Cosine,
                other => tracing::warn!("Ignoring unknown RETRIEVAL_METRIC {other:?}"),
            }
        }

        parse_env("SCORING_HIGH_BELOW", &mut config.scoring.high_below);
        parse_env("SCORING_MEDIUM_BELOW", &mut config.scoring.medium_below);
        parse_env(
            "SCORING_FIXED_CODE_FLOOR",
            &mut config.scoring.fixed_code_floor,
        );

        config
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chunking = &self.chunking;
        if chunking.max_chunk_size == 0 {
            return Err(ConfigError::Invalid("max_chunk_size must be positive".into()));
        }
        if chunking.overlap >= chunking.max_chunk_size {
            return Err(ConfigError::Invalid(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                chunking.overlap, chunking.max_chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be positive".into()));
        }
        let threshold = self.retrieval.score_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "score_threshold must be a non-negative number, got {threshold}"
            )));
        }
        if self.embedding.dim == 0 {
            return Err(ConfigError::Invalid("embedding dimension must be positive".into()));
        }
        if self.chat.timeout_secs == 0 {
            return Err(ConfigError::Invalid("LLM timeout must be positive".into()));
        }
        if self.chat.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "LLM max_concurrent must be positive".into(),
            ));
        }
        if self.scoring.medium_below < self.scoring.high_below {
            return Err(ConfigError::Invalid(
                "medium_below must not be smaller than high_below".into(),
            ));
        }
        if self.scoring.fixed_code_floor > 100 {
            return Err(ConfigError::Invalid("fixed_code_floor must be at most 100".into()));
        }
        Ok(())
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}
