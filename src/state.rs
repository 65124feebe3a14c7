use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::analysis::engine::AnalysisEngine;
use crate::analysis::CodeChecker;
use crate::chunking::load_corpus;
use crate::config::Config;
use crate::llm::chat::{ChatModel, OpenAiChat};
use crate::llm::embeddings::build_embedder;
use crate::search::retriever::Retriever;
use crate::search::vector::{VectorIndex, VectorSearch};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub checker: Arc<CodeChecker>,
    pub index: Arc<dyn VectorSearch>,
}

impl AppState {
    /// Load the corpus, open or build the index and wire the pipeline.
    /// Any failure here is fatal for startup.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.chat.timeout_secs.max(1) + 30))
            .build()
            .context("Failed to build HTTP client")?;

        let embedder = build_embedder(&http_client, &config.embedding)?;
        let chunks = load_corpus(&config.corpus_path, &config.chunking)?;
        let index = VectorIndex::open_or_build(
            &config.index_dir(),
            chunks,
            embedder.as_ref(),
            config.retrieval.metric,
            config.embedding.build_concurrency,
        )
        .await?;
        let index: Arc<dyn VectorSearch> = Arc::new(index);

        let model = OpenAiChat::from_config(http_client, &config.chat)
            .map(|chat| Arc::new(chat) as Arc<dyn ChatModel>);
        if model.is_none() {
            tracing::warn!("LLM_API_KEY not set; analysis uses distance banding only");
        }

        let retriever = Retriever::new(embedder, index.clone(), &config.retrieval);
        let engine = AnalysisEngine::from_config(model, &config.chat, config.scoring);

        Ok(Self::from_parts(config, CodeChecker::new(retriever, engine), index))
    }

    /// Assemble state from prebuilt parts.
    pub fn from_parts(config: Config, checker: CodeChecker, index: Arc<dyn VectorSearch>) -> Self {
        Self {
            config: Arc::new(config),
            checker: Arc::new(checker),
            index,
        }
    }
}
