use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::assessment::fit_scoring::{FitScorer, KeywordFitScorer, LlmFitScorer};
use crate::config::{Config, ExtractionStrategy, ScorerBackend};
use crate::extraction::{FieldExtractor, LlmFieldExtractor, RuleBasedExtractor};
use crate::llm_client::LlmClient;
use crate::profile::gateway::ProfileSyncGateway;
use crate::profile::store::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Single write path for profile state and assessment history.
    pub gateway: ProfileSyncGateway,
    /// Pluggable fit scorer. Default: KeywordFitScorer. Swap via FIT_SCORER env.
    pub fit_scorer: Arc<dyn FitScorer>,
    /// Pluggable field extractor. Default: RuleBasedExtractor. Swap via EXTRACTION_STRATEGY env.
    pub extractor: Arc<dyn FieldExtractor>,
}

impl AppState {
    /// Wires the configured backends around `store`.
    pub fn new(config: Config, store: Arc<dyn ProfileStore>) -> Result<Self> {
        let fit_scorer: Arc<dyn FitScorer> = match config.fit_scorer {
            ScorerBackend::Keyword => Arc::new(KeywordFitScorer::new(config.scoring)),
            ScorerBackend::Llm => {
                let client = LlmClient::new(config.llm.clone())?;
                info!("LLM fit scoring enabled (model: {})", client.model());
                Arc::new(LlmFitScorer(client))
            }
        };
        let extractor: Arc<dyn FieldExtractor> = match config.extraction {
            ExtractionStrategy::Rules => Arc::new(RuleBasedExtractor),
            ExtractionStrategy::Llm => {
                Arc::new(LlmFieldExtractor(LlmClient::new(config.llm.clone())?))
            }
        };
        info!(
            "Fit scorer: {:?}, field extractor: {}",
            config.fit_scorer,
            extractor.name()
        );

        Ok(Self {
            gateway: ProfileSyncGateway::new(store, config.store_timeout),
            fit_scorer,
            extractor,
            config,
        })
    }
}
