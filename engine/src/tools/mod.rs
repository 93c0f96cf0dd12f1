//! Tool adapters used by agents
//!
//! Two capabilities, each behind a trait so the conductor can run against
//! in-process fakes:
//!
//! - [`SearchProvider`]: query → ordered search hits
//! - [`PublishProvider`]: (title, markdown) → external document reference
//!
//! Adapters make one request per call and never retry. Failures surface as
//! `SearchUnavailable` / `PublishUnavailable` and are recorded by the agent
//! runner rather than aborting the run.

pub mod duckduckgo;
pub mod google_docs;
pub mod mcp;
pub mod serpapi;

pub use duckduckgo::DuckDuckGoSearch;
pub use google_docs::{extract_google_doc_link, GoogleDocsPublisher};
pub use serpapi::SerpApiSearch;

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::SearchHit;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, SearchProviderKind};
use crate::secrets::SecretCache;

/// Web search capability
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Query sent for `topic` when an agent wants results narrowed by `terms`
    fn compose_query(&self, topic: &str, terms: &str) -> String {
        format!("{} {}", topic, terms)
    }

    /// Search the web. Returns at most the configured number of hits.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, EngineError>;
}

/// Document publishing capability
#[async_trait]
pub trait PublishProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Publish markdown text as a new document and return its reference (URL)
    async fn publish(&self, title: &str, text: &str) -> Result<String, EngineError>;
}

/// Adapters and per-call bounds handed to every agent
#[derive(Clone)]
pub struct Toolbox {
    pub search: Arc<dyn SearchProvider>,

    /// `None` when publishing is disabled; agents then skip the publish step
    pub publisher: Option<Arc<dyn PublishProvider>>,

    pub search_timeout: Duration,
    pub publish_timeout: Duration,
}

impl Toolbox {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        publisher: Option<Arc<dyn PublishProvider>>,
    ) -> Self {
        Self {
            search,
            publisher,
            search_timeout: Duration::from_secs(20),
            publish_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, search_timeout: Duration, publish_timeout: Duration) -> Self {
        self.search_timeout = search_timeout;
        self.publish_timeout = publish_timeout;
        self
    }

    /// Build the configured adapters.
    ///
    /// # Errors
    /// Returns `EngineError::Config` when a selected adapter lacks its
    /// credential or endpoint (`SERPAPI_API_KEY`, `COMPOSIO_API_KEY`,
    /// `publish.mcp_config_id`).
    pub fn from_config(config: &Config, secrets: &SecretCache) -> Result<Self, EngineError> {
        let search: Arc<dyn SearchProvider> = match config.search.provider {
            SearchProviderKind::DuckDuckGo => Arc::new(DuckDuckGoSearch::new(
                config.search.duckduckgo_base_url.clone(),
                config.search.max_results,
                config.search.timeout(),
            )?),
            SearchProviderKind::SerpApi => Arc::new(SerpApiSearch::new(
                config.search.serpapi_base_url.clone(),
                secrets.get_secret("SERPAPI_API_KEY")?,
                config.search.max_results,
                config.search.timeout(),
            )?),
        };

        let publisher: Option<Arc<dyn PublishProvider>> = if config.publish.enabled {
            let mcp_config_id = config
                .publish
                .mcp_config_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| {
                    EngineError::Config(
                        "publish.mcp_config_id is not set. Set COMPOSIO_MCP_CONFIG_ID or disable publishing".to_string(),
                    )
                })?;

            Some(Arc::new(GoogleDocsPublisher::new(
                &config.publish.base_url,
                mcp_config_id,
                &config.publish.user_id,
                config.publish.tool.clone(),
                secrets.get_secret("COMPOSIO_API_KEY")?,
                config.publish.timeout(),
            )?))
        } else {
            tracing::info!("Document publishing disabled");
            None
        };

        Ok(Self::new(search, publisher)
            .with_timeouts(config.search.timeout(), config.publish.timeout()))
    }
}
