//! SerpAPI Google search
//!
//! Requires `SERPAPI_API_KEY`. Organic results map directly onto hits.

use async_trait::async_trait;
use reqwest::Client;
use sdk::errors::EngineError;
use sdk::types::SearchHit;
use serde::Deserialize;
use std::time::Duration;

use super::SearchProvider;
use crate::secrets::{scrub_secrets, SecretString};

pub struct SerpApiSearch {
    base_url: String,
    api_key: SecretString,
    max_results: usize,
    client: Client,
}

impl SerpApiSearch {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        max_results: usize,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            max_results,
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, EngineError> {
        tracing::debug!("SerpAPI search: {}", query);

        let num = self.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.api_key.unsecure()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::SearchUnavailable(scrub_secrets(&e.to_string())))?;

        let status = response.status();
        let body: SerpResponse = response.json().await.map_err(|e| {
            EngineError::SearchUnavailable(scrub_secrets(&format!(
                "Failed to parse SerpAPI response ({}): {}",
                status, e
            )))
        })?;

        if let Some(error) = body.error {
            return Err(EngineError::SearchUnavailable(scrub_secrets(&error)));
        }
        if !status.is_success() {
            return Err(EngineError::SearchUnavailable(format!("SerpAPI returned {}", status)));
        }

        Ok(body
            .organic_results
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .take(self.max_results)
            .map(|r| SearchHit::new(r.title, r.link, r.snippet))
            .collect())
    }
}
