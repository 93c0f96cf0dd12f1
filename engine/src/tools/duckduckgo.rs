//! DuckDuckGo Instant Answer search
//!
//! Free and keyless. The Instant Answer API returns an abstract for the
//! query plus a tree of related topics; both are flattened into hits.
//!
//! Instant Answer only resolves entity lookups, so agents' refinement terms
//! are dropped and the bare topic is sent.

use async_trait::async_trait;
use reqwest::Client;
use sdk::errors::EngineError;
use sdk::types::SearchHit;
use serde::Deserialize;
use std::time::Duration;

use super::SearchProvider;
use crate::secrets::scrub_secrets;

pub struct DuckDuckGoSearch {
    base_url: String,
    max_results: usize,
    client: Client,
}

impl DuckDuckGoSearch {
    pub fn new(
        base_url: impl Into<String>,
        max_results: usize,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("syllabus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results,
            client,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "FirstURL")]
    first_url: Option<String>,
    /// Present on category groups, which nest their own topics
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

/// DuckDuckGo topic text reads "Title - description"
fn split_topic_text(text: &str) -> (String, String) {
    match text.split_once(" - ") {
        Some((title, rest)) => (title.trim().to_string(), rest.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

fn collect_topics(topics: &[RelatedTopic], hits: &mut Vec<SearchHit>, limit: usize) {
    for topic in topics {
        if hits.len() >= limit {
            return;
        }
        match (&topic.text, &topic.first_url) {
            (Some(text), Some(url)) if !url.is_empty() => {
                let (title, snippet) = split_topic_text(text);
                hits.push(SearchHit::new(title, url.clone(), snippet));
            }
            _ => collect_topics(&topic.topics, hits, limit),
        }
    }
}

fn answer_to_hits(answer: &InstantAnswer, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    if !answer.abstract_url.is_empty() && !answer.abstract_text.is_empty() {
        hits.push(SearchHit::new(
            answer.heading.clone(),
            answer.abstract_url.clone(),
            answer.abstract_text.clone(),
        ));
    }

    collect_topics(&answer.related_topics, &mut hits, limit);
    hits.truncate(limit);
    hits
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    fn compose_query(&self, topic: &str, _terms: &str) -> String {
        topic.to_string()
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, EngineError> {
        tracing::debug!("DuckDuckGo search: {}", query);

        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| EngineError::SearchUnavailable(scrub_secrets(&e.to_string())))?;

        if !response.status().is_success() {
            return Err(EngineError::SearchUnavailable(format!(
                "DuckDuckGo returned {}",
                response.status()
            )));
        }

        let answer: InstantAnswer = response.json().await.map_err(|e| {
            EngineError::SearchUnavailable(format!("Failed to parse DuckDuckGo response: {}", e))
        })?;

        let hits = answer_to_hits(&answer, self.max_results);
        tracing::debug!("DuckDuckGo returned {} hits", hits.len());
        Ok(hits)
    }
}
