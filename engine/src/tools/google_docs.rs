//! Google Docs publishing through a Composio MCP server
//!
//! Each publish opens a fresh MCP session at
//! `{base_url}/v3/mcp/{config_id}/mcp?user_id={user_id}` and calls the
//! create-from-markdown tool once. The returned reference is the document
//! URL found in the tool output, or one built from a returned document id.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use sdk::errors::EngineError;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

use super::mcp::{McpError, McpHttpClient};
use super::PublishProvider;
use crate::secrets::{scrub_secrets, SecretString};

static DOC_LINK_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn doc_link_pattern() -> Option<&'static Regex> {
    DOC_LINK_PATTERN
        .get_or_init(|| {
            Regex::new(r"https://docs\.google\.com/document/d/[a-zA-Z0-9_-]+(?:/[a-zA-Z0-9_/-]*)?")
                .ok()
        })
        .as_ref()
}

/// Find the first Google Docs document URL in free text
pub fn extract_google_doc_link(text: &str) -> Option<String> {
    doc_link_pattern()?
        .find(text)
        .map(|m| m.as_str().to_string())
}

/// Look for a document id anywhere in a tool's JSON output
fn find_document_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            for key in ["documentId", "document_id"] {
                if let Some(id) = map.get(key).and_then(|v| v.as_str()) {
                    if !id.is_empty() {
                        return Some(id.to_string());
                    }
                }
            }
            map.values().find_map(find_document_id)
        }
        Value::Array(items) => items.iter().find_map(find_document_id),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(|v| v.is_object() || v.is_array())
            .and_then(|v| find_document_id(&v)),
        _ => None,
    }
}

pub(crate) fn document_url(id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", id)
}

/// `{base_url}/v3/mcp/{config_id}/mcp?user_id={user_id}` with the id and
/// user percent-encoded
fn mcp_endpoint(
    base_url: &str,
    mcp_config_id: &str,
    user_id: &str,
) -> Result<String, EngineError> {
    let invalid = || EngineError::Config(format!("Invalid publish.base_url: {}", base_url));

    let mut url = Url::parse(base_url).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(["v3", "mcp", mcp_config_id, "mcp"]);
    url.query_pairs_mut().append_pair("user_id", user_id);

    Ok(url.into())
}

pub struct GoogleDocsPublisher {
    client: McpHttpClient,
    tool: String,
}

impl GoogleDocsPublisher {
    pub fn new(
        base_url: &str,
        mcp_config_id: &str,
        user_id: &str,
        tool: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let endpoint = mcp_endpoint(base_url, mcp_config_id, user_id)?;

        let client = McpHttpClient::new(endpoint, api_key, timeout)
            .map_err(|e| EngineError::Config(e.to_string()))?;

        Ok(Self {
            client,
            tool: tool.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

fn unavailable(e: McpError) -> EngineError {
    EngineError::PublishUnavailable(scrub_secrets(&e.to_string()))
}

#[async_trait]
impl PublishProvider for GoogleDocsPublisher {
    fn name(&self) -> &str {
        "google_docs"
    }

    async fn publish(&self, title: &str, text: &str) -> Result<String, EngineError> {
        tracing::debug!("Publishing '{}' ({} chars) via {}", title, text.len(), self.tool);

        let session = self.client.initialize().await.map_err(unavailable)?;

        let result = self
            .client
            .call_tool(
                &session,
                &self.tool,
                serde_json::json!({ "title": title, "markdown_text": text }),
            )
            .await
            .map_err(unavailable)?;

        let output = result.text();

        if result.is_error {
            return Err(EngineError::PublishUnavailable(scrub_secrets(&format!(
                "{} reported an error: {}",
                self.tool,
                output.chars().take(300).collect::<String>()
            ))));
        }

        if let Some(link) = extract_google_doc_link(&output) {
            return Ok(link);
        }

        let structured = result.structured_content.as_ref().and_then(find_document_id);
        let from_text = || find_document_id(&Value::String(output.clone()));

        structured
            .or_else(from_text)
            .map(|id| document_url(&id))
            .ok_or_else(|| {
                EngineError::PublishUnavailable(format!(
                    "{} returned no document link",
                    self.tool
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_link_from_prose() {
        let text = "Created your doc: https://docs.google.com/document/d/1AbC_d-9/edit?usp=sharing done";
        assert_eq!(
            extract_google_doc_link(text).as_deref(),
            Some("https://docs.google.com/document/d/1AbC_d-9/edit")
        );
    }

    #[test]
    fn test_extract_link_absent() {
        assert!(extract_google_doc_link("no link here").is_none());
        assert!(extract_google_doc_link("https://docs.google.com/spreadsheets/d/xyz").is_none());
    }

    #[test]
    fn test_find_document_id_nested() {
        let value = serde_json::json!({
            "successful": true,
            "data": { "response_data": { "documentId": "doc-42", "title": "T" } }
        });
        assert_eq!(find_document_id(&value).as_deref(), Some("doc-42"));
    }

    #[test]
    fn test_find_document_id_in_json_text() {
        let value = Value::String(r#"{"data":{"document_id":"abc"}}"#.to_string());
        assert_eq!(find_document_id(&value).as_deref(), Some("abc"));
        assert!(find_document_id(&Value::String("plain words".into())).is_none());
    }

    #[test]
    fn test_endpoint_format() {
        let publisher = GoogleDocsPublisher::new(
            "https://backend.composio.dev/",
            "cfg-1",
            "default",
            "GOOGLEDOCS_CREATE_DOCUMENT_MARKDOWN",
            SecretString::new("ak_test"),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            publisher.endpoint(),
            "https://backend.composio.dev/v3/mcp/cfg-1/mcp?user_id=default"
        );
        assert_eq!(document_url("x1"), "https://docs.google.com/document/d/x1/edit");
    }

    #[test]
    fn test_endpoint_encodes_reserved_characters() {
        let endpoint = mcp_endpoint("https://backend.composio.dev", "cfg/1", "team a&b#c").unwrap();
        assert_eq!(
            endpoint,
            "https://backend.composio.dev/v3/mcp/cfg%2F1/mcp?user_id=team+a%26b%23c"
        );

        let err = mcp_endpoint("not a url", "cfg-1", "default").unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("publish.base_url")));
    }
}
