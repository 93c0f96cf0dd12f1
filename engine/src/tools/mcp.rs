//! Minimal MCP client over streamable HTTP.
//!
//! Only the two calls publishing needs: `initialize` and `tools/call`.
//! Servers may answer a POST with plain JSON or with a short SSE stream
//! whose `data:` lines carry the JSON-RPC response; both are accepted.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::secrets::SecretString;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Result of `tools/call`
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
    #[serde(default, rename = "structuredContent")]
    pub structured_content: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ToolCallResult {
    /// Concatenated text content blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Session handle returned by `initialize`
#[derive(Debug, Clone, Default)]
pub struct McpSession {
    session_id: Option<String>,
}

pub struct McpHttpClient {
    endpoint: String,
    api_key: SecretString,
    client: Client,
    next_id: AtomicU64,
}

impl McpHttpClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Connection(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform the initialization handshake and open a session.
    pub async fn initialize(&self) -> Result<McpSession, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "syllabus",
                "version": env!("CARGO_PKG_VERSION"),
            }
        });

        let (_, session_id) = self
            .call_method(&McpSession::default(), "initialize", Some(params))
            .await?;
        let session = McpSession { session_id };

        // Notification; servers reply 202 with no body. Failures are ignored.
        let notification = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method: "notifications/initialized",
            params: None,
        };
        if let Err(e) = self.post(&session, &notification).await {
            tracing::debug!("MCP initialized notification failed: {}", e);
        }

        Ok(session)
    }

    /// Call a tool on the MCP server.
    pub async fn call_tool(
        &self,
        session: &McpSession,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let (result, _) = self.call_method(session, "tools/call", Some(params)).await?;

        serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("failed to parse tools/call result: {}", e)))
    }

    fn headers(&self, session: &McpSession) -> Result<HeaderMap, McpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );

        let key = HeaderValue::from_str(self.api_key.unsecure())
            .map_err(|_| McpError::Connection("API key is not a valid header value".into()))?;
        headers.insert("x-api-key", key);

        if let Some(id) = &session.session_id {
            let value = HeaderValue::from_str(id)
                .map_err(|_| McpError::Protocol("invalid session id from server".into()))?;
            headers.insert(SESSION_HEADER, value);
        }

        Ok(headers)
    }

    async fn post(
        &self,
        session: &McpSession,
        request: &JsonRpcRequest<'_>,
    ) -> Result<reqwest::Response, McpError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers(session)?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    McpError::Connection("request timed out".into())
                } else {
                    McpError::Connection(format!("HTTP request failed: {}", e.without_url()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => McpError::Connection(format!("authentication failed ({})", status)),
                429 => McpError::Connection("quota exceeded (429)".into()),
                _ => McpError::Connection(format!(
                    "HTTP {} from MCP server: {}",
                    status,
                    text.chars().take(200).collect::<String>()
                )),
            });
        }

        Ok(response)
    }

    async fn call_method(
        &self,
        session: &McpSession,
        method: &str,
        params: Option<Value>,
    ) -> Result<(Value, Option<String>), McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        };

        let response = self.post(session, &request).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .or_else(|| session.session_id.clone());

        let body = response
            .text()
            .await
            .map_err(|e| McpError::Connection(format!("failed to read response body: {}", e)))?;

        let rpc = parse_response_body(&body, id)?;

        if let Some(err) = rpc.error {
            return Err(McpError::Server {
                code: err.code,
                message: err.message,
            });
        }

        let result = rpc
            .result
            .ok_or_else(|| McpError::Protocol(format!("{} returned no result", method)))?;

        Ok((result, session_id))
    }
}

/// Parse a JSON body or an SSE stream carrying the response with `id`.
fn parse_response_body(body: &str, id: u64) -> Result<JsonRpcResponse, McpError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed)
            .map_err(|e| McpError::Protocol(format!("failed to parse JSON-RPC response: {}", e)));
    }

    trimmed
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<JsonRpcResponse>(data.trim()).ok())
        .find(|rpc| rpc.id == Some(id))
        .ok_or_else(|| McpError::Protocol("no JSON-RPC response in event stream".into()))
}
