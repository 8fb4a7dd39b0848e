//! Web search with a hard per-run call budget.
//!
//! Pods bind this tool to keep research agents from searching forever: after
//! `max_searches` calls the tool answers with a fixed limit message and never
//! touches the search backend again until the next run resets the counter.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::base_tool::{BaseTool, ToolResult};

/// Default number of results requested per search.
pub const DEFAULT_MAX_RESULTS: u32 = 3;

/// Default per-result character allowance used for truncation.
pub const DEFAULT_MAX_LENGTH: usize = 400;

/// Default number of searches allowed per workflow run.
pub const DEFAULT_MAX_SEARCHES: u32 = 2;

/// Environment variable holding the Serper API key when the descriptor does
/// not pass one explicitly.
pub const SERPER_API_KEY_ENV: &str = "SERPER_API_KEY";

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

// ---------------------------------------------------------------------------
// Search backend seam
// ---------------------------------------------------------------------------

/// Search provider behind the tool. The HTTP client implements this; tests
/// substitute a counting fake.
#[async_trait]
pub trait SearchBackend: Send + Sync + fmt::Debug {
    /// Run one search and return rendered result text.
    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Serper-style JSON search API client.
#[derive(Debug, Clone)]
pub struct SerperClient {
    api_key: Option<String>,
}

impl SerperClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
        }
    }

    /// Create a client that reads `SERPER_API_KEY` from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(SERPER_API_KEY_ENV).ok(),
        }
    }

    /// Render the `organic` entries of a Serper response as numbered text.
    fn render_results(body: &Value, max_results: u32) -> String {
        let organic = match body.get("organic").and_then(|v| v.as_array()) {
            Some(items) if !items.is_empty() => items,
            _ => return "No results found.".to_string(),
        };

        let mut rendered = Vec::new();
        for (idx, item) in organic.iter().take(max_results as usize).enumerate() {
            let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("(untitled)");
            let link = item.get("link").and_then(|v| v.as_str()).unwrap_or("");
            let snippet = item.get("snippet").and_then(|v| v.as_str()).unwrap_or("");
            rendered.push(format!("{}. {}\n   {}\n   {}", idx + 1, title, link, snippet));
        }
        rendered.join("\n\n")
    }
}

#[async_trait]
impl SearchBackend for SerperClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            format!("{} not set; cannot reach the search API", SERPER_API_KEY_ENV)
        })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let response = client
            .post(SERPER_ENDPOINT)
            .header("X-API-KEY", api_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "q": query, "num": max_results }))
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;
        if !status.is_success() {
            return Err(format!("search API error ({}): {}", status, body_text).into());
        }

        let body: Value = serde_json::from_str(&body_text)
            .map_err(|e| format!("malformed search response: {}", e))?;
        Ok(Self::render_results(&body, max_results))
    }
}

// ---------------------------------------------------------------------------
// LimitedSearchTool
// ---------------------------------------------------------------------------

/// Search tool with built-in result and call-count limits.
#[derive(Debug)]
pub struct LimitedSearchTool {
    max_results: u32,
    max_length: usize,
    max_searches: u32,
    search_count: u32,
    backend: Arc<dyn SearchBackend>,
}

impl LimitedSearchTool {
    pub fn new(max_results: u32, max_length: usize, max_searches: u32) -> Self {
        Self::with_backend(
            max_results,
            max_length,
            max_searches,
            Arc::new(SerperClient::from_env()),
        )
    }

    /// Construct with an explicit backend (API-keyed client, or a test fake).
    pub fn with_backend(
        max_results: u32,
        max_length: usize,
        max_searches: u32,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            max_results,
            max_length,
            max_searches,
            search_count: 0,
            backend,
        }
    }

    /// The fixed reply once the budget is spent. Says `used/max`, e.g. `2/2`.
    fn limit_message(&self) -> String {
        format!(
            "Search limit reached. Used {}/{} searches. Please work with existing information.",
            self.search_count, self.max_searches
        )
    }

    fn perform_search(&mut self, query: &str) -> String {
        if self.search_count >= self.max_searches {
            log::warn!(
                "search limit reached ({} searches used)",
                self.max_searches
            );
            return self.limit_message();
        }

        self.search_count += 1;
        log::info!(
            "search {}/{}: {}",
            self.search_count,
            self.max_searches,
            query
        );

        let raw = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(self.backend.search(query, self.max_results)),
            Err(e) => Err(e.into()),
        };

        let text = match raw {
            Ok(text) => text,
            // Failed searches still consume budget; the agent gets the error
            // as text so the run keeps going.
            Err(e) => {
                log::warn!("search failed: {}", e);
                return format!("Search failed: {}", e);
            }
        };

        let budget = self.max_length * self.max_results as usize;
        let (mut limited, cut) = truncate_chars(&text, budget);
        if cut {
            limited.push_str("... [truncated]");
        }
        if self.search_count >= self.max_searches {
            limited.push_str(
                "\n\nSEARCH LIMIT REACHED: No more searches allowed. Work with this information.",
            );
        }

        format!(
            "Search Results (#{}, limited to {} results):\n\n{}",
            self.search_count, self.max_results, limited
        )
    }
}

#[async_trait]
impl BaseTool for LimitedSearchTool {
    fn name(&self) -> &str {
        "limited_search"
    }

    fn description(&self) -> &str {
        "Search the internet with strict limits (capped searches per run, few results each)"
    }

    fn args_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        })
    }

    fn max_usage_count(&self) -> Option<u32> {
        Some(self.max_searches)
    }

    fn current_usage_count(&self) -> u32 {
        self.search_count
    }

    fn increment_usage_count(&mut self) {
        self.search_count += 1;
    }

    fn reset_usage_count(&mut self) {
        self.search_count = 0;
    }

    fn run(&mut self, args: HashMap<String, Value>) -> ToolResult {
        let query = match args.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => {
                return Ok(Value::String(
                    "Search query missing. Pass a 'query' string argument.".to_string(),
                ))
            }
        };
        Ok(Value::String(self.perform_search(&query)))
    }
}

/// Truncate to at most `max_chars` characters, reporting whether a cut
/// happened. Counts characters, not bytes, so multibyte text stays intact.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}
