use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use super::error::{ToolError, ToolResult};
use super::{string_argument, Tool};
use crate::models::tool::{ParameterType, ToolFunction, ToolParameter};

pub const SERPAPI_HOST: &str = "https://serpapi.com";

/// Google search through SerpApi
pub struct Search {
    client: Client,
    host: String,
    api_key: String,
    functions: Vec<ToolFunction>,
}

impl Search {
    pub fn new(api_key: String) -> Self {
        Self::with_host(api_key, SERPAPI_HOST.to_string())
    }

    pub fn with_host(api_key: String, host: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            host,
            api_key,
            functions: vec![ToolFunction::new(
                "execute",
                "Executes Google Search and returns the result",
                vec![ToolParameter::new("input", ParameterType::String, "search query").required()],
            )],
        }
    }

    async fn search(&self, query: &str) -> ToolResult<Value> {
        let url = format!("{}/search.json", self.host.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionError(format!(
                "search returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

/// Pick the most direct answer out of a SerpApi result page
fn best_answer(results: &Value) -> Option<String> {
    let text = |pointer: &str| {
        results
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .map(String::from)
    };

    text("/answer_box/answer")
        .or_else(|| text("/answer_box/snippet"))
        .or_else(|| text("/answer_box/snippet_highlighted_words/0"))
        .or_else(|| text("/knowledge_graph/description"))
        .or_else(|| text("/organic_results/0/snippet"))
}

#[async_trait]
impl Tool for Search {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "A wrapper around SerpApi's Google Search. Useful for when you need to answer \
         questions about current events. Always one of the first options when you need to \
         find information on the internet. Input should be a search query."
    }

    fn functions(&self) -> &[ToolFunction] {
        &self.functions
    }

    async fn execute(&self, function: &str, arguments: &Map<String, Value>) -> ToolResult<String> {
        if function != "execute" {
            return Err(ToolError::FunctionNotFound(function.to_string()));
        }
        let query = string_argument(arguments, "input")?;
        tracing::debug!(query, "searching");

        let results = self.search(query).await?;
        if let Some(error) = results.get("error").and_then(|e| e.as_str()) {
            return Err(ToolError::ExecutionError(error.to_string()));
        }
        Ok(best_answer(&results).unwrap_or_else(|| "No good search result found".to_string()))
    }
}
