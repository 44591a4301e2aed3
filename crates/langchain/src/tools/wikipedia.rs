use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use super::error::{ToolError, ToolResult};
use super::{string_argument, Tool};
use crate::models::tool::{ParameterType, ToolFunction, ToolParameter};

pub const WIKIPEDIA_HOST: &str = "https://en.wikipedia.org";

/// Looks up the best matching Wikipedia page and returns its introduction
pub struct Wikipedia {
    client: Client,
    host: String,
    functions: Vec<ToolFunction>,
}

impl Wikipedia {
    pub fn new() -> Self {
        Self::with_host(WIKIPEDIA_HOST.to_string())
    }

    pub fn with_host(host: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            host,
            functions: vec![ToolFunction::new(
                "execute",
                "Executes Wikipedia API search and returns the answer",
                vec![ToolParameter::new("input", ParameterType::String, "search query").required()],
            )],
        }
    }

    async fn query(&self, params: &[(&str, &str)]) -> ToolResult<Value> {
        let url = format!("{}/w/api.php", self.host.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ToolError::ExecutionError(format!(
                "wikipedia returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn top_title(&self, search: &str) -> ToolResult<Option<String>> {
        let results = self
            .query(&[("list", "search"), ("srsearch", search), ("srlimit", "1")])
            .await?;
        Ok(results
            .pointer("/query/search/0/title")
            .and_then(|t| t.as_str())
            .map(String::from))
    }

    async fn extract(&self, title: &str) -> ToolResult<Option<String>> {
        let results = self
            .query(&[
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;
        let extract = results
            .pointer("/query/pages")
            .and_then(|pages| pages.as_object())
            .and_then(|pages| pages.values().next())
            .and_then(|page| page.get("extract"))
            .and_then(|e| e.as_str())
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        Ok(extract)
    }
}

impl Default for Wikipedia {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for Wikipedia {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions \
         about people, places, companies, facts, historical events, or other subjects. Input \
         should be a search query."
    }

    fn functions(&self) -> &[ToolFunction] {
        &self.functions
    }

    async fn execute(&self, function: &str, arguments: &Map<String, Value>) -> ToolResult<String> {
        if function != "execute" {
            return Err(ToolError::FunctionNotFound(function.to_string()));
        }
        let input = string_argument(arguments, "input")?;
        tracing::debug!(input, "searching wikipedia");

        let Some(title) = self.top_title(input).await? else {
            return Ok(format!("No Wikipedia page found for '{}'", input));
        };
        Ok(self
            .extract(&title)
            .await?
            .unwrap_or_else(|| format!("The Wikipedia page '{}' has no summary", title)))
    }
}
