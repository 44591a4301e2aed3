//! Tools an agent can call, and the closed registry of built-in ones
pub mod calculator;
pub mod error;
pub mod file_system;
pub mod search;
pub mod weather;
pub mod wikipedia;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::config::ToolSettings;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{FunctionDeclaration, ToolCall, ToolFunction};
use error::{ToolError, ToolResult};

pub use calculator::Calculator;
pub use file_system::FileSystem;
pub use search::Search;
pub use weather::Weather;
pub use wikipedia::Wikipedia;

/// Core trait that defines a tool that can be operated by an AI agent
///
/// Tools are built once and shared read-only between agents, so they only hold
/// configuration such as credentials.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of the tool
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the functions the tool exposes
    fn functions(&self) -> &[ToolFunction];

    /// Run one of the tool's functions
    async fn execute(&self, function: &str, arguments: &Map<String, Value>)
        -> ToolResult<String>;

    /// Run the tool from free text, as text based agents do
    ///
    /// The text becomes the primary parameter of the first function.
    async fn execute_text(&self, input: &str) -> ToolResult<String> {
        let function = self.functions().first().ok_or_else(|| {
            ToolError::FunctionNotFound(format!("{} exposes no functions", self.name()))
        })?;
        let mut arguments = Map::new();
        if let Some(parameter) = function.primary_parameter() {
            arguments.insert(parameter.name.clone(), Value::String(input.to_string()));
        }
        self.execute(&function.name, &arguments).await
    }

    fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.functions()
            .iter()
            .map(|function| FunctionDeclaration::new(self.name(), function))
            .collect()
    }
}

/// Every built-in tool, keyed by its snake case identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    Calculator,
    Search,
    Weather,
    Wikipedia,
    FileSystem,
}

impl ToolKind {
    /// Build the tool with the credentials it needs
    pub fn build(&self, settings: &ToolSettings) -> AgentResult<Arc<dyn Tool>> {
        match self {
            ToolKind::Calculator => {
                let calculator = match &settings.serpapi_api_key {
                    Some(key) => Calculator::with_fallback(Arc::new(Search::new(key.clone()))),
                    None => Calculator::new(),
                };
                Ok(Arc::new(calculator))
            }
            ToolKind::Search => {
                let key = required_setting(&settings.serpapi_api_key, "serpapi_api_key", *self)?;
                Ok(Arc::new(Search::new(key)))
            }
            ToolKind::Weather => {
                let key =
                    required_setting(&settings.openweather_api_key, "openweather_api_key", *self)?;
                Ok(Arc::new(Weather::new(key)))
            }
            ToolKind::Wikipedia => Ok(Arc::new(Wikipedia::new())),
            ToolKind::FileSystem => Ok(Arc::new(FileSystem::new(&settings.file_system_root))),
        }
    }
}

fn required_setting(value: &Option<String>, name: &str, kind: ToolKind) -> AgentResult<String> {
    value.clone().ok_or_else(|| {
        AgentError::InvalidParameters(format!("the {} tool requires tools.{}", kind, name))
    })
}

/// Resolve tool names, listing every name that is not a known tool
pub fn validate_tools<S: AsRef<str>>(names: &[S]) -> AgentResult<Vec<ToolKind>> {
    let mut kinds = Vec::with_capacity(names.len());
    let mut unrecognized = Vec::new();
    for name in names {
        match ToolKind::from_str(name.as_ref()) {
            Ok(kind) => kinds.push(kind),
            Err(_) => unrecognized.push(name.as_ref().to_string()),
        }
    }
    if unrecognized.is_empty() {
        Ok(kinds)
    } else {
        Err(AgentError::UnrecognizedTools(unrecognized))
    }
}

/// Validate the names and build each tool
pub fn build_tools<S: AsRef<str>>(
    names: &[S],
    settings: &ToolSettings,
) -> AgentResult<Vec<Arc<dyn Tool>>> {
    validate_tools(names)?
        .iter()
        .map(|kind| kind.build(settings))
        .collect()
}

/// The tools of one agent, looked up by exact name
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> AgentResult<Self> {
        let mut index = HashMap::new();
        for (position, tool) in tools.iter().enumerate() {
            if index.insert(tool.name().to_string(), position).is_some() {
                return Err(AgentError::InvalidParameters(format!(
                    "Duplicate tool name: {}",
                    tool.name()
                )));
            }
        }
        Ok(Self { tools, index })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|position| &self.tools[*position])
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .iter()
            .flat_map(|tool| tool.function_declarations())
            .collect()
    }

    /// One `name: description` line per tool
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a normalized tool call
    ///
    /// An unknown tool is fatal, a failing tool becomes the observation text.
    pub async fn dispatch(&self, call: &ToolCall) -> AgentResult<String> {
        let tool = self
            .get(&call.tool_name)
            .ok_or_else(|| AgentError::ToolNotFound(call.tool_name.clone()))?;
        tracing::debug!(
            tool = %call.tool_name,
            function = %call.method_name,
            "dispatching tool call"
        );
        Ok(observation(
            &call.tool_name,
            tool.execute(&call.method_name, &call.arguments).await,
        ))
    }

    /// Run a tool from free text input
    pub async fn dispatch_text(&self, name: &str, input: &str) -> AgentResult<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tracing::debug!(tool = %name, input, "dispatching text tool call");
        Ok(observation(name, tool.execute_text(input).await))
    }
}

fn observation(tool_name: &str, result: ToolResult<String>) -> String {
    match result {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(tool = %tool_name, error = %e, "tool execution failed");
            format!("Error: {}", e)
        }
    }
}

/// Read a required string argument
pub(crate) fn string_argument<'a>(
    arguments: &'a Map<String, Value>,
    name: &str,
) -> ToolResult<&'a str> {
    arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("Missing '{}' parameter", name)))
}

pub(crate) fn optional_string_argument<'a>(
    arguments: &'a Map<String, Value>,
    name: &str,
) -> Option<&'a str> {
    arguments
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::tool::{ParameterType, ToolParameter};
    use serde_json::json;
    use std::sync::Mutex;
    use strum::IntoEnumIterator;

    /// Answers every call with a fixed text and records the inputs it got
    pub(crate) struct StubTool {
        name: String,
        functions: Vec<ToolFunction>,
        output: ToolResultFactory,
        pub(crate) inputs: Mutex<Vec<Map<String, Value>>>,
    }

    type ToolResultFactory = fn() -> ToolResult<String>;

    impl StubTool {
        pub(crate) fn new(name: &str, output: ToolResultFactory) -> Self {
            Self {
                name: name.to_string(),
                functions: vec![ToolFunction::new(
                    "execute",
                    format!("Runs {}", name),
                    vec![ToolParameter::new("input", ParameterType::String, "Input").required()],
                )],
                output,
                inputs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "A stub tool"
        }

        fn functions(&self) -> &[ToolFunction] {
            &self.functions
        }

        async fn execute(
            &self,
            function: &str,
            arguments: &Map<String, Value>,
        ) -> ToolResult<String> {
            if function != "execute" {
                return Err(ToolError::FunctionNotFound(function.to_string()));
            }
            self.inputs.lock().unwrap().push(arguments.clone());
            (self.output)()
        }
    }

    #[test]
    fn test_tool_kind_names() {
        let names: Vec<String> = ToolKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            vec!["calculator", "search", "weather", "wikipedia", "file_system"]
        );
        assert_eq!(ToolKind::from_str("file_system").unwrap(), ToolKind::FileSystem);
    }

    #[test]
    fn test_validate_tools_lists_every_unknown_name() {
        assert_eq!(
            validate_tools(&["calculator", "search"]).unwrap(),
            vec![ToolKind::Calculator, ToolKind::Search]
        );

        let invalid = ["calculator", "telepathy", "search", "Calculator", "time_travel"];
        match validate_tools(&invalid) {
            Err(AgentError::UnrecognizedTools(names)) => {
                assert_eq!(names, vec!["telepathy", "Calculator", "time_travel"])
            }
            other => panic!("Expected UnrecognizedTools, got {:?}", other),
        }
        assert!(validate_tools::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_build_requires_credentials() {
        let settings = ToolSettings::default();
        assert!(ToolKind::Search.build(&settings).is_err());
        assert!(ToolKind::Weather.build(&settings).is_err());
        assert_eq!(
            ToolKind::Calculator.build(&settings).unwrap().name(),
            "calculator"
        );

        let settings = ToolSettings {
            serpapi_api_key: Some("key".into()),
            ..ToolSettings::default()
        };
        let tools = build_tools(&["calculator", "search"], &settings).unwrap();
        assert_eq!(tools.len(), 2);
        assert!(matches!(
            build_tools(&["calculator", "oracle"], &settings),
            Err(AgentError::UnrecognizedTools(_))
        ));
    }

    #[test]
    fn test_tool_set_rejects_duplicates() {
        let result = ToolSet::new(vec![
            Arc::new(StubTool::new("search", || Ok("a".into()))),
            Arc::new(StubTool::new("search", || Ok("b".into()))),
        ]);
        assert!(matches!(result, Err(AgentError::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn test_dispatch() {
        let tools = ToolSet::new(vec![Arc::new(StubTool::new("search", || {
            Ok("sunny".into())
        }))])
        .unwrap();

        let mut arguments = Map::new();
        arguments.insert("input".into(), json!("weather"));
        let output = tools
            .dispatch(&ToolCall::new("1", "search", "execute", arguments))
            .await
            .unwrap();
        assert_eq!(output, "sunny");

        let declarations = tools.declarations();
        assert_eq!(declarations[0].name, "search__execute");
        assert_eq!(tools.describe(), "search: A stub tool");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_fatal() {
        let tools = ToolSet::new(vec![]).unwrap();
        let result = tools
            .dispatch(&ToolCall::new("1", "oracle", "execute", Map::new()))
            .await;
        assert!(matches!(result, Err(AgentError::ToolNotFound(name)) if name == "oracle"));
        assert!(tools.dispatch_text("oracle", "hi").await.is_err());
    }

    #[tokio::test]
    async fn test_tool_errors_become_observations() {
        let tools = ToolSet::new(vec![Arc::new(StubTool::new("search", || {
            Err(ToolError::ExecutionError("quota exceeded".into()))
        }))])
        .unwrap();

        let output = tools.dispatch_text("search", "anything").await.unwrap();
        assert_eq!(output, "Error: Tool execution failed: quota exceeded");

        let output = tools
            .dispatch(&ToolCall::new("1", "search", "lookup", Map::new()))
            .await
            .unwrap();
        assert!(output.starts_with("Error: Function not found"));
    }
}
