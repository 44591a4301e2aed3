use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum_macros::{AsRefStr, Display};

/// Separator between the tool name and the function name in the names sent to the LLM
pub const FUNCTION_NAME_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// One declared parameter of a tool function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ToolParameter {
    pub fn new<N, D>(name: N, kind: ParameterType, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolParameter {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            enum_values: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// A function a tool exposes to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    /// The name of the function, unique within its tool
    pub name: String,
    /// A description of what the function does
    pub description: String,
    /// Parameters that the function accepts
    pub parameters: Vec<ToolParameter>,
}

impl ToolFunction {
    pub fn new<N, D>(name: N, description: D, parameters: Vec<ToolParameter>) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolFunction {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// The json schema of the function arguments
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for parameter in &self.parameters {
            let mut property = json!({
                "type": parameter.kind,
                "description": parameter.description,
            });
            if let Some(values) = &parameter.enum_values {
                property["enum"] = json!(values);
            }
            properties.insert(parameter.name.clone(), property);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The first required parameter, which receives the raw input of text based agents
    pub fn primary_parameter(&self) -> Option<&ToolParameter> {
        self.parameters
            .iter()
            .find(|p| p.required)
            .or_else(|| self.parameters.first())
    }
}

/// A tool declaration as sent to the LLM, with the tool and function names joined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl FunctionDeclaration {
    pub fn new(tool_name: &str, function: &ToolFunction) -> Self {
        FunctionDeclaration {
            name: qualified_name(tool_name, &function.name),
            description: function.description.clone(),
            input_schema: function.input_schema(),
        }
    }
}

/// A normalized tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates the tool result with the request
    pub id: String,
    pub tool_name: String,
    pub method_name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new<I, T, M>(id: I, tool_name: T, method_name: M, arguments: Map<String, Value>) -> Self
    where
        I: Into<String>,
        T: Into<String>,
        M: Into<String>,
    {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            method_name: method_name.into(),
            arguments,
        }
    }
}

pub fn qualified_name(tool_name: &str, function_name: &str) -> String {
    format!("{}{}{}", tool_name, FUNCTION_NAME_SEPARATOR, function_name)
}

/// Split `calculator__execute` into `("calculator", "execute")`
pub fn split_qualified_name(name: &str) -> Option<(&str, &str)> {
    let (tool, function) = name.split_once(FUNCTION_NAME_SEPARATOR)?;
    if tool.is_empty() || function.is_empty() {
        return None;
    }
    Some((tool, function))
}
