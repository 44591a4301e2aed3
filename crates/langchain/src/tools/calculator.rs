use async_trait::async_trait;
use evalexpr::eval;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

use super::error::{ToolError, ToolResult};
use super::{string_argument, Tool};
use crate::models::tool::{ParameterType, ToolFunction, ToolParameter};

/// Math functions that may be written without their `math::` namespace
const MATH_FUNCTIONS: &str = "sqrt|cbrt|pow|ln|log|log2|log10|exp|exp2|sin|cos|tan|asin|acos|atan|hypot|abs";

/// Evaluates arithmetic expressions
///
/// When an expression cannot be evaluated and a fallback is configured, the fallback gets
/// the raw input instead. Usually that is the search tool, which can answer things like
/// unit conversions.
pub struct Calculator {
    functions: Vec<ToolFunction>,
    fallback: Option<Arc<dyn Tool>>,
}

impl Calculator {
    pub fn new() -> Self {
        Self {
            functions: vec![ToolFunction::new(
                "execute",
                "Evaluates a pure math expression or if equation contains non-math characters \
                 (e.g.: \"12F in Celsius\") then it uses the google search calculator to \
                 evaluate the expression",
                vec![ToolParameter::new(
                    "input",
                    ParameterType::String,
                    "math expression",
                )
                .required()],
            )],
            fallback: None,
        }
    }

    pub fn with_fallback(fallback: Arc<dyn Tool>) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::new()
        }
    }

    /// Evaluate `input` without any fallback
    pub fn evaluate(input: &str) -> ToolResult<String> {
        let expression = float_literals(&normalize(input));
        if expression.is_empty() {
            return Err(ToolError::InvalidParameters(
                "expression must be non-empty".to_string(),
            ));
        }
        let result = eval(&expression).map_err(|e| ToolError::ExecutionError(e.to_string()))?;
        if let Ok(i) = result.as_int() {
            Ok(i.to_string())
        } else if let Ok(f) = result.as_float() {
            Ok(format_float(f))
        } else {
            Ok(result.to_string())
        }
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix bare math function names with the `math::` namespace evalexpr expects
fn normalize(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(&format!(r"(^|[^:\w])({})\s*\(", MATH_FUNCTIONS)).expect("valid regex")
    });
    re.replace_all(input.trim(), "${1}math::${2}(").into_owned()
}

/// Write integer literals as floats so `/` divides exactly, `7/2` is 3.5
fn float_literals(expression: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\b\d+(\.\d+)?([eE][+-]?\d+)?\b").expect("valid regex")
    });
    re.replace_all(expression, |caps: &regex::Captures| {
        if caps.get(1).is_some() || caps.get(2).is_some() {
            caps[0].to_string()
        } else {
            format!("{}.0", &caps[0])
        }
    })
    .into_owned()
}

fn format_float(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    rounded.to_string()
}

#[async_trait]
impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Useful for getting the result of a math expression. The input to this tool should be \
         a valid mathematical expression that could be executed by a simple calculator."
    }

    fn functions(&self) -> &[ToolFunction] {
        &self.functions
    }

    async fn execute(&self, function: &str, arguments: &Map<String, Value>) -> ToolResult<String> {
        if function != "execute" {
            return Err(ToolError::FunctionNotFound(function.to_string()));
        }
        let input = string_argument(arguments, "input")?;
        tracing::debug!(input, "calculator evaluating");

        match Self::evaluate(input) {
            Ok(result) => Ok(result),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    tracing::debug!(
                        error = %e,
                        fallback = fallback.name(),
                        "calculator falling back"
                    );
                    fallback.execute_text(input).await
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::StubTool;
    use serde_json::json;

    fn input(expression: &str) -> Map<String, Value> {
        let mut arguments = Map::new();
        arguments.insert("input".to_string(), json!(expression));
        arguments
    }

    #[tokio::test]
    async fn test_simple_arithmetic() {
        let calculator = Calculator::new();
        assert_eq!(calculator.execute("execute", &input("2+2")).await.unwrap(), "4");
        assert_eq!(
            calculator.execute("execute", &input("1.5 * 4")).await.unwrap(),
            "6"
        );
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(Calculator::evaluate("sqrt(169)").unwrap(), "13");
        assert_eq!(Calculator::evaluate("sqrt(73.96)").unwrap(), "8.6");
        assert_eq!(Calculator::evaluate("pow(2, 10)").unwrap(), "1024");
        assert_eq!(Calculator::evaluate("math::sqrt(4)").unwrap(), "2");
    }

    #[test]
    fn test_division_is_exact() {
        assert_eq!(Calculator::evaluate("(83+86)/2").unwrap(), "84.5");
        assert_eq!(Calculator::evaluate("7/2").unwrap(), "3.5");
        assert_eq!(Calculator::evaluate("1/2").unwrap(), "0.5");
        assert_eq!(Calculator::evaluate("10/2").unwrap(), "5");
        assert_eq!(Calculator::evaluate("sqrt((83+86)/2)").unwrap(), "9.1923881554");
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(float_literals("(83+86)/2"), "(83.0+86.0)/2.0");
        assert_eq!(float_literals("1.5 * 4"), "1.5 * 4.0");
        assert_eq!(float_literals("math::log10(100)"), "math::log10(100.0)");
        assert_eq!(float_literals("12F in Celsius"), "12F in Celsius");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" sqrt(4) + abs(-1) "), "math::sqrt(4) + math::abs(-1)");
        assert_eq!(normalize("math::sqrt(4)"), "math::sqrt(4)");
        assert_eq!(normalize("mysqrt(4)"), "mysqrt(4)");
    }

    #[tokio::test]
    async fn test_invalid_expression_without_fallback() {
        let calculator = Calculator::new();
        let result = calculator
            .execute("execute", &input("12F in Celsius"))
            .await;
        assert!(matches!(result, Err(ToolError::ExecutionError(_))));
    }

    #[tokio::test]
    async fn test_invalid_expression_uses_fallback() {
        let search = Arc::new(StubTool::new("search", || Ok("-11.1111111".into())));
        let calculator = Calculator::with_fallback(search.clone());

        let result = calculator
            .execute("execute", &input("12F in Celsius"))
            .await
            .unwrap();

        assert_eq!(result, "-11.1111111");
        let inputs = search.inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0]["input"], "12F in Celsius");
    }

    #[tokio::test]
    async fn test_valid_expression_skips_fallback() {
        let search = Arc::new(StubTool::new("search", || Ok("unused".into())));
        let calculator = Calculator::with_fallback(search.clone());
        assert_eq!(calculator.execute_text("2+2").await.unwrap(), "4");
        assert!(search.inputs.lock().unwrap().is_empty());
    }
}
