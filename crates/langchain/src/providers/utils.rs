use regex::Regex;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

use crate::errors::{ProviderError, ProviderResult};

/// Recognizes a vendor's "prompt too long" error body
pub(crate) type ContextLengthCheck = fn(&Value) -> Option<ProviderError>;

/// Fill in the model and sampling settings the adapter does not know about
///
/// Values the adapter already put in the payload win over the provider's configuration.
pub(crate) fn merge_settings(
    payload: &mut Value,
    model: &str,
    temperature: Option<f32>,
    max_tokens: Option<i32>,
) {
    let Some(object) = payload.as_object_mut() else {
        return;
    };
    object
        .entry("model")
        .or_insert_with(|| json!(model));
    if let Some(temp) = temperature {
        object.entry("temperature").or_insert_with(|| json!(temp));
    }
    if let Some(tokens) = max_tokens {
        object.entry("max_tokens").or_insert_with(|| json!(tokens));
    }
}

/// Map the HTTP status and body of a vendor reply onto a provider result
pub(crate) async fn handle_response(
    response: Response,
    context_check: ContextLengthCheck,
) -> ProviderResult<Value> {
    let status = response.status();
    match status {
        StatusCode::OK => {
            let body: Value = response.json().await?;
            if let Some(error) = body.get("error") {
                if let Some(err) = context_check(error) {
                    return Err(err);
                }
                return Err(ProviderError::RequestFailed {
                    status: status.as_u16(),
                    body: error.to_string(),
                });
            }
            Ok(body)
        }
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(ProviderError::ServerError(status.as_u16()))
        }
        _ => {
            let text = response.text().await?;
            if let Ok(body) = serde_json::from_str::<Value>(&text) {
                let error = body.get("error").unwrap_or(&body);
                if let Some(err) = context_check(error) {
                    return Err(err);
                }
            }
            Err(ProviderError::RequestFailed {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

fn error_message(error: &Value) -> Option<&str> {
    match error {
        Value::String(message) => Some(message),
        _ => error.get("message").and_then(|m| m.as_str()),
    }
}

/// Read two token counts out of an error message and return how far the first exceeds the second
fn overflow_from(message: &str, pattern: &str) -> Option<usize> {
    let re = Regex::new(pattern).ok()?;
    let captures = re.captures(message)?;
    let used: usize = captures.name("used")?.as_str().parse().ok()?;
    let limit: usize = captures.name("limit")?.as_str().parse().ok()?;
    used.checked_sub(limit)
}

pub fn check_openai_context_length_error(error: &Value) -> Option<ProviderError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error_message(error).unwrap_or("Unknown error");
        let overflow = overflow_from(
            message,
            r"maximum context length is (?P<limit>\d+) tokens.*?resulted in (?P<used>\d+) tokens",
        );
        Some(ProviderError::context_length(message, overflow))
    } else {
        None
    }
}

pub fn check_anthropic_context_length_error(error: &Value) -> Option<ProviderError> {
    let message = error_message(error)?;
    if !message.contains("prompt is too long") {
        return None;
    }
    let overflow = overflow_from(
        message,
        r"prompt is too long: (?P<used>\d+) tokens > (?P<limit>\d+) maximum",
    );
    Some(ProviderError::context_length(message, overflow))
}

pub fn check_gemini_context_length_error(error: &Value) -> Option<ProviderError> {
    let message = error_message(error)?;
    if !message.contains("exceeds the maximum number of tokens") {
        return None;
    }
    let overflow = overflow_from(
        message,
        r"input token count \((?P<used>\d+)\) exceeds the maximum number of tokens allowed \((?P<limit>\d+)\)",
    );
    Some(ProviderError::context_length(message, overflow))
}

pub fn check_mistral_context_length_error(error: &Value) -> Option<ProviderError> {
    let message = error_message(error)?;
    if !message.contains("too large for model") {
        return None;
    }
    let overflow = overflow_from(
        message,
        r"contains (?P<used>\d+) tokens.*?too large for model with (?P<limit>\d+) maximum context length",
    );
    Some(ProviderError::context_length(message, overflow))
}

pub fn check_ollama_context_length_error(error: &Value) -> Option<ProviderError> {
    let message = error_message(error)?;
    if message.contains("context length") || message.contains("context window") {
        Some(ProviderError::context_length(message, None))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_settings_keeps_adapter_values() {
        let mut payload = json!({"messages": [], "max_tokens": 1024});
        merge_settings(&mut payload, "gpt-4o", Some(0.2), Some(50));
        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["max_tokens"], 1024);
        assert!((payload["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);

        let mut bare = json!({"messages": []});
        merge_settings(&mut bare, "gpt-4o", None, None);
        assert!(bare.get("temperature").is_none());
        assert!(bare.get("max_tokens").is_none());
    }

    #[test]
    fn test_check_openai_context_length_error() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This model's maximum context length is 8192 tokens. However, your messages resulted in 9000 tokens."
        });
        match check_openai_context_length_error(&error) {
            Some(ProviderError::ContextLengthExceeded {
                message,
                token_overflow,
            }) => {
                assert!(message.starts_with("This model's maximum context length"));
                assert_eq!(token_overflow, Some(808));
            }
            other => panic!("Expected context length error, got {:?}", other),
        }

        let error = json!({"code": "other_error", "message": "Some other error"});
        assert!(check_openai_context_length_error(&error).is_none());
    }

    #[test]
    fn test_check_anthropic_context_length_error() {
        let error = json!({
            "type": "invalid_request_error",
            "message": "prompt is too long: 210000 tokens > 200000 maximum"
        });
        let err = check_anthropic_context_length_error(&error).unwrap();
        assert!(matches!(
            err,
            ProviderError::ContextLengthExceeded {
                token_overflow: Some(10000),
                ..
            }
        ));
        assert!(check_anthropic_context_length_error(&json!({"message": "overloaded"})).is_none());
    }

    #[test]
    fn test_check_gemini_context_length_error() {
        let error = json!({
            "code": 400,
            "status": "INVALID_ARGUMENT",
            "message": "The input token count (1050000) exceeds the maximum number of tokens allowed (1048576)."
        });
        assert!(matches!(
            check_gemini_context_length_error(&error),
            Some(ProviderError::ContextLengthExceeded {
                token_overflow: Some(1424),
                ..
            })
        ));
    }

    #[test]
    fn test_check_mistral_and_ollama_errors() {
        let mistral = json!({
            "message": "Prompt contains 40000 tokens and 0 draft tokens, too large for model with 32768 maximum context length"
        });
        assert!(matches!(
            check_mistral_context_length_error(&mistral),
            Some(ProviderError::ContextLengthExceeded {
                token_overflow: Some(7232),
                ..
            })
        ));

        let ollama = json!("input length exceeds the context length");
        assert!(matches!(
            check_ollama_context_length_error(&ollama),
            Some(ProviderError::ContextLengthExceeded {
                token_overflow: None,
                ..
            })
        ));
    }
}
