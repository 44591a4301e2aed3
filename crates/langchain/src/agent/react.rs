//! Text protocol for models driven through `Thought` / `Action` / `Observation` lines
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::prompt_template::BundledPrompt;
use crate::tools::ToolSet;

pub const FINAL_ANSWER: &str = "Final Answer:";
pub const OBSERVATION: &str = "Observation:";

/// Observation sent back when a reply has neither an action nor a final answer
pub const FORMAT_REMINDER: &str = "Invalid format. Respond with an Action and Action Input, \
    or with a Final Answer.";

/// What one model reply asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    FinalAnswer(String),
    Action { tool: String, input: String },
    Unparseable,
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Action: (.*)").expect("valid regex"))
}

fn action_input_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Action Input: "?(.*)"?"#).expect("valid regex"))
}

/// Read a reply: a final answer wins, then an action, otherwise it cannot be used
pub fn parse_step(text: &str) -> Step {
    if let Some(position) = text.rfind(FINAL_ANSWER) {
        return Step::FinalAnswer(text[position + FINAL_ANSWER.len()..].trim().to_string());
    }

    let tool = action_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());
    let input = action_input_regex()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| strip_quotes(m.as_str().trim()).to_string());

    match (tool, input) {
        (Some(tool), Some(input)) if !tool.is_empty() => Step::Action { tool, input },
        _ => Step::Unparseable,
    }
}

fn strip_quotes(input: &str) -> &str {
    let input = input.strip_prefix('"').unwrap_or(input);
    input.strip_suffix('"').unwrap_or(input)
}

/// Append an observation, reusing a trailing `Observation:` label, then prompt the next thought
pub fn append_observation(scratchpad: &mut String, observation: &str) {
    if scratchpad.trim_end().ends_with(OBSERVATION) {
        let trimmed = scratchpad.trim_end().len();
        scratchpad.truncate(trimmed);
        scratchpad.push(' ');
    } else {
        if !scratchpad.is_empty() && !scratchpad.ends_with('\n') {
            scratchpad.push('\n');
        }
        scratchpad.push_str(OBSERVATION);
        scratchpad.push(' ');
    }
    scratchpad.push_str(observation);
    scratchpad.push_str("\nThought:");
}

#[derive(Serialize)]
struct PromptContext<'a> {
    instructions: &'a str,
    date: String,
    tools: String,
    tool_names: String,
    history: String,
    question: &'a str,
}

/// Render the prompt up to the first `Thought:`
pub fn render_prompt(
    instructions: &str,
    tools: &ToolSet,
    history: &[Message],
    question: &str,
) -> AgentResult<String> {
    let context = PromptContext {
        instructions,
        date: chrono::Local::now().format("%B %d, %Y").to_string(),
        tools: tools.describe(),
        tool_names: format!("[{}]", tools.names().join(", ")),
        history: history
            .iter()
            .map(|message| format!("{}: {}", message.role(), message.text()))
            .collect::<Vec<_>>()
            .join("\n"),
        question,
    };
    Ok(BundledPrompt::React.render(&context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::StubTool;
    use std::sync::Arc;

    #[test]
    fn test_parse_action() {
        let step = parse_step(
            "Thought: I should look this up\nAction: search\nAction Input: \"average temperature in Miami, FL in May\"\n",
        );
        assert_eq!(
            step,
            Step::Action {
                tool: "search".to_string(),
                input: "average temperature in Miami, FL in May".to_string()
            }
        );

        let step = parse_step("Action: calculator\nAction Input: sqrt(83+86)/2");
        assert_eq!(
            step,
            Step::Action {
                tool: "calculator".to_string(),
                input: "sqrt(83+86)/2".to_string()
            }
        );
    }

    #[test]
    fn test_final_answer_uses_last_marker() {
        assert_eq!(
            parse_step("Final Answer: draft\nThought: wait\nFinal Answer:  8.6 \n"),
            Step::FinalAnswer("8.6".to_string())
        );
        // a final answer wins over an action in the same reply
        assert_eq!(
            parse_step("Action: search\nAction Input: x\nFinal Answer: done"),
            Step::FinalAnswer("done".to_string())
        );
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_step("I am thinking about it"), Step::Unparseable);
        assert_eq!(parse_step("Action: search"), Step::Unparseable);
    }

    #[test]
    fn test_observation_label_is_not_duplicated() {
        let mut scratchpad = "Action: search\nAction Input: x\n".to_string();
        append_observation(&mut scratchpad, "84°F");
        assert_eq!(
            scratchpad,
            "Action: search\nAction Input: x\nObservation: 84°F\nThought:"
        );

        let mut scratchpad = "Action: search\nAction Input: x\nObservation:".to_string();
        append_observation(&mut scratchpad, "84°F");
        assert_eq!(
            scratchpad,
            "Action: search\nAction Input: x\nObservation: 84°F\nThought:"
        );
        assert_eq!(scratchpad.matches(OBSERVATION).count(), 1);
    }

    #[test]
    fn test_render_prompt() {
        let tools = ToolSet::new(vec![
            Arc::new(StubTool::new("search", || Ok(String::new()))),
            Arc::new(StubTool::new("calculator", || Ok(String::new()))),
        ])
        .unwrap();
        let prompt = render_prompt(
            "Be brief.",
            &tools,
            &[Message::user("Hi"), Message::assistant("Hello!")],
            "What is 2+2?",
        )
        .unwrap();

        assert!(prompt.starts_with("Be brief.\n\n"));
        assert!(prompt.contains("search: A stub tool\ncalculator: A stub tool"));
        assert!(prompt.contains("should be one of [search, calculator]"));
        assert!(prompt.contains("Previous conversation:\nuser: Hi\nassistant: Hello!"));
        assert!(prompt.trim_end().ends_with("Question: What is 2+2?\nThought:"));
    }
}
