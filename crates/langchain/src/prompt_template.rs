//! Render the library's own prompts with tera
//!
//! These are the internal agent, memory and evaluation prompts. They are compiled into the
//! crate. User facing `{var}` templates live in [`crate::prompt`].
use serde::Serialize;
use strum_macros::{Display, EnumIter};
use tera::{Context, Error as TeraError, Tera};

/// Prompts shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum BundledPrompt {
    React,
    Summarize,
    AnswerRelevance,
    ContextRelevance,
    FaithfulnessStatements,
    FaithfulnessVerdicts,
}

impl BundledPrompt {
    pub fn source(&self) -> &'static str {
        match self {
            BundledPrompt::React => include_str!("prompts/react.md"),
            BundledPrompt::Summarize => include_str!("prompts/summarize.md"),
            BundledPrompt::AnswerRelevance => include_str!("prompts/ragas/answer_relevance.md"),
            BundledPrompt::ContextRelevance => include_str!("prompts/ragas/context_relevance.md"),
            BundledPrompt::FaithfulnessStatements => {
                include_str!("prompts/ragas/faithfulness_statements.md")
            }
            BundledPrompt::FaithfulnessVerdicts => {
                include_str!("prompts/ragas/faithfulness_verdicts.md")
            }
        }
    }

    pub fn render<T: Serialize>(&self, context_data: &T) -> Result<String, TeraError> {
        render_template(&self.to_string(), self.source(), context_data)
    }
}

/// Render a one-off tera template
pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    render_template("inline_template", template, context_data)
}

fn render_template<T: Serialize>(
    name: &str,
    template: &str,
    context_data: &T,
) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    // keep newlines and quotes exactly as written
    tera.autoescape_on(vec![]);
    tera.add_raw_template(name, template)?;
    let context = Context::from_serialize(context_data)?;
    tera.render(name, &context)
}
