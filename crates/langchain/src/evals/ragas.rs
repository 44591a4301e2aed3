//! RAGAS style scoring of an answer against its question and retrieved context
//!
//! Three metrics are computed with the help of the model under evaluation:
//! answer relevance, context relevance and faithfulness. The overall score is their
//! harmonic mean.
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::sync::OnceLock;

use super::{cosine_similarity, harmonic_mean};
use crate::adapters::{adapter_for, Adapter};
use crate::errors::{AgentError, AgentResult};
use crate::prompt_template::BundledPrompt;
use crate::providers::base::Provider;

const INSUFFICIENT_INFORMATION: &str = "Insufficient Information";
const FINAL_VERDICT: &str = "Final verdict for each statement in order:";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RagasScores {
    pub ragas_score: f64,
    pub answer_relevance_score: f64,
    pub context_relevance_score: f64,
    pub faithfulness_score: f64,
}

pub struct Ragas {
    provider: Box<dyn Provider>,
    adapter: Box<dyn Adapter>,
}

impl Ragas {
    pub fn new(provider: Box<dyn Provider>) -> AgentResult<Self> {
        let adapter = adapter_for(provider.llm_type())?;
        Ok(Self { provider, adapter })
    }

    pub async fn score(
        &self,
        question: &str,
        answer: &str,
        context: &str,
    ) -> AgentResult<RagasScores> {
        let answer_relevance_score = self.answer_relevance(question, answer).await?;
        let context_relevance_score = self.context_relevance(question, context).await?;
        let faithfulness_score = self.faithfulness(question, answer, context).await?;

        let scores = RagasScores {
            ragas_score: harmonic_mean(&[
                answer_relevance_score,
                context_relevance_score,
                faithfulness_score,
            ]),
            answer_relevance_score,
            context_relevance_score,
            faithfulness_score,
        };
        tracing::info!(?scores, "ragas evaluation");
        Ok(scores)
    }

    /// Similarity between the question and one regenerated from the answer
    pub async fn answer_relevance(&self, question: &str, answer: &str) -> AgentResult<f64> {
        let prompt = BundledPrompt::AnswerRelevance.render(&json!({ "answer": answer }))?;
        let generated = self.complete(&prompt).await?;

        let response = self
            .provider
            .embed(&[question.to_string(), generated.trim().to_string()])
            .await?;
        match response.embeddings().as_slice() {
            [original, regenerated] => Ok(cosine_similarity(original, regenerated).max(0.0)),
            other => Err(AgentError::Internal(format!(
                "expected 2 embeddings, got {}",
                other.len()
            ))),
        }
    }

    /// Share of the context's sentences the model considers useful for the question
    pub async fn context_relevance(&self, question: &str, context: &str) -> AgentResult<f64> {
        let total = split_sentences(context).len();
        if total == 0 {
            return Ok(0.0);
        }

        let prompt = BundledPrompt::ContextRelevance
            .render(&json!({ "question": question, "context": context }))?;
        let extracted = self.complete(&prompt).await?;
        if extracted.contains(INSUFFICIENT_INFORMATION) {
            return Ok(0.0);
        }

        let relevant = non_empty_lines(&extracted).len();
        Ok((relevant as f64 / total as f64).min(1.0))
    }

    /// Share of the answer's statements supported by the context
    pub async fn faithfulness(
        &self,
        question: &str,
        answer: &str,
        context: &str,
    ) -> AgentResult<f64> {
        let prompt = BundledPrompt::FaithfulnessStatements
            .render(&json!({ "question": question, "answer": answer }))?;
        let statements: Vec<String> = non_empty_lines(&self.complete(&prompt).await?)
            .into_iter()
            .map(strip_numbering)
            .collect();
        if statements.is_empty() {
            return Ok(0.0);
        }

        let prompt = BundledPrompt::FaithfulnessVerdicts
            .render(&json!({ "context": context, "statements": statements }))?;
        let supported = count_supported(&self.complete(&prompt).await?);
        Ok((supported as f64 / statements.len() as f64).min(1.0))
    }

    async fn complete(&self, prompt: &str) -> AgentResult<String> {
        let response = self
            .provider
            .chat(self.adapter.build_completion_params(prompt, &[]))
            .await?;
        response
            .completion()
            .ok_or_else(|| AgentError::Internal("evaluation request returned no text".to_string()))
    }
}

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+\s+|\n+").expect("valid regex"))
}

fn numbering() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+[.)]|-|\*)\s*").expect("valid regex"))
}

fn split_sentences(text: &str) -> Vec<&str> {
    sentence_end()
        .split(text)
        .map(str::trim)
        .filter(|s| !s.trim_end_matches(['.', '!', '?']).is_empty())
        .collect()
}

fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn strip_numbering(line: &str) -> String {
    numbering().replace(line, "").trim().to_string()
}

/// Count `Yes` verdicts, preferring the summary line when the model gave one
fn count_supported(verdicts: &str) -> usize {
    if let Some(position) = verdicts.rfind(FINAL_VERDICT) {
        let summary = verdicts[position + FINAL_VERDICT.len()..]
            .lines()
            .next()
            .unwrap_or_default();
        return summary
            .split(|c: char| !c.is_alphabetic())
            .filter(|word| word.eq_ignore_ascii_case("yes"))
            .count();
    }
    verdicts.matches("Verdict: Yes").count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::providers::base::LlmType;
    use crate::providers::mock::{openai_text, MockProvider};
    use std::collections::HashMap;

    const QUESTION: &str = "When was Einstein born?";
    const ANSWER: &str = "Einstein was born on 14 March 1879 in Ulm.";
    const CONTEXT: &str = "Albert Einstein was born in Ulm on 14 March 1879. \
        He developed the theory of relativity. He died in 1955.";

    fn embeddings() -> HashMap<String, Vec<f32>> {
        HashMap::from([
            (QUESTION.to_string(), vec![1.0, 0.0]),
            ("When was Einstein born?".to_string(), vec![1.0, 0.0]),
            ("Where was Einstein born?".to_string(), vec![0.0, 1.0]),
        ])
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences(CONTEXT),
            vec![
                "Albert Einstein was born in Ulm on 14 March 1879",
                "He developed the theory of relativity",
                "He died in 1955."
            ]
        );
        assert!(split_sentences("  ").is_empty());
    }

    #[test]
    fn test_count_supported() {
        assert_eq!(
            count_supported("...\nFinal verdict for each statement in order: No. No. Yes."),
            1
        );
        assert_eq!(count_supported("1. a Verdict: Yes.\n2. b Verdict: No."), 1);
        assert_eq!(count_supported("Final verdict for each statement in order: Yes. yes."), 2);
    }

    #[test]
    fn test_strip_numbering() {
        assert_eq!(strip_numbering("1. Einstein was born in Ulm."), "Einstein was born in Ulm.");
        assert_eq!(strip_numbering("- Einstein was born in 1879."), "Einstein was born in 1879.");
        assert_eq!(strip_numbering("Einstein was born."), "Einstein was born.");
    }

    #[tokio::test]
    async fn test_score() {
        let provider = MockProvider::new(
            LlmType::OpenAi,
            vec![
                openai_text("When was Einstein born?"),
                openai_text("Albert Einstein was born in Ulm on 14 March 1879."),
                openai_text("Einstein was born on 14 March 1879.\nEinstein was born in Ulm."),
                openai_text(
                    "1. ... Verdict: Yes.\n2. ... Verdict: Yes.\n\
                     Final verdict for each statement in order: Yes. Yes.",
                ),
            ],
        )
        .with_embeddings(embeddings());
        let ragas = Ragas::new(Box::new(provider)).unwrap();

        let scores = ragas.score(QUESTION, ANSWER, CONTEXT).await.unwrap();
        assert!((scores.answer_relevance_score - 1.0).abs() < 1e-9);
        assert!((scores.context_relevance_score - 1.0 / 3.0).abs() < 1e-9);
        assert!((scores.faithfulness_score - 1.0).abs() < 1e-9);
        assert!((scores.ragas_score - 3.0 / 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unrelated_answer_scores_zero() {
        let provider = MockProvider::new(
            LlmType::OpenAi,
            vec![
                openai_text("Where was Einstein born?"),
                openai_text("Insufficient Information"),
                openai_text("Einstein was born in Ulm."),
                openai_text("Final verdict for each statement in order: No."),
            ],
        )
        .with_embeddings(embeddings());
        let ragas = Ragas::new(Box::new(provider)).unwrap();

        let scores = ragas.score(QUESTION, "He was born in Ulm.", CONTEXT).await.unwrap();
        assert_eq!(scores.answer_relevance_score, 0.0);
        assert_eq!(scores.context_relevance_score, 0.0);
        assert_eq!(scores.faithfulness_score, 0.0);
        assert_eq!(scores.ragas_score, 0.0);
    }

    #[tokio::test]
    async fn test_statements_are_numbered_in_verdict_prompt() {
        let provider = MockProvider::new(
            LlmType::OpenAi,
            vec![
                openai_text("- Einstein was born in Ulm.\n- Einstein was born in 1879."),
                openai_text("Final verdict for each statement in order: Yes. No."),
            ],
        );
        let ragas = Ragas::new(Box::new(provider.clone())).unwrap();

        let score = ragas.faithfulness(QUESTION, ANSWER, CONTEXT).await.unwrap();
        assert!((score - 0.5).abs() < 1e-9);

        let requests = provider.requests();
        let prompt = requests[1]["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("1. Einstein was born in Ulm.\n2. Einstein was born in 1879.\n"));
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let provider = MockProvider::with_results(
            LlmType::OpenAi,
            vec![Err(ProviderError::RequestFailed {
                status: 401,
                body: "bad key".to_string(),
            })],
        );
        let ragas = Ragas::new(Box::new(provider)).unwrap();
        assert!(matches!(
            ragas.score(QUESTION, ANSWER, CONTEXT).await,
            Err(AgentError::Provider(ProviderError::RequestFailed { status: 401, .. }))
        ));
    }
}
