use super::{prompts, ChatClient, ChatOptions};
use crate::collaborator::Evaluator;
use crate::error::CollaboratorError;
use crate::types::Evaluation;
use async_trait::async_trait;
use std::sync::Arc;

/// Verdict used when the judge reply has no parseable score
pub const UNPARSED_EVALUATION: &str = "Could not parse evaluation";

/// Score given alongside [`UNPARSED_EVALUATION`]
const UNPARSED_SCORE: i64 = 50;

/// [`Evaluator`] that asks a chat model to grade the report
#[derive(Debug, Clone)]
pub struct LlmJudge {
    client: Arc<dyn ChatClient>,
    options: ChatOptions,
}

impl LlmJudge {
    /// Judge using `client`; use [`ChatOptions::judge`] for deterministic scoring
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, options: ChatOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl Evaluator for LlmJudge {
    async fn evaluate(
        &self,
        source_text: &str,
        report: &str,
    ) -> Result<Evaluation, CollaboratorError> {
        let raw = self
            .client
            .complete(&prompts::judge_prompt(source_text, report), self.options)
            .await?;
        let evaluation = parse_judgement(&raw);
        tracing::info!(score = evaluation.score, band = %evaluation.band, "report judged");
        Ok(evaluation)
    }
}

/// Parse a `Score: N` / `Evaluation: ...` reply
///
/// Every `Evaluation:` line is kept, joined with spaces. Without a readable
/// score the result is 50 with [`UNPARSED_EVALUATION`].
#[must_use]
pub fn parse_judgement(raw: &str) -> Evaluation {
    let mut score = None;
    let mut verdict = Vec::new();

    for line in raw.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("Score:") {
            let digits: String = rest
                .trim()
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            score = score.or_else(|| digits.parse::<i64>().ok());
        } else if let Some(rest) = line.strip_prefix("Evaluation:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                verdict.push(rest);
            }
        }
    }

    match score {
        Some(score) => Evaluation::new(score, verdict.join(" ")),
        None => Evaluation::new(UNPARSED_SCORE, UNPARSED_EVALUATION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tests_support::Scripted;
    use crate::types::ScoreBand;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_score_and_joins_evaluations() {
        let eval = parse_judgement(
            "Score: 82\nEvaluation: Numbers match the source.\nEvaluation: Trends are explained.",
        );
        assert_eq!(eval.score, 82);
        assert_eq!(eval.evaluation, "Numbers match the source. Trends are explained.");
        assert_eq!(eval.band, ScoreBand::Good);
    }

    #[test]
    fn tolerates_suffixes_and_clamps() {
        assert_eq!(parse_judgement("Score: 70/100\nEvaluation: ok").score, 70);
        assert_eq!(parse_judgement("Score: 250").score, 100);
    }

    #[test]
    fn unparseable_reply_falls_back() {
        for raw in ["Great report!", "Score: high\nEvaluation: fine", ""] {
            let eval = parse_judgement(raw);
            assert_eq!(eval.score, 50);
            assert_eq!(eval.evaluation, UNPARSED_EVALUATION);
            assert_eq!(eval.band, ScoreBand::Poor);
        }
    }

    #[tokio::test]
    async fn judge_uses_its_options() {
        let client = Scripted::replying("Score: 64\nEvaluation: Adequate.");
        let options = ChatOptions {
            temperature: 0.0,
            top_p: None,
            max_tokens: Some(512),
        };
        let judge = LlmJudge::new(client.clone(), options);
        let eval = judge.evaluate("source", "# report").await.unwrap();
        assert_eq!(eval.band, ScoreBand::Fair);
        assert_eq!(client.last_options(), options);
        assert!(client.last_prompt().contains("# report"));
    }
}
