use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::client::Completer;
use crate::error::{BenchError, Result};
use crate::judge::Judge;

pub const EVALUATOR_SYSTEM_PROMPT: &str = "You are an evaluator. Compare the expected answer with the generated answer, ignore the tag <think> content, the generated answers may vary slightly in wording but should preserve the original meaning, and respond with only 'CORRECT' or 'INCORRECT'";

/// Asks a second model whether the generated answer matches the expected one.
pub struct ModelJudge {
    completer: Arc<dyn Completer>,
    model: String,
}

impl ModelJudge {
    pub fn new(completer: Arc<dyn Completer>, model: impl Into<String>) -> Self {
        Self {
            completer,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Judge for ModelJudge {
    fn name(&self) -> &str {
        &self.model
    }

    async fn is_correct(&self, expected: &str, generated: &str) -> bool {
        let prompt = format!("Expected Answer: {expected}\nGenerated Answer: {generated}");
        let reply = match self
            .completer
            .complete(&self.model, &prompt, Some(EVALUATOR_SYSTEM_PROMPT))
            .await
        {
            Ok(completion) => completion.text,
            Err(err) => {
                warn!(evaluator = %self.model, error = %err, "Evaluator request failed, counting as incorrect");
                return false;
            }
        };

        match parse_verdict(&reply) {
            Ok(correct) => correct,
            Err(err) => {
                warn!(evaluator = %self.model, error = %err, "Counting as incorrect");
                false
            }
        }
    }
}

/// Exact match against the two verdict tokens, after trimming.
pub fn parse_verdict(reply: &str) -> Result<bool> {
    match reply.trim() {
        "CORRECT" => Ok(true),
        "INCORRECT" => Ok(false),
        other => Err(BenchError::AmbiguousVerdict(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::testing::completer_fn;

    fn judge_replying(reply: &'static str) -> ModelJudge {
        ModelJudge::new(Arc::new(completer_fn(move |_, _, _| Ok(reply.to_string()))), "judge-8b")
    }

    #[tokio::test]
    async fn test_verdict_tokens() {
        assert!(judge_replying("CORRECT").is_correct("Paris", "paris").await);
        assert!(judge_replying("  CORRECT\n").is_correct("Paris", "paris").await);
        assert!(!judge_replying("INCORRECT").is_correct("Paris", "Rome").await);
    }

    #[tokio::test]
    async fn test_ambiguous_reply_is_incorrect() {
        assert!(!judge_replying("I think it's fine").is_correct("Paris", "Paris").await);
        assert!(!judge_replying("correct").is_correct("Paris", "Paris").await);
        assert!(!judge_replying("CORRECT, mostly").is_correct("Paris", "Paris").await);
        assert!(!judge_replying("").is_correct("Paris", "Paris").await);
    }

    #[tokio::test]
    async fn test_request_failure_is_incorrect() {
        let judge = ModelJudge::new(
            Arc::new(completer_fn(|_, _, _| {
                Err(BenchError::RequestFailure("HTTP 503: overloaded".to_string()))
            })),
            "judge-8b",
        );
        assert!(!judge.is_correct("Paris", "Paris").await);
    }

    #[tokio::test]
    async fn test_evaluator_request_shape() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = calls.clone();
        let judge = ModelJudge::new(
            Arc::new(completer_fn(move |model, prompt, system| {
                log.lock().unwrap().push((
                    model.to_string(),
                    prompt.to_string(),
                    system.map(str::to_string),
                ));
                Ok("CORRECT".to_string())
            })),
            "judge-8b",
        );
        assert_eq!(judge.name(), "judge-8b");
        assert!(judge.is_correct("42", "<think>hmm</think>42").await);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (model, prompt, system) = &calls[0];
        assert_eq!(model, "judge-8b");
        assert_eq!(prompt, "Expected Answer: 42\nGenerated Answer: <think>hmm</think>42");
        assert_eq!(system.as_deref(), Some(EVALUATOR_SYSTEM_PROMPT));
    }

    #[test]
    fn test_parse_verdict() {
        assert!(parse_verdict("CORRECT").unwrap());
        assert!(!parse_verdict(" INCORRECT ").unwrap());
        let err = parse_verdict("Correct!").unwrap_err();
        assert!(matches!(err, BenchError::AmbiguousVerdict(ref r) if r == "Correct!"));
    }
}
