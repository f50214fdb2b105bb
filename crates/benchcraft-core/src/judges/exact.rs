use async_trait::async_trait;

use crate::judge::Judge;

/// Case-insensitive exact comparison, used when no evaluator model is set.
pub struct ExactMatchJudge;

#[async_trait]
impl Judge for ExactMatchJudge {
	fn name(&self) -> &str {
		"exact_match"
	}

	async fn is_correct(&self, expected: &str, generated: &str) -> bool {
		expected.to_lowercase() == generated.to_lowercase()
	}
}
