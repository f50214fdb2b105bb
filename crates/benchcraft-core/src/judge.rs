use std::sync::Arc;

use async_trait::async_trait;

use crate::client::Completer;
use crate::config::BenchConfig;
use crate::judges::{exact::ExactMatchJudge, model::ModelJudge};

/// Decides whether a generated answer matches the expected one.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Identifier stored as `evaluator_model` on judged records.
    fn name(&self) -> &str;
    async fn is_correct(&self, expected: &str, generated: &str) -> bool;
}

/// The model judge when an evaluator model is configured, exact matching otherwise.
pub fn judge_for(config: &BenchConfig, completer: Arc<dyn Completer>) -> Arc<dyn Judge> {
    match &config.evaluator_model {
        Some(model) => Arc::new(ModelJudge::new(completer, model.clone())),
        None => Arc::new(ExactMatchJudge),
    }
}
