//! benchcraft-core: benchmark OpenAI-compatible chat endpoints against stored answers.
//! Three stages (generate, evaluate, render) hand results to each other through JSON artifacts.
//! See `Pipeline` for the entry point.

pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod judge;
pub mod report;
pub mod runner;
pub mod store;
pub mod testing;

pub mod judges {
	pub mod exact;
	pub mod model;
}

pub use benchcraft_types::{ModelSummary, ResultGrid, ResultRecord};
pub use client::{ChatClient, Completer, Completion};
pub use config::BenchConfig;
pub use error::{BenchError, Result};
pub use judge::{judge_for, Judge};
pub use judges::{exact::ExactMatchJudge, model::ModelJudge};
pub use runner::{Pipeline, PipelineBuilder, RunReport, Stage, StageOutcome};
pub use store::{PromptPair, PromptStore};
