use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use benchcraft_types::{console_report, summarize, ResultRecord};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::artifact;
use crate::client::{ChatClient, Completer};
use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::judge::{judge_for, Judge};
use crate::report::generate_html_report;
use crate::store::{PromptPair, PromptStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
	Generate,
	Evaluate,
	Render,
}

impl Stage {
	/// Every stage, in pipeline order.
	pub const ALL: [Stage; 3] = [Stage::Generate, Stage::Evaluate, Stage::Render];

	/// Parse a comma-separated stage list such as `generate,render`.
	pub fn parse_list(s: &str) -> Result<Vec<Stage>> {
		crate::config::parse_list(s).iter().map(|item| item.parse()).collect()
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Stage::Generate => "GENERATE",
			Stage::Evaluate => "EVALUATE",
			Stage::Render => "RENDER",
		})
	}
}

impl FromStr for Stage {
	type Err = BenchError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_lowercase().as_str() {
			"generate" => Ok(Stage::Generate),
			"evaluate" => Ok(Stage::Evaluate),
			"render" => Ok(Stage::Render),
			other => Err(BenchError::InvalidConfig(format!(
				"unknown stage '{other}', expected generate, evaluate or render"
			))),
		}
	}
}

/// What happened to one selected stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
	Completed { stage: Stage, records: usize, artifact: PathBuf },
	Aborted { stage: Stage, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
	pub outcomes: Vec<StageOutcome>,
	/// Console tables from the render stage, if it ran.
	pub console: Option<String>,
}

impl RunReport {
	pub fn aborted(&self) -> impl Iterator<Item = &StageOutcome> {
		self.outcomes.iter().filter(|o| matches!(o, StageOutcome::Aborted { .. }))
	}
}

pub struct RenderedReport {
	pub records: Vec<ResultRecord>,
	pub console: String,
	pub html_path: PathBuf,
}

pub struct PipelineBuilder {
	config: Option<Arc<BenchConfig>>,
	store: Option<PromptStore>,
	completer: Option<Arc<dyn Completer>>,
	judge: Option<Arc<dyn Judge>>,
}

impl PipelineBuilder {
	pub fn new() -> Self {
		Self {
			config: None,
			store: None,
			completer: None,
			judge: None,
		}
	}

	pub fn config(mut self, config: impl Into<Arc<BenchConfig>>) -> Self {
		self.config = Some(config.into());
		self
	}

	pub fn store(mut self, store: PromptStore) -> Self {
		self.store = Some(store);
		self
	}

	/// Defaults to a [`ChatClient`] for the configured endpoint.
	pub fn completer(mut self, completer: Arc<dyn Completer>) -> Self {
		self.completer = Some(completer);
		self
	}

	/// Defaults to [`judge_for`] over the completer.
	pub fn judge(mut self, judge: Arc<dyn Judge>) -> Self {
		self.judge = Some(judge);
		self
	}

	pub fn build(self) -> Result<Pipeline> {
		let config = self.config.ok_or_else(|| BenchError::InvalidConfig("config must be set".to_string()))?;
		config.validate()?;
		let store = self.store.unwrap_or_else(|| PromptStore::from_config(&config));
		let completer = self
			.completer
			.unwrap_or_else(|| Arc::new(ChatClient::from_config(&config)));
		let judge = self.judge.unwrap_or_else(|| judge_for(&config, completer.clone()));
		Ok(Pipeline { config, store, completer, judge })
	}
}

impl Default for PipelineBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Generate → evaluate → render, with a JSON artifact between each stage.
pub struct Pipeline {
	config: Arc<BenchConfig>,
	store: PromptStore,
	completer: Arc<dyn Completer>,
	judge: Arc<dyn Judge>,
}

impl Pipeline {
	pub fn builder() -> PipelineBuilder {
		PipelineBuilder::new()
	}

	pub fn config(&self) -> &BenchConfig {
		&self.config
	}

	/// Run the configured stages in pipeline order.
	///
	/// A stage that fails is logged and recorded in the report; the next stage
	/// still runs. Only failing to create the output directory is fatal.
	pub async fn run(&self) -> Result<RunReport> {
		tokio::fs::create_dir_all(&self.config.output_dir)
			.await
			.map_err(|e| BenchError::io(&self.config.output_dir, e))?;

		let mut report = RunReport::default();
		for stage in Stage::ALL {
			if !self.config.runs(stage) {
				continue;
			}
			info!(%stage, "Starting stage");
			let outcome = match stage {
				Stage::Generate => self
					.generate()
					.await
					.map(|records| (records.len(), self.config.raw_report_path())),
				Stage::Evaluate => self
					.evaluate()
					.await
					.map(|records| (records.len(), self.config.evaluated_report_path())),
				Stage::Render => self.render().await.map(|rendered| {
					let count = rendered.records.len();
					report.console = Some(rendered.console);
					(count, rendered.html_path)
				}),
			};
			match outcome {
				Ok((records, artifact)) => {
					info!(%stage, records, artifact = %artifact.display(), "Stage complete");
					report.outcomes.push(StageOutcome::Completed { stage, records, artifact });
				}
				Err(err) => {
					error!(%stage, "{err}");
					report.outcomes.push(StageOutcome::Aborted { stage, reason: err.to_string() });
				}
			}
		}
		Ok(report)
	}

	/// Ask every model every prompt that has an expected answer, and write the raw report.
	pub async fn generate(&self) -> Result<Vec<ResultRecord>> {
		let prompt_files = self.store.prompt_files()?;
		info!(
			models = self.config.models.len(),
			prompts = prompt_files.len(),
			"Generating answers"
		);

		let mut records = Vec::new();
		for model in &self.config.models {
			info!(model = %model, "Testing model");
			for prompt_path in &prompt_files {
				let pair = match self.store.require_pair(prompt_path) {
					Ok(pair) => pair,
					Err(err) => {
						info!("Skipping {}: {err}", display_name(prompt_path));
						continue;
					}
				};
				match self.generate_one(model, &pair).await {
					Ok(record) => {
						info!(
							model = %model,
							file = %record.file,
							response_time = %format!("{:.2}s", record.response_time),
							"Answer generated"
						);
						records.push(record);
					}
					Err(err) => warn!(model = %model, file = %pair.file, error = %err, "Skipping prompt"),
				}
			}
		}

		artifact::write_records(&self.config.raw_report_path(), &records).await?;
		Ok(records)
	}

	async fn generate_one(&self, model: &str, pair: &PromptPair) -> Result<ResultRecord> {
		let (prompt, expected) = pair.load().await?;
		let completion = self
			.completer
			.complete(model, &prompt, self.config.system_prompt.as_deref())
			.await?;
		Ok(ResultRecord {
			model: model.to_string(),
			file: pair.file.clone(),
			prompt,
			response_time: completion.elapsed.as_secs_f64(),
			expected,
			generated: completion.text,
			correct: None,
			evaluator_model: None,
		})
	}

	/// Judge every record of the raw report and write the evaluated report.
	pub async fn evaluate(&self) -> Result<Vec<ResultRecord>> {
		let raw_path = self.config.raw_report_path();
		require_artifact(&raw_path, Stage::Evaluate, Stage::Generate).await?;
		let mut records = artifact::read_records(&raw_path).await?;
		info!(records = records.len(), evaluator = self.judge.name(), "Evaluating answers");

		for r in records.iter_mut() {
			let correct = self.judge.is_correct(&r.expected, &r.generated).await;
			r.correct = Some(correct);
			r.evaluator_model = Some(self.judge.name().to_string());
			if correct {
				info!(model = %r.model, file = %r.file, "Correct");
			} else {
				info!(
					model = %r.model,
					file = %r.file,
					expected = %r.expected,
					generated = %r.generated,
					"Incorrect"
				);
			}
		}

		for s in summarize(&records) {
			info!(
				model = %s.model,
				"{}/{} correct ({:.1}%), avg {:.2}s",
				s.correct,
				s.total,
				s.accuracy(),
				s.avg_response_time()
			);
		}

		artifact::write_records(&self.config.evaluated_report_path(), &records).await?;
		Ok(records)
	}

	/// Build the console tables and the HTML report from the evaluated report.
	pub async fn render(&self) -> Result<RenderedReport> {
		let evaluated_path = self.config.evaluated_report_path();
		require_artifact(&evaluated_path, Stage::Render, Stage::Evaluate).await?;
		let records = artifact::read_records(&evaluated_path).await?;

		let console = console_report(&records);
		let html_path = self.config.html_report_path();
		tokio::fs::write(&html_path, generate_html_report(&records))
			.await
			.map_err(|e| BenchError::io(&html_path, e))?;

		Ok(RenderedReport { records, console, html_path })
	}
}

async fn require_artifact(path: &Path, stage: Stage, prerequisite: Stage) -> Result<()> {
	if tokio::fs::try_exists(path).await.unwrap_or(false) {
		return Ok(());
	}
	Err(BenchError::MissingArtifact {
		stage,
		prerequisite,
		path: path.to_path_buf(),
	})
}

fn display_name(path: &Path) -> String {
	path.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| path.display().to_string())
}
