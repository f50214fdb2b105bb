use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use benchcraft_core::config::{non_empty, parse_list};
use benchcraft_core::{BenchConfig, Pipeline, Stage, StageOutcome};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod serve;

#[derive(Debug, Parser)]
#[command(name = "benchcraft", version, about = "Benchmark OpenAI-compatible LLM endpoints against stored answers")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Run the generate, evaluate and render stages.
	Run(RunArgs),
	/// Serve the HTML report for a report artifact.
	Serve(ServeArgs),
}

#[derive(Debug, Clone, Parser)]
struct RunArgs {
	/// YAML file with defaults; environment variables and flags override it
	#[arg(long, env = "BENCHCRAFT_CONFIG")]
	config: Option<PathBuf>,

	/// Directory holding the prompt files
	#[arg(long, env = "PROMPT_DIR")]
	prompt_dir: Option<PathBuf>,

	/// Directory holding the expected answers, one file per prompt with the same name
	#[arg(long, env = "ANSWER_DIR")]
	answer_dir: Option<PathBuf>,

	/// Where report.json, report-evaluated.json and report.html are written
	#[arg(long, env = "OUTPUT_DIR")]
	output_dir: Option<PathBuf>,

	/// Glob pattern to filter prompt files (e.g. '*CODE*')
	#[arg(long, env = "PROMPT_PATTERN")]
	pattern: Option<String>,

	/// Chat completions URL
	#[arg(long, env = "ENDPOINT_URL")]
	endpoint_url: Option<String>,

	/// Comma-separated model names to test
	#[arg(long, env = "MODEL_NAMES")]
	models: Option<String>,

	/// Model that judges answers; empty means case-insensitive exact match
	#[arg(long, env = "MODEL_EVALUATOR")]
	evaluator_model: Option<String>,

	/// Bearer token for the endpoint
	#[arg(long, env = "API_KEY", hide_env_values = true)]
	api_key: Option<String>,

	/// System prompt sent with every generation request
	#[arg(long, env = "SYSTEM_PROMPT")]
	system_prompt: Option<String>,

	/// Seconds to wait before each request
	#[arg(long, env = "REQUEST_DELAY")]
	request_delay: Option<f64>,

	/// Comma-separated stages to run: generate, evaluate, render
	#[arg(long, env = "STAGES")]
	stages: Option<String>,
}

#[derive(Debug, Clone, Parser)]
struct ServeArgs {
	/// Directory the report artifacts are read from
	#[arg(long, env = "OUTPUT_DIR", default_value = "answers-generated")]
	output_dir: PathBuf,

	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	#[arg(long, env = "PORT", default_value_t = 8001)]
	port: u16,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
	// .env must be loaded before clap reads the environment
	let _ = dotenvy::dotenv();
	let cli = Cli::parse();

	// Examples:
	// - `BENCHCRAFT_LOG=debug` to also see request details
	// - `BENCHCRAFT_LOG=warn` to only see skipped items and failed stages
	tracing_subscriber::registry()
		.with(fmt::layer().with_target(false).compact())
		.with(
			EnvFilter::builder()
				.with_env_var("BENCHCRAFT_LOG")
				.with_default_directive(LevelFilter::INFO.into())
				.from_env_lossy(),
		)
		.init();

	match cli.command {
		Commands::Run(args) => run(args).await,
		Commands::Serve(args) => {
			serve::serve(args.output_dir, &args.host, args.port).await?;
			Ok(ExitCode::SUCCESS)
		}
	}
}

async fn run(args: RunArgs) -> Result<ExitCode> {
	let config = load_config(args)?;
	let pipeline = Pipeline::builder()
		.config(Arc::new(config))
		.build()
		.context("Invalid benchmark configuration")?;

	let report = pipeline.run().await?;
	if let Some(console) = &report.console {
		println!("\n{}", console);
	}
	if let Some(path) = report.outcomes.iter().find_map(|o| match o {
		StageOutcome::Completed { stage: Stage::Render, artifact, .. } => Some(artifact),
		_ => None,
	}) {
		println!("HTML report written to {}", path.display());
	}

	let mut failed = false;
	for outcome in report.aborted() {
		if let StageOutcome::Aborted { stage, reason } = outcome {
			eprintln!("{stage} did not run: {reason}");
			failed = true;
		}
	}
	Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Defaults, then the YAML file, then environment and flags.
fn load_config(args: RunArgs) -> Result<BenchConfig> {
	let mut config = match &args.config {
		Some(path) => BenchConfig::from_yaml_file(path)
			.with_context(|| format!("Failed to load config from {:?}", path))?,
		None => BenchConfig::default(),
	};

	if let Some(dir) = args.prompt_dir {
		config.prompt_dir = dir;
	}
	if let Some(dir) = args.answer_dir {
		config.answer_dir = dir;
	}
	if let Some(dir) = args.output_dir {
		config.output_dir = dir;
	}
	if let Some(pattern) = args.pattern {
		config.pattern = pattern;
	}
	if let Some(url) = args.endpoint_url {
		config.endpoint_url = url;
	}
	if let Some(models) = args.models {
		config.models = parse_list(&models);
	}
	if let Some(model) = args.evaluator_model {
		config.evaluator_model = non_empty(Some(model));
	}
	if let Some(key) = args.api_key {
		config.api_key = non_empty(Some(key));
	}
	if let Some(prompt) = args.system_prompt {
		config.system_prompt = non_empty(Some(prompt));
	}
	if let Some(delay) = args.request_delay {
		config.request_delay_secs = delay;
	}
	if let Some(stages) = args.stages {
		config.stages = Stage::parse_list(&stages)?;
	}

	Ok(config)
}
