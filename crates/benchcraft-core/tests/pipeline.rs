use std::fs;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use benchcraft_core::{artifact, BenchConfig, Pipeline, Stage, StageOutcome};
use serde_json::{json, Value};

/// Fake chat endpoint: `good-model` answers correctly, `bad-model` fails on
/// every request, and `judge` says CORRECT when the generated answer is "Paris".
async fn spawn_endpoint() -> String {
	let app = Router::new().route(
		"/v1/chat/completions",
		post(|Json(body): Json<Value>| async move {
			let model = body["model"].as_str().unwrap_or_default().to_string();
			let user = body["messages"]
				.as_array()
				.and_then(|m| m.last())
				.and_then(|m| m["content"].as_str())
				.unwrap_or_default()
				.to_string();
			let content = match model.as_str() {
				"bad-model" => return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"}))),
				"judge" if user.ends_with("Generated Answer: Paris") => "CORRECT".to_string(),
				"judge" => "INCORRECT".to_string(),
				_ if user.contains("France") => "Paris".to_string(),
				_ => "I don't know".to_string(),
			};
			(
				StatusCode::OK,
				Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]})),
			)
		}),
	);
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	format!("http://{addr}/v1/chat/completions")
}

#[tokio::test]
async fn test_full_pipeline_over_http() {
	let dir = tempfile::tempdir().unwrap();
	let prompts = dir.path().join("prompts");
	let answers = dir.path().join("answers");
	fs::create_dir(&prompts).unwrap();
	fs::create_dir(&answers).unwrap();
	fs::write(prompts.join("capital.txt"), "What is the capital of France?\n").unwrap();
	fs::write(prompts.join("math.txt"), "What is 2 + 2?").unwrap();
	fs::write(prompts.join("orphan.txt"), "No answer for this one").unwrap();
	fs::write(answers.join("capital.txt"), "Paris").unwrap();
	fs::write(answers.join("math.txt"), "4").unwrap();

	let config = BenchConfig {
		prompt_dir: prompts,
		answer_dir: answers,
		output_dir: dir.path().join("answers-generated"),
		endpoint_url: spawn_endpoint().await,
		models: vec!["good-model".to_string(), "bad-model".to_string()],
		evaluator_model: Some("judge".to_string()),
		request_delay_secs: 0.0,
		..BenchConfig::default()
	};
	let pipeline = Pipeline::builder().config(Arc::new(config.clone())).build().unwrap();

	let report = pipeline.run().await.unwrap();
	assert_eq!(report.aborted().count(), 0);
	assert_eq!(report.outcomes.len(), 3);
	assert!(matches!(
		report.outcomes[0],
		StageOutcome::Completed { stage: Stage::Generate, records: 2, .. }
	));

	let evaluated = artifact::read_records(&config.evaluated_report_path()).await.unwrap();
	assert_eq!(evaluated.len(), 2);
	assert!(evaluated.iter().all(|r| r.model == "good-model"));
	assert_eq!(evaluated[0].file, "capital.txt");
	assert_eq!(evaluated[0].prompt, "What is the capital of France?");
	assert_eq!(evaluated[0].correct, Some(true));
	assert_eq!(evaluated[1].file, "math.txt");
	assert_eq!(evaluated[1].correct, Some(false));
	assert!(evaluated.iter().all(|r| r.evaluator_model.as_deref() == Some("judge")));
	assert!(evaluated.iter().all(|r| r.response_time >= 0.0));

	let console = report.console.unwrap();
	assert!(console.contains("1/2 (50.0%)"));

	let html = fs::read_to_string(config.html_report_path()).unwrap();
	assert!(html.contains("capital.txt"));
	assert!(html.contains("What is the capital of France?"));
}

#[tokio::test]
async fn test_rerun_evaluate_and_render_from_artifacts() {
	let dir = tempfile::tempdir().unwrap();
	let out = dir.path().join("out");
	fs::create_dir(&out).unwrap();
	let raw = json!([
		{"model": "m1", "file": "a.txt", "prompt": "p", "response_time": 1.5, "expected": "Yes", "generated": "yes"},
		{"model": "m2", "file": "b.txt", "prompt": "q", "response_time": 0.5, "expected": "No", "generated": "maybe"}
	]);
	fs::write(out.join("report.json"), raw.to_string()).unwrap();

	let config = BenchConfig {
		prompt_dir: dir.path().join("missing-prompts"),
		answer_dir: dir.path().join("missing-answers"),
		output_dir: out,
		stages: vec![Stage::Evaluate, Stage::Render],
		..BenchConfig::default()
	};
	let pipeline = Pipeline::builder().config(config.clone()).build().unwrap();

	let report = pipeline.run().await.unwrap();
	assert_eq!(report.aborted().count(), 0);

	let evaluated = artifact::read_records(&config.evaluated_report_path()).await.unwrap();
	assert_eq!(evaluated[0].correct, Some(true));
	assert_eq!(evaluated[1].correct, Some(false));
	assert_eq!(evaluated[0].evaluator_model.as_deref(), Some("exact_match"));

	let console = report.console.unwrap();
	// m1 never saw b.txt, m2 never saw a.txt
	assert!(console.contains("Results Grid"));
	assert!(console.contains("1/1 (100.0%)"));
	assert!(console.contains("0/1 (0.0%)"));

	let html = fs::read_to_string(config.html_report_path()).unwrap();
	assert_eq!(html.matches(">unavailable</td>").count(), 2);
}
