use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};

/// Generated text plus the time the endpoint took to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
	pub text: String,
	pub elapsed: Duration,
}

#[async_trait]
pub trait Completer: Send + Sync {
	async fn complete(&self, model: &str, user_prompt: &str, system_prompt: Option<&str>) -> Result<Completion>;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
	role: &'static str,
	content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: Vec<ChatMessage<'a>>,
	stream: bool,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
	http: reqwest::Client,
	endpoint: String,
	api_key: Option<String>,
	delay: Duration,
}

impl ChatClient {
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			http: reqwest::Client::new(),
			endpoint: endpoint.into(),
			api_key: None,
			delay: Duration::from_millis(100),
		}
	}

	pub fn from_config(config: &BenchConfig) -> Self {
		let mut client = Self::new(config.endpoint_url.clone()).delay(config.request_delay());
		if let Some(key) = &config.api_key {
			client = client.api_key(key.clone());
		}
		client
	}

	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(key.into());
		self
	}

	/// Pause applied before every request.
	pub fn delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}
}

#[async_trait]
impl Completer for ChatClient {
	async fn complete(&self, model: &str, user_prompt: &str, system_prompt: Option<&str>) -> Result<Completion> {
		let mut messages = Vec::with_capacity(2);
		if let Some(system) = system_prompt {
			messages.push(ChatMessage { role: "system", content: system });
		}
		messages.push(ChatMessage { role: "user", content: user_prompt });
		let body = ChatRequest { model, messages, stream: false };

		if !self.delay.is_zero() {
			tokio::time::sleep(self.delay).await;
		}

		debug!(endpoint = %self.endpoint, model, "Sending chat completion request");
		let start = Instant::now();
		let mut req = self.http.post(&self.endpoint).json(&body);
		if let Some(key) = &self.api_key {
			req = req.bearer_auth(key);
		}
		let resp = req.send().await?;
		let status = resp.status();
		let text = resp.text().await?;
		if !status.is_success() {
			return Err(BenchError::RequestFailure(format!("HTTP {}: {}", status.as_u16(), text)));
		}
		let v: Value = serde_json::from_str(&text)
			.map_err(|e| BenchError::RequestFailure(format!("invalid JSON response: {e}")))?;
		let elapsed = start.elapsed();

		Ok(Completion { text: message_content(&v), elapsed })
	}
}

/// `choices[0].message.content`, empty when any part is missing.
fn message_content(v: &Value) -> String {
	v["choices"][0]["message"]["content"]
		.as_str()
		.unwrap_or_default()
		.trim()
		.to_string()
}
