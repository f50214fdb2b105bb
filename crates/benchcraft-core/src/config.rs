use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BenchError, Result};
use crate::runner::Stage;

/// Everything a benchmark run needs, fixed once at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default = "default_prompt_dir")]
    pub prompt_dir: PathBuf,
    #[serde(default = "default_answer_dir")]
    pub answer_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Glob applied to file names inside `prompt_dir`.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Falls back to case-insensitive exact matching when unset.
    #[serde(default)]
    pub evaluator_model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_request_delay")]
    pub request_delay_secs: f64,
    #[serde(default = "default_stages")]
    pub stages: Vec<Stage>,
}

fn default_prompt_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_answer_dir() -> PathBuf {
    PathBuf::from("answers")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("answers-generated")
}

fn default_pattern() -> String {
    "*".to_string()
}

fn default_endpoint_url() -> String {
    "http://localhost:9292/v1/chat/completions".to_string()
}

fn default_models() -> Vec<String> {
    parse_list("gemma-3-270m-it-Q4_K_M,Qwen3-8B-Q4_K_M")
}

fn default_request_delay() -> f64 {
    0.1
}

fn default_stages() -> Vec<Stage> {
    Stage::ALL.to_vec()
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            prompt_dir: default_prompt_dir(),
            answer_dir: default_answer_dir(),
            output_dir: default_output_dir(),
            pattern: default_pattern(),
            endpoint_url: default_endpoint_url(),
            models: default_models(),
            evaluator_model: None,
            api_key: None,
            system_prompt: None,
            request_delay_secs: default_request_delay(),
            stages: default_stages(),
        }
    }
}

impl BenchConfig {
    /// Load a YAML file; keys that are absent keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            BenchError::InvalidConfig(message) => BenchError::serialization(path, message),
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // an empty document is a valid, all-defaults config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self =
            serde_yaml::from_str(content).map_err(|e| BenchError::InvalidConfig(e.to_string()))?;
        config.evaluator_model = non_empty(config.evaluator_model);
        config.api_key = non_empty(config.api_key);
        config.system_prompt = non_empty(config.system_prompt);
        Ok(config)
    }

    /// Zero when the configured value is not a representable delay; `validate` rejects those.
    pub fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_delay_secs).unwrap_or_default()
    }

    pub fn raw_report_path(&self) -> PathBuf {
        self.output_dir.join(RAW_REPORT_FILE)
    }

    pub fn evaluated_report_path(&self) -> PathBuf {
        self.output_dir.join(EVALUATED_REPORT_FILE)
    }

    pub fn html_report_path(&self) -> PathBuf {
        self.output_dir.join(HTML_REPORT_FILE)
    }

    pub fn runs(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint_url.trim().is_empty() {
            return Err(BenchError::InvalidConfig("endpoint URL is empty".to_string()));
        }
        Duration::try_from_secs_f64(self.request_delay_secs).map_err(|e| {
            BenchError::InvalidConfig(format!(
                "request delay must be a non-negative number of seconds, got {}: {e}",
                self.request_delay_secs
            ))
        })?;
        if self.runs(Stage::Generate) && self.models.is_empty() {
            return Err(BenchError::InvalidConfig(
                "no models to test; set MODEL_NAMES or --models".to_string(),
            ));
        }
        // each (model, file) pair must appear at most once in a report
        let mut seen = HashSet::new();
        if let Some(model) = self.models.iter().find(|m| !seen.insert(m.as_str())) {
            return Err(BenchError::InvalidConfig(format!("model '{model}' is listed more than once")));
        }
        Ok(())
    }
}

pub const RAW_REPORT_FILE: &str = "report.json";
pub const EVALUATED_REPORT_FILE: &str = "report-evaluated.json";
pub const HTML_REPORT_FILE: &str = "report.html";

/// Split a comma-separated list, trimming entries and dropping empty and repeated ones.
pub fn parse_list(s: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in s.split(',').map(str::trim) {
        if !item.is_empty() && !items.iter().any(|seen| seen == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// Treat an empty or whitespace-only value as unset.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.models, vec!["gemma-3-270m-it-Q4_K_M", "Qwen3-8B-Q4_K_M"]);
        assert_eq!(config.request_delay(), Duration::from_millis(100));
        assert_eq!(config.stages, Stage::ALL.to_vec());
        assert!(config.evaluator_model.is_none());
        assert_eq!(
            config.evaluated_report_path(),
            PathBuf::from("answers-generated/report-evaluated.json")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        assert_eq!(parse_list(" a, b ,,c ,"), vec!["a", "b", "c"]);
        assert_eq!(parse_list("m2, m1, m2,m1"), vec!["m2", "m1"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = r#"
models: [llama-3-8b]
evaluator_model: ""
request_delay_secs: 0.5
stages: [evaluate, render]
"#;
        let config = BenchConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.models, vec!["llama-3-8b"]);
        assert!(config.evaluator_model.is_none());
        assert_eq!(config.request_delay_secs, 0.5);
        assert_eq!(config.stages, vec![Stage::Evaluate, Stage::Render]);
        assert_eq!(config.prompt_dir, PathBuf::from("prompts"));
    }

    #[test]
    fn test_yaml_unknown_stage_is_rejected() {
        let err = BenchConfig::from_yaml_str("stages: [deploy]").unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BenchConfig::default();
        config.request_delay_secs = -1.0;
        assert!(config.validate().is_err());
        config.request_delay_secs = f64::NAN;
        assert!(config.validate().is_err());
        config.request_delay_secs = 1e20;
        assert!(matches!(config.validate(), Err(BenchError::InvalidConfig(_))));
        assert_eq!(config.request_delay(), Duration::ZERO);

        let mut config = BenchConfig::default();
        config.models = vec!["m1".to_string(), "m2".to_string(), "m1".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'m1' is listed more than once"));

        let mut config = BenchConfig::default();
        config.models.clear();
        assert!(config.validate().is_err());
        // render alone doesn't need models
        config.stages = vec![Stage::Render];
        assert!(config.validate().is_ok());
    }
}
