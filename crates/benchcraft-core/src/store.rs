use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};

/// Prompt files and their expected answers, paired by base file name.
#[derive(Debug, Clone)]
pub struct PromptStore {
    prompt_dir: PathBuf,
    answer_dir: PathBuf,
    pattern: String,
}

/// A prompt file that has a matching answer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    /// Base name shared by both files.
    pub file: String,
    pub prompt_path: PathBuf,
    pub answer_path: PathBuf,
}

impl PromptStore {
    pub fn new(
        prompt_dir: impl Into<PathBuf>,
        answer_dir: impl Into<PathBuf>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            prompt_dir: prompt_dir.into(),
            answer_dir: answer_dir.into(),
            pattern: pattern.into(),
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(&config.prompt_dir, &config.answer_dir, config.pattern.clone())
    }

    /// Prompt files matching the pattern, in lexicographic order.
    ///
    /// Each call re-reads the directory, so the sequence can be walked again.
    pub fn prompt_files(&self) -> Result<Vec<PathBuf>> {
        let full_pattern = self.prompt_dir.join(&self.pattern);
        let full_pattern = full_pattern.to_string_lossy();
        let entries = glob::glob(&full_pattern).map_err(|e| BenchError::InvalidPattern {
            pattern: self.pattern.clone(),
            message: e.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Skipping unreadable prompt entry"),
            }
        }
        files.sort();
        Ok(files)
    }

    /// The answer file for `prompt_path`, or `None` when it has no gold answer.
    pub fn pair_for(&self, prompt_path: &Path) -> Option<PromptPair> {
        let file = prompt_path.file_name()?.to_string_lossy().into_owned();
        let answer_path = self.answer_dir.join(&file);
        if !answer_path.is_file() {
            return None;
        }
        Some(PromptPair {
            file,
            prompt_path: prompt_path.to_path_buf(),
            answer_path,
        })
    }

    /// Like [`pair_for`](Self::pair_for), but says which answer file was missing.
    pub fn require_pair(&self, prompt_path: &Path) -> Result<PromptPair> {
        self.pair_for(prompt_path).ok_or_else(|| {
            let name = prompt_path.file_name().unwrap_or_default();
            BenchError::MissingAnswerFile(self.answer_dir.join(name))
        })
    }
}

impl PromptPair {
    /// Read prompt and expected answer, trimmed.
    pub async fn load(&self) -> Result<(String, String)> {
        let prompt = read_trimmed(&self.prompt_path).await?;
        let expected = read_trimmed(&self.answer_path).await?;
        Ok((prompt, expected))
    }
}

async fn read_trimmed(path: &Path) -> Result<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BenchError::io(path, e))?;
    Ok(content.trim().to_string())
}
