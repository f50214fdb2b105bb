//! Reading and writing the JSON report artifacts that hand results between stages.

use std::path::{Path, PathBuf};

use benchcraft_types::ResultRecord;

use crate::error::{BenchError, Result};

/// Write `records` as one pretty-printed JSON array.
///
/// The document goes to a sibling temp file first and is renamed over `path`,
/// so readers see either the previous artifact or the complete new one.
pub async fn write_records(path: &Path, records: &[ResultRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).map_err(|e| BenchError::serialization(path, e))?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| BenchError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| BenchError::io(path, e))?;
    Ok(())
}

pub async fn read_records(path: &Path) -> Result<Vec<ResultRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BenchError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| BenchError::serialization(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
