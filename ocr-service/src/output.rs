use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Indented JSON
    Json,
    /// Single-line JSON
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

/// Write an extraction result to disk as UTF-8. Accented characters are written as-is.
pub async fn save_results<T: Serialize>(data: &T, path: &Path, format: OutputFormat) -> Result<()> {
    let body = match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Text => serde_json::to_string(data)?,
    };

    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to save results to {}", path.display()))?;

    info!("Results saved to {}", path.display());
    Ok(())
}
