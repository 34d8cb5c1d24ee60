//! Reading stack files from disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::types::StackConfig;

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid YAML stack file: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("invalid JSON stack file: {0}")]
  Json(#[from] serde_json::Error),

  #[error("unsupported stack file extension for {path} (expected .yaml, .yml or .json)")]
  UnsupportedFormat { path: PathBuf },
}

impl StackConfig {
  /// Load a stack file, choosing the format by extension.
  pub fn from_path(path: &Path) -> Result<Self, LoadError> {
    let extension = path
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_ascii_lowercase);

    let parse: fn(&str) -> Result<Self, LoadError> = match extension.as_deref() {
      Some("yaml" | "yml") => Self::from_yaml_str,
      Some("json") => Self::from_json_str,
      _ => {
        return Err(LoadError::UnsupportedFormat {
          path: path.to_path_buf(),
        });
      }
    };

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "read stack file");

    parse(&content)
  }

  pub fn from_yaml_str(content: &str) -> Result<Self, LoadError> {
    Ok(serde_yaml::from_str(content)?)
  }

  pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
    Ok(serde_json::from_str(content)?)
  }
}
