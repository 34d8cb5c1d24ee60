//! Accepted baseline documents.
//!
//! A baseline is the last document a human accepted for an environment. The
//! Parity Checker compares fresh compiles against it.
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/baselines/
//! ├── <application>-dev.json
//! ├── <application>-staging.json
//! └── <application>-prod.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::EnvironmentName;
use crate::consts::DOCUMENT_FORMAT_VERSION;
use crate::platform::paths::{PathError, data_dir};
use crate::synth::Document;

/// Directory name for baselines within the data directory.
const BASELINES_DIR: &str = "baselines";

#[derive(Debug, Error)]
pub enum BaselineError {
  #[error("failed to create baseline directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read baseline {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write baseline: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse baseline {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize baseline: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported baseline format version {0}")]
  UnsupportedVersion(u32),

  #[error(transparent)]
  Location(#[from] PathError),
}

/// Stores one accepted document per application and environment.
#[derive(Debug, Clone)]
pub struct BaselineStore {
  base_path: PathBuf,
}

impl BaselineStore {
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  /// A store at the platform data directory:
  /// - Linux/macOS: `~/.local/share/stackc/baselines`
  /// - Windows: `%APPDATA%\stackc\baselines`
  pub fn default_store() -> Result<Self, BaselineError> {
    Ok(Self::new(data_dir()?.join(BASELINES_DIR)))
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  pub fn path_for(&self, application: &str, environment: EnvironmentName) -> PathBuf {
    self.base_path.join(format!("{}-{}.json", application, environment))
  }

  /// Save `document` as the accepted baseline for its application and environment.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  pub fn save(&self, document: &Document) -> Result<PathBuf, BaselineError> {
    let path = self.path_for(&document.application, document.environment);
    write_document(&path, document)?;
    info!(path = %path.display(), "saved baseline");
    Ok(path)
  }

  /// Load the accepted baseline.
  ///
  /// Returns `Ok(None)` if nothing has been accepted yet.
  pub fn load(&self, application: &str, environment: EnvironmentName) -> Result<Option<Document>, BaselineError> {
    let path = self.path_for(application, environment);
    match fs::metadata(&path) {
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no baseline");
        Ok(None)
      }
      _ => read_document(&path).map(Some),
    }
  }
}

/// Read a document written by [`write_document`].
pub fn read_document(path: &Path) -> Result<Document, BaselineError> {
  let content = fs::read_to_string(path).map_err(|source| BaselineError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let document: Document = serde_json::from_str(&content).map_err(|source| BaselineError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  if document.format_version != DOCUMENT_FORMAT_VERSION {
    return Err(BaselineError::UnsupportedVersion(document.format_version));
  }
  Ok(document)
}

/// Write a document atomically, creating parent directories.
pub fn write_document(path: &Path, document: &Document) -> Result<(), BaselineError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).map_err(BaselineError::CreateDir)?;
  }

  let content = document.to_json().map_err(BaselineError::Serialize)?;
  let mut temp_name = path.as_os_str().to_owned();
  temp_name.push(".tmp");
  let temp_path = PathBuf::from(temp_name);

  fs::write(&temp_path, &content).map_err(BaselineError::Write)?;
  fs::rename(&temp_path, path).map_err(BaselineError::Write)?;
  Ok(())
}
