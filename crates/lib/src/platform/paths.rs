use std::path::PathBuf;

use thiserror::Error;

use crate::consts::APP_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
  #[error("environment variable {0} is not set")]
  MissingVar(&'static str),
}

fn env_path(var: &'static str) -> Result<PathBuf, PathError> {
  std::env::var_os(var)
    .filter(|v| !v.is_empty())
    .map(PathBuf::from)
    .ok_or(PathError::MissingVar(var))
}

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> Result<PathBuf, PathError> {
  env_path("USERPROFILE")
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> Result<PathBuf, PathError> {
  env_path("HOME")
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> Result<PathBuf, PathError> {
  Ok(env_path("APPDATA")?.join(APP_NAME))
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> Result<PathBuf, PathError> {
  let data_home = match env_path("XDG_DATA_HOME") {
    Ok(path) => path,
    Err(_) => home_dir()?.join(".local").join("share"),
  };
  Ok(data_home.join(APP_NAME))
}
