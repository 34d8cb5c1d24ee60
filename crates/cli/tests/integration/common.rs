//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the stack file and an
/// isolated data directory for baselines.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file.
  ///
  /// Copies the fixture content to a temporary `stack.yaml` file.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("stack.yaml");
    std::fs::write(&config_path, fixture_content(name)).unwrap();
    Self { temp, config_path }
  }

  /// Overwrite the stack file.
  pub fn write_config(&self, content: &str) {
    std::fs::write(&self.config_path, content).unwrap();
  }

  pub fn config(&self) -> String {
    std::fs::read_to_string(&self.config_path).unwrap()
  }

  /// Data path for baselines.
  pub fn data_path(&self) -> PathBuf {
    let p = self.temp.path().join("data");
    std::fs::create_dir_all(&p).unwrap();
    p
  }

  /// Path of the baseline the default store keeps for an environment.
  pub fn baseline_path(&self, environment: &str) -> PathBuf {
    self
      .data_path()
      .join("stackc")
      .join("baselines")
      .join(format!("vidscribe-{}.json", environment))
  }

  /// Get a pre-configured Command for the stackc binary.
  ///
  /// Runs in the temp directory and sets environment variables for isolated testing:
  /// - `XDG_DATA_HOME`: Isolated data path (for baselines)
  /// - `APPDATA`: Isolated data path (for Windows)
  pub fn stackc_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("stackc");
    cmd.current_dir(self.temp.path());
    cmd.env("XDG_DATA_HOME", self.data_path());
    cmd.env("APPDATA", self.data_path());
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
