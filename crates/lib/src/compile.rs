//! The compile pipeline.
//!
//! This module provides [`compile`], which runs every phase in order:
//! validation, graph construction, synthesis. It either returns the complete
//! document or the first error; no partial artifact is ever produced.

use tracing::info;

use crate::config::{StackConfig, ValidationError, validate};
use crate::graph::{BuildError, GraphError, ResourceGraph, build};
use crate::naming::NamingError;
use crate::synth::{Document, SynthError, synthesize};

/// Per-run compile settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
  /// Environment profile to compile against (`dev`, `staging`, `prod`).
  pub environment: String,
  /// Overrides the profile's transcription language.
  pub language: Option<String>,
}

impl CompileOptions {
  pub fn new(environment: impl Into<String>) -> Self {
    Self {
      environment: environment.into(),
      language: None,
    }
  }

  pub fn with_language(mut self, language: impl Into<String>) -> Self {
    self.language = Some(language.into());
    self
  }
}

/// Errors that can abort a compile.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
  /// The configuration failed a validation pass. No node was built.
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  /// A composed physical name breaks its kind's rule.
  #[error("naming failed: {0}")]
  Naming(NamingError),

  /// A builder-internal invariant was violated.
  #[error("graph integrity violated: {0}")]
  Integrity(GraphError),

  #[error("build failed: {0}")]
  Build(BuildError),

  #[error("synthesis failed: {0}")]
  Synth(SynthError),
}

impl From<BuildError> for CompileError {
  fn from(err: BuildError) -> Self {
    match err {
      BuildError::Naming(e) => CompileError::Naming(e),
      BuildError::Integrity(e) => CompileError::Integrity(e),
      other => CompileError::Build(other),
    }
  }
}

impl From<SynthError> for CompileError {
  fn from(err: SynthError) -> Self {
    match err {
      SynthError::Integrity(e) => CompileError::Integrity(e),
      other => CompileError::Synth(other),
    }
  }
}

/// The products of one compile.
#[derive(Debug, Clone)]
pub struct Compiled {
  pub graph: ResourceGraph,
  pub document: Document,
}

/// Validate, build and synthesize `config` for one environment.
///
/// # Errors
///
/// Returns the first [`CompileError`]; nothing is produced on failure.
pub fn compile(config: &StackConfig, options: &CompileOptions) -> Result<Compiled, CompileError> {
  info!(
    application = %config.application,
    environment = %options.environment,
    "compiling stack"
  );

  let stack = validate(config, &options.environment, options.language.as_deref())?;
  let graph = build(&stack)?;
  let document = synthesize(&graph, &stack)?;

  info!(
    resources = document.resources.len(),
    outputs = document.outputs.len(),
    "compile complete"
  );
  Ok(Compiled { graph, document })
}
