mod accept;
mod diff;
mod outputs;
mod synth;

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::debug;

use stackc_lib::config::StackConfig;
use stackc_lib::consts::APP_NAME;
use stackc_lib::synth::Metadata;
use stackc_lib::{CompileOptions, Compiled, compile};

use crate::StackArgs;

pub use accept::cmd_accept;
pub use diff::cmd_diff;
pub use outputs::cmd_outputs;
pub use synth::cmd_synth;

/// Load and compile the stack named by `args`.
fn compile_stack(args: &StackArgs) -> Result<Compiled> {
  let config = StackConfig::from_path(&args.config)
    .with_context(|| format!("Failed to load stack file: {}", args.config.display()))?;

  let mut options = CompileOptions::new(&args.env);
  if let Some(ref language) = args.language {
    options = options.with_language(language);
  }

  let compiled = compile(&config, &options)
    .with_context(|| format!("Failed to compile {} for environment '{}'", config.application, args.env))?;
  debug!(resources = compiled.document.resources.len(), "compiled stack");
  Ok(compiled)
}

/// Generation facts recorded alongside a written document.
fn metadata() -> Metadata {
  let generated_at = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or_default();
  Metadata {
    generated_at,
    generator: format!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION")),
  }
}
