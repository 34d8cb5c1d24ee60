//! Implementation of the `stackc synth` command.
//!
//! Compiles the stack and either prints the resource document to stdout or
//! writes it, with generation metadata, to a file. The printed document
//! carries no metadata, so identical inputs print identical bytes.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use stackc_lib::baseline::write_document;

use super::{compile_stack, metadata};
use crate::StackArgs;
use crate::output::{done, emit_json, field, short_hash};

#[derive(Serialize)]
struct SynthSummary<'a> {
  path: &'a Path,
  hash: String,
  resources: usize,
  outputs: usize,
}

pub fn cmd_synth(args: &StackArgs, out: Option<&Path>, json: bool) -> Result<()> {
  let compiled = compile_stack(args)?;

  let Some(path) = out else {
    let content = compiled.document.to_json().context("Failed to serialize document")?;
    std::io::stdout()
      .write_all(content.as_bytes())
      .context("Failed to write document to stdout")?;
    return Ok(());
  };

  let document = compiled.document.with_metadata(metadata());
  write_document(path, &document).with_context(|| format!("Failed to write document: {}", path.display()))?;
  let hash = document.content_hash().context("Failed to hash document")?;

  if json {
    emit_json(&SynthSummary {
      path,
      hash: hash.0,
      resources: document.resources.len(),
      outputs: document.outputs.len(),
    })?;
  } else {
    done(&format!(
      "Wrote {} resources to {}",
      document.resources.len(),
      path.display()
    ));
    field("Environment", document.environment.as_str());
    field("Hash", short_hash(&hash));
    field("Outputs", &document.outputs.len().to_string());
  }

  Ok(())
}
