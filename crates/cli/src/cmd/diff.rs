//! Diff command implementation.
//!
//! Compiles the stack and compares the result against the accepted baseline,
//! displaying added, removed and changed resources.

use std::path::Path;

use anyhow::{Context, Result, bail};

use stackc_lib::baseline::{BaselineStore, read_document};
use stackc_lib::parity::{ParityChecker, ParityReport};
use stackc_lib::synth::Document;

use super::compile_stack;
use crate::StackArgs;
use crate::output::{Change, caution, change, change_detail, done, emit_json, short_hash};

pub fn cmd_diff(args: &StackArgs, baseline: Option<&Path>, check: bool, json: bool, verbose: bool) -> Result<()> {
  let candidate = compile_stack(args)?.document;
  let reference = load_baseline(&candidate, baseline)?;

  let report = ParityChecker::new().compare(&candidate, &reference);

  if json {
    emit_json(&report)?;
  } else {
    print_human_report(&candidate, &reference, &report, verbose)?;
  }

  if check {
    report.into_result().context("Compiled document differs from the accepted baseline")?;
  }
  Ok(())
}

fn load_baseline(candidate: &Document, baseline: Option<&Path>) -> Result<Document> {
  if let Some(path) = baseline {
    return read_document(path).with_context(|| format!("Failed to load baseline: {}", path.display()));
  }

  let store = BaselineStore::default_store().context("Failed to locate baseline store")?;
  match store
    .load(&candidate.application, candidate.environment)
    .context("Failed to load baseline")?
  {
    Some(document) => Ok(document),
    None => bail!(
      "No accepted baseline for {} ({}). Run `stackc accept --env {}` first.",
      candidate.application,
      candidate.environment,
      candidate.environment
    ),
  }
}

fn print_human_report(candidate: &Document, reference: &Document, report: &ParityReport, verbose: bool) -> Result<()> {
  let ours = candidate.content_hash().context("Failed to hash compiled document")?;
  let theirs = reference.content_hash().context("Failed to hash baseline")?;
  println!("Comparing baseline {} → {}", short_hash(&theirs), short_hash(&ours));
  println!();

  if report.is_match() {
    done("No differences.");
    return Ok(());
  }

  if !report.header_changed.is_empty() {
    caution(&format!("Document header changed: {}", report.header_changed.join(", ")));
  }
  for id in &report.duplicate_ids {
    caution(&format!("Resource id {} appears more than once", id));
  }

  for id in &report.only_in_candidate {
    change(Change::Added, id.as_str());
  }
  for id in &report.only_in_reference {
    change(Change::Removed, id.as_str());
  }
  for changed in &report.changed {
    change(Change::Modified, changed.id.as_str());
    if verbose {
      for path in &changed.paths {
        change_detail(path);
      }
    }
  }
  for key in &report.outputs_changed {
    change(Change::Modified, &format!("output {}", key));
  }

  println!();
  println!("{}", report);
  Ok(())
}
