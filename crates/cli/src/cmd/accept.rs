//! Implementation of the `stackc accept` command.
//!
//! Stores the compiled document as the accepted baseline that later `diff`
//! runs compare against.

use std::path::Path;

use anyhow::{Context, Result};

use stackc_lib::baseline::{BaselineStore, write_document};

use super::{compile_stack, metadata};
use crate::StackArgs;
use crate::output::{done, field, short_hash};

pub fn cmd_accept(args: &StackArgs, baseline: Option<&Path>) -> Result<()> {
  let compiled = compile_stack(args)?;
  let document = compiled.document.with_metadata(metadata());

  let path = match baseline {
    Some(path) => {
      write_document(path, &document).with_context(|| format!("Failed to write baseline: {}", path.display()))?;
      path.to_path_buf()
    }
    None => {
      let store = BaselineStore::default_store().context("Failed to locate baseline store")?;
      store.save(&document).context("Failed to save baseline")?
    }
  };

  let hash = document.content_hash().context("Failed to hash document")?;
  done(&format!(
    "Accepted {} baseline for {}",
    document.environment, document.application
  ));
  field("Path", &path.display().to_string());
  field("Hash", short_hash(&hash));
  field("Resources", &document.resources.len().to_string());
  Ok(())
}
