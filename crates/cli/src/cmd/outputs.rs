//! Implementation of the `stackc outputs` command.

use anyhow::Result;

use super::compile_stack;
use crate::StackArgs;
use crate::output::{emit_json, field, note};

pub fn cmd_outputs(args: &StackArgs, json: bool) -> Result<()> {
  let compiled = compile_stack(args)?;
  let outputs = &compiled.document.outputs;

  if json {
    return emit_json(outputs);
  }

  if outputs.is_empty() {
    note("No outputs published");
    return Ok(());
  }
  println!("Outputs ({}):", compiled.document.environment);
  for (key, value) in outputs {
    field(key.as_str(), value);
  }
  Ok(())
}
