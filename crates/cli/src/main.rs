mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::failed;

/// stackc - compile a declarative stack into a deployable resource document
#[derive(Parser)]
#[command(name = "stackc")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Arguments shared by every command that compiles the stack.
#[derive(Args, Debug, Clone)]
pub struct StackArgs {
  /// Path to the stack file (.yaml, .yml or .json)
  #[arg(short, long, default_value = "stack.yaml")]
  pub config: PathBuf,

  /// Environment profile to compile against (dev, staging, prod)
  #[arg(short, long = "env")]
  pub env: String,

  /// Override the profile's transcription language
  #[arg(long)]
  pub language: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile the stack and print or write the resource document
  Synth {
    #[command(flatten)]
    stack: StackArgs,

    /// Write the document to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print a JSON summary when writing to a file
    #[arg(long)]
    json: bool,
  },

  /// Print the outputs manifest
  Outputs {
    #[command(flatten)]
    stack: StackArgs,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Accept the compiled document as the baseline for its environment
  Accept {
    #[command(flatten)]
    stack: StackArgs,

    /// Baseline file to write instead of the default store
    #[arg(long)]
    baseline: Option<PathBuf>,
  },

  /// Compare the compiled document against the accepted baseline
  Diff {
    #[command(flatten)]
    stack: StackArgs,

    /// Baseline file to read instead of the default store
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Exit non-zero if the documents differ
    #[arg(long)]
    check: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Commands::Synth { stack, out, json } => cmd::cmd_synth(&stack, out.as_deref(), json),
    Commands::Outputs { stack, json } => cmd::cmd_outputs(&stack, json),
    Commands::Accept { stack, baseline } => cmd::cmd_accept(&stack, baseline.as_deref()),
    Commands::Diff {
      stack,
      baseline,
      check,
      json,
    } => cmd::cmd_diff(&stack, baseline.as_deref(), check, json, cli.verbose),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      failed(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
