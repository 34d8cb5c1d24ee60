//! Terminal rendering shared by the stackc commands.
//!
//! Progress and results go to stdout, failures and warnings to stderr. Marks
//! are colored only when the target stream supports it.

use anyhow::Context;
use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use stackc_lib::util::hash::ObjectHash;

/// Leading digits of a document hash shown to humans.
const SHORT_HASH_LEN: usize = 12;

/// How a diffed item relates to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
  Added,
  Removed,
  Modified,
}

impl Change {
  fn mark(self) -> &'static str {
    match self {
      Change::Added => "+",
      Change::Removed => "-",
      Change::Modified => "~",
    }
  }

  fn style(self) -> Style {
    match self {
      Change::Added => Style::new().green(),
      Change::Removed => Style::new().red(),
      Change::Modified => Style::new().yellow(),
    }
  }
}

fn status(stream: Stream, mark: &str, style: Style, message: &str) {
  let mark = mark.if_supports_color(stream, |s| s.style(style));
  match stream {
    Stream::Stderr => eprintln!("{} {}", mark, message),
    _ => println!("{} {}", mark, message),
  }
}

pub fn done(message: &str) {
  status(Stream::Stdout, "✓", Style::new().green(), message);
}

pub fn note(message: &str) {
  status(Stream::Stdout, "•", Style::new().blue(), message);
}

pub fn caution(message: &str) {
  status(Stream::Stderr, "⚠", Style::new().yellow(), message);
}

pub fn failed(message: &str) {
  status(Stream::Stderr, "✗", Style::new().red(), message);
}

/// An indented `label: value` line under a status message.
pub fn field(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// One line of a diff listing, e.g. `  + function/extractaudio`.
pub fn change(kind: Change, subject: &str) {
  println!(
    "  {} {}",
    kind.mark().if_supports_color(Stream::Stdout, |s| s.style(kind.style())),
    subject
  );
}

/// A changed field path beneath a [`change`] line.
pub fn change_detail(path: &str) {
  println!("      {}", path.if_supports_color(Stream::Stdout, |s| s.dimmed()));
}

pub fn short_hash(hash: &ObjectHash) -> &str {
  let len = hash.0.len().min(SHORT_HASH_LEN);
  &hash.0[..len]
}

/// Print a machine-readable result to stdout.
pub fn emit_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
