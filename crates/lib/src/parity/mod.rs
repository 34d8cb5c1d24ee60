//! Parity Checker.
//!
//! Structural comparison of a candidate document against a reference (usually
//! an accepted baseline). Resources are matched by id; matched resources are
//! walked field by field and every differing leaf is reported by its dotted
//! path, e.g. `attributes.memory_size` or `attributes.environment.LOG_LEVEL`.
//!
//! Document metadata is always ignored. Further volatile paths can be declared
//! with [`ParityChecker::ignore`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::OutputKey;
use crate::graph::NodeId;
use crate::synth::{Document, ResourceRecord};

/// A resource present in both documents whose fields differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedResource {
  pub id: NodeId,
  /// Dotted paths of every differing field, sorted.
  pub paths: Vec<String>,
}

/// The structured result of a parity check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParityReport {
  /// Document-level fields that differ (`application`, `region`, ...).
  pub header_changed: Vec<String>,
  pub only_in_candidate: Vec<NodeId>,
  pub only_in_reference: Vec<NodeId>,
  pub changed: Vec<ChangedResource>,
  pub outputs_changed: Vec<OutputKey>,
  /// Ids carried by more than one record in either document.
  pub duplicate_ids: Vec<NodeId>,
}

impl ParityReport {
  /// Returns true if the documents are structurally equivalent.
  pub fn is_match(&self) -> bool {
    self.header_changed.is_empty()
      && self.only_in_candidate.is_empty()
      && self.only_in_reference.is_empty()
      && self.changed.is_empty()
      && self.outputs_changed.is_empty()
      && self.duplicate_ids.is_empty()
  }

  /// Convert a mismatch into an error value for callers that gate on parity.
  pub fn into_result(self) -> Result<(), ParityMismatch> {
    if self.is_match() {
      Ok(())
    } else {
      Err(ParityMismatch { report: self })
    }
  }
}

impl fmt::Display for ParityReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} added, {} removed, {} changed",
      self.only_in_candidate.len(),
      self.only_in_reference.len(),
      self.changed.len()
    )?;
    if !self.outputs_changed.is_empty() {
      write!(f, ", {} outputs changed", self.outputs_changed.len())?;
    }
    if !self.duplicate_ids.is_empty() {
      write!(f, ", {} duplicate ids", self.duplicate_ids.len())?;
    }
    if !self.header_changed.is_empty() {
      write!(f, ", header changed ({})", self.header_changed.join(", "))?;
    }
    Ok(())
  }
}

/// A parity check that found differences.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("document does not match reference: {report}")]
pub struct ParityMismatch {
  pub report: ParityReport,
}

/// Compares documents, skipping declared-volatile paths.
#[derive(Debug, Clone, Default)]
pub struct ParityChecker {
  ignored: BTreeSet<String>,
}

impl ParityChecker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Ignore a record field path and everything beneath it, e.g. `attributes.code`.
  pub fn ignore(mut self, path: impl Into<String>) -> Self {
    self.ignored.insert(path.into());
    self
  }

  fn is_ignored(&self, path: &str) -> bool {
    self.ignored.iter().any(|ignored| {
      path == ignored
        || path
          .strip_prefix(ignored.as_str())
          .is_some_and(|rest| rest.starts_with('.'))
    })
  }

  pub fn compare(&self, candidate: &Document, reference: &Document) -> ParityReport {
    let mut report = ParityReport::default();

    let header = [
      ("format_version", candidate.format_version.to_string(), reference.format_version.to_string()),
      ("application", candidate.application.clone(), reference.application.clone()),
      ("environment", candidate.environment.to_string(), reference.environment.to_string()),
      ("account", candidate.account.clone(), reference.account.clone()),
      ("region", candidate.region.clone(), reference.region.clone()),
    ];
    for (field, ours, theirs) in header {
      if ours != theirs {
        report.header_changed.push(field.to_string());
      }
    }

    let mut duplicates = BTreeSet::new();
    let ours = index_records(candidate, &mut duplicates);
    let theirs = index_records(reference, &mut duplicates);
    report.duplicate_ids = duplicates.into_iter().cloned().collect();

    for (id, record) in &ours {
      match theirs.get(id) {
        None => report.only_in_candidate.push((*id).clone()),
        Some(other) => {
          let mut paths = Vec::new();
          self.diff_values(&record_value(record), &record_value(other), "", &mut paths);
          if !paths.is_empty() {
            paths.sort();
            report.changed.push(ChangedResource {
              id: (*id).clone(),
              paths,
            });
          }
        }
      }
    }
    for id in theirs.keys() {
      if !ours.contains_key(id) {
        report.only_in_reference.push((*id).clone());
      }
    }

    let keys: BTreeSet<&OutputKey> = candidate.outputs.keys().chain(reference.outputs.keys()).collect();
    for key in keys {
      if candidate.outputs.get(key) != reference.outputs.get(key) {
        report.outputs_changed.push(*key);
      }
    }

    report
  }

  fn diff_values(&self, ours: &Value, theirs: &Value, path: &str, out: &mut Vec<String>) {
    if !path.is_empty() && self.is_ignored(path) {
      return;
    }

    match (ours, theirs) {
      (Value::Object(a), Value::Object(b)) => {
        let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
        for key in keys {
          let child = join(path, key);
          match (a.get(key), b.get(key)) {
            (Some(x), Some(y)) => self.diff_values(x, y, &child, out),
            _ if self.is_ignored(&child) => {}
            _ => out.push(child),
          }
        }
      }
      (Value::Array(a), Value::Array(b)) if a.len() == b.len() => {
        for (index, (x, y)) in a.iter().zip(b).enumerate() {
          self.diff_values(x, y, &join(path, &index.to_string()), out);
        }
      }
      _ if ours != theirs => out.push(path.to_string()),
      _ => {}
    }
  }
}

fn join(path: &str, key: &str) -> String {
  if path.is_empty() {
    key.to_string()
  } else {
    format!("{}.{}", path, key)
  }
}

/// Index records by id. Every id seen twice goes to `duplicates`; the first
/// record keeps the slot.
fn index_records<'a>(
  document: &'a Document,
  duplicates: &mut BTreeSet<&'a NodeId>,
) -> BTreeMap<&'a NodeId, &'a ResourceRecord> {
  let mut records = BTreeMap::new();
  for record in &document.resources {
    if records.contains_key(&record.id) {
      duplicates.insert(&record.id);
    } else {
      records.insert(&record.id, record);
    }
  }
  records
}

/// A record as a JSON object, minus its id (the match key).
fn record_value(record: &ResourceRecord) -> Value {
  let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
  if let Value::Object(ref mut map) = value {
    map.remove("id");
  }
  value
}

/// Compare with the default checker (metadata ignored, nothing else).
pub fn compare(candidate: &Document, reference: &Document) -> ParityReport {
  ParityChecker::new().compare(candidate, reference)
}
