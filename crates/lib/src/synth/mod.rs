//! Template Synthesizer.
//!
//! Flattens a completed [`ResourceGraph`] into an ordered [`Document`]: one
//! [`ResourceRecord`] per node, in stage order, each listing the ids it depends
//! on. Every dependency appears before its dependent, so a consumer that only
//! sees the flat document can still provision in order.
//!
//! Synthesis is pure. The only volatile data (generation time and generator
//! version) lives in [`Document::metadata`], which synthesis never fills in
//! and which is excluded from [`Document::content_hash`] and parity checks.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{EnvironmentName, OutputKey, ValidatedStack};
use crate::consts::DOCUMENT_FORMAT_VERSION;
use crate::graph::{GraphError, NodeId, ResourceGraph, Stage};
use crate::naming::ResourceKind;
use crate::placeholder;
use crate::util::hash::{HashError, Hashable, ObjectHash};

/// Published values keyed by the fixed output names.
pub type OutputsManifest = BTreeMap<OutputKey, String>;

#[derive(Debug, Error)]
pub enum SynthError {
  #[error(transparent)]
  Integrity(#[from] GraphError),

  #[error("failed to serialize attributes of {node}: {source}")]
  Serialize {
    node: NodeId,
    #[source]
    source: serde_json::Error,
  },
}

/// One node of the flattened graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
  pub id: NodeId,
  pub kind: ResourceKind,
  pub stage: Stage,
  pub physical_name: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub tags: BTreeMap<String, String>,
  pub attributes: serde_json::Value,
  /// Sorted dependency ids.
  pub depends_on: Vec<NodeId>,
}

/// Volatile facts about how a document was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  /// Seconds since the Unix epoch.
  pub generated_at: u64,
  pub generator: String,
}

/// The serialized resource graph handed to a provisioning executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub format_version: u32,
  pub application: String,
  pub environment: EnvironmentName,
  pub account: String,
  pub region: String,
  pub resources: Vec<ResourceRecord>,
  pub outputs: OutputsManifest,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Metadata>,
}

/// The comparable portion of a document: everything but the metadata.
#[derive(Serialize)]
struct Comparable<'a> {
  format_version: u32,
  application: &'a str,
  environment: EnvironmentName,
  account: &'a str,
  region: &'a str,
  resources: &'a [ResourceRecord],
  outputs: &'a OutputsManifest,
}

impl Hashable for Comparable<'_> {}

impl Document {
  pub fn resource(&self, id: &NodeId) -> Option<&ResourceRecord> {
    self.resources.iter().find(|r| &r.id == id)
  }

  pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceRecord> {
    self.resources.iter().filter(move |r| r.kind == kind)
  }

  /// Attach volatile metadata. Does not change the content hash.
  pub fn with_metadata(mut self, metadata: Metadata) -> Self {
    self.metadata = Some(metadata);
    self
  }

  /// The document without its metadata.
  pub fn comparable(&self) -> Self {
    Self {
      metadata: None,
      ..self.clone()
    }
  }

  /// Truncated SHA-256 of the comparable portion.
  pub fn content_hash(&self) -> Result<ObjectHash, HashError> {
    Comparable {
      format_version: self.format_version,
      application: &self.application,
      environment: self.environment,
      account: &self.account,
      region: &self.region,
      resources: &self.resources,
      outputs: &self.outputs,
    }
    .compute_hash()
  }

  /// Pretty JSON, newline terminated.
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(self)?;
    json.push('\n');
    Ok(json)
  }
}

/// Flatten `graph` into an output document.
///
/// # Errors
///
/// Returns `SynthError::Integrity` if a record would precede one of its
/// dependencies, which means the graph itself is corrupt.
pub fn synthesize(graph: &ResourceGraph, stack: &ValidatedStack<'_>) -> Result<Document, SynthError> {
  let mut emitted: HashSet<&NodeId> = HashSet::with_capacity(graph.len());
  let mut resources = Vec::with_capacity(graph.len());

  for stage in Stage::ALL {
    for node in graph.stage_nodes(stage) {
      if let Some(dependency) = node.depends_on.iter().find(|dep| !emitted.contains(dep)) {
        return Err(GraphError::DanglingReference {
          node: node.id.clone(),
          dependency: dependency.clone(),
        }
        .into());
      }

      let attributes = serde_json::to_value(&node.attributes).map_err(|source| SynthError::Serialize {
        node: node.id.clone(),
        source,
      })?;
      resources.push(ResourceRecord {
        id: node.id.clone(),
        kind: node.kind,
        stage: node.stage,
        physical_name: node.physical_name.clone(),
        tags: node.tags.clone(),
        attributes,
        depends_on: node.depends_on.iter().cloned().collect(),
      });
      emitted.insert(&node.id);
    }
    debug!(stage = %stage, records = resources.len(), "synthesized stage");
  }

  let ctx = stack.context();
  let document = Document {
    format_version: DOCUMENT_FORMAT_VERSION,
    application: ctx.scope.application.clone(),
    environment: ctx.environment,
    account: ctx.scope.account.clone(),
    region: ctx.scope.region.clone(),
    resources,
    outputs: outputs(graph, stack),
    metadata: None,
  };

  info!(
    resources = document.resources.len(),
    outputs = document.outputs.len(),
    "synthesized document"
  );
  Ok(document)
}

/// Build the outputs manifest. Keys whose resource is not in the graph are omitted.
pub fn outputs(graph: &ResourceGraph, stack: &ValidatedStack<'_>) -> OutputsManifest {
  let ctx = stack.context();
  let mut manifest = OutputsManifest::new();

  let api = NodeId::api();
  if graph.contains(&api) {
    manifest.insert(
      OutputKey::ApiUrl,
      format!(
        "https://{}.execute-api.{}.amazonaws.com/{}/",
        placeholder::reference(api.as_str(), "id"),
        ctx.scope.region,
        ctx.environment
      ),
    );
  }

  let distribution = NodeId::distribution();
  if graph.contains(&distribution) {
    manifest.insert(
      OutputKey::DistributionUrl,
      format!("https://{}", placeholder::reference(distribution.as_str(), "domain_name")),
    );
  }

  for spec in &stack.config().storage {
    if let Some(key) = spec.output
      && let Some(node) = graph.get(&NodeId::storage(&spec.name))
    {
      manifest.insert(key, node.physical_name.clone());
    }
  }

  manifest
}
