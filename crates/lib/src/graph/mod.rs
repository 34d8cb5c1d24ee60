//! Resource Graph Builder.
//!
//! A [`ResourceGraph`] is built in five strictly ordered stages
//! (see [`Stage`]). While a stage is open, only nodes of that stage may be
//! inserted, and every dependency of an inserted node must already be in the
//! graph. Since later stages cannot have nodes yet, every reference points at
//! the same or an earlier stage and the graph is acyclic by construction.
//!
//! Nodes reference each other by [`NodeId`] only. A node cannot be removed
//! while anything still depends on it.

mod builder;
mod gateway;
mod types;

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

pub use builder::build;
pub use types::*;

use crate::naming::ResourceKind;

/// The cross-referenced set of nodes produced by one build.
#[derive(Debug, Clone)]
pub struct ResourceGraph {
  nodes: BTreeMap<NodeId, ResourceNode>,
  /// Insertion order; also stage order because stages only move forward.
  order: Vec<NodeId>,
  stage: Stage,
}

impl Default for ResourceGraph {
  fn default() -> Self {
    Self::new()
  }
}

impl ResourceGraph {
  /// An empty graph in the first stage.
  pub fn new() -> Self {
    Self {
      nodes: BTreeMap::new(),
      order: Vec::new(),
      stage: Stage::Roles,
    }
  }

  /// The stage currently accepting nodes.
  pub fn stage(&self) -> Stage {
    self.stage
  }

  /// Close the current stage and open `next`.
  ///
  /// # Errors
  ///
  /// Returns `StageOutOfOrder` unless `next` directly follows the current stage.
  pub fn advance(&mut self, next: Stage) -> Result<(), GraphError> {
    if self.stage.next() != Some(next) {
      return Err(GraphError::StageOutOfOrder {
        current: self.stage,
        requested: next,
      });
    }
    debug!(from = %self.stage, to = %next, "advancing stage");
    self.stage = next;
    Ok(())
  }

  /// Add a node to the current stage.
  ///
  /// # Errors
  ///
  /// - `WrongStage` if the node belongs to a different stage
  /// - `DuplicateNode` if the id is taken
  /// - `DanglingReference` if a dependency is not in the graph
  pub fn insert(&mut self, node: ResourceNode) -> Result<(), GraphError> {
    if node.stage != self.stage {
      return Err(GraphError::WrongStage {
        node: node.id,
        expected: self.stage,
        actual: node.stage,
      });
    }
    if self.nodes.contains_key(&node.id) {
      return Err(GraphError::DuplicateNode(node.id));
    }
    if let Some(dependency) = node.depends_on.iter().find(|dep| !self.nodes.contains_key(*dep)) {
      return Err(GraphError::DanglingReference {
        node: node.id.clone(),
        dependency: dependency.clone(),
      });
    }

    debug!(id = %node.id, kind = %node.kind, name = %node.physical_name, "inserted node");
    self.order.push(node.id.clone());
    self.nodes.insert(node.id.clone(), node);
    Ok(())
  }

  /// Remove a node nothing depends on.
  ///
  /// # Errors
  ///
  /// Returns `LiveReferences` listing the dependents if any remain, or
  /// `NodeNotFound`.
  pub fn remove(&mut self, id: &NodeId) -> Result<ResourceNode, GraphError> {
    if !self.nodes.contains_key(id) {
      return Err(GraphError::NodeNotFound(id.clone()));
    }

    let dependents: Vec<NodeId> = self.dependents(id).map(|n| n.id.clone()).collect();
    if !dependents.is_empty() {
      return Err(GraphError::LiveReferences {
        node: id.clone(),
        dependents,
      });
    }

    self.order.retain(|existing| existing != id);
    debug!(id = %id, "removed node");
    self.nodes.remove(id).ok_or_else(|| GraphError::NodeNotFound(id.clone()))
  }

  /// Update a node's attributes in place. Dependencies cannot be changed.
  pub(crate) fn patch(&mut self, id: &NodeId, f: impl FnOnce(&mut Attributes)) -> Result<(), GraphError> {
    let node = self.nodes.get_mut(id).ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
    f(&mut node.attributes);
    Ok(())
  }

  pub fn get(&self, id: &NodeId) -> Option<&ResourceNode> {
    self.nodes.get(id)
  }

  /// Like [`get`](Self::get), additionally checking the node's kind.
  pub fn expect_kind(&self, id: &NodeId, kind: ResourceKind) -> Result<&ResourceNode, GraphError> {
    let node = self.get(id).ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
    if node.kind != kind {
      return Err(GraphError::KindMismatch {
        node: id.clone(),
        expected: kind,
        actual: node.kind,
      });
    }
    Ok(node)
  }

  pub fn contains(&self, id: &NodeId) -> bool {
    self.nodes.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// All nodes in insertion (and therefore stage) order.
  pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
    self.order.iter().filter_map(|id| self.nodes.get(id))
  }

  /// Nodes built in `stage`, in insertion order.
  pub fn stage_nodes(&self, stage: Stage) -> impl Iterator<Item = &ResourceNode> {
    self.iter().filter(move |node| node.stage == stage)
  }

  /// Nodes that directly reference `id`.
  pub fn dependents<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a ResourceNode> + 'a {
    self.iter().filter(move |node| node.depends_on.contains(id))
  }

  /// Bucket policies attached to a bucket node.
  pub fn bucket_policies<'a>(&'a self, bucket: &'a NodeId) -> impl Iterator<Item = &'a ResourceNode> + 'a {
    self
      .dependents(bucket)
      .filter(|node| node.kind == ResourceKind::BucketPolicy)
  }

  fn to_petgraph(&self) -> (DiGraph<NodeId, ()>, HashMap<NodeId, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut indices = HashMap::new();

    for id in &self.order {
      indices.insert(id.clone(), graph.add_node(id.clone()));
    }

    for node in self.iter() {
      let Some(&dependent) = indices.get(&node.id) else {
        continue;
      };
      for dep in &node.depends_on {
        if let Some(&dependency) = indices.get(dep) {
          // Edge from dependency to dependent
          graph.add_edge(dependency, dependent, ());
        }
      }
    }

    (graph, indices)
  }

  /// Verify that the graph is acyclic.
  pub fn verify_acyclic(&self) -> Result<(), GraphError> {
    let (graph, _) = self.to_petgraph();
    toposort(&graph, None).map_err(|_| GraphError::CycleDetected)?;
    Ok(())
  }

  /// Node ids ordered so that every dependency precedes its dependents.
  pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
    let (graph, _) = self.to_petgraph();
    let sorted = toposort(&graph, None).map_err(|_| GraphError::CycleDetected)?;
    Ok(sorted.into_iter().map(|idx| graph[idx].clone()).collect())
  }
}
