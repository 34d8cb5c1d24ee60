use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
  BillingMode, CacheSettings, CorsRule, Effect, HttpMethod, KeyAttribute, LifecycleThresholds, LogLevel, PriceClass,
  RemovalPolicy, RoleKind, ThrottleLimits,
};
use crate::naming::{NamingError, ResourceKind};
use crate::placeholder::PlaceholderError;

/// Graph construction stages, in build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Roles,
  Storage,
  Compute,
  Gateway,
  Edge,
}

impl Stage {
  pub const ALL: [Stage; 5] = [Stage::Roles, Stage::Storage, Stage::Compute, Stage::Gateway, Stage::Edge];

  /// The stage that follows this one, if any.
  pub fn next(self) -> Option<Stage> {
    match self {
      Stage::Roles => Some(Stage::Storage),
      Stage::Storage => Some(Stage::Compute),
      Stage::Compute => Some(Stage::Gateway),
      Stage::Gateway => Some(Stage::Edge),
      Stage::Edge => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Stage::Roles => "roles",
      Stage::Storage => "storage",
      Stage::Compute => "compute",
      Stage::Gateway => "gateway",
      Stage::Edge => "edge",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Identifier of a node within one graph.
///
/// Ids are derived from logical names, never from physical names, so the same
/// configuration produces the same ids in every environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
  pub fn role(name: &str) -> Self {
    Self(format!("role/{}", name))
  }

  pub fn storage(name: &str) -> Self {
    Self(format!("storage/{}", name))
  }

  pub fn policy(bucket: &str) -> Self {
    Self(format!("policy/{}", bucket))
  }

  pub fn function(name: &str) -> Self {
    Self(format!("function/{}", name))
  }

  pub fn log_group(function: &str) -> Self {
    Self(format!("log/{}", function))
  }

  pub fn notification(bucket: &str) -> Self {
    Self(format!("notification/{}", bucket))
  }

  pub fn api() -> Self {
    Self("api".to_string())
  }

  /// `path` is the joined template, e.g. `/video/{videoId}`.
  pub fn api_resource(path: &str) -> Self {
    Self(format!("api/resource{}", path))
  }

  pub fn api_method(path: &str, method: HttpMethod) -> Self {
    Self(format!("api/method{}/{}", path, method))
  }

  pub fn api_deployment() -> Self {
    Self("api/deployment".to_string())
  }

  pub fn access_identity() -> Self {
    Self("edge/identity".to_string())
  }

  pub fn distribution() -> Self {
    Self("edge/distribution".to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A single physical infrastructure object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceNode {
  pub id: NodeId,
  pub kind: ResourceKind,
  pub stage: Stage,
  pub physical_name: String,
  /// Empty for kinds the provider cannot tag.
  pub tags: BTreeMap<String, String>,
  pub attributes: Attributes,
  /// Nodes this one borrows a reference to. Every entry exists in the graph.
  pub depends_on: BTreeSet<NodeId>,
}

// =============================================================================
// Attributes
// =============================================================================

/// Kind-specific node settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Attributes {
  Role(RoleAttributes),
  Bucket(BucketAttributes),
  Table(TableAttributes),
  BucketPolicy(PolicyAttributes),
  Function(FunctionAttributes),
  LogGroup(LogGroupAttributes),
  Notification(NotificationAttributes),
  RestApi(RestApiAttributes),
  ApiResource(ApiResourceAttributes),
  ApiMethod(ApiMethodAttributes),
  Deployment(DeploymentAttributes),
  AccessIdentity(AccessIdentityAttributes),
  Distribution(DistributionAttributes),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStatement {
  pub effect: Effect,
  pub actions: Vec<String>,
  pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleAttributes {
  pub role_kind: RoleKind,
  pub arn: String,
  pub trusted_principal: String,
  pub statements: Vec<ResolvedStatement>,
}

/// A function invoked by object events, as seen from the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerEntry {
  /// Physical name of the target function.
  pub function: String,
  pub function_arn: String,
  pub events: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub prefix: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketAttributes {
  pub arn: String,
  pub encryption: String,
  pub block_public_access: bool,
  pub cors: Vec<CorsRule>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lifecycle: Option<LifecycleThresholds>,
  pub triggers: Vec<TriggerEntry>,
  pub removal_policy: RemovalPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableAttributes {
  pub arn: String,
  pub partition_key: KeyAttribute,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort_key: Option<KeyAttribute>,
  pub billing_mode: BillingMode,
  pub encrypted: bool,
  pub point_in_time_recovery: bool,
  pub removal_policy: RemovalPolicy,
}

/// Who a bucket policy statement applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Principal {
  /// Any caller on the public internet.
  Anyone,
  /// One origin access identity, by its deferred canonical user id.
  AccessIdentity { canonical_user: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyStatement {
  pub sid: String,
  pub effect: Effect,
  pub principal: Principal,
  pub actions: Vec<String>,
  pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyAttributes {
  pub bucket: String,
  pub statements: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionAttributes {
  pub arn: String,
  pub handler: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  pub runtime: String,
  pub memory_size: u32,
  pub timeout: u32,
  pub role_arn: String,
  pub environment: BTreeMap<String, String>,
  pub tracing: TracingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TracingMode {
  Active,
  PassThrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogGroupAttributes {
  pub function: String,
  pub retention_days: u32,
  pub removal_policy: RemovalPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAttributes {
  pub bucket: String,
  pub targets: Vec<TriggerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestApiAttributes {
  pub endpoint_type: String,
  /// Deferred id of the API's implicit `/` resource.
  pub root_resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResourceAttributes {
  pub path: String,
  pub path_part: String,
  /// `None` when the parent is the API root.
  pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Integration {
  /// Proxy to a function.
  Lambda { function: String, function_arn: String },
  /// Synthesized CORS preflight answered by the gateway itself.
  Preflight {
    allowed_methods: Vec<HttpMethod>,
    allowed_origins: Vec<String>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiMethodAttributes {
  pub http_method: HttpMethod,
  pub path: String,
  pub integration: Integration,
  pub required_parameters: Vec<String>,
  pub validate_body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentAttributes {
  pub stage_name: String,
  pub throttle: ThrottleLimits,
  pub cache: CacheSettings,
  pub logging_level: LogLevel,
  pub tracing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessIdentityAttributes {
  pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionAttributes {
  pub origin_bucket: String,
  pub origin_domain: String,
  pub origin_access_identity: String,
  pub price_class: PriceClass,
  pub default_ttl: u32,
  pub default_root_object: String,
  pub viewer_protocol_policy: String,
}

// =============================================================================
// Errors
// =============================================================================

/// A builder-internal invariant was violated. These indicate defects, not
/// user errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("node {node} belongs to the {actual} stage but the graph is in the {expected} stage")]
  WrongStage { node: NodeId, expected: Stage, actual: Stage },

  #[error("cannot advance from the {current} stage to the {requested} stage")]
  StageOutOfOrder { current: Stage, requested: Stage },

  #[error("node {node} references {dependency}, which is not in the graph")]
  DanglingReference { node: NodeId, dependency: NodeId },

  #[error("node {0} already exists")]
  DuplicateNode(NodeId),

  #[error("cannot remove {node}: still referenced by {}", format_ids(.dependents))]
  LiveReferences { node: NodeId, dependents: Vec<NodeId> },

  #[error("node {0} not found")]
  NodeNotFound(NodeId),

  #[error("node {node} is a {actual}, expected a {expected}")]
  KindMismatch {
    node: NodeId,
    expected: ResourceKind,
    actual: ResourceKind,
  },

  #[error("cycle detected in resource graph")]
  CycleDetected,
}

fn format_ids(ids: &[NodeId]) -> String {
  ids.iter().map(NodeId::as_str).collect::<Vec<_>>().join(", ")
}

/// Errors that abort graph construction.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Naming(#[from] NamingError),

  #[error(transparent)]
  Integrity(#[from] GraphError),

  #[error("invalid endpoint path: {0}")]
  InvalidPath(String),

  #[error("function '{function}' has no role of kind '{role}'")]
  MissingRole { function: String, role: RoleKind },

  #[error("{node}: {source}")]
  Unresolved {
    node: NodeId,
    #[source]
    source: PlaceholderError,
  },
}
