//! Stage-by-stage construction of a [`ResourceGraph`] from a validated stack.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::config::{
  Effect, EnvironmentProfile, FunctionSpec, RemovalPolicy, RoleKind, StackConfig, StorageKind, StorageSpec,
  TriggerSpec, TrustedService, ValidatedStack,
};
use crate::naming::{BuildContext, ResourceKind};
use crate::placeholder::{self, ContextKey, Placeholder, PlaceholderError, RefAttr, Resolver};

use super::gateway;
use super::types::*;
use super::ResourceGraph;

/// Physical name and ARN of a record, computed before any node exists.
#[derive(Debug, Clone)]
pub(super) struct Named {
  pub(super) physical: String,
  pub(super) arn: String,
}

/// A bucket event trigger waiting for its function node.
struct PendingTrigger<'s> {
  bucket: &'s str,
  spec: &'s TriggerSpec,
}

pub(super) struct Builder<'s> {
  pub(super) config: &'s StackConfig,
  pub(super) profile: &'s EnvironmentProfile,
  pub(super) ctx: &'s BuildContext,
  pub(super) graph: ResourceGraph,
  storage: BTreeMap<&'s str, Named>,
  functions: BTreeMap<&'s str, Named>,
  pending: Vec<PendingTrigger<'s>>,
}

/// Build the complete resource graph for a validated stack.
///
/// # Errors
///
/// Returns a [`BuildError`] on the first naming failure or integrity
/// violation. No partially built graph is returned.
pub fn build(stack: &ValidatedStack<'_>) -> Result<ResourceGraph, BuildError> {
  let mut builder = Builder::new(stack)?;

  builder.roles()?;
  builder.finish_stage(Stage::Storage)?;
  builder.storage()?;
  builder.finish_stage(Stage::Compute)?;
  builder.compute()?;
  builder.finish_stage(Stage::Gateway)?;
  gateway::build_gateway(&mut builder)?;
  builder.finish_stage(Stage::Edge)?;
  builder.edge()?;

  let graph = builder.graph;
  graph.verify_acyclic()?;
  info!(nodes = graph.len(), "resource graph complete");
  Ok(graph)
}

impl<'s> Builder<'s> {
  fn new(stack: &'s ValidatedStack<'_>) -> Result<Self, BuildError> {
    let config: &'s StackConfig = stack.config();
    let profile = stack.profile();
    let ctx = stack.context();

    let mut storage = BTreeMap::new();
    for spec in &config.storage {
      let named = match &spec.kind {
        StorageKind::Bucket(_) => {
          let physical = ctx.physical_name(ResourceKind::Bucket, &spec.name)?;
          let arn = ctx.bucket_arn(&physical);
          Named { physical, arn }
        }
        StorageKind::Table(_) => {
          let physical = ctx.physical_name(ResourceKind::Table, &spec.name)?;
          let arn = ctx.table_arn(&physical);
          Named { physical, arn }
        }
      };
      storage.insert(spec.name.as_str(), named);
    }

    let mut functions = BTreeMap::new();
    for spec in &config.functions {
      let physical = ctx.physical_name(ResourceKind::Function, &spec.name)?;
      let arn = ctx.function_arn(&physical);
      functions.insert(spec.name.as_str(), Named { physical, arn });
    }

    Ok(Self {
      config,
      profile,
      ctx,
      graph: ResourceGraph::new(),
      storage,
      functions,
      pending: Vec::new(),
    })
  }

  pub(super) fn finish_stage(&mut self, next: Stage) -> Result<(), GraphError> {
    let current = self.graph.stage();
    info!(
      stage = %current,
      nodes = self.graph.stage_nodes(current).count(),
      "stage complete"
    );
    self.graph.advance(next)
  }

  /// A node for the current stage carrying the generated tags when the kind is taggable.
  pub(super) fn node(
    &self,
    id: NodeId,
    kind: ResourceKind,
    physical_name: String,
    attributes: Attributes,
    depends_on: BTreeSet<NodeId>,
  ) -> ResourceNode {
    let tags = if kind.is_taggable() { self.ctx.tags() } else { BTreeMap::new() };
    ResourceNode {
      id,
      kind,
      stage: self.graph.stage(),
      physical_name,
      tags,
      attributes,
      depends_on,
    }
  }

  pub(super) fn function_named(&self, name: &str) -> Result<&Named, BuildError> {
    self.functions.get(name).ok_or_else(|| BuildError::Unresolved {
      node: NodeId::function(name),
      source: PlaceholderError::UnresolvedFunction(name.to_string()),
    })
  }

  fn substitute(&self, node: &NodeId, value: &str) -> Result<String, BuildError> {
    placeholder::substitute(value, self).map_err(|source| BuildError::Unresolved {
      node: node.clone(),
      source,
    })
  }

  // ===========================================================================
  // Roles
  // ===========================================================================

  fn roles(&mut self) -> Result<(), BuildError> {
    let config = self.config;
    for spec in &config.roles {
      let id = NodeId::role(&spec.name);
      let physical = self.ctx.physical_name(ResourceKind::Role, &spec.name)?;

      let mut statements = Vec::with_capacity(spec.statements.len() + 1);
      for statement in &spec.statements {
        let resources = statement
          .resources
          .iter()
          .map(|r| self.substitute(&id, r))
          .collect::<Result<Vec<_>, _>>()?;
        statements.push(ResolvedStatement {
          effect: statement.effect,
          actions: statement.actions.clone(),
          resources,
        });
      }

      if spec.trust == TrustedService::Lambda {
        statements.push(ResolvedStatement {
          effect: Effect::Allow,
          actions: vec![
            "logs:CreateLogStream".to_string(),
            "logs:PutLogEvents".to_string(),
          ],
          resources: vec![format!("{}:*", self.ctx.log_groups_arn_pattern())],
        });
      }

      let attributes = Attributes::Role(RoleAttributes {
        role_kind: spec.kind,
        arn: self.ctx.role_arn(&physical),
        trusted_principal: spec.trust.principal().to_string(),
        statements,
      });
      let node = self.node(id, ResourceKind::Role, physical, attributes, BTreeSet::new());
      self.graph.insert(node)?;
    }
    Ok(())
  }

  // ===========================================================================
  // Storage
  // ===========================================================================

  fn storage(&mut self) -> Result<(), BuildError> {
    let (config, profile) = (self.config, self.profile);
    for spec in &config.storage {
      let id = NodeId::storage(&spec.name);
      let named = self.storage_named(spec)?.clone();

      let (kind, attributes) = match &spec.kind {
        StorageKind::Bucket(bucket) => {
          for trigger in &bucket.triggers {
            self.pending.push(PendingTrigger {
              bucket: &spec.name,
              spec: trigger,
            });
          }
          let attributes = BucketAttributes {
            arn: named.arn.clone(),
            encryption: "S3_MANAGED".to_string(),
            block_public_access: !bucket.public,
            cors: bucket.cors.clone(),
            lifecycle: bucket.lifecycle.then_some(profile.lifecycle),
            triggers: Vec::new(),
            removal_policy: profile.removal_policy,
          };
          (ResourceKind::Bucket, Attributes::Bucket(attributes))
        }
        StorageKind::Table(table) => {
          let attributes = TableAttributes {
            arn: named.arn.clone(),
            partition_key: table.partition_key.clone(),
            sort_key: table.sort_key.clone(),
            billing_mode: profile.billing_mode,
            encrypted: spec.encrypted,
            point_in_time_recovery: profile.removal_policy == RemovalPolicy::Retain,
            removal_policy: profile.removal_policy,
          };
          (ResourceKind::Table, Attributes::Table(attributes))
        }
      };

      let node = self.node(id.clone(), kind, named.physical.clone(), attributes, BTreeSet::new());
      self.graph.insert(node)?;

      if spec.as_bucket().is_some_and(|b| b.public) {
        self.public_read_policy(&spec.name, &id, &named)?;
      }
    }
    Ok(())
  }

  fn storage_named(&self, spec: &StorageSpec) -> Result<&Named, BuildError> {
    self.storage.get(spec.name.as_str()).ok_or_else(|| BuildError::Unresolved {
      node: NodeId::storage(&spec.name),
      source: PlaceholderError::UnresolvedStorage(spec.name.clone()),
    })
  }

  /// Initial policy of the public bucket: anyone may read. Replaced in the edge stage.
  fn public_read_policy(&mut self, name: &str, bucket: &NodeId, named: &Named) -> Result<(), BuildError> {
    let id = NodeId::policy(name);
    let physical = self.ctx.physical_name(ResourceKind::BucketPolicy, &format!("{}-policy", name))?;
    let attributes = Attributes::BucketPolicy(PolicyAttributes {
      bucket: named.physical.clone(),
      statements: vec![PolicyStatement {
        sid: "PublicRead".to_string(),
        effect: Effect::Allow,
        principal: Principal::Anyone,
        actions: vec!["s3:GetObject".to_string()],
        resources: vec![format!("{}/*", named.arn)],
      }],
    });
    let node = self.node(
      id,
      ResourceKind::BucketPolicy,
      physical,
      attributes,
      BTreeSet::from([bucket.clone()]),
    );
    self.graph.insert(node)?;
    Ok(())
  }

  // ===========================================================================
  // Compute
  // ===========================================================================

  fn compute(&mut self) -> Result<(), BuildError> {
    let config = self.config;
    for spec in &config.functions {
      let function = self.function_node(spec)?;
      let function_id = function.id.clone();
      let function_name = function.physical_name.clone();
      self.graph.insert(function)?;

      let log_physical = self.ctx.physical_name(ResourceKind::LogGroup, &spec.name)?;
      let attributes = Attributes::LogGroup(LogGroupAttributes {
        function: function_name,
        retention_days: self.profile.log_retention_days,
        removal_policy: self.profile.removal_policy,
      });
      let log = self.node(
        NodeId::log_group(&spec.name),
        ResourceKind::LogGroup,
        log_physical,
        attributes,
        BTreeSet::from([function_id]),
      );
      self.graph.insert(log)?;
    }

    self.resolve_triggers()
  }

  /// The single construction function for compute nodes.
  fn function_node(&self, spec: &FunctionSpec) -> Result<ResourceNode, BuildError> {
    let id = NodeId::function(&spec.name);
    let named = self.function_named(&spec.name)?;

    let role_spec = self.config.role_for(spec.role).ok_or_else(|| BuildError::MissingRole {
      function: spec.name.clone(),
      role: spec.role,
    })?;
    let role_id = NodeId::role(&role_spec.name);
    let role = self.graph.expect_kind(&role_id, ResourceKind::Role)?;
    let role_arn = self.ctx.role_arn(&role.physical_name);

    let mut depends_on = BTreeSet::from([role_id]);
    let mut environment = BTreeMap::new();
    environment.insert("LOG_LEVEL".to_string(), self.profile.log_level.as_str().to_string());
    if spec.role == RoleKind::Transcribe {
      environment.insert(
        "TRANSCRIBE_LANGUAGE".to_string(),
        self.profile.transcribe_language.clone(),
      );
    }
    for (key, value) in &spec.environment {
      let references = placeholder::references(value).map_err(|source| BuildError::Unresolved {
        node: id.clone(),
        source,
      })?;
      for reference in references {
        if let Placeholder::Storage { name, .. } = reference {
          depends_on.insert(NodeId::storage(&name));
        }
      }
      environment.insert(key.clone(), self.substitute(&id, value)?);
    }

    let attributes = Attributes::Function(FunctionAttributes {
      arn: named.arn.clone(),
      handler: spec.handler.clone(),
      code: spec.code.clone(),
      runtime: spec.runtime.clone(),
      memory_size: spec.memory_mb,
      timeout: spec.timeout_secs,
      role_arn,
      environment,
      tracing: if self.profile.tracing {
        TracingMode::Active
      } else {
        TracingMode::PassThrough
      },
    });

    Ok(self.node(id, ResourceKind::Function, named.physical.clone(), attributes, depends_on))
  }

  /// Wire the triggers registered during the storage stage to their functions.
  ///
  /// Each bucket's `triggers` attribute is filled in with the functions'
  /// physical names, and one notification node per bucket carries the
  /// references the bucket itself cannot hold.
  fn resolve_triggers(&mut self) -> Result<(), BuildError> {
    let mut buckets: Vec<(&str, Vec<TriggerEntry>, BTreeSet<NodeId>)> = Vec::new();
    for pending in std::mem::take(&mut self.pending) {
      let function = self.function_named(&pending.spec.function)?;
      let entry = TriggerEntry {
        function: function.physical.clone(),
        function_arn: function.arn.clone(),
        events: pending.spec.events.clone(),
        prefix: pending.spec.prefix.clone(),
        suffix: pending.spec.suffix.clone(),
      };
      let function_id = NodeId::function(&pending.spec.function);

      match buckets.iter_mut().find(|(bucket, _, _)| *bucket == pending.bucket) {
        Some((_, targets, functions)) => {
          targets.push(entry);
          functions.insert(function_id);
        }
        None => buckets.push((pending.bucket, vec![entry], BTreeSet::from([function_id]))),
      }
    }

    for (bucket, targets, functions) in buckets {
      let bucket_id = NodeId::storage(bucket);
      let bucket_physical = self.graph.expect_kind(&bucket_id, ResourceKind::Bucket)?.physical_name.clone();

      let patched = targets.clone();
      self.graph.patch(&bucket_id, |attributes| {
        if let Attributes::Bucket(b) = attributes {
          b.triggers = patched;
        }
      })?;

      let mut depends_on = functions;
      depends_on.insert(bucket_id);
      let physical = self
        .ctx
        .physical_name(ResourceKind::BucketNotification, &format!("{}-notification", bucket))?;
      let attributes = Attributes::Notification(NotificationAttributes {
        bucket: bucket_physical,
        targets,
      });
      let node = self.node(
        NodeId::notification(bucket),
        ResourceKind::BucketNotification,
        physical,
        attributes,
        depends_on,
      );
      self.graph.insert(node)?;
    }
    Ok(())
  }

  // ===========================================================================
  // Edge
  // ===========================================================================

  fn edge(&mut self) -> Result<(), BuildError> {
    let config = self.config;
    let Some(public) = config.storage.iter().find(|s| s.as_bucket().is_some_and(|b| b.public)) else {
      warn!(stage = %Stage::Edge, "no public bucket declared, skipping edge distribution");
      return Ok(());
    };

    let bucket_id = NodeId::storage(&public.name);
    let named = self.storage_named(public)?.clone();

    let identity_id = NodeId::access_identity();
    let identity_physical = self.ctx.physical_name(ResourceKind::AccessIdentity, "oai")?;
    let identity = self.node(
      identity_id.clone(),
      ResourceKind::AccessIdentity,
      identity_physical,
      Attributes::AccessIdentity(AccessIdentityAttributes {
        comment: format!("access identity for {}", named.physical),
      }),
      BTreeSet::new(),
    );
    self.graph.insert(identity)?;

    // Replace the public-read policy with one trusting only the identity.
    let policy_id = NodeId::policy(&public.name);
    let previous = self.graph.remove(&policy_id)?;
    let attributes = Attributes::BucketPolicy(PolicyAttributes {
      bucket: named.physical.clone(),
      statements: vec![PolicyStatement {
        sid: "AccessIdentityRead".to_string(),
        effect: Effect::Allow,
        principal: Principal::AccessIdentity {
          canonical_user: placeholder::reference(identity_id.as_str(), "canonical_user_id"),
        },
        actions: vec!["s3:GetObject".to_string()],
        resources: vec![format!("{}/*", named.arn)],
      }],
    });
    let policy = self.node(
      policy_id.clone(),
      ResourceKind::BucketPolicy,
      previous.physical_name,
      attributes,
      BTreeSet::from([bucket_id.clone(), identity_id.clone()]),
    );
    self.graph.insert(policy)?;

    self.graph.patch(&bucket_id, |attributes| {
      if let Attributes::Bucket(b) = attributes {
        b.block_public_access = true;
      }
    })?;

    let distribution_physical = self.ctx.physical_name(ResourceKind::Distribution, "cdn")?;
    let cache = self.profile.cache;
    let attributes = Attributes::Distribution(DistributionAttributes {
      origin_bucket: named.physical.clone(),
      origin_domain: format!("{}.s3.{}.amazonaws.com", named.physical, self.ctx.scope.region),
      origin_access_identity: placeholder::reference(identity_id.as_str(), "id"),
      price_class: self.profile.price_class,
      default_ttl: if cache.enabled { cache.ttl_secs } else { 0 },
      default_root_object: "index.html".to_string(),
      viewer_protocol_policy: "redirect-to-https".to_string(),
    });
    let distribution = self.node(
      NodeId::distribution(),
      ResourceKind::Distribution,
      distribution_physical,
      attributes,
      BTreeSet::from([bucket_id, identity_id, policy_id]),
    );
    self.graph.insert(distribution)?;

    info!(stage = %Stage::Edge, nodes = self.graph.stage_nodes(Stage::Edge).count(), "stage complete");
    Ok(())
  }
}

impl Resolver for Builder<'_> {
  fn resolve_storage(&self, name: &str, attr: RefAttr) -> Result<String, PlaceholderError> {
    let named = self
      .storage
      .get(name)
      .ok_or_else(|| PlaceholderError::UnresolvedStorage(name.to_string()))?;
    Ok(match attr {
      RefAttr::Name => named.physical.clone(),
      RefAttr::Arn => named.arn.clone(),
    })
  }

  fn resolve_function(&self, name: &str, attr: RefAttr) -> Result<String, PlaceholderError> {
    let named = self
      .functions
      .get(name)
      .ok_or_else(|| PlaceholderError::UnresolvedFunction(name.to_string()))?;
    Ok(match attr {
      RefAttr::Name => named.physical.clone(),
      RefAttr::Arn => named.arn.clone(),
    })
  }

  fn resolve_context(&self, key: ContextKey) -> String {
    match key {
      ContextKey::Application => self.ctx.scope.application.clone(),
      ContextKey::Environment => self.ctx.environment.as_str().to_string(),
      ContextKey::Account => self.ctx.scope.account.clone(),
      ContextKey::Region => self.ctx.scope.region.clone(),
    }
  }
}
