//! Configuration validation.
//!
//! [`validate`] selects the environment profile and runs three passes over
//! the stack, in order, stopping at the first failure:
//!
//! 1. structural: required fields, numeric bounds, path and identifier syntax
//! 2. referential: role kinds, endpoint targets, trigger functions and
//!    placeholder references all resolve
//! 3. uniqueness: names, routes, role kinds, output keys, public buckets
//!
//! Only a [`ValidatedStack`] can be handed to the graph builder, so no node is
//! ever constructed from an unchecked configuration.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::consts::{FUNCTION_MEMORY_MB, FUNCTION_TIMEOUT_SECS, LOG_RETENTION_DAYS, MAX_CACHE_TTL_SECS};
use crate::naming::{BuildContext, DeploymentScope};
use crate::placeholder::{self, Placeholder, PlaceholderError};

use super::profile::{BillingMode, EnvironmentName, EnvironmentProfile};
use super::route::{PathSegment, join_path, parse_path};
use super::types::{Effect, HttpMethod, OutputKey, RoleKind, StackConfig, StorageKind};

/// The record family a validation error points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
  Stack,
  Profile,
  Role,
  Storage,
  Function,
  Endpoint,
}

impl fmt::Display for RecordKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      RecordKind::Stack => "stack",
      RecordKind::Profile => "profile",
      RecordKind::Role => "role",
      RecordKind::Storage => "storage",
      RecordKind::Function => "function",
      RecordKind::Endpoint => "endpoint",
    })
  }
}

/// Identifies the offending record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
  pub kind: RecordKind,
  pub name: String,
}

impl RecordRef {
  fn new(kind: RecordKind, name: &str) -> Self {
    Self {
      kind,
      name: name.to_string(),
    }
  }
}

impl fmt::Display for RecordRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} '{}'", self.kind, self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("unknown environment '{name}' (expected one of: dev, staging, prod)")]
  UnknownEnvironment { name: String },

  #[error("{record}: field '{field}' is required")]
  MissingField { record: RecordRef, field: &'static str },

  #[error("{record}: {field} = {value} is outside {min}..={max}")]
  OutOfBounds {
    record: RecordRef,
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
  },

  #[error("{record}: invalid {field}: {reason}")]
  InvalidValue {
    record: RecordRef,
    field: &'static str,
    reason: String,
  },

  #[error("{record}: storage must be encrypted")]
  Unencrypted { record: RecordRef },

  #[error("{record}: statement {index} allows '{action}' on '*' without the global flag")]
  OverPrivileged {
    record: RecordRef,
    index: usize,
    action: String,
  },

  #[error("{record}: invalid placeholder in {field}: {source}")]
  Placeholder {
    record: RecordRef,
    field: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("{record}: role kind '{role}' is not declared by any role")]
  UnknownRole { record: RecordRef, role: RoleKind },

  #[error("{record}: function '{target}' is not declared")]
  UnknownFunction { record: RecordRef, target: String },

  #[error("{record}: storage '{storage}' is not declared")]
  UnknownStorage { record: RecordRef, storage: String },

  #[error("duplicate {kind} name '{name}'")]
  DuplicateName { kind: RecordKind, name: String },

  #[error("roles '{first}' and '{second}' both declare kind '{kind}'")]
  DuplicateRoleKind {
    kind: RoleKind,
    first: String,
    second: String,
  },

  #[error("endpoints '{first}' and '{second}' both route {method} {path}")]
  DuplicateRoute {
    path: String,
    method: HttpMethod,
    first: String,
    second: String,
  },

  #[error("path parameters '{{{first}}}' and '{{{second}}}' conflict under '{parent}'")]
  ConflictingPathParameter {
    parent: String,
    first: String,
    second: String,
  },

  #[error("output {key} is published by both '{first}' and '{second}'")]
  DuplicateOutput {
    key: OutputKey,
    first: String,
    second: String,
  },

  #[error("buckets '{first}' and '{second}' are both marked public")]
  MultiplePublicBuckets { first: String, second: String },
}

/// A stack that passed every validation pass for one environment.
#[derive(Debug, Clone)]
pub struct ValidatedStack<'a> {
  config: &'a StackConfig,
  profile: EnvironmentProfile,
  context: BuildContext,
}

impl<'a> ValidatedStack<'a> {
  pub fn config(&self) -> &'a StackConfig {
    self.config
  }

  pub fn profile(&self) -> &EnvironmentProfile {
    &self.profile
  }

  pub fn context(&self) -> &BuildContext {
    &self.context
  }
}

/// Select the profile for `environment` and validate the stack against it.
///
/// `language` overrides the profile's transcription language.
pub fn validate<'a>(
  config: &'a StackConfig,
  environment: &str,
  language: Option<&str>,
) -> Result<ValidatedStack<'a>, ValidationError> {
  let name: EnvironmentName = environment.parse()?;

  let mut profile = EnvironmentProfile::preset(name);
  if let Some(overrides) = config.profiles.get(&name) {
    profile = profile.with_overrides(overrides);
  }
  if let Some(language) = language {
    profile = profile.with_language(language);
  }

  check_structure(config, &profile)?;
  debug!("structural pass complete");
  check_references(config)?;
  debug!("referential pass complete");
  check_uniqueness(config)?;
  debug!("uniqueness pass complete");

  let scope = DeploymentScope {
    application: config.application.clone(),
    account: config.account.clone(),
    region: config.region.clone(),
  };
  let context = BuildContext::new(scope, name).with_tag_overrides(config.tags.clone());

  Ok(ValidatedStack {
    config,
    profile,
    context,
  })
}

// =============================================================================
// Pass 1: structure
// =============================================================================

fn require(record: &RecordRef, field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::MissingField {
      record: record.clone(),
      field,
    });
  }
  Ok(())
}

fn bounded(record: &RecordRef, field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), ValidationError> {
  if value < min || value > max {
    return Err(ValidationError::OutOfBounds {
      record: record.clone(),
      field,
      value: value.into(),
      min: min.into(),
      max: max.into(),
    });
  }
  Ok(())
}

fn invalid(record: &RecordRef, field: &'static str, reason: impl Into<String>) -> ValidationError {
  ValidationError::InvalidValue {
    record: record.clone(),
    field,
    reason: reason.into(),
  }
}

/// Logical names become part of physical names, so keep them to `[A-Za-z0-9_-]`.
fn identifier(record: &RecordRef, field: &'static str, value: &str) -> Result<(), ValidationError> {
  require(record, field, value)?;
  if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
    return Err(invalid(record, field, format!("'{}' may only contain letters, digits, '-' and '_'", value)));
  }
  Ok(())
}

fn placeholders(record: &RecordRef, field: &str, value: &str) -> Result<Vec<Placeholder>, ValidationError> {
  placeholder::references(value).map_err(|source| ValidationError::Placeholder {
    record: record.clone(),
    field: field.to_string(),
    source,
  })
}

fn check_structure(config: &StackConfig, profile: &EnvironmentProfile) -> Result<(), ValidationError> {
  let stack = RecordRef::new(RecordKind::Stack, &config.application);
  require(&stack, "application", &config.application)?;
  let app_ok = config.application.starts_with(|c: char| c.is_ascii_lowercase())
    && config
      .application
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
  if !app_ok || config.application.len() > 24 {
    return Err(invalid(
      &stack,
      "application",
      "must be 1-24 lowercase letters, digits or '-', starting with a letter",
    ));
  }
  if config.account.len() != 12 || !config.account.chars().all(|c| c.is_ascii_digit()) {
    return Err(invalid(&stack, "account", format!("'{}' is not a 12-digit account id", config.account)));
  }
  require(&stack, "region", &config.region)?;
  if !config
    .region
    .chars()
    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
  {
    return Err(invalid(&stack, "region", format!("'{}' is not a region name", config.region)));
  }

  check_profile(profile)?;

  for role in &config.roles {
    let record = RecordRef::new(RecordKind::Role, &role.name);
    identifier(&record, "name", &role.name)?;
    for (index, statement) in role.statements.iter().enumerate() {
      if statement.actions.is_empty() {
        return Err(ValidationError::MissingField { record, field: "actions" });
      }
      if statement.resources.is_empty() {
        return Err(ValidationError::MissingField {
          record,
          field: "resources",
        });
      }
      for action in &statement.actions {
        let well_formed = action
          .split_once(':')
          .is_some_and(|(service, op)| !service.is_empty() && !op.is_empty());
        if !well_formed {
          return Err(invalid(&record, "actions", format!("'{}' is not of the form service:Action", action)));
        }
      }
      for resource in &statement.resources {
        placeholders(&record, &format!("statements[{}].resources", index), resource)?;
      }
      let wildcard = statement.resources.iter().any(|r| grants_every_resource(r));
      if wildcard && statement.effect == Effect::Allow && !statement.global {
        return Err(ValidationError::OverPrivileged {
          record,
          index,
          action: statement.actions[0].clone(),
        });
      }
    }
  }

  for storage in &config.storage {
    let record = RecordRef::new(RecordKind::Storage, &storage.name);
    identifier(&record, "name", &storage.name)?;
    if !storage.encrypted {
      return Err(ValidationError::Unencrypted { record });
    }
    match &storage.kind {
      StorageKind::Bucket(bucket) => {
        if let Some(key) = storage.output
          && !key.is_bucket_key()
        {
          return Err(invalid(&record, "output", format!("{} cannot name a bucket", key)));
        }
        for rule in &bucket.cors {
          if rule.allowed_methods.is_empty() {
            return Err(ValidationError::MissingField {
              record,
              field: "cors.allowed_methods",
            });
          }
          if rule.allowed_origins.is_empty() {
            return Err(ValidationError::MissingField {
              record,
              field: "cors.allowed_origins",
            });
          }
        }
        for trigger in &bucket.triggers {
          require(&record, "triggers.function", &trigger.function)?;
          if trigger.events.is_empty() {
            return Err(ValidationError::MissingField {
              record,
              field: "triggers.events",
            });
          }
          if let Some(event) = trigger.events.iter().find(|e| !e.starts_with("s3:")) {
            return Err(invalid(&record, "triggers.events", format!("'{}' is not an object event", event)));
          }
        }
      }
      StorageKind::Table(table) => {
        if let Some(key) = storage.output
          && !key.is_table_key()
        {
          return Err(invalid(&record, "output", format!("{} cannot name a table", key)));
        }
        require(&record, "partition_key.name", &table.partition_key.name)?;
        if let Some(ref sort) = table.sort_key {
          require(&record, "sort_key.name", &sort.name)?;
          if sort.name == table.partition_key.name {
            return Err(invalid(&record, "sort_key", "sort key must differ from the partition key"));
          }
        }
      }
    }
  }

  for function in &config.functions {
    let record = RecordRef::new(RecordKind::Function, &function.name);
    identifier(&record, "name", &function.name)?;
    require(&record, "handler", &function.handler)?;
    require(&record, "runtime", &function.runtime)?;
    bounded(&record, "memory_mb", function.memory_mb, FUNCTION_MEMORY_MB)?;
    bounded(&record, "timeout_secs", function.timeout_secs, FUNCTION_TIMEOUT_SECS)?;
    for (key, value) in &function.environment {
      let valid_key = key.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
      if !valid_key {
        return Err(invalid(&record, "environment", format!("'{}' is not a valid variable name", key)));
      }
      placeholders(&record, &format!("environment.{}", key), value)?;
    }
  }

  for endpoint in &config.endpoints {
    let record = RecordRef::new(RecordKind::Endpoint, &endpoint.name);
    identifier(&record, "name", &endpoint.name)?;
    require(&record, "target", &endpoint.target)?;
    parse_path(&endpoint.path).map_err(|reason| invalid(&record, "path", reason))?;
    if endpoint.method == HttpMethod::Options {
      return Err(invalid(&record, "method", "OPTIONS is synthesized for every resource"));
    }
  }

  Ok(())
}

fn check_profile(profile: &EnvironmentProfile) -> Result<(), ValidationError> {
  let record = RecordRef::new(RecordKind::Profile, profile.name.as_str());
  require(&record, "transcribe_language", &profile.transcribe_language)?;
  if !LOG_RETENTION_DAYS.contains(&profile.log_retention_days) {
    return Err(invalid(
      &record,
      "log_retention_days",
      format!("{} is not a supported retention period", profile.log_retention_days),
    ));
  }
  if profile.throttle.rate_limit == 0 || profile.throttle.burst_limit == 0 {
    return Err(invalid(&record, "throttle", "limits must be positive"));
  }
  if profile.throttle.burst_limit < profile.throttle.rate_limit {
    return Err(invalid(&record, "throttle", "burst limit must be at least the rate limit"));
  }
  bounded(&record, "cache.ttl_secs", profile.cache.ttl_secs, (0, MAX_CACHE_TTL_SECS))?;
  if profile.lifecycle.transition_days == 0 || profile.lifecycle.expiration_days <= profile.lifecycle.transition_days {
    return Err(invalid(
      &record,
      "lifecycle",
      "expiration must come after a non-zero transition",
    ));
  }
  if let BillingMode::Provisioned {
    read_capacity,
    write_capacity,
  } = profile.billing_mode
    && (read_capacity == 0 || write_capacity == 0)
  {
    return Err(invalid(&record, "billing_mode", "provisioned capacity must be positive"));
  }
  Ok(())
}

// =============================================================================
// Pass 2: references
// =============================================================================

fn check_placeholder_targets(
  config: &StackConfig,
  record: &RecordRef,
  field: &str,
  value: &str,
) -> Result<(), ValidationError> {
  for reference in placeholders(record, field, value)? {
    match reference {
      Placeholder::Storage { name, .. } if config.storage(&name).is_none() => {
        return Err(ValidationError::UnknownStorage {
          record: record.clone(),
          storage: name,
        });
      }
      Placeholder::Function { name, .. } if config.function(&name).is_none() => {
        return Err(ValidationError::UnknownFunction {
          record: record.clone(),
          target: name,
        });
      }
      _ => {}
    }
  }
  Ok(())
}

fn check_references(config: &StackConfig) -> Result<(), ValidationError> {
  for role in &config.roles {
    let record = RecordRef::new(RecordKind::Role, &role.name);
    for (index, statement) in role.statements.iter().enumerate() {
      for resource in &statement.resources {
        check_placeholder_targets(config, &record, &format!("statements[{}].resources", index), resource)?;
      }
    }
  }

  for storage in &config.storage {
    let record = RecordRef::new(RecordKind::Storage, &storage.name);
    if let Some(bucket) = storage.as_bucket() {
      for trigger in &bucket.triggers {
        if config.function(&trigger.function).is_none() {
          return Err(ValidationError::UnknownFunction {
            record,
            target: trigger.function.clone(),
          });
        }
      }
    }
  }

  for function in &config.functions {
    let record = RecordRef::new(RecordKind::Function, &function.name);
    if config.role_for(function.role).is_none() {
      return Err(ValidationError::UnknownRole {
        record,
        role: function.role,
      });
    }
    for (key, value) in &function.environment {
      check_placeholder_targets(config, &record, &format!("environment.{}", key), value)?;
    }
  }

  for endpoint in &config.endpoints {
    if config.function(&endpoint.target).is_none() {
      return Err(ValidationError::UnknownFunction {
        record: RecordRef::new(RecordKind::Endpoint, &endpoint.name),
        target: endpoint.target.clone(),
      });
    }
  }

  Ok(())
}

// =============================================================================
// Pass 3: uniqueness
// =============================================================================

fn unique_names<'a>(kind: RecordKind, names: impl Iterator<Item = &'a str>) -> Result<(), ValidationError> {
  let mut seen = HashSet::new();
  for name in names {
    if !seen.insert(name) {
      return Err(ValidationError::DuplicateName {
        kind,
        name: name.to_string(),
      });
    }
  }
  Ok(())
}

fn check_uniqueness(config: &StackConfig) -> Result<(), ValidationError> {
  unique_names(RecordKind::Role, config.roles.iter().map(|r| r.name.as_str()))?;
  unique_names(RecordKind::Storage, config.storage.iter().map(|s| s.name.as_str()))?;
  unique_names(RecordKind::Function, config.functions.iter().map(|f| f.name.as_str()))?;
  unique_names(RecordKind::Endpoint, config.endpoints.iter().map(|e| e.name.as_str()))?;

  let mut role_kinds: HashMap<RoleKind, &str> = HashMap::new();
  for role in &config.roles {
    if let Some(first) = role_kinds.insert(role.kind, &role.name) {
      return Err(ValidationError::DuplicateRoleKind {
        kind: role.kind,
        first: first.to_string(),
        second: role.name.clone(),
      });
    }
  }

  let mut outputs: HashMap<OutputKey, &str> = HashMap::new();
  let mut public: Option<&str> = None;
  for storage in &config.storage {
    if let Some(key) = storage.output
      && let Some(first) = outputs.insert(key, &storage.name)
    {
      return Err(ValidationError::DuplicateOutput {
        key,
        first: first.to_string(),
        second: storage.name.clone(),
      });
    }
    if storage.as_bucket().is_some_and(|b| b.public) {
      if let Some(first) = public {
        return Err(ValidationError::MultiplePublicBuckets {
          first: first.to_string(),
          second: storage.name.clone(),
        });
      }
      public = Some(&storage.name);
    }
  }

  // Routes are compared on their parsed form so `/a/{id}` is one path however it is spelled.
  let mut routes: HashMap<(String, HttpMethod), &str> = HashMap::new();
  // Parent path -> first parameter name seen directly beneath it.
  let mut parameters: BTreeMap<String, String> = BTreeMap::new();
  for endpoint in &config.endpoints {
    let segments = parse_path(&endpoint.path).map_err(|reason| {
      invalid(&RecordRef::new(RecordKind::Endpoint, &endpoint.name), "path", reason)
    })?;
    let path = join_path(&segments);

    if let Some(first) = routes.insert((path.clone(), endpoint.method), &endpoint.name) {
      return Err(ValidationError::DuplicateRoute {
        path,
        method: endpoint.method,
        first: first.to_string(),
        second: endpoint.name.clone(),
      });
    }

    for (depth, segment) in segments.iter().enumerate() {
      if let PathSegment::Parameter(name) = segment {
        let parent = join_path(&segments[..depth]);
        let parent = if parent.is_empty() { "/".to_string() } else { parent };
        match parameters.get(&parent) {
          Some(existing) if existing != name => {
            return Err(ValidationError::ConflictingPathParameter {
              parent,
              first: existing.clone(),
              second: name.clone(),
            });
          }
          Some(_) => {}
          None => {
            parameters.insert(parent, name.clone());
          }
        }
      }
    }
  }

  Ok(())
}

/// Whether a statement resource covers every resource of its service:
/// `*`, or an ARN whose resource part is all wildcards (`arn:aws:s3:::*`,
/// `arn:aws:dynamodb:*:*:table/*`).
fn grants_every_resource(resource: &str) -> bool {
  let resource = resource.trim();
  if resource == "*" {
    return true;
  }

  let mut parts = resource.splitn(6, ':');
  let (Some("arn"), Some(_), Some(service), Some(_), Some(_), Some(rest)) = (
    parts.next(),
    parts.next(),
    parts.next(),
    parts.next(),
    parts.next(),
    parts.next(),
  ) else {
    return false;
  };

  let mut names = rest.split(['/', ':']);
  // S3 names the bucket directly; other services lead with a resource type.
  if service != "s3" && rest.contains(['/', ':']) {
    names.next();
  }
  names.all(|name| name == "*")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{BucketSpec, StorageSpec, TriggerSpec};
  use crate::util::testutil::{bucket, endpoint, function, minimal_stack, role, table};

  fn expect_err(config: &StackConfig) -> ValidationError {
    validate(config, "dev", None).expect_err("validation should fail")
  }

  #[test]
  fn minimal_stack_is_valid() {
    let config = minimal_stack();
    let validated = validate(&config, "dev", None).unwrap();
    assert_eq!(validated.profile().name, EnvironmentName::Dev);
    assert_eq!(validated.context().prefix(), "vidscribe-dev");
  }

  #[test]
  fn unknown_environment_fails_first() {
    let mut config = minimal_stack();
    config.functions[0].memory_mb = 1;
    let err = validate(&config, "qa", None).unwrap_err();
    assert!(matches!(err, ValidationError::UnknownEnvironment { .. }));
  }

  #[test]
  fn language_override_wins_over_profile() {
    let config = minimal_stack();
    let validated = validate(&config, "prod", Some("fr-FR")).unwrap();
    assert_eq!(validated.profile().transcribe_language, "fr-FR");
  }

  #[test]
  fn memory_out_of_bounds() {
    let mut config = minimal_stack();
    config.functions[0].memory_mb = 64;
    match expect_err(&config) {
      ValidationError::OutOfBounds { record, field, value, .. } => {
        assert_eq!(record.name, "extractaudio");
        assert_eq!(field, "memory_mb");
        assert_eq!(value, 64);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn timeout_out_of_bounds() {
    let mut config = minimal_stack();
    config.functions[0].timeout_secs = 901;
    assert!(matches!(
      expect_err(&config),
      ValidationError::OutOfBounds {
        field: "timeout_secs",
        ..
      }
    ));
  }

  #[test]
  fn empty_handler_is_missing() {
    let mut config = minimal_stack();
    config.functions[0].handler = " ".to_string();
    assert!(matches!(
      expect_err(&config),
      ValidationError::MissingField { field: "handler", .. }
    ));
  }

  #[test]
  fn unencrypted_storage_is_rejected() {
    let mut config = minimal_stack();
    config.storage[0].encrypted = false;
    assert!(matches!(expect_err(&config), ValidationError::Unencrypted { .. }));
  }

  #[test]
  fn wildcard_requires_global_flag() {
    let mut config = minimal_stack();
    config.roles[0].statements[0].resources = vec!["*".to_string()];
    match expect_err(&config) {
      ValidationError::OverPrivileged { record, index, .. } => {
        assert_eq!(record.kind, RecordKind::Role);
        assert_eq!(index, 0);
      }
      other => panic!("unexpected error: {other}"),
    }

    config.roles[0].statements[0].global = true;
    assert!(validate(&config, "dev", None).is_ok());
  }

  #[test]
  fn wildcard_arn_requires_global_flag() {
    for resource in ["arn:aws:s3:::*", "arn:aws:dynamodb:*:*:table/*", " *", "arn:aws:logs:*:*:*"] {
      let mut config = minimal_stack();
      config.roles[0].statements[0].resources = vec![resource.to_string()];
      assert!(
        matches!(expect_err(&config), ValidationError::OverPrivileged { index: 0, .. }),
        "{resource} should need the global flag"
      );

      config.roles[0].statements[0].global = true;
      assert!(validate(&config, "dev", None).is_ok(), "{resource} with global flag");
    }
  }

  #[test]
  fn scoped_arns_are_not_wildcards() {
    assert!(!grants_every_resource("arn:aws:s3:::vidscribe-dev-video/*"));
    assert!(!grants_every_resource("arn:aws:dynamodb:us-east-1:123456789012:table/videos"));
    assert!(!grants_every_resource("arn:aws:logs:us-east-1:123456789012:log-group:/aws/lambda/x:*"));
    assert!(!grants_every_resource("$${storage:video:arn}/*"));
    assert!(grants_every_resource("arn:aws:s3:::*/*"));
  }

  #[test]
  fn unknown_role_kind() {
    let mut config = minimal_stack();
    config.functions[0].role = RoleKind::Transcribe;
    match expect_err(&config) {
      ValidationError::UnknownRole { record, role } => {
        assert_eq!(record.name, "extractaudio");
        assert_eq!(role, RoleKind::Transcribe);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn unknown_trigger_function() {
    let mut config = minimal_stack();
    config.storage[0].kind = StorageKind::Bucket(BucketSpec {
      triggers: vec![TriggerSpec {
        function: "missing".to_string(),
        events: vec!["s3:ObjectCreated:*".to_string()],
        prefix: None,
        suffix: None,
      }],
      ..Default::default()
    });
    assert!(matches!(
      expect_err(&config),
      ValidationError::UnknownFunction { ref target, .. } if target == "missing"
    ));
  }

  #[test]
  fn unknown_endpoint_target() {
    let mut config = minimal_stack();
    config.endpoints.push(endpoint("getVideo", "/video/{videoId}", HttpMethod::Get, "nope"));
    assert!(matches!(
      expect_err(&config),
      ValidationError::UnknownFunction { ref record, .. } if record.kind == RecordKind::Endpoint
    ));
  }

  #[test]
  fn unknown_storage_placeholder() {
    let mut config = minimal_stack();
    config.functions[0]
      .environment
      .insert("BUCKET".to_string(), "$${storage:audio}".to_string());
    assert!(matches!(
      expect_err(&config),
      ValidationError::UnknownStorage { ref storage, .. } if storage == "audio"
    ));
  }

  #[test]
  fn malformed_placeholder_is_structural() {
    let mut config = minimal_stack();
    config.functions[0]
      .environment
      .insert("BUCKET".to_string(), "$${storage:video".to_string());
    assert!(matches!(expect_err(&config), ValidationError::Placeholder { .. }));
  }

  #[test]
  fn duplicate_function_names() {
    let mut config = minimal_stack();
    config.functions.push(function("extractaudio", RoleKind::MediaConvert));
    assert!(matches!(
      expect_err(&config),
      ValidationError::DuplicateName {
        kind: RecordKind::Function,
        ..
      }
    ));
  }

  #[test]
  fn duplicate_role_kinds() {
    let mut config = minimal_stack();
    config.roles.push(role("media-convert-2", RoleKind::MediaConvert));
    assert!(matches!(expect_err(&config), ValidationError::DuplicateRoleKind { .. }));
  }

  #[test]
  fn duplicate_route() {
    let mut config = minimal_stack();
    config
      .endpoints
      .push(endpoint("listVideos", "/videos", HttpMethod::Get, "extractaudio"));
    config
      .endpoints
      .push(endpoint("listVideosAgain", "/videos", HttpMethod::Get, "extractaudio"));
    match expect_err(&config) {
      ValidationError::DuplicateRoute {
        path,
        method,
        first,
        second,
      } => {
        assert_eq!(path, "/videos");
        assert_eq!(method, HttpMethod::Get);
        assert_eq!(first, "listVideos");
        assert_eq!(second, "listVideosAgain");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn same_path_different_methods_is_fine() {
    let mut config = minimal_stack();
    config
      .endpoints
      .push(endpoint("listVideos", "/videos", HttpMethod::Get, "extractaudio"));
    config
      .endpoints
      .push(endpoint("createVideo", "/videos", HttpMethod::Post, "extractaudio"));
    assert!(validate(&config, "dev", None).is_ok());
  }

  #[test]
  fn conflicting_parameters_at_same_position() {
    let mut config = minimal_stack();
    config
      .endpoints
      .push(endpoint("getVideo", "/video/{videoId}", HttpMethod::Get, "extractaudio"));
    config
      .endpoints
      .push(endpoint("deleteVideo", "/video/{id}", HttpMethod::Delete, "extractaudio"));
    match expect_err(&config) {
      ValidationError::ConflictingPathParameter { parent, first, second } => {
        assert_eq!(parent, "/video");
        assert_eq!(first, "videoId");
        assert_eq!(second, "id");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn options_method_is_reserved() {
    let mut config = minimal_stack();
    config
      .endpoints
      .push(endpoint("preflight", "/videos", HttpMethod::Options, "extractaudio"));
    assert!(matches!(
      expect_err(&config),
      ValidationError::InvalidValue { field: "method", .. }
    ));
  }

  #[test]
  fn output_keys_must_match_storage_kind() {
    let mut config = minimal_stack();
    config.storage.push(StorageSpec {
      output: Some(OutputKey::VideoBucketName),
      ..table("videos", "id")
    });
    assert!(matches!(
      expect_err(&config),
      ValidationError::InvalidValue { field: "output", .. }
    ));
  }

  #[test]
  fn duplicate_output_keys() {
    let mut config = minimal_stack();
    config.storage.push(StorageSpec {
      output: Some(OutputKey::VideoBucketName),
      ..bucket("video2")
    });
    assert!(matches!(expect_err(&config), ValidationError::DuplicateOutput { .. }));
  }

  #[test]
  fn single_public_bucket() {
    let mut config = minimal_stack();
    for name in ["site", "assets"] {
      let mut spec = bucket(name);
      if let StorageKind::Bucket(ref mut b) = spec.kind {
        b.public = true;
      }
      config.storage.push(spec);
    }
    assert!(matches!(expect_err(&config), ValidationError::MultiplePublicBuckets { .. }));
  }

  #[test]
  fn bad_account_id() {
    let mut config = minimal_stack();
    config.account = "12345".to_string();
    assert!(matches!(
      expect_err(&config),
      ValidationError::InvalidValue { field: "account", .. }
    ));
  }

  #[test]
  fn unsupported_retention_from_overrides() {
    let mut config = minimal_stack();
    config.profiles.insert(
      EnvironmentName::Dev,
      crate::config::ProfileOverrides {
        log_retention_days: Some(4),
        ..Default::default()
      },
    );
    assert!(matches!(
      expect_err(&config),
      ValidationError::InvalidValue {
        field: "log_retention_days",
        ..
      }
    ));
  }

  #[test]
  fn error_messages_name_the_record() {
    let mut config = minimal_stack();
    config.functions[0].memory_mb = 20_000;
    let message = expect_err(&config).to_string();
    assert_eq!(message, "function 'extractaudio': memory_mb = 20000 is outside 128..=10240");
  }
}
