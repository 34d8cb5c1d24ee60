//! Naming Engine.
//!
//! Pure functions mapping a resource kind and logical name to the physical,
//! provider-facing identifier. Every physical name is
//!
//! ```text
//! {application}-{environment}-{logical}[-{account}][-{region}]
//! ```
//!
//! where the trailing scope depends on how widely the kind's namespace is
//! shared (see [`Scope`]). Log groups are the one exception: the provider
//! derives them from the function name, so they are `/aws/lambda/` followed
//! by the function's physical name.
//!
//! Names that exceed a kind's limits are rejected, never truncated.

mod types;

use std::collections::BTreeMap;

pub use types::*;

use crate::config::EnvironmentName;
use crate::consts::APP_NAME;

/// Account and region a stack is deployed into, plus the owning application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentScope {
  pub application: String,
  pub account: String,
  pub region: String,
}

/// Compose and check the physical name for a resource.
///
/// # Errors
///
/// Returns a [`NamingError`] if the logical name is empty or the composed name
/// breaks the kind's length or character-set rule.
pub fn physical_name(
  kind: ResourceKind,
  logical: &str,
  environment: EnvironmentName,
  scope: &DeploymentScope,
) -> Result<String, NamingError> {
  if logical.is_empty() {
    return Err(NamingError::EmptyLogicalName { kind });
  }

  let rule = kind.rule();
  let base = format!("{}-{}-{}", scope.application, environment.as_str(), logical);
  let name = match (kind, rule.scope) {
    (ResourceKind::LogGroup, _) => format!("/aws/lambda/{}", base),
    (_, Scope::Environment) => base,
    (_, Scope::Region) => format!("{}-{}", base, scope.region),
    (_, Scope::Estate) => format!("{}-{}-{}", base, scope.account, scope.region),
  };

  check_name(kind, logical, &name, &rule)?;
  Ok(name)
}

fn check_name(kind: ResourceKind, logical: &str, name: &str, rule: &NameRule) -> Result<(), NamingError> {
  let len = name.chars().count();
  if len > rule.max {
    return Err(NamingError::TooLong {
      kind,
      logical: logical.to_string(),
      name: name.to_string(),
      len,
      max: rule.max,
    });
  }
  if len < rule.min {
    return Err(NamingError::TooShort {
      kind,
      logical: logical.to_string(),
      name: name.to_string(),
      len,
      min: rule.min,
    });
  }

  if let Some(ch) = name.chars().find(|c| !rule.charset.allows(*c)) {
    return Err(NamingError::InvalidCharacter {
      kind,
      logical: logical.to_string(),
      name: name.to_string(),
      ch,
    });
  }

  if rule.charset == Charset::Dns {
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(name.chars().next()) || !alnum(name.chars().last()) || name.contains("..") {
      return Err(NamingError::InvalidBoundary {
        kind,
        logical: logical.to_string(),
        name: name.to_string(),
      });
    }
  }

  Ok(())
}

/// Generated tags merged with caller overrides; an override wins on collision.
pub fn tags(
  scope: &DeploymentScope,
  environment: EnvironmentName,
  overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
  let mut tags = BTreeMap::new();
  tags.insert("application".to_string(), scope.application.clone());
  tags.insert("environment".to_string(), environment.as_str().to_string());
  tags.insert("managed-by".to_string(), APP_NAME.to_string());
  for (key, value) in overrides {
    tags.insert(key.clone(), value.clone());
  }
  tags
}

/// Everything the Naming Engine needs for one build, passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
  pub scope: DeploymentScope,
  pub environment: EnvironmentName,
  pub tag_overrides: BTreeMap<String, String>,
}

impl BuildContext {
  pub fn new(scope: DeploymentScope, environment: EnvironmentName) -> Self {
    Self {
      scope,
      environment,
      tag_overrides: BTreeMap::new(),
    }
  }

  pub fn with_tag_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
    self.tag_overrides = overrides;
    self
  }

  /// `{application}-{environment}`, the prefix shared by every physical name.
  pub fn prefix(&self) -> String {
    format!("{}-{}", self.scope.application, self.environment.as_str())
  }

  pub fn physical_name(&self, kind: ResourceKind, logical: &str) -> Result<String, NamingError> {
    physical_name(kind, logical, self.environment, &self.scope)
  }

  pub fn tags(&self) -> BTreeMap<String, String> {
    tags(&self.scope, self.environment, &self.tag_overrides)
  }

  pub fn bucket_arn(&self, physical: &str) -> String {
    format!("arn:aws:s3:::{}", physical)
  }

  pub fn table_arn(&self, physical: &str) -> String {
    format!(
      "arn:aws:dynamodb:{}:{}:table/{}",
      self.scope.region, self.scope.account, physical
    )
  }

  pub fn function_arn(&self, physical: &str) -> String {
    format!(
      "arn:aws:lambda:{}:{}:function:{}",
      self.scope.region, self.scope.account, physical
    )
  }

  pub fn role_arn(&self, physical: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", self.scope.account, physical)
  }

  /// ARN pattern matching every function log group of this stack.
  pub fn log_groups_arn_pattern(&self) -> String {
    format!(
      "arn:aws:logs:{}:{}:log-group:/aws/lambda/{}-*",
      self.scope.region,
      self.scope.account,
      self.prefix()
    )
  }
}
