use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every kind of resource node the compiler can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
  Role,
  Bucket,
  Table,
  BucketPolicy,
  Function,
  LogGroup,
  BucketNotification,
  RestApi,
  ApiResource,
  ApiMethod,
  ApiDeployment,
  AccessIdentity,
  Distribution,
}

impl ResourceKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ResourceKind::Role => "Role",
      ResourceKind::Bucket => "Bucket",
      ResourceKind::Table => "Table",
      ResourceKind::BucketPolicy => "BucketPolicy",
      ResourceKind::Function => "Function",
      ResourceKind::LogGroup => "LogGroup",
      ResourceKind::BucketNotification => "BucketNotification",
      ResourceKind::RestApi => "RestApi",
      ResourceKind::ApiResource => "ApiResource",
      ResourceKind::ApiMethod => "ApiMethod",
      ResourceKind::ApiDeployment => "ApiDeployment",
      ResourceKind::AccessIdentity => "AccessIdentity",
      ResourceKind::Distribution => "Distribution",
    }
  }

  /// Whether the provider accepts tags on this kind.
  pub fn is_taggable(self) -> bool {
    matches!(
      self,
      ResourceKind::Role
        | ResourceKind::Bucket
        | ResourceKind::Table
        | ResourceKind::Function
        | ResourceKind::LogGroup
        | ResourceKind::RestApi
        | ResourceKind::Distribution
    )
  }

  /// The naming rule for this kind.
  pub fn rule(self) -> NameRule {
    match self {
      ResourceKind::Bucket => NameRule::new(3, 63, Charset::Dns, Scope::Estate),
      ResourceKind::Role => NameRule::new(1, 64, Charset::Principal, Scope::Region),
      ResourceKind::Table | ResourceKind::BucketNotification => {
        NameRule::new(3, 255, Charset::Dotted, Scope::Environment)
      }
      ResourceKind::Function => NameRule::new(1, 64, Charset::Identifier, Scope::Environment),
      ResourceKind::LogGroup => NameRule::new(1, 512, Charset::LogPath, Scope::Environment),
      ResourceKind::ApiResource | ResourceKind::ApiMethod | ResourceKind::ApiDeployment => {
        NameRule::new(1, 512, Charset::ApiPath, Scope::Environment)
      }
      ResourceKind::RestApi
      | ResourceKind::BucketPolicy
      | ResourceKind::AccessIdentity
      | ResourceKind::Distribution => NameRule::new(1, 128, Charset::Identifier, Scope::Environment),
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How far a physical name must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  /// Unique within the account and region; the environment suffices.
  Environment,
  /// Account-wide namespace; the region is appended.
  Region,
  /// Provider-wide namespace; account and region are appended.
  Estate,
}

/// Characters a kind accepts in its physical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
  /// Lowercase DNS label characters, alphanumeric at both ends.
  Dns,
  /// `[A-Za-z0-9_-]`
  Identifier,
  /// `[A-Za-z0-9_.-]`
  Dotted,
  /// `[A-Za-z0-9+=,.@_-]`
  Principal,
  /// `[A-Za-z0-9_./#-]`
  LogPath,
  /// `[A-Za-z0-9_./{}#-]`
  ApiPath,
}

impl Charset {
  pub fn allows(self, c: char) -> bool {
    let base = c.is_ascii_alphanumeric() || c == '-';
    match self {
      Charset::Dns => c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.',
      Charset::Identifier => base || c == '_',
      Charset::Dotted => base || matches!(c, '_' | '.'),
      Charset::Principal => base || matches!(c, '+' | '=' | ',' | '.' | '@' | '_'),
      Charset::LogPath => base || matches!(c, '_' | '.' | '/' | '#'),
      Charset::ApiPath => base || matches!(c, '_' | '.' | '/' | '{' | '}' | '#'),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRule {
  pub min: usize,
  pub max: usize,
  pub charset: Charset,
  pub scope: Scope,
}

impl NameRule {
  const fn new(min: usize, max: usize, charset: Charset, scope: Scope) -> Self {
    Self {
      min,
      max,
      charset,
      scope,
    }
  }
}

/// A composed physical name that the provider would reject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
  #[error("{kind} has an empty logical name")]
  EmptyLogicalName { kind: ResourceKind },

  #[error("{kind} name '{name}' (from '{logical}') is {len} characters, limit is {max}")]
  TooLong {
    kind: ResourceKind,
    logical: String,
    name: String,
    len: usize,
    max: usize,
  },

  #[error("{kind} name '{name}' (from '{logical}') is {len} characters, minimum is {min}")]
  TooShort {
    kind: ResourceKind,
    logical: String,
    name: String,
    len: usize,
    min: usize,
  },

  #[error("{kind} name '{name}' (from '{logical}') contains invalid character {ch:?}")]
  InvalidCharacter {
    kind: ResourceKind,
    logical: String,
    name: String,
    ch: char,
  },

  #[error("{kind} name '{name}' (from '{logical}') must start and end with a letter or digit")]
  InvalidBoundary {
    kind: ResourceKind,
    logical: String,
    name: String,
  },
}
