//! Configuration record types.
//!
//! A [`StackConfig`] is the complete declarative input of one application: the
//! roles, storage, functions and endpoints it needs plus per-environment
//! profile overrides. Records reference each other by logical name only; the
//! references are checked by [`super::validate`] before anything is built.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::profile::{EnvironmentName, ProfileOverrides};

/// The complete stack definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
  /// Application prefix applied to every physical name.
  pub application: String,
  /// Provider account identifier (12 digits).
  pub account: String,
  pub region: String,
  /// Tag overrides merged over the generated tags.
  #[serde(default)]
  pub tags: BTreeMap<String, String>,
  #[serde(default)]
  pub profiles: BTreeMap<EnvironmentName, ProfileOverrides>,
  #[serde(default)]
  pub roles: Vec<RoleSpec>,
  #[serde(default)]
  pub storage: Vec<StorageSpec>,
  #[serde(default)]
  pub functions: Vec<FunctionSpec>,
  #[serde(default)]
  pub endpoints: Vec<EndpointSpec>,
}

impl StackConfig {
  /// An empty stack with no records.
  pub fn new(application: &str, account: &str, region: &str) -> Self {
    Self {
      application: application.to_string(),
      account: account.to_string(),
      region: region.to_string(),
      tags: BTreeMap::new(),
      profiles: BTreeMap::new(),
      roles: Vec::new(),
      storage: Vec::new(),
      functions: Vec::new(),
      endpoints: Vec::new(),
    }
  }

  pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
    self.functions.iter().find(|f| f.name == name)
  }

  pub fn storage(&self, name: &str) -> Option<&StorageSpec> {
    self.storage.iter().find(|s| s.name == name)
  }

  /// The role declared for a role kind.
  pub fn role_for(&self, kind: RoleKind) -> Option<&RoleSpec> {
    self.roles.iter().find(|r| r.kind == kind)
  }
}

// =============================================================================
// Roles
// =============================================================================

/// The closed set of role kinds a function can run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleKind {
  /// Logging only.
  Basic,
  /// Media conversion jobs (audio extraction).
  MediaConvert,
  /// Speech-to-text jobs.
  Transcribe,
  /// Reads and writes application tables and buckets.
  DataAccess,
}

impl RoleKind {
  pub fn as_str(self) -> &'static str {
    match self {
      RoleKind::Basic => "basic",
      RoleKind::MediaConvert => "mediaConvert",
      RoleKind::Transcribe => "transcribe",
      RoleKind::DataAccess => "dataAccess",
    }
  }
}

impl fmt::Display for RoleKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The service principal allowed to assume a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedService {
  Lambda,
  MediaConvert,
  ApiGateway,
}

impl TrustedService {
  pub fn principal(self) -> &'static str {
    match self {
      TrustedService::Lambda => "lambda.amazonaws.com",
      TrustedService::MediaConvert => "mediaconvert.amazonaws.com",
      TrustedService::ApiGateway => "apigateway.amazonaws.com",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
  #[default]
  Allow,
  Deny,
}

/// One permission statement.
///
/// `resources` entries may contain placeholders such as `$${storage:video:arn}/*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionStatement {
  #[serde(default)]
  pub effect: Effect,
  pub actions: Vec<String>,
  pub resources: Vec<String>,
  /// Marks a statement whose actions only make sense on `*` (list operations).
  #[serde(default)]
  pub global: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSpec {
  pub name: String,
  pub kind: RoleKind,
  pub trust: TrustedService,
  #[serde(default)]
  pub statements: Vec<PermissionStatement>,
}

// =============================================================================
// Storage
// =============================================================================

/// Keys of the outputs manifest.
///
/// The declaration order is the order of the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutputKey {
  ApiUrl,
  DistributionUrl,
  VideoBucketName,
  AudioBucketName,
  TranscribeBucketName,
  PublicBucketName,
  VideoTableName,
  CaptionTableName,
  ConfigTableName,
}

impl OutputKey {
  pub const ALL: [OutputKey; 9] = [
    OutputKey::ApiUrl,
    OutputKey::DistributionUrl,
    OutputKey::VideoBucketName,
    OutputKey::AudioBucketName,
    OutputKey::TranscribeBucketName,
    OutputKey::PublicBucketName,
    OutputKey::VideoTableName,
    OutputKey::CaptionTableName,
    OutputKey::ConfigTableName,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OutputKey::ApiUrl => "ApiUrl",
      OutputKey::DistributionUrl => "DistributionUrl",
      OutputKey::VideoBucketName => "VideoBucketName",
      OutputKey::AudioBucketName => "AudioBucketName",
      OutputKey::TranscribeBucketName => "TranscribeBucketName",
      OutputKey::PublicBucketName => "PublicBucketName",
      OutputKey::VideoTableName => "VideoTableName",
      OutputKey::CaptionTableName => "CaptionTableName",
      OutputKey::ConfigTableName => "ConfigTableName",
    }
  }

  /// Whether a bucket may publish its name under this key.
  pub fn is_bucket_key(self) -> bool {
    matches!(
      self,
      OutputKey::VideoBucketName
        | OutputKey::AudioBucketName
        | OutputKey::TranscribeBucketName
        | OutputKey::PublicBucketName
    )
  }

  /// Whether a table may publish its name under this key.
  pub fn is_table_key(self) -> bool {
    matches!(
      self,
      OutputKey::VideoTableName | OutputKey::CaptionTableName | OutputKey::ConfigTableName
    )
  }
}

impl fmt::Display for OutputKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSpec {
  pub name: String,
  #[serde(default = "default_encrypted")]
  pub encrypted: bool,
  /// Outputs-manifest key that publishes this resource's physical name.
  #[serde(default)]
  pub output: Option<OutputKey>,
  #[serde(flatten)]
  pub kind: StorageKind,
}

fn default_encrypted() -> bool {
  true
}

impl StorageSpec {
  pub fn as_bucket(&self) -> Option<&BucketSpec> {
    match &self.kind {
      StorageKind::Bucket(bucket) => Some(bucket),
      StorageKind::Table(_) => None,
    }
  }

  pub fn is_bucket(&self) -> bool {
    self.as_bucket().is_some()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageKind {
  Bucket(BucketSpec),
  Table(TableSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BucketSpec {
  #[serde(default)]
  pub cors: Vec<CorsRule>,
  /// Apply the profile's lifecycle thresholds.
  #[serde(default)]
  pub lifecycle: bool,
  /// The bucket served by the edge distribution.
  #[serde(default)]
  pub public: bool,
  #[serde(default)]
  pub triggers: Vec<TriggerSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsRule {
  pub allowed_methods: Vec<HttpMethod>,
  pub allowed_origins: Vec<String>,
  #[serde(default)]
  pub allowed_headers: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_age_secs: Option<u32>,
}

/// An object event on a bucket that invokes a function.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerSpec {
  pub function: String,
  #[serde(default = "default_trigger_events")]
  pub events: Vec<String>,
  #[serde(default)]
  pub prefix: Option<String>,
  #[serde(default)]
  pub suffix: Option<String>,
}

fn default_trigger_events() -> Vec<String> {
  vec!["s3:ObjectCreated:*".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
  pub partition_key: KeyAttribute,
  #[serde(default)]
  pub sort_key: Option<KeyAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
  pub name: String,
  #[serde(rename = "type")]
  pub kind: KeyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
  #[serde(rename = "S")]
  String,
  #[serde(rename = "N")]
  Number,
  #[serde(rename = "B")]
  Binary,
}

// =============================================================================
// Functions and endpoints
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
  pub name: String,
  /// Entry point, e.g. `extractaudio.handler`.
  pub handler: String,
  /// Code bundle location, passed through for the asset locator.
  #[serde(default)]
  pub code: Option<String>,
  #[serde(default = "default_runtime")]
  pub runtime: String,
  pub memory_mb: u32,
  pub timeout_secs: u32,
  /// Values may contain placeholders such as `$${storage:video}`.
  #[serde(default)]
  pub environment: BTreeMap<String, String>,
  pub role: RoleKind,
}

fn default_runtime() -> String {
  "nodejs18.x".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Patch,
  Delete,
  Head,
  Options,
}

impl HttpMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Patch => "PATCH",
      HttpMethod::Delete => "DELETE",
      HttpMethod::Head => "HEAD",
      HttpMethod::Options => "OPTIONS",
    }
  }
}

impl fmt::Display for HttpMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationFlags {
  /// Require the declared path parameters.
  #[serde(default)]
  pub parameters: bool,
  /// Validate the request body.
  #[serde(default)]
  pub body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSpec {
  pub name: String,
  /// Path template, e.g. `/video/{videoId}`.
  pub path: String,
  pub method: HttpMethod,
  /// Logical name of the function serving this endpoint.
  pub target: String,
  #[serde(default)]
  pub validation: ValidationFlags,
}
