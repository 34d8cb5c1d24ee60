//! Environment profiles.
//!
//! A profile holds every setting that varies between deployment environments.
//! Three presets are built in; a stack file may override individual fields per
//! environment through [`ProfileOverrides`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::validate::ValidationError;

/// The closed set of deployment environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentName {
  Dev,
  Staging,
  Prod,
}

impl EnvironmentName {
  pub const ALL: [EnvironmentName; 3] = [EnvironmentName::Dev, EnvironmentName::Staging, EnvironmentName::Prod];

  pub fn as_str(self) -> &'static str {
    match self {
      EnvironmentName::Dev => "dev",
      EnvironmentName::Staging => "staging",
      EnvironmentName::Prod => "prod",
    }
  }
}

impl fmt::Display for EnvironmentName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EnvironmentName {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    EnvironmentName::ALL
      .into_iter()
      .find(|env| env.as_str() == s)
      .ok_or_else(|| ValidationError::UnknownEnvironment { name: s.to_string() })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
  Error,
  Warn,
  Info,
  Debug,
}

impl LogLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      LogLevel::Error => "ERROR",
      LogLevel::Warn => "WARN",
      LogLevel::Info => "INFO",
      LogLevel::Debug => "DEBUG",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BillingMode {
  PayPerRequest,
  Provisioned { read_capacity: u32, write_capacity: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleThresholds {
  /// Days before objects move to the infrequent-access tier.
  pub transition_days: u32,
  /// Days before objects are deleted.
  pub expiration_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleLimits {
  /// Steady-state requests per second.
  pub rate_limit: u32,
  pub burst_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
  pub enabled: bool,
  pub ttl_secs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceClass {
  #[serde(rename = "PriceClass_100")]
  Class100,
  #[serde(rename = "PriceClass_200")]
  Class200,
  #[serde(rename = "PriceClass_All")]
  All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
  Retain,
  Destroy,
}

/// Per-environment settings. Immutable once selected for a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentProfile {
  pub name: EnvironmentName,
  /// Default language code for transcription jobs.
  pub transcribe_language: String,
  pub log_retention_days: u32,
  pub log_level: LogLevel,
  pub tracing: bool,
  pub billing_mode: BillingMode,
  pub lifecycle: LifecycleThresholds,
  pub throttle: ThrottleLimits,
  pub cache: CacheSettings,
  pub price_class: PriceClass,
  pub removal_policy: RemovalPolicy,
}

impl EnvironmentProfile {
  /// The built-in profile for an environment.
  pub fn preset(name: EnvironmentName) -> Self {
    match name {
      EnvironmentName::Dev => Self {
        name,
        transcribe_language: "en-US".to_string(),
        log_retention_days: 3,
        log_level: LogLevel::Debug,
        tracing: false,
        billing_mode: BillingMode::PayPerRequest,
        lifecycle: LifecycleThresholds {
          transition_days: 30,
          expiration_days: 90,
        },
        throttle: ThrottleLimits {
          rate_limit: 50,
          burst_limit: 100,
        },
        cache: CacheSettings {
          enabled: false,
          ttl_secs: 0,
        },
        price_class: PriceClass::Class100,
        removal_policy: RemovalPolicy::Destroy,
      },
      EnvironmentName::Staging => Self {
        name,
        transcribe_language: "en-US".to_string(),
        log_retention_days: 7,
        log_level: LogLevel::Info,
        tracing: true,
        billing_mode: BillingMode::PayPerRequest,
        lifecycle: LifecycleThresholds {
          transition_days: 30,
          expiration_days: 180,
        },
        throttle: ThrottleLimits {
          rate_limit: 100,
          burst_limit: 200,
        },
        cache: CacheSettings {
          enabled: true,
          ttl_secs: 300,
        },
        price_class: PriceClass::Class100,
        removal_policy: RemovalPolicy::Destroy,
      },
      EnvironmentName::Prod => Self {
        name,
        transcribe_language: "en-US".to_string(),
        log_retention_days: 30,
        log_level: LogLevel::Warn,
        tracing: true,
        billing_mode: BillingMode::PayPerRequest,
        lifecycle: LifecycleThresholds {
          transition_days: 90,
          expiration_days: 365,
        },
        throttle: ThrottleLimits {
          rate_limit: 500,
          burst_limit: 1000,
        },
        cache: CacheSettings {
          enabled: true,
          ttl_secs: 3600,
        },
        price_class: PriceClass::All,
        removal_policy: RemovalPolicy::Retain,
      },
    }
  }

  /// Apply stack-file overrides on top of this profile.
  pub fn with_overrides(mut self, overrides: &ProfileOverrides) -> Self {
    if let Some(ref language) = overrides.transcribe_language {
      self.transcribe_language = language.clone();
    }
    if let Some(days) = overrides.log_retention_days {
      self.log_retention_days = days;
    }
    if let Some(level) = overrides.log_level {
      self.log_level = level;
    }
    if let Some(tracing) = overrides.tracing {
      self.tracing = tracing;
    }
    if let Some(mode) = overrides.billing_mode {
      self.billing_mode = mode;
    }
    if let Some(lifecycle) = overrides.lifecycle {
      self.lifecycle = lifecycle;
    }
    if let Some(throttle) = overrides.throttle {
      self.throttle = throttle;
    }
    if let Some(cache) = overrides.cache {
      self.cache = cache;
    }
    if let Some(price_class) = overrides.price_class {
      self.price_class = price_class;
    }
    if let Some(policy) = overrides.removal_policy {
      self.removal_policy = policy;
    }
    self
  }

  /// Replace the transcription language (the CLI `--language` override).
  pub fn with_language(mut self, language: &str) -> Self {
    self.transcribe_language = language.to_string();
    self
  }
}

/// Optional per-environment overrides read from the stack file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileOverrides {
  pub transcribe_language: Option<String>,
  pub log_retention_days: Option<u32>,
  pub log_level: Option<LogLevel>,
  pub tracing: Option<bool>,
  pub billing_mode: Option<BillingMode>,
  pub lifecycle: Option<LifecycleThresholds>,
  pub throttle: Option<ThrottleLimits>,
  pub cache: Option<CacheSettings>,
  pub price_class: Option<PriceClass>,
  pub removal_policy: Option<RemovalPolicy>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn environment_names_parse() {
    assert_eq!("dev".parse::<EnvironmentName>().unwrap(), EnvironmentName::Dev);
    assert_eq!("prod".parse::<EnvironmentName>().unwrap(), EnvironmentName::Prod);
  }

  #[test]
  fn unknown_environment_is_a_validation_error() {
    let err = "qa".parse::<EnvironmentName>().unwrap_err();
    assert!(matches!(err, ValidationError::UnknownEnvironment { ref name } if name == "qa"));
  }

  #[test]
  fn retention_is_environment_specific() {
    assert_eq!(EnvironmentProfile::preset(EnvironmentName::Dev).log_retention_days, 3);
    assert_eq!(EnvironmentProfile::preset(EnvironmentName::Staging).log_retention_days, 7);
    assert_eq!(EnvironmentProfile::preset(EnvironmentName::Prod).log_retention_days, 30);
  }

  #[test]
  fn overrides_replace_only_given_fields() {
    let overrides = ProfileOverrides {
      log_retention_days: Some(14),
      price_class: Some(PriceClass::Class200),
      ..Default::default()
    };
    let profile = EnvironmentProfile::preset(EnvironmentName::Dev).with_overrides(&overrides);

    assert_eq!(profile.log_retention_days, 14);
    assert_eq!(profile.price_class, PriceClass::Class200);
    assert_eq!(profile.log_level, LogLevel::Debug);
    assert_eq!(profile.removal_policy, RemovalPolicy::Destroy);
  }

  #[test]
  fn language_override() {
    let profile = EnvironmentProfile::preset(EnvironmentName::Prod).with_language("es-ES");
    assert_eq!(profile.transcribe_language, "es-ES");
  }

  #[test]
  fn overrides_deserialize_from_yaml() {
    let yaml = r#"
log_retention_days: 14
billing_mode:
  mode: provisioned
  read_capacity: 5
  write_capacity: 5
price_class: PriceClass_All
"#;
    let overrides: ProfileOverrides = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(overrides.log_retention_days, Some(14));
    assert_eq!(
      overrides.billing_mode,
      Some(BillingMode::Provisioned {
        read_capacity: 5,
        write_capacity: 5
      })
    );
    assert_eq!(overrides.price_class, Some(PriceClass::All));
  }

  #[test]
  fn overrides_reject_unknown_fields() {
    let result: Result<ProfileOverrides, _> = serde_yaml::from_str("retention: 3\n");
    assert!(result.is_err());
  }
}
