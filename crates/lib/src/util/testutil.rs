//! Builders for test stacks.
//!
//! [`minimal_stack`] is the smallest valid stack: one media-convert role, one
//! video bucket and the `extractaudio` function. Tests push extra records onto
//! it to exercise a single behavior.

use std::collections::BTreeMap;

use crate::config::{
  BucketSpec, EndpointSpec, FunctionSpec, HttpMethod, KeyAttribute, KeyType, OutputKey, PermissionStatement,
  RoleKind, RoleSpec, StackConfig, StorageKind, StorageSpec, TableSpec, TrustedService, ValidationFlags,
};

pub fn role(name: &str, kind: RoleKind) -> RoleSpec {
  RoleSpec {
    name: name.to_string(),
    kind,
    trust: TrustedService::Lambda,
    statements: Vec::new(),
  }
}

pub fn bucket(name: &str) -> StorageSpec {
  StorageSpec {
    name: name.to_string(),
    encrypted: true,
    output: None,
    kind: StorageKind::Bucket(BucketSpec::default()),
  }
}

pub fn table(name: &str, partition_key: &str) -> StorageSpec {
  StorageSpec {
    name: name.to_string(),
    encrypted: true,
    output: None,
    kind: StorageKind::Table(TableSpec {
      partition_key: KeyAttribute {
        name: partition_key.to_string(),
        kind: KeyType::String,
      },
      sort_key: None,
    }),
  }
}

pub fn function(name: &str, role: RoleKind) -> FunctionSpec {
  FunctionSpec {
    name: name.to_string(),
    handler: format!("{}.handler", name),
    code: None,
    runtime: "nodejs18.x".to_string(),
    memory_mb: 256,
    timeout_secs: 30,
    environment: BTreeMap::new(),
    role,
  }
}

pub fn endpoint(name: &str, path: &str, method: HttpMethod, target: &str) -> EndpointSpec {
  EndpointSpec {
    name: name.to_string(),
    path: path.to_string(),
    method,
    target: target.to_string(),
    validation: ValidationFlags::default(),
  }
}

pub fn minimal_stack() -> StackConfig {
  let mut config = StackConfig::new("vidscribe", "123456789012", "us-east-1");

  let mut media = role("media-convert", RoleKind::MediaConvert);
  media.statements.push(PermissionStatement {
    effect: Default::default(),
    actions: vec!["s3:GetObject".to_string()],
    resources: vec!["$${storage:video:arn}/*".to_string()],
    global: false,
  });
  config.roles.push(media);

  config.storage.push(StorageSpec {
    output: Some(OutputKey::VideoBucketName),
    ..bucket("video")
  });

  let mut extract = function("extractaudio", RoleKind::MediaConvert);
  extract.memory_mb = 2048;
  extract.timeout_secs = 600;
  config.functions.push(extract);

  config
}
