//! Shared stack builders for compiler integration tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use stackc_lib::config::{
  BucketSpec, EndpointSpec, FunctionSpec, HttpMethod, OutputKey, PermissionStatement, RoleKind, RoleSpec,
  StackConfig, StorageKind, StorageSpec, TriggerSpec, TrustedService, ValidationFlags,
};
use stackc_lib::{CompileOptions, Compiled, compile};

/// Path of the full example stack shipped with the repository.
pub fn demo_stack_path() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("..")
    .join("..")
    .join("demos")
    .join("stack.yaml")
}

pub fn demo_stack() -> StackConfig {
  StackConfig::from_path(&demo_stack_path()).unwrap_or_else(|e| panic!("Failed to load demo stack: {}", e))
}

pub fn bucket(name: &str, bucket: BucketSpec) -> StorageSpec {
  StorageSpec {
    name: name.to_string(),
    encrypted: true,
    output: None,
    kind: StorageKind::Bucket(bucket),
  }
}

pub fn function(name: &str, role: RoleKind, memory_mb: u32, timeout_secs: u32) -> FunctionSpec {
  FunctionSpec {
    name: name.to_string(),
    handler: format!("{}.handler", name),
    code: None,
    runtime: "nodejs18.x".to_string(),
    memory_mb,
    timeout_secs,
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

/// One media-convert role, a video bucket triggering `extractaudio`, and the function itself.
pub fn extractaudio_stack() -> StackConfig {
  let mut config = StackConfig::new("vidscribe", "123456789012", "us-east-1");

  config.roles.push(RoleSpec {
    name: "media-convert".to_string(),
    kind: RoleKind::MediaConvert,
    trust: TrustedService::Lambda,
    statements: vec![PermissionStatement {
      effect: Default::default(),
      actions: vec!["s3:GetObject".to_string()],
      resources: vec!["$${storage:video:arn}/*".to_string()],
      global: false,
    }],
  });

  config.storage.push(StorageSpec {
    output: Some(OutputKey::VideoBucketName),
    ..bucket(
      "video",
      BucketSpec {
        triggers: vec![TriggerSpec {
          function: "extractaudio".to_string(),
          events: vec!["s3:ObjectCreated:*".to_string()],
          prefix: None,
          suffix: Some(".mp4".to_string()),
        }],
        ..Default::default()
      },
    )
  });

  config
    .functions
    .push(function("extractaudio", RoleKind::MediaConvert, 2048, 600));

  config
}

/// Compile for an environment, panicking on failure.
pub fn compile_ok(config: &StackConfig, environment: &str) -> Compiled {
  compile(config, &CompileOptions::new(environment)).unwrap_or_else(|e| panic!("compile failed: {}", e))
}
