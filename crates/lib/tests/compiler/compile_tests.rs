use stackc_lib::config::{EnvironmentName, OutputKey, RoleKind, StorageSpec, ValidationError};
use stackc_lib::graph::{Attributes, NodeId, Principal, Stage, TracingMode};
use stackc_lib::naming::{NamingError, ResourceKind};
use stackc_lib::{CompileError, CompileOptions, compile};
use tracing_test::traced_test;

use super::common::{bucket, compile_ok, demo_stack, extractaudio_stack, function};

#[test]
fn extractaudio_scenario() {
  let compiled = compile_ok(&extractaudio_stack(), "dev");
  let doc = &compiled.document;

  assert_eq!(doc.resources_of(ResourceKind::Role).count(), 1);
  assert_eq!(doc.resources_of(ResourceKind::Bucket).count(), 1);
  assert_eq!(doc.resources_of(ResourceKind::Function).count(), 1);

  let function = doc.resource(&NodeId::function("extractaudio")).unwrap();
  assert_eq!(function.physical_name, "vidscribe-dev-extractaudio");
  assert_eq!(function.attributes["memory_size"], 2048);
  assert_eq!(function.attributes["timeout"], 600);
  assert!(function.depends_on.contains(&NodeId::role("media-convert")));

  let video = doc.resource(&NodeId::storage("video")).unwrap();
  let triggers = video.attributes["triggers"].as_array().unwrap();
  assert_eq!(triggers.len(), 1);
  assert_eq!(triggers[0]["function"], "vidscribe-dev-extractaudio");
  assert_eq!(triggers[0]["suffix"], ".mp4");

  assert_eq!(
    doc.outputs.get(&OutputKey::VideoBucketName).map(String::as_str),
    Some(video.physical_name.as_str())
  );
}

#[test]
fn records_follow_stage_order_and_dependencies() {
  let compiled = compile_ok(&demo_stack(), "staging");
  let doc = &compiled.document;

  let stages: Vec<Stage> = doc.resources.iter().map(|r| r.stage).collect();
  let mut sorted = stages.clone();
  sorted.sort();
  assert_eq!(stages, sorted);

  for (index, record) in doc.resources.iter().enumerate() {
    for dep in &record.depends_on {
      let position = doc.resources.iter().position(|r| &r.id == dep).unwrap();
      assert!(position < index, "{} must precede {}", dep, record.id);
    }
  }

  let topo = compiled.graph.topological_order().unwrap();
  assert_eq!(topo.len(), doc.resources.len());
}

#[test]
fn compile_is_deterministic() {
  let config = demo_stack();
  let first = compile_ok(&config, "prod").document;
  let second = compile_ok(&config, "prod").document;

  assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
  assert_eq!(first.content_hash().unwrap(), second.content_hash().unwrap());
}

#[test]
fn environments_get_distinct_names() {
  let config = demo_stack();
  let dev = compile_ok(&config, "dev").document;
  let prod = compile_ok(&config, "prod").document;

  let id = NodeId::storage("video");
  assert_ne!(dev.resource(&id).unwrap().physical_name, prod.resource(&id).unwrap().physical_name);
  assert_eq!(prod.environment, EnvironmentName::Prod);
}

#[test]
fn unknown_role_fails_before_any_node() {
  let mut config = extractaudio_stack();
  config.functions.push(function("transcribeaudio", RoleKind::Transcribe, 512, 300));

  let err = compile(&config, &CompileOptions::new("dev")).unwrap_err();
  assert!(matches!(
    err,
    CompileError::Validation(ValidationError::UnknownRole {
      role: RoleKind::Transcribe,
      ..
    })
  ));
}

#[test]
fn unknown_environment_is_rejected() {
  let err = compile(&extractaudio_stack(), &CompileOptions::new("qa")).unwrap_err();
  assert!(matches!(err, CompileError::Validation(ValidationError::UnknownEnvironment { .. })));
}

#[test]
fn overlong_bucket_name_is_a_naming_error() {
  let mut config = extractaudio_stack();
  config.storage.push(StorageSpec {
    output: None,
    ..bucket(&"archive".repeat(6), Default::default())
  });

  let err = compile(&config, &CompileOptions::new("staging")).unwrap_err();
  assert!(matches!(
    err,
    CompileError::Naming(NamingError::TooLong {
      kind: ResourceKind::Bucket,
      ..
    })
  ));
}

#[test]
fn edge_replaces_public_policy() {
  let compiled = compile_ok(&demo_stack(), "prod");
  let graph = &compiled.graph;

  let site = NodeId::storage("site");
  let policies: Vec<_> = graph.bucket_policies(&site).collect();
  assert_eq!(policies.len(), 1);
  assert_eq!(policies[0].stage, Stage::Edge);

  let Attributes::BucketPolicy(ref policy) = policies[0].attributes else {
    panic!("expected a bucket policy");
  };
  assert_eq!(policy.statements.len(), 1);
  assert!(matches!(policy.statements[0].principal, Principal::AccessIdentity { .. }));

  let Attributes::Bucket(ref bucket) = graph.get(&site).unwrap().attributes else {
    panic!("expected a bucket");
  };
  assert!(bucket.block_public_access);

  let distribution = graph.get(&NodeId::distribution()).unwrap();
  assert!(distribution.depends_on.contains(&NodeId::policy("site")));
  assert!(compiled.document.outputs.contains_key(&OutputKey::DistributionUrl));
}

#[test]
#[traced_test]
fn edge_is_skipped_without_public_bucket() {
  let compiled = compile_ok(&extractaudio_stack(), "dev");

  assert_eq!(compiled.graph.stage_nodes(Stage::Edge).count(), 0);
  assert!(!compiled.document.outputs.contains_key(&OutputKey::DistributionUrl));
  assert!(logs_contain("skipping edge distribution"));
}

#[test]
fn profile_settings_reach_functions() {
  let config = demo_stack();

  let prod = compile_ok(&config, "prod");
  let transcribe = prod.graph.get(&NodeId::function("transcribeaudio")).unwrap();
  let Attributes::Function(ref attrs) = transcribe.attributes else {
    panic!("expected a function");
  };
  assert_eq!(attrs.environment["TRANSCRIBE_LANGUAGE"], "en-GB");
  assert_eq!(attrs.environment["LOG_LEVEL"], "WARN");
  assert_eq!(attrs.environment["OUTPUT_BUCKET"], "vidscribe-prod-transcripts-123456789012-us-east-1");
  assert_eq!(attrs.tracing, TracingMode::Active);
  assert!(transcribe.depends_on.contains(&NodeId::storage("transcripts")));

  let dev = compile_ok(&config, "dev");
  let log = dev.graph.get(&NodeId::log_group("transcribeaudio")).unwrap();
  let Attributes::LogGroup(ref log_attrs) = log.attributes else {
    panic!("expected a log group");
  };
  assert_eq!(log_attrs.retention_days, 1);
  assert_eq!(log.physical_name, "/aws/lambda/vidscribe-dev-transcribeaudio");

  let language = compile(&config, &CompileOptions::new("dev").with_language("fr-FR")).unwrap();
  let Attributes::Function(ref attrs) = language.graph.get(&NodeId::function("transcribeaudio")).unwrap().attributes
  else {
    panic!("expected a function");
  };
  assert_eq!(attrs.environment["TRANSCRIBE_LANGUAGE"], "fr-FR");
}

#[test]
fn lambda_roles_can_write_logs() {
  let compiled = compile_ok(&extractaudio_stack(), "dev");
  let role = compiled.graph.get(&NodeId::role("media-convert")).unwrap();
  let Attributes::Role(ref attrs) = role.attributes else {
    panic!("expected a role");
  };

  assert_eq!(attrs.statements[0].resources, vec![
    "arn:aws:s3:::vidscribe-dev-video-123456789012-us-east-1/*".to_string()
  ]);
  let logs = attrs.statements.last().unwrap();
  assert!(logs.actions.contains(&"logs:PutLogEvents".to_string()));
}
