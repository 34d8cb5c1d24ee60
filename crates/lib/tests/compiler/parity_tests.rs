use stackc_lib::baseline::BaselineStore;
use stackc_lib::config::EnvironmentName;
use stackc_lib::graph::NodeId;
use stackc_lib::parity::{ParityChecker, compare};
use stackc_lib::synth::Metadata;
use tempfile::TempDir;

use super::common::{compile_ok, demo_stack, extractaudio_stack};

#[test]
fn recompile_matches_itself() {
  let config = demo_stack();
  let reference = compile_ok(&config, "staging").document;
  let candidate = compile_ok(&config, "staging").document.with_metadata(Metadata {
    generated_at: 1_700_000_000,
    generator: "stackc test".to_string(),
  });

  let report = compare(&candidate, &reference);
  assert!(report.is_match(), "unexpected differences: {}", report);
  assert_eq!(candidate.content_hash().unwrap(), reference.content_hash().unwrap());
}

#[test]
fn memory_change_is_one_changed_resource() {
  let reference = compile_ok(&extractaudio_stack(), "dev").document;

  let mut config = extractaudio_stack();
  config.functions[0].memory_mb = 3008;
  let candidate = compile_ok(&config, "dev").document;

  let report = compare(&candidate, &reference);
  assert!(report.only_in_candidate.is_empty());
  assert!(report.only_in_reference.is_empty());
  assert_eq!(report.changed.len(), 1);
  assert_eq!(report.changed[0].id, NodeId::function("extractaudio"));
  assert_eq!(report.changed[0].paths, vec!["attributes.memory_size".to_string()]);
  assert!(report.into_result().is_err());
}

#[test]
fn repeated_record_id_is_a_mismatch() {
  let reference = compile_ok(&extractaudio_stack(), "dev").document;
  let mut candidate = reference.clone();
  let mut copy = candidate.resources[0].clone();
  copy.attributes = serde_json::json!({ "tampered": true });
  candidate.resources.push(copy);

  let report = compare(&candidate, &reference);
  assert_eq!(report.duplicate_ids, vec![reference.resources[0].id.clone()]);
  assert!(report.changed.is_empty());
  assert!(report.into_result().is_err());
}

#[test]
fn new_function_is_reported_as_added() {
  let reference = compile_ok(&extractaudio_stack(), "dev").document;
  let candidate = compile_ok(&demo_stack(), "dev").document;

  let report = compare(&candidate, &reference);
  assert!(report.only_in_candidate.contains(&NodeId::function("transcribeaudio")));
  assert!(report.only_in_candidate.contains(&NodeId::log_group("transcribeaudio")));
  assert!(report.only_in_reference.is_empty());
}

#[test]
fn ignored_paths_hide_code_changes() {
  let mut config = demo_stack();
  let reference = compile_ok(&config, "prod").document;
  config.functions[0].code = Some("lambda/extractaudio-v2".to_string());
  let candidate = compile_ok(&config, "prod").document;

  assert!(!compare(&candidate, &reference).is_match());
  let report = ParityChecker::new()
    .ignore("attributes.code")
    .compare(&candidate, &reference);
  assert!(report.is_match());
}

#[test]
fn accepted_baseline_round_trips() {
  let temp = TempDir::new().unwrap();
  let store = BaselineStore::new(temp.path().join("baselines"));
  let document = compile_ok(&demo_stack(), "prod").document;

  store.save(&document).unwrap();
  let loaded = store.load("vidscribe", EnvironmentName::Prod).unwrap().unwrap();

  assert!(compare(&document, &loaded).is_match());
  assert!(store.load("vidscribe", EnvironmentName::Dev).unwrap().is_none());
}
