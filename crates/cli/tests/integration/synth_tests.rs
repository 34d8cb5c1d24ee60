use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn synth_writes_document_with_metadata() {
  let env = TestEnv::from_fixture("stack.yaml");
  let out = env.temp.path().join("build").join("prod.json");

  env
    .stackc_cmd()
    .args(["synth", "--env", "prod", "--out"])
    .arg(&out)
    .assert()
    .success()
    .stdout(predicate::str::contains("Wrote"));

  let document: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
  assert_eq!(document["environment"], "prod");
  assert!(document["metadata"]["generator"].as_str().unwrap().starts_with("stackc "));

  let resources = document["resources"].as_array().unwrap();
  assert!(resources.iter().any(|r| r["id"] == "edge/distribution"));
  assert!(resources.iter().any(|r| r["id"] == "api/deployment"));
}

#[test]
fn synth_json_summary() {
  let env = TestEnv::from_fixture("stack.yaml");
  let out = env.temp.path().join("dev.json");

  let output = env
    .stackc_cmd()
    .args(["synth", "--env", "dev", "--json", "--out"])
    .arg(&out)
    .output()
    .unwrap();
  assert!(output.status.success());

  let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(summary["hash"].as_str().unwrap().len(), 20);
  assert!(summary["resources"].as_u64().unwrap() > 0);
}

#[test]
fn synth_stdout_is_stable() {
  let env = TestEnv::from_fixture("stack.yaml");

  let first = env.stackc_cmd().args(["synth", "--env", "staging"]).output().unwrap();
  let second = env.stackc_cmd().args(["synth", "--env", "staging"]).output().unwrap();
  assert!(first.status.success());
  assert_eq!(first.stdout, second.stdout);

  let document: Value = serde_json::from_slice(&first.stdout).unwrap();
  assert!(document.get("metadata").is_none());
}

#[test]
fn language_override_reaches_transcribe_function() {
  let env = TestEnv::from_fixture("stack.yaml");

  env
    .stackc_cmd()
    .args(["synth", "--env", "dev", "--language", "de-DE"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"TRANSCRIBE_LANGUAGE\": \"de-DE\""));
}

#[test]
fn outputs_include_deferred_urls() {
  let env = TestEnv::from_fixture("stack.yaml");

  env
    .stackc_cmd()
    .args(["outputs", "--env", "prod"])
    .assert()
    .success()
    .stdout(predicate::str::contains("ApiUrl"))
    .stdout(predicate::str::contains("$${ref:edge/distribution:domain_name}"));
}
