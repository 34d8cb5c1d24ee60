use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn diff_without_baseline_fails() {
  let env = TestEnv::from_fixture("stack.yaml");

  env
    .stackc_cmd()
    .args(["diff", "--env", "dev"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No accepted baseline"));
}

#[test]
fn accept_then_diff_matches() {
  let env = TestEnv::from_fixture("stack.yaml");

  env
    .stackc_cmd()
    .args(["accept", "--env", "staging"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Accepted staging baseline"));
  assert!(env.baseline_path("staging").exists());

  env
    .stackc_cmd()
    .args(["diff", "--env", "staging", "--check"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No differences"));
}

#[test]
fn diff_check_fails_on_change() {
  let env = TestEnv::from_fixture("stack.yaml");

  env.stackc_cmd().args(["accept", "--env", "dev"]).assert().success();
  env.write_config(&env.config().replace("memory_mb: 2048", "memory_mb: 3008"));

  env
    .stackc_cmd()
    .args(["-v", "diff", "--env", "dev", "--check"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("function/extractaudio"))
    .stdout(predicate::str::contains("attributes.memory_size"))
    .stderr(predicate::str::contains("differs from the accepted baseline"));

  env
    .stackc_cmd()
    .args(["diff", "--env", "dev"])
    .assert()
    .success()
    .stdout(predicate::str::contains("0 added, 0 removed, 1 changed"));
}

#[test]
fn diff_json_reports_changes() {
  let env = TestEnv::from_fixture("stack.yaml");
  let baseline = env.temp.path().join("accepted.json");

  env
    .stackc_cmd()
    .args(["accept", "--env", "prod", "--baseline"])
    .arg(&baseline)
    .assert()
    .success();
  assert!(baseline.exists());
  assert!(!env.baseline_path("prod").exists());

  env.write_config(&env.config().replace("timeout_secs: 10", "timeout_secs: 15"));

  let output = env
    .stackc_cmd()
    .args(["diff", "--env", "prod", "--json", "--baseline"])
    .arg(&baseline)
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let changed = report["changed"].as_array().unwrap();
  assert_eq!(changed.len(), 1);
  assert_eq!(changed[0]["id"], "function/uploadurl");
  assert_eq!(changed[0]["paths"][0], "attributes.timeout");
}
