#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn deployer(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deployer").unwrap();
    cmd.current_dir(dir.path()).env_remove("DEPLOYER_CONFIG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

// ---------------------------------------------------------------------------
// deployer plan --group
// ---------------------------------------------------------------------------

#[test]
fn offline_plan_private_only() {
    let dir = TempDir::new().unwrap();
    let plans = stdout_json(deployer(&dir).args([
        "plan",
        "--group",
        "web",
        "--label",
        "cloud-minikube",
        "--json",
    ]));

    let plan = &plans[0];
    assert_eq!(plan["group"], "web");
    assert_eq!(plan["decision"], "private_only");
    let actions = plan["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 3);
    assert_eq!(actions[0]["context"], "private");
    assert_eq!(actions[0]["verb"], "apply");
    assert_eq!(actions[2]["context"], "public");
    assert_eq!(actions[2]["verb"], "delete");
}

#[test]
fn offline_plan_without_labels_deletes_everywhere() {
    let dir = TempDir::new().unwrap();
    let plans = stdout_json(deployer(&dir).args(["plan", "--group", "batch", "-j"]));

    assert_eq!(plans[0]["decision"], "none");
    let actions = plans[0]["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|a| a["verb"] == "delete"));
}

#[test]
fn offline_plan_table_names_contexts() {
    let dir = TempDir::new().unwrap();
    deployer(&dir)
        .args([
            "plan",
            "--group",
            "web",
            "--label",
            "cloud-minikube=supported",
            "--label",
            "cloud-bsc-aks",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("GROUP"))
        .stdout(predicate::str::contains("both"))
        .stdout(predicate::str::contains("minikube"))
        .stdout(predicate::str::contains("bsc-aks"));
}

#[test]
fn label_requires_group() {
    let dir = TempDir::new().unwrap();
    deployer(&dir)
        .args(["plan", "--label", "cloud-minikube"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// deployer config
// ---------------------------------------------------------------------------

#[test]
fn config_show_prints_defaults() {
    let dir = TempDir::new().unwrap();
    deployer(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("minikube"))
        .stdout(predicate::str::contains("run_log_capacity: 100"));
}

#[test]
fn config_show_reads_local_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("deployer.yaml"),
        "contexts:\n  private: kind-local\n",
    )
    .unwrap();

    let config = stdout_json(deployer(&dir).args(["config", "show", "--json"]));
    assert_eq!(config["contexts"]["private"], "kind-local");
    assert_eq!(config["contexts"]["public"], "bsc-aks");
}

#[test]
fn config_validate_defaults_are_clean() {
    let dir = TempDir::new().unwrap();
    deployer(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_fails_on_identical_contexts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("same.yaml");
    std::fs::write(&path, "contexts:\n  private: one\n  public: one\n").unwrap();

    deployer(&dir)
        .arg("--config")
        .arg(&path)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    deployer(&dir)
        .args(["--config", "nope.yaml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn config_path_from_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("env.yaml");
    std::fs::write(&path, "policy_kind: clusterpolicy\n").unwrap();

    deployer(&dir)
        .env("DEPLOYER_CONFIG", &path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("policy_kind: clusterpolicy"));
}

// ---------------------------------------------------------------------------
// deployer deploy
// ---------------------------------------------------------------------------

#[test]
fn deploy_rejects_missing_directory() {
    let dir = TempDir::new().unwrap();
    deployer(&dir)
        .args(["deploy", "--dir", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

/// A config whose kubectl is `true`: every call succeeds with empty output.
fn silent_cluster(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("silent.yaml");
    std::fs::write(&path, "kubectl:\n  binary: \"true\"\n").unwrap();
    std::fs::create_dir(dir.path().join("deploy")).unwrap();
    path
}

#[test]
fn deploy_report_carries_rev() {
    let dir = TempDir::new().unwrap();
    let config = silent_cluster(&dir);
    let report = stdout_json(
        deployer(&dir)
            .arg("--config")
            .arg(&config)
            .args(["deploy", "--dir", "deploy", "--rev", "revTest2", "--json"]),
    );
    assert_eq!(report["kind"], "apply");
    assert_eq!(report["rev"], "revTest2");
}

#[test]
fn delete_summary_names_rev() {
    let dir = TempDir::new().unwrap();
    let config = silent_cluster(&dir);
    deployer(&dir)
        .arg("--config")
        .arg(&config)
        .args(["delete", "--dir", "deploy", "--rev", "revTest3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("delete pass (rev revTest3) succeeded"));
}
