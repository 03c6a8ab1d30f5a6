// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const COMBINE: &str = r#"
version: "1"
name: combine-example
stages:
  - name: reference
    type: transform
    transform: constant
    params: { artifacts: [ { name: ref, value: 1 } ] }
  - name: samples
    type: transform
    transform: constant
    params: { artifacts: [ { name: s, value: 2, kind: number } ] }
  - name: combine
    type: join
    inputs:
      - { from: reference, mode: once }
      - samples
run: [reference, samples]
"#;

const CYCLE: &str = r#"
name: loop
stages:
  - { name: start, type: relay }
  - { name: a, type: relay, inputs: [start, b] }
  - { name: b, type: relay, inputs: [a] }
"#;

fn workspace(pipeline: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".plugflow.yaml"), pipeline).unwrap();
    dir
}

fn plugflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("plugflow").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1");
    cmd
}

#[test]
fn run_prints_combined_outputs() {
    let dir = workspace(COMBINE);

    plugflow(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("combine (1 bundle(s))"))
        .stdout(predicate::str::contains("ref = 1 [json]"))
        .stdout(predicate::str::contains("s = 2 [number]"));
}

#[test]
fn run_json_output() {
    let dir = workspace(COMBINE);

    let output = plugflow(&dir)
        .args(["run", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["pipeline"], "combine-example");
    let bundle = &document["outputs"][0]["bundles"][0];
    assert_eq!(bundle[0]["name"], "ref");
    assert_eq!(bundle[1]["value"], 2);
}

#[test]
fn run_parallel_roots() {
    let dir = workspace(
        r#"
name: converge
stages:
  - name: left
    type: transform
    transform: constant
    params: { artifacts: [ { name: l, value: "left" } ] }
  - name: right
    type: transform
    transform: constant
    params: { artifacts: [ { name: r, value: "right" } ] }
  - { name: join, type: join, inputs: [left, right] }
"#,
    );

    plugflow(&dir)
        .args(["run", "--parallel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("join (1 bundle(s))"));
}

#[test]
fn run_selected_root_only() {
    let dir = workspace(COMBINE);

    plugflow(&dir)
        .args(["run", "--root", "reference"])
        .assert()
        .success()
        .stdout(predicate::str::contains("combine (no output)"));
}

#[test]
fn run_unknown_root_fails() {
    let dir = workspace(COMBINE);

    plugflow(&dir)
        .args(["run", "--root", "nowhere"])
        .assert()
        .failure();
}

#[test]
fn run_missing_pipeline_suggests_recovery() {
    let dir = TempDir::new().unwrap();

    plugflow(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Create a pipeline definition"));
}

#[test]
fn validate_accepts_good_pipeline() {
    let dir = workspace(COMBINE);

    plugflow(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline is valid!"));
}

#[test]
fn validate_rejects_cycle() {
    let dir = workspace(CYCLE);

    plugflow(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Circular wiring"));
}

#[test]
fn graph_mermaid_marks_once_inputs() {
    let dir = workspace(COMBINE);

    plugflow(&dir)
        .args(["graph", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reference -.->|once| combine"))
        .stdout(predicate::str::contains("samples --> combine"));
}

#[test]
fn trace_reverse_lists_inputs() {
    let dir = workspace(COMBINE);

    plugflow(&dir)
        .args(["trace", "--stage", "combine", "--reverse"])
        .assert()
        .success()
        .stdout("combine\n   reference\n   samples\n");
}

#[test]
fn directory_flag_changes_working_dir() {
    let dir = workspace(COMBINE);

    Command::cargo_bin("plugflow")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("-C")
        .arg(dir.path())
        .arg("validate")
        .assert()
        .success();
}
