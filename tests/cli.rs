use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_script(script: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp script");
    tmp.write_all(script.as_bytes()).expect("write script");
    tmp
}

const TANKS: &str = r#"[
  { "action": "module.load", "modules": ["scenes/scene", "objects/vehicles/tank/tank"] },
  { "action": "tank.create", "pos": { "x": 1, "y": 2, "z": 3 } },
  { "action": "scene.tick", "count": 2 }
]"#;

#[test]
fn cli_runs_script_and_prints_final_state() {
    let script = write_script(TANKS);
    let mut cmd = Command::cargo_bin("scenegrid-runtime").expect("binary exists");
    cmd.arg(script.path());
    cmd.assert()
        .success()
        .stdout(contains("Running 3 message(s)"))
        .stdout(contains(r#"[1] tank.create -> ok {"tankId":"tank0"}"#))
        .stdout(contains(" - objects/vehicles/tank/tank [Loaded] Tron tank objects"))
        .stdout(contains(" - tank0 pos=(1.00, 2.00, 3.00)"));
}

#[test]
fn summary_only_skips_step_lines() {
    let script = write_script(TANKS);
    let mut cmd = Command::cargo_bin("scenegrid-runtime").expect("binary exists");
    cmd.arg(script.path()).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Final scene nodes:"))
        .stdout(contains("tank.create -> ok").not());
}

#[test]
fn failing_step_exits_with_error() {
    let script = write_script(
        r#"[
  { "action": "module.load", "modules": ["scenes/scene"] },
  { "action": "tank.create" },
  { "action": "scene.tick" }
]"#,
    );
    let mut cmd = Command::cargo_bin("scenegrid-runtime").expect("binary exists");
    cmd.arg(script.path());
    cmd.assert()
        .failure()
        .stdout(contains("[1] tank.create -> rejected: action not supported: 'tank.create'"))
        .stdout(contains("[2]").not())
        .stderr(contains("step 1 (tank.create) did not complete"));
}

#[test]
fn continue_on_error_keeps_loading_modules() {
    let script = write_script(
        r#"[
  { "action": "module.load", "modules": ["camera/camera", "scenes/scene"] }
]"#,
    );
    let mut cmd = Command::cargo_bin("scenegrid-runtime").expect("binary exists");
    cmd.arg(script.path()).arg("--continue-on-error");
    cmd.assert()
        .success()
        .stdout(contains(" - camera/camera [Failed]"))
        .stdout(contains(" - scenes/scene [Loaded]"));
}

#[test]
fn missing_script_argument_prints_usage() {
    let mut cmd = Command::cargo_bin("scenegrid-runtime").expect("binary exists");
    cmd.assert()
        .failure()
        .stderr(contains("Usage: scenegrid-runtime <script.json>"));
}

#[test]
fn teapot_demo_runs_to_completion() {
    let script = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/teapot.json");
    let mut cmd = Command::cargo_bin("scenegrid-runtime").expect("binary exists");
    cmd.arg(script);
    cmd.assert()
        .success()
        .stdout(contains("[5] demos.teapot.set -> ok"))
        .stdout(contains(" - objects/prims/teapot [Loaded] Newell teapot primitive"));
}
