use std::path::Path;
use std::process::Command;

use adventure_state::{GameState, StateRecord, LEGACY_SAVE_VERSION, SAVE_VERSION};

fn write_save(path: &Path) {
    let mut state = GameState::new();
    state.set_var(61, 3).expect("set age");
    state.set_var(62, 301).expect("set room");
    state.update_inventory(&[7, 9]);
    state.set_save_description("Edanna").expect("description");
    let mut bytes = Vec::new();
    state.write(&mut bytes, SAVE_VERSION).expect("write");
    std::fs::write(path, bytes).expect("save file");
}

fn advstate(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_advstate"))
        .args(args)
        .output()
        .expect("run advstate")
}

#[test]
fn inspect_prints_a_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = dir.path().join("slot_001.m3s");
    write_save(&save);

    let output = advstate(&["inspect", save.to_str().expect("utf8 path")]);
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(summary["version"], SAVE_VERSION);
    assert_eq!(summary["location"]["age"], 3);
    assert_eq!(summary["inventory"], serde_json::json!([7, 9]));
    assert_eq!(summary["description"], "Edanna");
    assert_eq!(summary["vars"]["LocationRoom"], 301);
}

#[test]
fn convert_writes_the_requested_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = dir.path().join("in.m3s");
    let converted = dir.path().join("out").join("legacy.m3s");
    write_save(&save);

    let output = advstate(&[
        "convert",
        save.to_str().expect("utf8 path"),
        "-o",
        converted.to_str().expect("utf8 path"),
        "--version",
        &LEGACY_SAVE_VERSION.to_string(),
    ]);
    assert!(output.status.success());
    let record = StateRecord::from_bytes(&std::fs::read(&converted).expect("read")).expect("decode");
    assert_eq!(record.version, LEGACY_SAVE_VERSION);
    assert_eq!(record.vars.get(61).expect("get"), 3);

    let rejected = advstate(&[
        "convert",
        save.to_str().expect("utf8 path"),
        "-o",
        converted.to_str().expect("utf8 path"),
        "--version",
        &(SAVE_VERSION + 1).to_string(),
    ]);
    assert!(!rejected.status.success());
}

#[test]
fn eval_accepts_negated_conditions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let save = dir.path().join("slot_002.m3s");
    write_save(&save);

    let output = advstate(&["eval", save.to_str().expect("utf8 path"), "--", "-8253"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["description"], "c[LocationAge != 3]");
    assert_eq!(report["result"], false);
}

#[test]
fn list_skips_unreadable_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_save(&dir.path().join("a.m3s"));
    std::fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
    write_save(&dir.path().join("nested").join("b.m3s"));
    std::fs::write(dir.path().join("broken.m3s"), b"nope").expect("write");
    std::fs::write(dir.path().join("notes.txt"), b"ignored").expect("write");

    let output = advstate(&["list", dir.path().to_str().expect("utf8 path")]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line.ends_with(&format!("v{SAVE_VERSION}\tEdanna"))));
}
