//! The `kervy-terminal` binary without a cloud project: separate runs share
//! the SQLite queue, and stdout carries only command output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn write_config(dir: &Path) -> PathBuf {
    let config = dir.join("kervy.toml");
    let db = dir.join("data").join("kervy.db");
    std::fs::write(
        &config,
        format!("[storage]\ndatabase_path = {:?}\n", db.display().to_string()),
    )
    .unwrap();
    config
}

fn kervy(config: &Path, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_kervy-terminal"))
        .arg("--config")
        .arg(config)
        .args(["--email", "ana@kervy.ph", "--password", "secret1"])
        .args(args)
        .env("RUST_LOG", "info")
        .env_remove("KERVY_FIREBASE_PROJECT_ID")
        .env_remove("KERVY_FIREBASE_API_KEY")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn queued_categories(config: &Path) -> usize {
    let listing = stdout_json(&kervy(config, &["queue"]));
    listing[0]["writes"].as_array().unwrap().len()
}

#[test]
fn test_offline_category_is_flushed_by_a_later_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let added = kervy(&config, &["--offline", "add-category", "Drinks"]);
    assert_eq!(stdout_json(&added)["status"], "queued");
    assert_eq!(queued_categories(&config), 1);

    let flushed = kervy(&config, &["flush"]);
    let text = String::from_utf8_lossy(&flushed.stdout);
    assert!(text.contains("replayed 1 (categories 1, products 0)"), "{text}");
    assert_eq!(queued_categories(&config), 0);
}

#[test]
fn test_logs_go_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = kervy(&config, &["queue"]);

    let listing = stdout_json(&output);
    assert_eq!(listing.as_array().unwrap().len(), 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Opening local database"));
}
