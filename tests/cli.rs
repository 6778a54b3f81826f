use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn kidx_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_kidx"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let knowledge = root.join("knowledge");
    for bucket in ["base", "public", "private"] {
        fs::create_dir_all(knowledge.join(bucket)).unwrap();
    }
    fs::write(
        knowledge.join("base").join("hours.md"),
        "# Hours\n\nOur hours are 9-5, Monday to Friday.",
    )
    .unwrap();
    fs::write(
        knowledge.join("public").join("shipping.md"),
        "# Shipping\n\nWe ship worldwide.\nOrders leave the warehouse within two days.",
    )
    .unwrap();
    fs::write(
        knowledge.join("private").join("roadmap.txt"),
        "Launch plan: the new catalogue goes live in spring.",
    )
    .unwrap();
    fs::write(knowledge.join("public").join("ignored.csv"), "a,b,c").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/kidx.sqlite"

[corpus]
root = "{root}/knowledge"
include_globs = ["**/*.md", "**/*.txt"]

[chunking]
max_chars = 900

[embedding]
provider = "disabled"

[retrieval]
top_k = 3
"#,
        root = root.display()
    );

    let config_path = config_dir.join("kidx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_kidx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = kidx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run kidx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config) = setup_test_env();

    let (stdout, stderr, success) = run_kidx(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("initialized"));

    let (stdout, stderr, success) = run_kidx(&config, &["init"]);
    assert!(success, "second init failed: {}", stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_build_dry_run_counts_documents() {
    let (_tmp, config) = setup_test_env();

    let (stdout, stderr, success) = run_kidx(&config, &["build", "--dry-run"]);
    assert!(success, "dry run failed: {}", stderr);
    assert!(stdout.contains("build (dry-run)"));
    assert!(stdout.contains("documents: 3"));
    assert!(stdout.contains("chunks: 3"));
    assert!(stdout.contains("pending embeddings: 3"));
}

#[test]
fn test_build_with_disabled_provider_fails_after_inserting_chunks() {
    let (_tmp, config) = setup_test_env();

    let (_stdout, stderr, success) = run_kidx(&config, &["build"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "unexpected stderr: {}", stderr);

    let (stdout, stderr, success) = run_kidx(&config, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Chunks:      3"));
    assert!(stdout.contains("Embedded:    0 / 3"));
}

#[test]
fn test_stats_on_fresh_database() {
    let (_tmp, config) = setup_test_env();

    let (stdout, stderr, success) = run_kidx(&config, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Chunks:      0"));
}

#[test]
fn test_query_rejects_unknown_mode() {
    let (_tmp, config) = setup_test_env();

    let (_stdout, stderr, success) = run_kidx(&config, &["query", "hours", "--mode", "secret"]);
    assert!(!success);
    assert!(stderr.contains("secret"));
}

#[test]
fn test_query_with_disabled_provider_is_an_error() {
    let (_tmp, config) = setup_test_env();

    let (_stdout, stderr, success) = run_kidx(&config, &["query", "what are your hours"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "unexpected stderr: {}", stderr);
}

#[test]
fn test_missing_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_stdout, stderr, success) = run_kidx(&missing, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
