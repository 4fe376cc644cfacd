mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::TestFixtures;
use tempfile::TempDir;

/// Run the binary with config, auth and context isolated under `home`
fn govlint(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_govlint"))
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("GOVLINT_AUTH_CONFIG", home.join("auth.json"))
        .env("GOVLINT_CONTEXT_FILE", home.join("context.json"))
        .env_remove("GOVLINT_FAIL_SEVERITY")
        .env_remove("GOVLINT_DIAGNOSTICS_FORMAT")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run govlint")
}

#[test]
fn test_valid_document_exits_zero() {
    let fixtures = TestFixtures::new();
    let home = TempDir::new().unwrap();
    let path = fixtures.valid().display().to_string();

    let output = govlint(home.path(), &["validate", &path]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains(&format!(
        "{path} is valid! You don't have governance issues."
    )));
}

#[test]
fn test_invalid_document_exits_one() {
    let fixtures = TestFixtures::new();
    let home = TempDir::new().unwrap();
    let path = fixtures.missing_paths().display().to_string();

    let output = govlint(home.path(), &["validate", &path]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("oas-document-schema"));
    assert!(stdout.contains(&format!("{path} has governance issues")));
}

#[test]
fn test_fail_severity_flag() {
    let fixtures = TestFixtures::new();
    let home = TempDir::new().unwrap();
    let path = fixtures.with_warnings().display().to_string();

    let lenient = govlint(home.path(), &["validate", &path]);
    assert!(lenient.status.success());
    assert!(String::from_utf8_lossy(&lenient.stdout).contains("is valid, but it has governance issues"));

    let strict = govlint(home.path(), &["validate", &path, "--fail-severity", "warn"]);
    assert_eq!(strict.status.code(), Some(1));
}

#[test]
fn test_missing_file_reports_kind_and_exits_two() {
    let home = TempDir::new().unwrap();

    let output = govlint(home.path(), &["validate", "./nowhere.yaml"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("document-not-found:"), "stderr: {stderr}");
}

#[test]
fn test_conventional_file_used_without_reference() {
    let fixtures = TestFixtures::new();
    let home = TempDir::new().unwrap();
    std::fs::copy(fixtures.valid(), home.path().join("spec.yaml")).unwrap();

    let output = govlint(home.path(), &["validate"]);
    assert!(output.status.success());
}

#[test]
fn test_output_file_written_in_format() {
    let fixtures = TestFixtures::new();
    let home = TempDir::new().unwrap();
    let path = fixtures.with_warnings().display().to_string();
    let report = home.path().join("reports").join("result.json");

    let output = govlint(
        home.path(),
        &[
            "validate",
            &path,
            "-f",
            "json",
            "-o",
            &report.display().to_string(),
        ],
    );
    assert!(output.status.success());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 7);
}

#[test]
fn test_wrong_output_extension_is_a_warning() {
    let fixtures = TestFixtures::new();
    let home = TempDir::new().unwrap();
    let path = fixtures.valid().display().to_string();
    let report = home.path().join("result.txt");

    let output = govlint(
        home.path(),
        &[
            "validate",
            &path,
            "--diagnostics-format",
            "json",
            "--output",
            &report.display().to_string(),
        ],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success());
    assert!(stderr.contains("invalid-output-extension"), "stderr: {stderr}");
    assert!(!report.exists());
}

#[test]
fn test_suppress_all_warnings_flag() {
    let fixtures = TestFixtures::new();
    let home = TempDir::new().unwrap();
    let path = fixtures.missing_paths().display().to_string();

    let output = govlint(home.path(), &["validate", &path, "--suppress-all-warnings"]);
    assert!(output.status.success());
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    let output = govlint(home.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("serve"));
}
