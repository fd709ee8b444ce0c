mod common;

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::str::{contains, is_match};

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("pdf-summarize").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_options() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--pdfs-path"))
        .stdout(contains("--token-limit"))
        .stdout(contains("--dry-run"));
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = assert_fs::TempDir::new().unwrap();
    let pdfs = dir.child("pdfs");
    pdfs.create_dir_all().unwrap();
    common::write_pdf(pdfs.child("paper.pdf").path(), &["Some findings", "More results"]);

    cli()
        .current_dir(&dir)
        .args(["--dry-run", "--tokenizer", "simple"])
        .assert()
        .success()
        .stdout(contains("Dry Run Summary"))
        .stdout(is_match(r"PDFs Found:\s+1 ").unwrap());

    dir.child("summaries").assert(predicates::path::missing());
}

#[test]
fn missing_api_key_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("pdfs").create_dir_all().unwrap();

    cli()
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(contains("API key"));
}

#[test]
fn missing_pdfs_directory_fails() {
    let dir = assert_fs::TempDir::new().unwrap();

    cli()
        .current_dir(&dir)
        .args(["--dry-run", "--pdfs-path", "nowhere"])
        .assert()
        .failure()
        .stderr(contains("PDF directory does not exist"));
}

#[test]
fn buffer_larger_than_limit_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("pdfs").create_dir_all().unwrap();

    cli()
        .current_dir(&dir)
        .args(["--dry-run", "--token-limit", "100", "--buffer-tokens", "200"])
        .assert()
        .failure()
        .stderr(contains("buffer_tokens"));
}

#[test]
fn default_config_file_is_loaded() {
    let dir = assert_fs::TempDir::new().unwrap();
    let papers = dir.child("papers");
    papers.create_dir_all().unwrap();
    common::write_pdf(papers.child("a.pdf").path(), &["alpha"]);
    common::write_pdf(papers.child("b.pdf").path(), &["beta"]);
    dir.child("config/config.yaml")
        .write_str("file:\n  pdfs_path: papers\ntokenizer:\n  kind: simple\n")
        .unwrap();

    cli()
        .current_dir(&dir)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(is_match(r"PDFs Found:\s+2 ").unwrap());
}

#[test]
fn flags_override_config_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("papers").create_dir_all().unwrap();
    dir.child("settings.yaml")
        .write_str("file:\n  pdfs_path: does-not-exist\n")
        .unwrap();

    cli()
        .current_dir(&dir)
        .args(["--config", "settings.yaml", "--pdfs-path", "papers", "--dry-run"])
        .assert()
        .success();
}

#[test]
fn invalid_config_file_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("pdfs").create_dir_all().unwrap();
    dir.child("bad.yaml").write_str("openai:\n  engin: typo\n").unwrap();

    cli()
        .current_dir(&dir)
        .args(["--config", "bad.yaml", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("bad.yaml"));
}
