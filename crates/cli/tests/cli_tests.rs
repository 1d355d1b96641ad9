#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CACHE_VARS: [&str; 8] = [
    "NXCACHE_ARTIFACTORY_URL",
    "NXCACHE_ARTIFACTORY_REPO_KEY",
    "NXCACHE_ARTIFACTORY_BASIC_HTTP_AUTH",
    "ARTIFACTORY_ACCESS_TOKEN",
    "NXCACHE_VERBOSE_LOGGING",
    "NXCACHE_ARTIFACTORY_DISABLE",
    "NXCACHE_SKIP_NX_CACHE",
    "RUST_LOG",
];

/// The binary with every cache-related variable cleared
fn artcache() -> Command {
    let mut cmd = Command::cargo_bin("artcache").unwrap();
    for var in CACHE_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    artcache()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("retrieve"))
        .stdout(predicate::str::contains("store"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_check_without_configuration_lists_missing_options() {
    artcache()
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NXCACHE_ARTIFACTORY_URL | url"))
        .stderr(predicate::str::contains("NXCACHE_ARTIFACTORY_REPO_KEY | repoKey"));
}

#[test]
fn test_check_with_flags_succeeds() {
    artcache()
        .args(["--url", "https://example.com/artifactory/", "--repo-key", "nx"])
        .arg("check")
        .assert()
        .success()
        .stdout("https://example.com/artifactory/nx\n");
}

#[test]
fn test_check_reads_config_file_and_environment() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("cache.json");
    fs::write(&config, r#"{ "url": "https://example.com" }"#).unwrap();

    artcache()
        .env("NXCACHE_ARTIFACTORY_REPO_KEY", "from-env")
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/from-env"));
}

#[cfg(unix)]
#[test]
fn test_run_with_remote_disabled_caches_locally() {
    let temp = TempDir::new().unwrap();
    let cache_dir = temp.path().join("cache");
    let marker = temp.path().join("runs");
    let script = format!(
        "echo built > \"$ARTCACHE_OUTPUT_DIR/out.txt\"; echo run >> {}",
        marker.display()
    );

    for _ in 0..2 {
        artcache()
            .env("NXCACHE_ARTIFACTORY_DISABLE", "true")
            .arg("--cache-dir")
            .arg(&cache_dir)
            .args(["run", "--hash", "abc123", "--", "sh", "-c", &script])
            .assert()
            .success()
            .stderr(predicate::str::contains("USING LOCAL CACHE"));
    }

    assert_eq!(
        fs::read_to_string(cache_dir.join("abc123/out.txt")).unwrap(),
        "built\n"
    );
    assert_eq!(
        fs::read_to_string(cache_dir.join("abc123.commit")).unwrap(),
        "true"
    );
    // Second invocation was served from the local commit marker
    assert_eq!(fs::read_to_string(&marker).unwrap(), "run\n");
}

#[cfg(unix)]
#[test]
fn test_run_propagates_exit_code_and_skips_commit() {
    let temp = TempDir::new().unwrap();

    artcache()
        .env("NXCACHE_ARTIFACTORY_DISABLE", "true")
        .arg("--cache-dir")
        .arg(temp.path())
        .args(["run", "--hash", "bad1", "--", "sh", "-c", "exit 3"])
        .assert()
        .code(3);

    assert!(!temp.path().join("bad1.commit").exists());
}

#[cfg(unix)]
#[test]
fn test_run_exports_hash() {
    let temp = TempDir::new().unwrap();

    artcache()
        .env("NXCACHE_ARTIFACTORY_DISABLE", "true")
        .env("NXCACHE_SKIP_NX_CACHE", "true")
        .arg("--cache-dir")
        .arg(temp.path())
        .args(["run", "--hash", "h42", "--", "sh", "-c", "echo \"hash=$ARTCACHE_HASH\""])
        .assert()
        .success()
        .stdout(predicate::str::contains("hash=h42"))
        .stderr(predicate::str::contains("USING LOCAL CACHE").not());
}

#[cfg(unix)]
#[test]
fn test_run_misconfigured_remote_still_runs_command() {
    let temp = TempDir::new().unwrap();

    artcache()
        .env("NXCACHE_ARTIFACTORY_URL", "https://example.com")
        .arg("--cache-dir")
        .arg(temp.path())
        .args(["run", "--hash", "m1", "--", "true"])
        .assert()
        .success()
        .stderr(predicate::str::contains("USING LOCAL CACHE"));

    assert!(temp.path().join("m1.commit").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retrieve_reports_miss() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/nx/abc123.tar.gz"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    artcache()
        .args(["--url", &server.uri(), "--repo-key", "nx"])
        .arg("--cache-dir")
        .arg(temp.path())
        .args(["retrieve", "abc123"])
        .assert()
        .success()
        .stdout("miss\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retrieve_surfaces_remote_failure() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();

    artcache()
        .args(["--url", &server.uri(), "--repo-key", "nx"])
        .arg("--cache-dir")
        .arg(temp.path())
        .args(["retrieve", "abc123"])
        .assert()
        .failure()
        .stdout("miss\n")
        .stderr(predicate::str::contains("Check cache error"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_store_uploads_entry() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/nx/def456.tar.gz"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("def456")).unwrap();
    fs::write(temp.path().join("def456/terminalOutput"), "ok").unwrap();

    artcache()
        .args(["--url", &server.uri(), "--repo-key", "nx"])
        .arg("--cache-dir")
        .arg(temp.path())
        .args(["store", "def456"])
        .assert()
        .success()
        .stdout("stored\n");
}
