use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vaultsync(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vaultsync").expect("vaultsync binary");
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("VAULTSYNC_PASSWORD")
        .env("NO_COLOR", "1");
    cmd
}

fn configure(home: &Path, pairs: &[(&str, &str)]) {
    for (key, value) in pairs {
        vaultsync(home)
            .args(["config", "set", key, value])
            .assert()
            .success();
    }
}

#[test]
fn config_init_writes_disabled_defaults() {
    let home = TempDir::new().unwrap();

    vaultsync(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote default settings"));

    let written = std::fs::read_to_string(home.path().join(".vaultsync/settings.yaml")).unwrap();
    assert!(written.contains("enabled: false"));
    assert!(written.contains("dav.jianguoyun.com"));

    vaultsync(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn config_show_hides_the_password() {
    let home = TempDir::new().unwrap();
    configure(home.path(), &[("username", "alice"), ("password", "hunter2")]);

    vaultsync(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn config_set_rejects_unknown_keys_and_bad_values() {
    let home = TempDir::new().unwrap();

    vaultsync(home.path())
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown settings key 'colour'"));

    vaultsync(home.path())
        .args(["config", "set", "debounce-ms", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("debounce-ms"));
}

#[test]
fn probe_reports_disabled_and_fails() {
    let home = TempDir::new().unwrap();

    vaultsync(home.path())
        .arg("probe")
        .assert()
        .failure()
        .stdout(predicate::str::contains("disabled"))
        .stderr(predicate::str::contains("sync is disabled"));
}

#[test]
fn push_refuses_when_disabled() {
    let home = TempDir::new().unwrap();

    vaultsync(home.path())
        .arg("push")
        .assert()
        .failure()
        .stderr(predicate::str::contains("sync is disabled"));
}

#[tokio::test(flavor = "multi_thread")]
async fn probe_and_push_against_a_webdav_server() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(207))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(body_bytes(b"sealed".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let blob = home.path().join("data.enc");
    std::fs::write(&blob, b"sealed").unwrap();
    let base_url = format!("{}/dav/", server.uri());
    let blob_arg = blob.display().to_string();

    let home_path = home.path().to_path_buf();
    tokio::task::spawn_blocking(move || {
        configure(
            &home_path,
            &[
                ("provider", "custom"),
                ("base-url", &base_url),
                ("username", "alice"),
                ("password", "s3cret"),
                ("local-file", &blob_arg),
                ("enabled", "true"),
            ],
        );

        vaultsync(&home_path)
            .arg("probe")
            .assert()
            .success()
            .stdout(predicate::str::contains("connected"));

        vaultsync(&home_path)
            .arg("push")
            .assert()
            .success()
            .stdout(predicate::str::contains("pushed 6 bytes"));
    })
    .await
    .unwrap();
}
