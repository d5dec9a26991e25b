//! End-to-end watch loop against a fake WebDAV server and a real watcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use vaultsync_core::{Provider, Settings, SyncEvent, SyncState};
use vaultsync_daemon::{run, WatchOptions};
use vaultsync_sync::status_channel;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer, blob: &Path, enabled: bool) -> Settings {
    Settings {
        enabled,
        provider: Provider::Custom,
        base_url: format!("{}/dav/", server.uri()),
        remote_folder: "vault".into(),
        username: "alice".into(),
        password: "s3cret".into(),
        local_file: Some(blob.to_path_buf()),
        debounce_ms: Some(50),
        min_upload_interval_ms: Some(0),
        request_timeout_secs: 5,
        ..Settings::default()
    }
}

async fn mount_store(server: &MockServer) {
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(207))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
}

async fn wait_for(events: &mut UnboundedReceiver<SyncEvent>, state: SyncState) {
    timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.expect("event stream open");
            if event.state() == state {
                return;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {state}"));
}

struct Running {
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<Result<(), vaultsync_daemon::DaemonError>>,
    events: UnboundedReceiver<SyncEvent>,
}

fn spawn_run(settings: Settings, home: PathBuf, options: WatchOptions) -> Running {
    let shutdown = CancellationToken::new();
    let (observer, events) = status_channel();
    let handle = tokio::spawn(run(settings, home, options, observer, shutdown.clone()));
    Running {
        shutdown,
        handle,
        events,
    }
}

impl Running {
    async fn stop(self) {
        self.shutdown.cancel();
        timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("run exits after shutdown")
            .expect("run task")
            .expect("run result");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn saving_the_blob_pushes_it() {
    let server = MockServer::start().await;
    mount_store(&server).await;
    let home = TempDir::new().unwrap();
    let blob = home.path().join("vault").join("data.enc");
    std::fs::create_dir_all(blob.parent().unwrap()).unwrap();
    std::fs::write(&blob, b"v0").unwrap();

    let mut running = spawn_run(
        settings_for(&server, &blob, true),
        home.path().to_path_buf(),
        WatchOptions::default(),
    );
    wait_for(&mut running.events, SyncState::Connected).await;
    // Give the watcher a moment to register after the probe.
    tokio::time::sleep(Duration::from_millis(300)).await;

    std::fs::write(&blob, b"v1").unwrap();
    wait_for(&mut running.events, SyncState::Uploaded).await;

    let puts: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .collect();
    assert!(!puts.is_empty());
    assert_eq!(puts.last().unwrap().body, b"v1");

    running.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn pull_first_refreshes_local_copy_before_probing() {
    let server = MockServer::start().await;
    mount_store(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"from remote".to_vec()))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    let blob = home.path().join("data.enc");

    let mut running = spawn_run(
        settings_for(&server, &blob, true),
        home.path().to_path_buf(),
        WatchOptions { pull_first: true },
    );
    wait_for(&mut running.events, SyncState::Connected).await;
    assert_eq!(std::fs::read(&blob).unwrap(), b"from remote");

    running.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn disabled_settings_report_disabled_and_stay_offline() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    let blob = home.path().join("data.enc");

    let mut running = spawn_run(
        settings_for(&server, &blob, false),
        home.path().to_path_buf(),
        WatchOptions { pull_first: true },
    );
    wait_for(&mut running.events, SyncState::Disabled).await;
    running.stop().await;

    assert!(server.received_requests().await.unwrap().is_empty());
}
