mod common;

use std::net::SocketAddr;
use std::time::Duration;

use assert_fs::prelude::*;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use predicates::prelude::*;

use imagecompare::{
    create_router,
    loadgen::{self, load_image_base64, LoadTestConfig, WaitTime, PLACEHOLDER_PNG_BASE64},
    Config,
};

use common::{png_bytes, state_with, ScriptedModel};

async fn spawn_server(replies: &[&str]) -> SocketAddr {
    let model = ScriptedModel::new(replies.iter().copied());
    let app = create_router(state_with(model, Config::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn quick_config(addr: SocketAddr) -> LoadTestConfig {
    LoadTestConfig {
        host: format!("http://{}", addr),
        users: 3,
        spawn_rate: 100.0,
        wait: WaitTime::between(0.0, 0.01).unwrap(),
        run_time: Some(Duration::from_secs(30)),
        iterations: Some(4),
        image1: None,
        image2: None,
    }
}

#[test]
fn test_load_image_from_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("cat.png");
    let bytes = png_bytes(3, 2, [200, 100, 50]);
    file.write_binary(&bytes).unwrap();
    file.assert(predicate::path::is_file());

    let encoded = load_image_base64(Some(file.path()));
    assert_eq!(STANDARD.decode(encoded).unwrap(), bytes);

    let missing = temp.child("dog.png");
    missing.assert(predicate::path::missing());
    assert_eq!(load_image_base64(Some(missing.path())), PLACEHOLDER_PNG_BASE64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_all_requests_succeed_against_live_server() {
    let addr = spawn_server(&["Score: 99\nExplanation: identical placeholders"]).await;

    let report = loadgen::run(quick_config(addr)).await.unwrap();

    assert_eq!(report.total(), 12);
    assert_eq!(report.successes, 12);
    assert_eq!(report.failure_count(), 0);
    assert_eq!(report.latencies.len(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_errors_are_recorded_as_failures() {
    // No scripted replies: every uncached comparison fails with 500.
    let addr = spawn_server(&[]).await;
    let config = LoadTestConfig {
        users: 1,
        iterations: Some(2),
        ..quick_config(addr)
    };

    let report = loadgen::run(config).await.unwrap();

    assert_eq!(report.successes, 0);
    assert_eq!(
        report.failures.get("Failed with status code: 500"),
        Some(&2)
    );
}

#[tokio::test]
async fn test_unreachable_host_is_a_failure_not_an_error() {
    let config = LoadTestConfig {
        host: "http://127.0.0.1:9".to_string(),
        users: 1,
        iterations: Some(1),
        wait: WaitTime::between(0.0, 0.0).unwrap(),
        ..LoadTestConfig::default()
    };

    let report = loadgen::run(config).await.unwrap();

    assert_eq!(report.total(), 1);
    assert_eq!(report.failure_count(), 1);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = LoadTestConfig {
        users: 0,
        ..LoadTestConfig::default()
    };
    assert!(loadgen::run(config).await.is_err());
}
