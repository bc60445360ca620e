use std::collections::HashMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use serial_test::serial;
use testkit::{movement_lines, query_range_body};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_lokimap")
}

/// Serves `query_range` over HTTP from canned records, honouring the window
/// bounds, direction, and per-request limit like the real store does.
async fn spawn_fake_loki(records: Vec<(i64, String)>) -> u16 {
    let port = free_port();
    let records = Arc::new(records);

    async fn query_range(
        State(records): State<Arc<Vec<(i64, String)>>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let get_i64 = |key: &str, fallback: i64| {
            params
                .get(key)
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(fallback)
        };
        let start = get_i64("start", i64::MIN);
        let end = get_i64("end", i64::MAX);
        let limit = params
            .get("limit")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        let backward = params.get("direction").map(String::as_str) != Some("forward");

        let mut matched: Vec<(i64, String)> = records
            .iter()
            .filter(|(ts, _)| *ts >= start && *ts <= end)
            .cloned()
            .collect();
        matched.sort_by_key(|(ts, _)| if backward { -*ts } else { *ts });
        matched.truncate(limit);

        Json(query_range_body("loom-tg-bot", &matched))
    }

    let app = Router::new()
        .route("/loki/api/v1/query_range", get(query_range))
        .with_state(records);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

fn spawn_server(http_port: u16, loki_port: u16) -> Child {
    Command::new(bin())
        .arg("run")
        .arg("--http-addr")
        .arg(format!("127.0.0.1:{http_port}"))
        .arg("--loki-url")
        .arg(format!("http://127.0.0.1:{loki_port}"))
        .env("LOKIMAP_CONFIG", "/nonexistent/lokimap.toml")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

async fn wait_http_ready(port: u16, child: &mut Child) {
    let client = reqwest::Client::new();
    let mut ready = false;
    for _ in 0..100 {
        assert!(child.try_wait().unwrap().is_none(), "lokimap exited early");
        if client
            .get(format!("http://127.0.0.1:{port}/healthz"))
            .send()
            .await
            .is_ok()
        {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(ready, "dashboard api not ready");
}

#[tokio::test]
#[serial]
async fn e2e_movement_map_over_http() {
    let loki_port = spawn_fake_loki(movement_lines(52)).await;
    let http_port = free_port();
    let mut child = spawn_server(http_port, loki_port);
    wait_http_ready(http_port, &mut child).await;

    let entries: Value = reqwest::Client::new()
        .get(format!(
            "http://127.0.0.1:{http_port}/api/dashboard/user-movement-map/52/24"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["account_id"], 52);
    assert_eq!(entries[0]["user_name"], "Иван");
    assert_eq!(entries[0]["service"], "Сервис главного меню");
    assert_eq!(entries[0]["method"], "Перейти к контенту");
    assert_eq!(entries[0]["duration"], "648 мс");
    assert_eq!(entries[1]["service"], "Сервис меню контента");
    assert_eq!(entries[1]["duration"], "1 мин 5 с");

    let _ = child.kill();
    let _ = child.wait();
}

#[tokio::test]
#[serial]
async fn e2e_zero_window_is_bad_request() {
    let loki_port = spawn_fake_loki(Vec::new()).await;
    let http_port = free_port();
    let mut child = spawn_server(http_port, loki_port);
    wait_http_ready(http_port, &mut child).await;

    let resp = reqwest::Client::new()
        .get(format!(
            "http://127.0.0.1:{http_port}/api/dashboard/user-movement-map/52/0"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("window"));

    let _ = child.kill();
    let _ = child.wait();
}

#[tokio::test]
#[serial]
async fn e2e_unreachable_loki_is_bad_gateway() {
    let http_port = free_port();
    let mut child = spawn_server(http_port, 1);
    wait_http_ready(http_port, &mut child).await;

    let resp = reqwest::Client::new()
        .get(format!(
            "http://127.0.0.1:{http_port}/api/dashboard/user-movement-map/52/24"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);

    let _ = child.kill();
    let _ = child.wait();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn e2e_movements_cli_json_and_human() {
    let loki_port = spawn_fake_loki(movement_lines(52)).await;
    let loki_url = format!("http://127.0.0.1:{loki_port}");

    let output = Command::new(bin())
        .arg("--json")
        .arg("movements")
        .arg("52")
        .arg("--loki-url")
        .arg(&loki_url)
        .env("LOKIMAP_CONFIG", "/nonexistent/lokimap.toml")
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[0]["duration"], "648 мс");

    let output = Command::new(bin())
        .arg("movements")
        .arg("52")
        .arg("--hours")
        .arg("2")
        .arg("--loki-url")
        .arg(&loki_url)
        .env("LOKIMAP_CONFIG", "/nonexistent/lokimap.toml")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-- 2 movements --"));
    assert!(stdout.contains("Сервис главного меню"));
}
