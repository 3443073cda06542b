//! End-to-end runs against an in-process stub of the verification service.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Path as UrlPath, extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use proxy_refresh::config::{OutputPaths, RefreshConfig};
use proxy_refresh::error::RefreshError;

/// Stub verdicts keyed by `host:port`; unknown addresses get a 500.
type Verdicts = Arc<HashMap<String, Value>>;

async fn verdict(
    State(verdicts): State<Verdicts>,
    UrlPath(addr): UrlPath<String>,
) -> Result<Json<Value>, StatusCode> {
    verdicts
        .get(&addr)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn start_stub(verdicts: HashMap<String, Value>) -> SocketAddr {
    let app = Router::new()
        .route("/check/{addr}", get(verdict))
        .with_state(Arc::new(verdicts));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn config_for(dir: &Path, stub: SocketAddr, concurrency: usize) -> RefreshConfig {
    RefreshConfig {
        store_path: dir.join("totalproxylist.txt"),
        api_template: format!("http://{stub}/check/{{ip}}:{{port}}"),
        concurrency,
        timeout: Duration::from_secs(5),
        outputs: OutputPaths::in_dir(dir),
    }
}

fn alive(cc: &str, org: &str) -> Value {
    json!([{ "proxyip": true, "countryCode": cc, "asOrganization": org }])
}

fn dead() -> Value {
    json!([{ "proxyip": false }])
}

#[tokio::test]
async fn alive_and_dead_candidates_end_to_end() {
    let stub = start_stub(HashMap::from([
        ("1.1.1.1:8080".to_string(), alive("US", "OrgA")),
        ("2.2.2.2:9090".to_string(), dead()),
    ]))
    .await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_for(dir.path(), stub, 10);
    fs::write(&cfg.store_path, "1.1.1.1,8080\n2.2.2.2,9090\n").unwrap();

    let run = proxy_refresh::refresh(&cfg).await.expect("run ok");

    assert_eq!(run.result.submitted, 2);
    assert_eq!(run.result.accounted(), 2);
    assert_eq!(fs::read_to_string(&cfg.store_path).unwrap(), "1.1.1.1,8080\n");
    assert_eq!(
        fs::read_to_string(&cfg.outputs.detail_report).unwrap(),
        "IP,Port,Country Code,ISP\n1.1.1.1,8080,US,OrgA\n"
    );
    let grouped: Value =
        serde_json::from_str(&fs::read_to_string(&cfg.outputs.grouped_report).unwrap()).unwrap();
    assert_eq!(grouped, json!({ "US": ["1.1.1.1:8080"] }));
    assert_eq!(
        fs::read_to_string(&cfg.outputs.error_log).unwrap(),
        "2.2.2.2:9090 is DEAD\n"
    );
}

#[tokio::test]
async fn service_failures_are_logged_not_fatal() {
    let stub = start_stub(HashMap::from([(
        "3.3.3.3:80".to_string(),
        json!({ "unexpected": "shape" }),
    )]))
    .await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_for(dir.path(), stub, 4);
    fs::write(&cfg.store_path, "3.3.3.3,80\n4.4.4.4,81\n").unwrap();

    let run = proxy_refresh::refresh(&cfg).await.expect("run ok");

    assert!(run.result.alive.is_empty());
    assert_eq!(fs::read_to_string(&cfg.store_path).unwrap(), "");
    let log = fs::read_to_string(&cfg.outputs.error_log).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert!(log.contains("Error parsing JSON for 3.3.3.3:80"));
    assert!(log.contains("Error checking 4.4.4.4:81"));
}

#[tokio::test]
async fn repeated_runs_are_idempotent() {
    let stub = start_stub(HashMap::from([
        ("10.0.0.1:80".to_string(), alive("US", "OrgA")),
        ("10.0.0.2:80".to_string(), alive("DE", "OrgB")),
        ("10.0.0.3:80".to_string(), dead()),
        ("10.0.0.4:80".to_string(), alive("US", "OrgC")),
    ]))
    .await;
    let dir = tempfile::tempdir().unwrap();
    // One probe at a time keeps completion order equal to input order.
    let cfg = config_for(dir.path(), stub, 1);
    fs::write(
        &cfg.store_path,
        "10.0.0.1,80\n10.0.0.2,80\n10.0.0.3,80\n10.0.0.4,80\n",
    )
    .unwrap();

    let snapshot = |cfg: &RefreshConfig| {
        [
            fs::read_to_string(&cfg.store_path).unwrap(),
            fs::read_to_string(&cfg.outputs.grouped_report).unwrap(),
            fs::read_to_string(&cfg.outputs.detail_report).unwrap(),
        ]
    };

    proxy_refresh::refresh(&cfg).await.expect("first run");
    let first = snapshot(&cfg);
    proxy_refresh::refresh(&cfg).await.expect("second run");
    let second = snapshot(&cfg);

    assert_eq!(first, second);
    assert_eq!(first[0], "10.0.0.1,80\n10.0.0.2,80\n10.0.0.4,80\n");
    // The second run saw no dead candidates.
    assert!(!cfg.outputs.error_log.exists());
}

#[tokio::test]
async fn missing_store_aborts_before_any_output() {
    let stub = start_stub(HashMap::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_for(dir.path(), stub, 10);

    let err = proxy_refresh::refresh(&cfg).await.unwrap_err();

    assert!(matches!(err, RefreshError::InputMissing { .. }));
    assert!(!cfg.outputs.grouped_report.exists());
    assert!(!cfg.outputs.detail_report.exists());
    assert!(!cfg.outputs.error_log.exists());
    assert!(!cfg.store_path.exists());
}
