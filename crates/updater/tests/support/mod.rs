//! Test support: a local fake content server
//!
//! Serves the consumer-metadata/snapshot/changes endpoint family the
//! downloader stages speak, in raw and XZ flavors, on an ephemeral port.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

pub struct ServerState {
    addr: SocketAddr,
    last_offset: u64,
    snapshot_xz: Vec<u8>,
    slow: bool,
}

pub struct FakeServer {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

pub fn xz_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn snapshot_body() -> Vec<u8> {
    serde_json::to_vec(&json!({"key": "value"})).unwrap()
}

async fn consumers(State(state): State<Arc<ServerState>>, flavor: &str) -> Json<Value> {
    if state.slow {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    }
    Json(json!({
        "data": {
            "last_offset": state.last_offset,
            "last_snapshot_offset": 3,
            // Scheme-less, as consumer metadata advertises it.
            "last_snapshot_link": format!("{}/{}/snapshot", state.addr, flavor),
        }
    }))
}

async fn raw_consumers(state: State<Arc<ServerState>>) -> Json<Value> {
    consumers(state, "raw").await
}

async fn xz_consumers(state: State<Arc<ServerState>>) -> Json<Value> {
    consumers(state, "xz").await
}

async fn raw_snapshot() -> Vec<u8> {
    snapshot_body()
}

async fn xz_snapshot(State(state): State<Arc<ServerState>>) -> Vec<u8> {
    state.snapshot_xz.clone()
}

fn changes_body() -> Value {
    json!({
        "data": [
            {"offset": 1, "type": "create", "version": 1, "payload": {"cve": "CVE-2024-0001"}},
            {"offset": 2, "type": "update", "version": 2, "payload": {"cve": "CVE-2024-0002"}},
        ]
    })
}

async fn raw_changes() -> Json<Value> {
    Json(changes_body())
}

async fn xz_changes() -> Vec<u8> {
    xz_compress(&serde_json::to_vec(&changes_body()).unwrap())
}

impl FakeServer {
    pub async fn start(last_offset: u64) -> Self {
        Self::start_inner(last_offset, false).await
    }

    /// Variant whose consumer endpoint stalls, for overlap tests
    pub async fn start_slow(last_offset: u64) -> Self {
        Self::start_inner(last_offset, true).await
    }

    async fn start_inner(last_offset: u64, slow: bool) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(ServerState {
            addr,
            last_offset,
            snapshot_xz: xz_compress(&snapshot_body()),
            slow,
        });

        let app = Router::new()
            .route("/raw/consumers", get(raw_consumers))
            .route("/raw/consumers/changes", get(raw_changes))
            .route("/raw/snapshot", get(raw_snapshot))
            .route("/xz/consumers", get(xz_consumers))
            .route("/xz/consumers/changes", get(xz_changes))
            .route("/xz/snapshot", get(xz_snapshot))
            .with_state(state);

        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Action parameter document pointing at a test workspace
pub fn action_params(
    topic: &str,
    url: &str,
    output: &std::path::Path,
    content_source: &str,
    compression: &str,
    file_name: &str,
) -> Value {
    json!({
        "topicName": topic,
        "interval": 1,
        "ondemand": true,
        "configData": {
            "url": url,
            "contentSource": content_source,
            "compressionType": compression,
            "dataFormat": "json",
            "outputFolder": output.display().to_string(),
            "contentFileName": file_name,
            "consumerName": "test_consumer"
        }
    })
}

pub fn dir_entries(path: &std::path::Path) -> Vec<String> {
    match std::fs::read_dir(path) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
