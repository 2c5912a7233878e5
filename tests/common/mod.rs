//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use octomatic_telemetry::config::LoggerConfig;
use octomatic_telemetry::logging::MemoryConsole;
use octomatic_telemetry::LogLevel;

#[derive(Clone, Default)]
struct CollectorState {
    received: Arc<Mutex<Vec<(String, Value)>>>,
    status: Arc<AtomicU16>,
    delay_ms: Arc<AtomicU64>,
    notify: Arc<Notify>,
}

/// A mock collector that records every JSON POST by path.
pub struct Collector {
    pub addr: SocketAddr,
    state: CollectorState,
}

impl Collector {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = CollectorState::default();
        state.status.store(200, Ordering::SeqCst);

        let app = Router::new()
            .route("/{*path}", post(capture))
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path)
    }

    /// Status returned for subsequent requests.
    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    /// Hold each response this long before answering.
    pub fn delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Bodies received on `path`, in arrival order. Failed requests count too.
    pub fn bodies(&self, path: &str) -> Vec<Value> {
        self.state
            .received
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.state.received.lock().unwrap().len()
    }

    /// Wait until at least `count` requests arrived, failing after 5 s.
    pub async fn wait_for(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.state.notify.notified();
                if self.total() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await;
        assert!(waited.is_ok(), "collector received {} of {} requests", self.total(), count);
    }
}

async fn capture(
    State(state): State<CollectorState>,
    Path(path): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.received.lock().unwrap().push((path, body));
    state.notify.notify_waiters();

    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

/// Remote-enabled logger settings with console output on.
pub fn remote_logger_config(batch_size: usize) -> LoggerConfig {
    LoggerConfig {
        level: LogLevel::Debug,
        enable_remote_logging: true,
        enable_console_output: true,
        max_retries: 3,
        batch_size,
        flush_interval_ms: 30_000,
    }
}

pub fn console() -> Arc<MemoryConsole> {
    Arc::new(MemoryConsole::new())
}
