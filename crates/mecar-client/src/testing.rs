//! Test utilities for mecar-client
//!
//! Provides an in-memory stand-in for the vendor API and a server that
//! hosts it on a loopback port.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::RwLock;
use tokio::net::TcpListener;

use crate::{Container, MeClient, Result};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: MeClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Create a new test server from an axum Router
    pub async fn start(router: Router) -> Result<Self> {
        Self::start_with_timeout(router, Duration::from_secs(5), Duration::from_secs(2)).await
    }

    /// Create a new test server with custom timeouts
    pub async fn start_with_timeout(
        router: Router,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let base_url = format!("http://{}/", addr);
        let client = MeClient::with_options(&base_url, Some("test-token"), timeout, connect_timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Canned answer for one container
#[derive(Debug, Clone)]
struct CannedResponse {
    status: StatusCode,
    body: Option<serde_json::Value>,
}

/// In-memory vendor API.
///
/// Unknown VIN/container pairs answer `404` with a JSON reason.
#[derive(Debug, Clone, Default)]
pub struct MockVendor {
    responses: Arc<RwLock<HashMap<(String, Container), CannedResponse>>>,
    requests: Arc<AtomicUsize>,
    last_authorization: Arc<RwLock<Option<String>>>,
}

impl MockVendor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `200` with the given JSON body
    pub fn set_json(&self, vin: &str, container: Container, body: serde_json::Value) {
        self.set_status(vin, container, 200, Some(body));
    }

    /// Answer with an arbitrary status and optional JSON body
    pub fn set_status(
        &self,
        vin: &str,
        container: Container,
        status: u16,
        body: Option<serde_json::Value>,
    ) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.responses
            .write()
            .insert((vin.to_string(), container), CannedResponse { status, body });
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent request
    pub fn last_authorization(&self) -> Option<String> {
        self.last_authorization.read().clone()
    }

    /// Router serving `/vehicles/{vin}/containers/{container}`
    pub fn router(&self) -> Router {
        Router::new()
            .route("/vehicles/{vin}/containers/{container}", get(serve_container))
            .with_state(self.clone())
    }
}

async fn serve_container(
    State(vendor): State<MockVendor>,
    Path((vin, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    vendor.requests.fetch_add(1, Ordering::SeqCst);
    *vendor.last_authorization.write() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let canned = Container::from_path(&container)
        .and_then(|c| vendor.responses.read().get(&(vin, c)).cloned());

    match canned {
        Some(CannedResponse {
            status,
            body: Some(body),
        }) => (status, Json(body)).into_response(),
        Some(CannedResponse { status, body: None }) => status.into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"reason": "container not found"})),
        )
            .into_response(),
    }
}
