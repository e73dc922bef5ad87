//! Test server harness for E2E testing
//!
//! Provides TestAuthnServer for spawning real authentication service
//! instances, backed by an in-memory store, in tests.

use crate::recording_sink::RecordingAuditSink;
use authn_service::audit::AuditExporter;
use authn_service::observability::metrics::init_metrics_recorder;
use authn_service::repositories::MemoryStore;
use authn_service::routes::{self, AppState};
use authn_service::services::AuthenticationService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning the authentication service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_delete_e2e() -> Result<()> {
///     let server = TestAuthnServer::spawn(true).await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .delete(format!("{}/auth/v1/tokens/{}", server.url(), id))
///         .bearer_auth(&token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthnServer {
    addr: SocketAddr,
    store: Arc<MemoryStore>,
    audit_sink: Arc<RecordingAuditSink>,
    cancel_token: CancellationToken,
    exporter_handle: Option<JoinHandle<()>>,
    _handle: JoinHandle<()>,
}

impl TestAuthnServer {
    /// Spawn a new test server instance with an empty store
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Export audit events to a [`RecordingAuditSink`]
    /// - Start the HTTP server in the background
    pub async fn spawn(audit_logging_enabled: bool) -> Result<Self, anyhow::Error> {
        let store = Arc::new(MemoryStore::new());
        let audit_sink = Arc::new(RecordingAuditSink::new());
        let cancel_token = CancellationToken::new();

        let (emitter, exporter_handle) = AuditExporter::spawn(
            audit_sink.clone(),
            64,
            Duration::from_millis(50),
            cancel_token.clone(),
        );

        let service = AuthenticationService::new(store.clone(), emitter)
            .with_audit_logging_enabled(audit_logging_enabled);
        let state = Arc::new(AppState {
            service,
            store: store.clone(),
        });

        // Initialize metrics recorder for test server
        // Note: This may fail if already installed in the test process.
        // In that case, we create a new recorder without installing it globally.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        // Build routes using the service's real route builder
        let app = routes::build_routes(state, metrics_handle);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            audit_sink,
            cancel_token,
            exporter_handle: Some(exporter_handle),
            _handle: handle,
        })
    }

    /// Get reference to the backing store
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Events the audit exporter has delivered so far
    pub fn audit_sink(&self) -> &RecordingAuditSink {
        &self.audit_sink
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop the audit exporter, waiting for it to flush queued events
    pub async fn shutdown_audit(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.exporter_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestAuthnServer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self._handle.abort();
    }
}
