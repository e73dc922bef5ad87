//! HTTP routes for the authentication service.

use crate::handlers::{self, authentication_handler as auth};
use crate::middleware::{require_authentication, resolve_authentication};
use crate::repositories::AuthenticationStore;
use crate::services::AuthenticationService;
use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: AuthenticationService,
    /// Used by the middleware to resolve client tokens.
    pub store: Arc<dyn AuthenticationStore>,
}

/// Build the application routes.
///
/// - `/health` - liveness probe, public
/// - `/metrics` - Prometheus metrics, public
/// - `/auth/v1/self`, `/auth/v1/self/expire` - caller-scoped; 401 without a
///   valid client token
/// - `/auth/v1/tokens`, `/auth/v1/tokens/:id` - require authentication
///
/// Only `/auth/v1` requests pass through `resolve_authentication`, which builds
/// the `RequestContext` handlers receive. Operational endpoints never touch
/// the store.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let operational_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let self_routes = Router::new()
        .route("/auth/v1/self", get(auth::handle_get_self))
        .route("/auth/v1/self/expire", put(auth::handle_expire_self))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/v1/tokens", get(auth::handle_list))
        .route(
            "/auth/v1/tokens/:id",
            get(auth::handle_get).delete(auth::handle_delete),
        )
        .route_layer(middleware::from_fn(require_authentication))
        .with_state(state.clone());

    // resolve_authentication runs before the route_layer guard
    let api_routes = self_routes
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(state, resolve_authentication));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer
    // 2. TraceLayer (outermost)
    operational_routes
        .merge(api_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
}
