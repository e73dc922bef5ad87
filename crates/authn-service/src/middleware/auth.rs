//! Request authentication middleware.
//!
//! - `resolve_authentication` - resolves the Bearer client token (if any) and
//!   inserts a [`RequestContext`] into request extensions. Never rejects on
//!   an unknown or expired token; the request simply carries no authentication.
//! - `require_authentication` - rejects requests whose context has no
//!   authentication with 401.

use crate::context::RequestContext;
use crate::errors::{AuthnError, ErrorKind};
use crate::models::Authentication;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Bearer token from the Authorization header, if well-formed.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
        _ => {
            tracing::debug!(target: "authn.middleware.auth", "Invalid Authorization header format");
            None
        }
    }
}

async fn resolve(state: &AppState, token: &str) -> Result<Option<Authentication>, AuthnError> {
    match state.store.get_authentication_by_client_token(token).await {
        Ok(authentication) if authentication.is_expired_at(Utc::now()) => {
            tracing::debug!(
                target: "authn.middleware.auth",
                id = %authentication.id,
                "Client token expired"
            );
            Ok(None)
        }
        Ok(authentication) => Ok(Some(authentication)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(target: "authn.middleware.auth", "Unknown client token");
            Ok(None)
        }
        Err(e) => Err(e.context("resolving client token")),
    }
}

#[instrument(skip_all, name = "authn.middleware.resolve")]
pub async fn resolve_authentication(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let authentication = match extract_bearer_token(req.headers()) {
        Some(token) => match resolve(&state, &token).await {
            Ok(authentication) => authentication,
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    let ctx = RequestContext::from_headers(req.headers(), authentication);
    req.extensions_mut().insert(ctx);

    next.run(req).await
}

pub async fn require_authentication(req: Request, next: Next) -> Result<Response, AuthnError> {
    let authenticated = req
        .extensions()
        .get::<RequestContext>()
        .is_some_and(|ctx| ctx.authentication().is_some());

    if !authenticated {
        return Err(AuthnError::Unauthenticated);
    }

    Ok(next.run(req).await)
}
