//! HTTP handlers for the authentication lifecycle.
//!
//! Handlers only translate between HTTP and [`AuthenticationService`]; every
//! decision lives in the service.
//!
//! [`AuthenticationService`]: crate::services::AuthenticationService

use crate::context::RequestContext;
use crate::errors::AuthnError;
use crate::models::{Authentication, Method};
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
pub struct ListAuthenticationsQuery {
    /// Wire (`METHOD_TOKEN`) or short (`token`) name; absent lists all.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListAuthenticationsResponse {
    pub authentications: Vec<Authentication>,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpireAuthenticationSelfRequest {
    /// RFC 3339 timestamp. Absent or unparseable means now.
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl ExpireAuthenticationSelfRequest {
    pub fn requested_expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

/// `{}`
#[derive(Debug, Default, Serialize)]
pub struct EmptyResponse {}

/// Handle GET /auth/v1/self
#[instrument(skip_all, name = "authn.handler.get_self")]
pub async fn handle_get_self(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Authentication>, AuthnError> {
    let authentication = state.service.get_authentication_self(&ctx)?;
    Ok(Json(authentication))
}

/// Handle PUT /auth/v1/self/expire
///
/// The body is optional; a missing body expires the caller now.
#[instrument(skip_all, name = "authn.handler.expire_self")]
pub async fn handle_expire_self(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Option<Json<ExpireAuthenticationSelfRequest>>,
) -> Result<Json<EmptyResponse>, AuthnError> {
    let requested = body.and_then(|Json(request)| request.requested_expiry());

    state
        .service
        .expire_authentication_self(&ctx, requested)
        .await?;

    Ok(Json(EmptyResponse::default()))
}

/// Handle GET /auth/v1/tokens
#[instrument(skip_all, name = "authn.handler.list")]
pub async fn handle_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAuthenticationsQuery>,
) -> Result<Json<ListAuthenticationsResponse>, AuthnError> {
    let method = match query.method.as_deref() {
        Some(raw) => raw.parse::<Method>().map_err(AuthnError::InvalidArgument)?,
        None => Method::None,
    };

    let page = state
        .service
        .list_authentications(method, query.limit, query.page_token)
        .await?;

    Ok(Json(ListAuthenticationsResponse {
        authentications: page.results,
        next_page_token: page.next_page_token,
    }))
}

/// Handle GET /auth/v1/tokens/:id
#[instrument(skip_all, name = "authn.handler.get", fields(id = %id))]
pub async fn handle_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Authentication>, AuthnError> {
    let authentication = state.service.get_authentication(&id).await?;
    Ok(Json(authentication))
}

/// Handle DELETE /auth/v1/tokens/:id
#[instrument(skip_all, name = "authn.handler.delete", fields(id = %id))]
pub async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<EmptyResponse>, AuthnError> {
    state.service.delete_authentication(&ctx, &id).await?;
    Ok(Json(EmptyResponse::default()))
}
