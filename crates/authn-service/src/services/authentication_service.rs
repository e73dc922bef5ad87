//! Authentication lifecycle operations.
//!
//! Every operation takes an explicit [`RequestContext`] when it depends on the
//! caller, delegates persistence to the [`AuthenticationStore`], and records
//! `authn_operations_total` / `authn_operation_duration_seconds`.

use super::predicate::build_list_request;
use crate::actor::Actor;
use crate::audit::{audited_event_type, AuditAction, AuditEmitter, AuditEvent};
use crate::context::RequestContext;
use crate::errors::AuthnError;
use crate::models::{Authentication, DeleteFilter, Method, ResultSet};
use crate::observability::{metrics, status_label};
use crate::repositories::AuthenticationStore;
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument};

/// Range of years accepted for a requested expiry.
const VALID_EXPIRY_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

#[derive(Clone)]
pub struct AuthenticationService {
    store: Arc<dyn AuthenticationStore>,
    audit: AuditEmitter,
    audit_logging_enabled: bool,
}

impl AuthenticationService {
    /// Audit logging starts disabled.
    pub fn new(store: Arc<dyn AuthenticationStore>, audit: AuditEmitter) -> Self {
        Self {
            store,
            audit,
            audit_logging_enabled: false,
        }
    }

    pub fn with_audit_logging_enabled(mut self, enabled: bool) -> Self {
        self.audit_logging_enabled = enabled;
        self
    }

    pub fn audit_logging_enabled(&self) -> bool {
        self.audit_logging_enabled
    }

    /// Authentication bound to the calling request.
    #[instrument(skip_all, name = "authn.service.get_self")]
    pub fn get_authentication_self(
        &self,
        ctx: &RequestContext,
    ) -> Result<Authentication, AuthnError> {
        let start = Instant::now();
        let result = ctx
            .authentication()
            .cloned()
            .ok_or(AuthnError::Unauthenticated);
        record("get_authentication_self", start, &result);
        result
    }

    #[instrument(skip_all, name = "authn.service.get", fields(id = %id))]
    pub async fn get_authentication(&self, id: &str) -> Result<Authentication, AuthnError> {
        let start = Instant::now();
        let result = self.store.get_authentication_by_id(id).await;
        record("get_authentication", start, &result);
        result
    }

    /// One page of authentications, optionally restricted to `method`.
    ///
    /// `Method::None` lists every method. `limit == 0` means no limit.
    #[instrument(
        skip_all,
        name = "authn.service.list",
        fields(method = %method, limit = limit)
    )]
    pub async fn list_authentications(
        &self,
        method: Method,
        limit: u64,
        page_token: Option<String>,
    ) -> Result<ResultSet<Authentication>, AuthnError> {
        let start = Instant::now();
        let request = build_list_request(method, limit, page_token);

        let result = self
            .store
            .list_authentications(&request)
            .await
            .map_err(|e| {
                error!(target: "authn.service", error = %e, "listing authentication");
                e.context("listing authentications")
            });

        record("list_authentications", start, &result);
        result
    }

    /// Move the caller's expiry to `expires_at`, or to now when absent or
    /// out of range. A future time only extends; now (or earlier) logs out.
    #[instrument(skip_all, name = "authn.service.expire_self")]
    pub async fn expire_authentication_self(
        &self,
        ctx: &RequestContext,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AuthnError> {
        let start = Instant::now();
        let result = self.expire_self_inner(ctx, expires_at).await;
        record("expire_authentication_self", start, &result);
        result
    }

    async fn expire_self_inner(
        &self,
        ctx: &RequestContext,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AuthnError> {
        let authentication = ctx.authentication().ok_or(AuthnError::Unauthenticated)?;
        let expires_at = effective_expiry(expires_at, Utc::now());

        debug!(
            target: "authn.service",
            id = %authentication.id,
            expires_at = %expires_at,
            "Expiring authentication"
        );

        self.store
            .expire_authentication_by_id(&authentication.id, expires_at)
            .await
    }

    /// Delete one authentication.
    ///
    /// With audit logging enabled the record is fetched first; a failed fetch
    /// aborts without deleting. Audited methods emit a delete event before
    /// the store call.
    #[instrument(skip_all, name = "authn.service.delete", fields(id = %id))]
    pub async fn delete_authentication(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<(), AuthnError> {
        let start = Instant::now();
        let result = self.delete_inner(ctx, id).await;
        record("delete_authentication", start, &result);
        result
    }

    async fn delete_inner(&self, ctx: &RequestContext, id: &str) -> Result<(), AuthnError> {
        debug!(target: "authn.service", id = %id, "Deleting authentication");

        if self.audit_logging_enabled {
            let actor = Actor::from_context(ctx);

            let authentication = self.store.get_authentication_by_id(id).await.map_err(|e| {
                error!(
                    target: "authn.service",
                    error = %e,
                    "failed to get authentication for audit events"
                );
                e
            })?;

            if let Some(event_type) = audited_event_type(authentication.method) {
                let event = AuditEvent::new(
                    event_type,
                    AuditAction::Delete,
                    actor,
                    authentication.metadata,
                );
                self.audit.emit(event).await;
            }
        }

        self.store
            .delete_authentications(&DeleteFilter::by_id(id))
            .await?;
        Ok(())
    }
}

/// Requested expiry, or `now` when absent or outside the representable range.
pub fn effective_expiry(requested: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match requested {
        Some(t) if VALID_EXPIRY_YEARS.contains(&t.year()) => t,
        _ => now,
    }
}

fn record<T>(operation: &'static str, start: Instant, result: &Result<T, AuthnError>) {
    metrics::record_operation(operation, status_label(result), start.elapsed());
}
