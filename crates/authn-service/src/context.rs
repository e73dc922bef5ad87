//! Per-request context.
//!
//! The boundary layer (HTTP middleware) resolves the caller once and builds a
//! [`RequestContext`]; the service receives it as an explicit argument.

use crate::models::Authentication;
use axum::http::HeaderMap;

/// Inbound header carrying the original client address.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Resolved caller plus the inbound metadata used for audit attribution.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    authentication: Option<Authentication>,
    forwarded_for: Option<String>,
}

impl RequestContext {
    /// Context with no bound authentication and no metadata.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build from request headers and the (optionally) resolved authentication.
    ///
    /// Only the first `x-forwarded-for` value is kept, as received.
    pub fn from_headers(headers: &HeaderMap, authentication: Option<Authentication>) -> Self {
        let forwarded_for = headers
            .get_all(FORWARDED_FOR_HEADER)
            .iter()
            .next()
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Self {
            authentication,
            forwarded_for,
        }
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    pub fn with_forwarded_for(mut self, forwarded_for: impl Into<String>) -> Self {
        self.forwarded_for = Some(forwarded_for.into());
        self
    }

    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    pub fn forwarded_for(&self) -> Option<&str> {
        self.forwarded_for.as_deref()
    }
}
