//! Data models for the authentication lifecycle.
//!
//! [`Authentication`] records are owned by the store; everything here is a
//! value type passed between the service, the store and the HTTP layer.

use chrono::{DateTime, Utc};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Prefix carried by the wire names of [`Method`] variants.
pub const METHOD_PREFIX: &str = "METHOD_";

/// Authentication method.
///
/// `None` is a list-filter sentinel meaning "any method"; it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Method {
    #[default]
    #[serde(rename = "METHOD_NONE")]
    None,
    #[serde(rename = "METHOD_TOKEN")]
    Token,
    #[serde(rename = "METHOD_OIDC")]
    Oidc,
    #[serde(rename = "METHOD_KUBERNETES")]
    Kubernetes,
    #[serde(rename = "METHOD_GITHUB")]
    Github,
    #[serde(rename = "METHOD_JWT")]
    Jwt,
}

impl Method {
    /// Every storable method (excludes the `None` sentinel).
    pub const STORABLE: [Method; 5] = [
        Method::Token,
        Method::Oidc,
        Method::Kubernetes,
        Method::Github,
        Method::Jwt,
    ];

    /// Wire name, e.g. `METHOD_TOKEN`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Method::None => "METHOD_NONE",
            Method::Token => "METHOD_TOKEN",
            Method::Oidc => "METHOD_OIDC",
            Method::Kubernetes => "METHOD_KUBERNETES",
            Method::Github => "METHOD_GITHUB",
            Method::Jwt => "METHOD_JWT",
        }
    }

    /// Short lower-case name, e.g. `token`.
    pub fn short_name(&self) -> String {
        self.wire_name()
            .trim_start_matches(METHOD_PREFIX)
            .to_ascii_lowercase()
    }

    /// Stable numeric code used by the PostgreSQL store.
    pub fn code(&self) -> i16 {
        match self {
            Method::None => 0,
            Method::Token => 1,
            Method::Oidc => 2,
            Method::Kubernetes => 3,
            Method::Github => 4,
            Method::Jwt => 5,
        }
    }

    /// Inverse of [`Method::code`].
    pub fn from_code(code: i16) -> Option<Method> {
        match code {
            0 => Some(Method::None),
            1 => Some(Method::Token),
            2 => Some(Method::Oidc),
            3 => Some(Method::Kubernetes),
            4 => Some(Method::Github),
            5 => Some(Method::Jwt),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Method {
    type Err = String;

    /// Accepts wire names (`METHOD_TOKEN`) and short names (`token`), any case.
    /// An empty string is the `None` filter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix(METHOD_PREFIX).unwrap_or(&upper);
        match name {
            "" | "NONE" => Ok(Method::None),
            "TOKEN" => Ok(Method::Token),
            "OIDC" => Ok(Method::Oidc),
            "KUBERNETES" => Ok(Method::Kubernetes),
            "GITHUB" => Ok(Method::Github),
            "JWT" => Ok(Method::Jwt),
            _ => Err(format!("unknown authentication method: {s}")),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Identity record of a successfully authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub id: String,
    pub method: Method,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// `None` means the authentication never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Authentication {
    /// Whether the authentication has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Pagination parameters shared by list queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Maximum number of results; `0` means no limit.
    pub limit: u64,
    /// Opaque cursor from a previous page; `None` starts at the beginning.
    pub page_token: Option<String>,
}

/// A list query: a predicate plus pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest<P> {
    pub predicate: P,
    pub query_params: QueryParams,
}

/// Filter for listing authentications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListAuthenticationsPredicate {
    /// `None` matches every method; it is distinct from "match nothing".
    pub method: Option<Method>,
}

impl ListAuthenticationsPredicate {
    pub fn matches(&self, authentication: &Authentication) -> bool {
        self.method
            .map_or(true, |method| authentication.method == method)
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet<T> {
    pub results: Vec<T>,
    /// Empty when there are no further pages.
    pub next_page_token: String,
}

/// Delete predicate. Every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteFilter {
    pub id: Option<String>,
    pub method: Option<Method>,
    pub expired_before: Option<DateTime<Utc>>,
}

impl DeleteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching exactly one authentication.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_expired_before(mut self, expired_before: DateTime<Utc>) -> Self {
        self.expired_before = Some(expired_before);
        self
    }

    /// True when no field is constrained. Stores refuse such filters.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.method.is_none() && self.expired_before.is_none()
    }

    pub fn matches(&self, authentication: &Authentication) -> bool {
        if let Some(id) = &self.id {
            if &authentication.id != id {
                return false;
            }
        }
        if let Some(method) = self.method {
            if authentication.method != method {
                return false;
            }
        }
        if let Some(expired_before) = self.expired_before {
            // Never-expiring records are never "expired before" anything.
            match authentication.expires_at {
                Some(expires_at) if expires_at < expired_before => {}
                _ => return false,
            }
        }
        true
    }
}

/// Input for creating an authentication in a store.
#[derive(Debug)]
pub struct CreateAuthenticationRequest {
    pub method: Method,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, String>,
    /// Use this client token instead of generating one.
    pub client_token: Option<SecretString>,
}

impl CreateAuthenticationRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            expires_at: None,
            metadata: BTreeMap::new(),
            client_token: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_client_token(mut self, client_token: SecretString) -> Self {
        self.client_token = Some(client_token);
        self
    }
}
