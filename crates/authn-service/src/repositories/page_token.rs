//! Opaque keyset cursors for list pagination.
//!
//! A page token encodes the `(created_at, id)` key of the first record of the
//! next page. Resuming selects records with a key `>=` the cursor, so records
//! deleted between calls never cause skips or duplicates.

use crate::errors::AuthnError;
use crate::models::Authentication;
use crate::models::ResultSet;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl PageToken {
    pub fn for_authentication(authentication: &Authentication) -> Self {
        Self {
            created_at: authentication.created_at,
            id: authentication.id.clone(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing two plain fields cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, AuthnError> {
        let invalid = || AuthnError::InvalidArgument("invalid page token".to_string());
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
        serde_json::from_slice(&bytes).map_err(|_| invalid())
    }

    /// Whether `authentication` sorts at or after this cursor.
    pub fn admits(&self, authentication: &Authentication) -> bool {
        (authentication.created_at, authentication.id.as_str())
            >= (self.created_at, self.id.as_str())
    }
}

/// Decode an optional page token, treating `""` as absent.
pub fn decode_optional(page_token: Option<&str>) -> Result<Option<PageToken>, AuthnError> {
    match page_token {
        None | Some("") => Ok(None),
        Some(token) => PageToken::decode(token).map(Some),
    }
}

/// Cut `items` (already ordered and starting at the cursor) into one page.
pub fn into_page(mut items: Vec<Authentication>, limit: u64) -> ResultSet<Authentication> {
    if limit == 0 {
        return ResultSet {
            results: items,
            next_page_token: String::new(),
        };
    }

    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    if items.len() <= limit {
        return ResultSet {
            results: items,
            next_page_token: String::new(),
        };
    }

    let rest = items.split_off(limit);
    let next_page_token = rest
        .first()
        .map(|next| PageToken::for_authentication(next).encode())
        .unwrap_or_default();

    ResultSet {
        results: items,
        next_page_token,
    }
}
