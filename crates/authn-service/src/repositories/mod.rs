//! Store layer for authentication records.
//!
//! Follows the Handler -> Service -> Repository layering. The service only
//! ever talks to [`AuthenticationStore`]; the backing engine is chosen at
//! startup:
//!
//! - [`MemoryStore`] - process-local, used by tests and single-node runs
//! - [`PostgresStore`] - sqlx/PostgreSQL, selected when `DATABASE_URL` is set
//!
//! # Contract
//!
//! - `expire_authentication_by_id` is atomic per record and follows
//!   [`next_expiry`]: a future time only extends (`max(current, requested)`),
//!   a time at or before now invalidates immediately. A record without an
//!   expiry adopts the requested one.
//! - `list_authentications` orders by `(created_at, id)` and returns an opaque
//!   `next_page_token`, empty on the last page. A limit of `0` means no limit.
//! - `delete_authentications` refuses an empty [`DeleteFilter`].

pub mod client_token;
pub mod memory;
pub mod page_token;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::errors::AuthnError;
use crate::models::{
    Authentication, CreateAuthenticationRequest, DeleteFilter, ListAuthenticationsPredicate,
    ListRequest, ResultSet,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::secret::SecretString;

#[async_trait]
pub trait AuthenticationStore: Send + Sync {
    /// Persist a new authentication and return its client token.
    async fn create_authentication(
        &self,
        request: CreateAuthenticationRequest,
    ) -> Result<(SecretString, Authentication), AuthnError>;

    /// Resolve a presented client token to its authentication.
    async fn get_authentication_by_client_token(
        &self,
        client_token: &str,
    ) -> Result<Authentication, AuthnError>;

    async fn get_authentication_by_id(&self, id: &str) -> Result<Authentication, AuthnError>;

    async fn list_authentications(
        &self,
        request: &ListRequest<ListAuthenticationsPredicate>,
    ) -> Result<ResultSet<Authentication>, AuthnError>;

    /// Delete every authentication matching `filter`; returns how many.
    async fn delete_authentications(&self, filter: &DeleteFilter) -> Result<u64, AuthnError>;

    /// Apply `expires_at` to `id` as described by [`next_expiry`].
    async fn expire_authentication_by_id(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthnError>;
}

pub(crate) fn reject_empty_filter(filter: &DeleteFilter) -> Result<(), AuthnError> {
    if filter.is_empty() {
        return Err(AuthnError::InvalidArgument(
            "delete filter must constrain at least one field".to_string(),
        ));
    }
    Ok(())
}

/// Expiry to persist when `requested` is applied to a record currently
/// expiring at `current` (`None` = never).
///
/// A future `requested` never shortens a session. A `requested` at or before
/// `now` is a logout and takes effect at once, unless the record already
/// expired earlier than that.
pub fn next_expiry(
    current: Option<DateTime<Utc>>,
    requested: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match current {
        None => requested,
        Some(current) if requested <= now => current.min(requested),
        Some(current) => current.max(requested),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_next_expiry_future_request_only_extends() {
        let now = Utc::now();
        let soon = now + Duration::minutes(10);
        let later = now + Duration::hours(1);

        assert_eq!(next_expiry(Some(later), soon, now), later);
        assert_eq!(next_expiry(Some(soon), later, now), later);
        assert_eq!(next_expiry(None, later, now), later);
    }

    #[test]
    fn test_next_expiry_past_request_logs_out() {
        let now = Utc::now();
        let later = now + Duration::hours(1);
        let earlier = now - Duration::hours(1);

        assert_eq!(next_expiry(Some(later), now, now), now);
        assert_eq!(next_expiry(None, now, now), now);
        // Already expired before the logout time: left alone
        assert_eq!(next_expiry(Some(earlier), now, now), earlier);
    }
}
