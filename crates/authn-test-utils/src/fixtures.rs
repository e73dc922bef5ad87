//! Builder patterns for test authentications.

use authn_service::models::{Authentication, CreateAuthenticationRequest, Method};
use authn_service::repositories::AuthenticationStore;
use chrono::{Duration, Utc};
use common::secret::ExposeSecret;

/// Builder for authentications created directly in a store
///
/// # Example
/// ```rust,ignore
/// let (client_token, authentication) = TestAuthenticationBuilder::token()
///     .with_metadata("client", "cli")
///     .expires_in(3600)
///     .create(&store)
///     .await?;
/// ```
pub struct TestAuthenticationBuilder {
    request: CreateAuthenticationRequest,
}

impl TestAuthenticationBuilder {
    pub fn new(method: Method) -> Self {
        Self {
            request: CreateAuthenticationRequest::new(method),
        }
    }

    /// TOKEN-method authentication
    pub fn token() -> Self {
        Self::new(Method::Token)
    }

    /// OIDC-method authentication
    pub fn oidc() -> Self {
        Self::new(Method::Oidc)
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.request = self.request.with_metadata(key, value);
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.request = self
            .request
            .with_expires_at(Utc::now() + Duration::seconds(seconds));
        self
    }

    /// Create in `store`, returning the plaintext client token
    pub async fn create(
        self,
        store: &dyn AuthenticationStore,
    ) -> Result<(String, Authentication), anyhow::Error> {
        let (client_token, authentication) = store
            .create_authentication(self.request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create authentication: {}", e))?;
        Ok((client_token.expose_secret().to_string(), authentication))
    }
}

/// Create `count` authentications of `method`, returned in creation order
pub async fn seed_authentications(
    store: &dyn AuthenticationStore,
    method: Method,
    count: usize,
) -> Result<Vec<Authentication>, anyhow::Error> {
    let mut created = Vec::with_capacity(count);
    for i in 0..count {
        let (_, authentication) = TestAuthenticationBuilder::new(method)
            .with_metadata("seq", &i.to_string())
            .create(store)
            .await?;
        created.push(authentication);
    }
    Ok(created)
}
