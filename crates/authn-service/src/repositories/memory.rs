//! Process-local authentication store.
//!
//! All state sits behind one `RwLock`, so every mutation (including the
//! extend-only expiry) is atomic with respect to concurrent callers.

use super::client_token::{generate_client_token, hash_client_token};
use super::page_token::{decode_optional, into_page};
use super::{next_expiry, reject_empty_filter, AuthenticationStore};
use crate::errors::AuthnError;
use crate::models::{
    Authentication, CreateAuthenticationRequest, DeleteFilter, ListAuthenticationsPredicate,
    ListRequest, Method, ResultSet,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Authentication>,
    /// client token hash -> authentication id
    by_token_hash: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored authentications.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AuthenticationStore for MemoryStore {
    #[instrument(skip_all, fields(method = %request.method))]
    async fn create_authentication(
        &self,
        request: CreateAuthenticationRequest,
    ) -> Result<(SecretString, Authentication), AuthnError> {
        if request.method == Method::None {
            return Err(AuthnError::InvalidArgument(
                "authentication method is required".to_string(),
            ));
        }

        let client_token = match request.client_token {
            Some(token) => token,
            None => generate_client_token()?,
        };
        let token_hash = hash_client_token(client_token.expose_secret());

        let now = Utc::now();
        let authentication = Authentication {
            id: Uuid::new_v4().to_string(),
            method: request.method,
            metadata: request.metadata,
            expires_at: request.expires_at,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        if inner.by_token_hash.contains_key(&token_hash) {
            return Err(AuthnError::InvalidArgument(
                "client token already in use".to_string(),
            ));
        }
        inner
            .by_token_hash
            .insert(token_hash, authentication.id.clone());
        inner
            .by_id
            .insert(authentication.id.clone(), authentication.clone());

        tracing::debug!(
            target: "authn.store",
            id = %authentication.id,
            "Created authentication"
        );

        Ok((client_token, authentication))
    }

    async fn get_authentication_by_client_token(
        &self,
        client_token: &str,
    ) -> Result<Authentication, AuthnError> {
        let token_hash = hash_client_token(client_token);
        let inner = self.inner.read().await;
        inner
            .by_token_hash
            .get(&token_hash)
            .and_then(|id| inner.by_id.get(id))
            .cloned()
            .ok_or_else(|| AuthnError::NotFound("authentication".to_string()))
    }

    async fn get_authentication_by_id(&self, id: &str) -> Result<Authentication, AuthnError> {
        self.inner
            .read()
            .await
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| AuthnError::NotFound("authentication".to_string()))
    }

    async fn list_authentications(
        &self,
        request: &ListRequest<ListAuthenticationsPredicate>,
    ) -> Result<ResultSet<Authentication>, AuthnError> {
        let cursor = decode_optional(request.query_params.page_token.as_deref())?;

        let mut matching: Vec<Authentication> = {
            let inner = self.inner.read().await;
            inner
                .by_id
                .values()
                .filter(|a| request.predicate.matches(a))
                .filter(|a| cursor.as_ref().map_or(true, |c| c.admits(a)))
                .cloned()
                .collect()
        };
        matching.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

        Ok(into_page(matching, request.query_params.limit))
    }

    async fn delete_authentications(&self, filter: &DeleteFilter) -> Result<u64, AuthnError> {
        reject_empty_filter(filter)?;

        let mut inner = self.inner.write().await;
        let doomed: Vec<String> = inner
            .by_id
            .values()
            .filter(|a| filter.matches(a))
            .map(|a| a.id.clone())
            .collect();

        for id in &doomed {
            inner.by_id.remove(id);
        }
        inner.by_token_hash.retain(|_, id| !doomed.contains(id));

        Ok(doomed.len() as u64)
    }

    async fn expire_authentication_by_id(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthnError> {
        let mut inner = self.inner.write().await;
        let authentication = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| AuthnError::NotFound("authentication".to_string()))?;

        let now = Utc::now();
        let next = next_expiry(authentication.expires_at, expires_at, now);

        if authentication.expires_at != Some(next) {
            authentication.expires_at = Some(next);
            authentication.updated_at = now;
        }

        Ok(())
    }
}
