//! First-start provisioning of a TOKEN authentication.

use crate::errors::AuthnError;
use crate::models::{Authentication, CreateAuthenticationRequest, Method};
use crate::repositories::AuthenticationStore;
use crate::services::predicate::build_list_request;
use common::secret::SecretString;
use tracing::{info, instrument};

pub const BOOTSTRAP_TOKEN_NAME: &str = "initial_bootstrap_token";
pub const BOOTSTRAP_TOKEN_DESCRIPTION: &str =
    "Initial token created when bootstrapping authentication";

/// Create a TOKEN authentication for `client_token` unless one already exists.
///
/// Returns the created authentication, or `None` when the store already holds
/// a TOKEN authentication.
#[instrument(skip_all, name = "authn.bootstrap")]
pub async fn bootstrap_token(
    store: &dyn AuthenticationStore,
    client_token: SecretString,
) -> Result<Option<Authentication>, AuthnError> {
    let existing = store
        .list_authentications(&build_list_request(Method::Token, 1, None))
        .await
        .map_err(|e| e.context("checking for existing token authentications"))?;

    if !existing.results.is_empty() {
        info!(target: "authn.service", "Token authentication already present, skipping bootstrap");
        return Ok(None);
    }

    let request = CreateAuthenticationRequest::new(Method::Token)
        .with_metadata("name", BOOTSTRAP_TOKEN_NAME)
        .with_metadata("description", BOOTSTRAP_TOKEN_DESCRIPTION)
        .with_client_token(client_token);

    let (_, authentication) = store
        .create_authentication(request)
        .await
        .map_err(|e| e.context("creating bootstrap token"))?;

    info!(
        target: "authn.service",
        id = %authentication.id,
        "Bootstrapped token authentication"
    );

    Ok(Some(authentication))
}
