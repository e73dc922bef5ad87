//! Integration tests for caller-scoped endpoints
//!
//! GET /auth/v1/self and PUT /auth/v1/self/expire, exercised through the
//! client token middleware.

use authn_test_utils::fixtures::TestAuthenticationBuilder;
use authn_test_utils::server_harness::TestAuthnServer;
use authn_service::repositories::AuthenticationStore;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;

#[tokio::test]
async fn test_get_self_returns_caller() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;
    let (token, auth) = TestAuthenticationBuilder::token()
        .with_metadata("client", "cli")
        .create(server.store())
        .await?;

    let response = reqwest::Client::new()
        .get(format!("{}/auth/v1/self", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["id"], auth.id.as_str());
    assert_eq!(body["method"], "METHOD_TOKEN");
    assert_eq!(body["metadata"]["client"], "cli");
    Ok(())
}

#[tokio::test]
async fn test_get_self_without_token_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;

    let response = reqwest::get(format!("{}/auth/v1/self", server.url())).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("www-authenticate"));
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_treated_as_anonymous() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;
    let (token, _) = TestAuthenticationBuilder::token()
        .expires_in(-60)
        .create(server.store())
        .await?;

    let response = reqwest::Client::new()
        .get(format!("{}/auth/v1/self", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_expire_self_logs_out() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;
    let (token, auth) = TestAuthenticationBuilder::token()
        .create(server.store())
        .await?;
    let client = reqwest::Client::new();

    // No body: expire now
    let response = client
        .put(format!("{}/auth/v1/self/expire", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({}));

    let stored = server
        .store()
        .get_authentication_by_id(&auth.id)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    assert!(stored.expires_at.is_some_and(|t| t <= Utc::now()));

    // The token no longer resolves
    let response = client
        .get(format!("{}/auth/v1/self", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_expire_self_logs_out_expiring_session() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;
    let (token, _) = TestAuthenticationBuilder::token()
        .expires_in(3600)
        .create(server.store())
        .await?;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/auth/v1/self/expire", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(format!("{}/auth/v1/self", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_expire_self_only_extends() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;
    let (token, auth) = TestAuthenticationBuilder::token()
        .expires_in(3600)
        .create(server.store())
        .await?;
    let original = auth.expires_at.ok_or_else(|| anyhow::anyhow!("no expiry"))?;
    let client = reqwest::Client::new();

    // Earlier than current: no change
    let earlier = original - Duration::minutes(30);
    let response = client
        .put(format!("{}/auth/v1/self/expire", server.url()))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "expires_at": earlier.to_rfc3339() }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = server
        .store()
        .get_authentication_by_id(&auth.id)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(stored.expires_at, Some(original));

    // Later than current: extended
    let later: DateTime<Utc> = original + Duration::hours(2);
    let response = client
        .put(format!("{}/auth/v1/self/expire", server.url()))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "expires_at": later.to_rfc3339() }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = server
        .store()
        .get_authentication_by_id(&auth.id)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(stored.expires_at, Some(later));
    Ok(())
}

#[tokio::test]
async fn test_expire_self_without_token_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;

    let response = reqwest::Client::new()
        .put(format!("{}/auth/v1/self/expire", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
