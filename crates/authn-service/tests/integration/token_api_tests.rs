//! Integration tests for /auth/v1/tokens
//!
//! Listing with method filter and pagination, lookup by id, deletion.

use authn_service::models::Method;
use authn_test_utils::fixtures::{seed_authentications, TestAuthenticationBuilder};
use authn_test_utils::server_harness::TestAuthnServer;
use reqwest::StatusCode;
use std::collections::HashSet;

/// Spawn a server and create the caller's own TOKEN authentication.
async fn server_with_caller(audit: bool) -> Result<(TestAuthnServer, String), anyhow::Error> {
    let server = TestAuthnServer::spawn(audit).await?;
    let (token, _) = TestAuthenticationBuilder::token()
        .with_metadata("client", "integration")
        .create(server.store())
        .await?;
    Ok((server, token))
}

#[tokio::test]
async fn test_tokens_endpoints_require_authentication() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(false).await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/auth/v1/tokens", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .delete(format!("{}/auth/v1/tokens/some-id", server.url()))
        .bearer_auth("not-a-real-token")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_list_paginates_without_duplicates() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_caller(false).await?;
    // 24 more, 25 in total with the caller
    seed_authentications(server.store(), Method::Token, 24).await?;
    let client = reqwest::Client::new();

    let mut seen = HashSet::new();
    let mut page_sizes = Vec::new();
    let mut page_token = String::new();
    loop {
        let response = client
            .get(format!("{}/auth/v1/tokens", server.url()))
            .query(&[("limit", "10"), ("page_token", page_token.as_str())])
            .bearer_auth(&token)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = response.json().await?;
        let authentications = body["authentications"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("missing authentications"))?;
        page_sizes.push(authentications.len());
        for auth in authentications {
            let id = auth["id"].as_str().unwrap_or_default().to_string();
            assert!(seen.insert(id), "duplicate authentication across pages");
        }

        page_token = body["next_page_token"].as_str().unwrap_or_default().to_string();
        if page_token.is_empty() {
            break;
        }
    }

    assert_eq!(page_sizes, vec![10, 10, 5]);
    assert_eq!(seen.len(), 25);
    Ok(())
}

#[tokio::test]
async fn test_list_filters_by_method() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_caller(false).await?;
    seed_authentications(server.store(), Method::Oidc, 3).await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/auth/v1/tokens", server.url()))
        .query(&[("method", "METHOD_OIDC")])
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    let authentications = body["authentications"].as_array().cloned().unwrap_or_default();
    assert_eq!(authentications.len(), 3);
    assert!(authentications.iter().all(|a| a["method"] == "METHOD_OIDC"));
    assert_eq!(body["next_page_token"], "");

    // No filter lists every method
    let response = client
        .get(format!("{}/auth/v1/tokens", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["authentications"].as_array().map(Vec::len), Some(4));
    Ok(())
}

#[tokio::test]
async fn test_list_rejects_bad_input() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_caller(false).await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/auth/v1/tokens", server.url()))
        .query(&[("page_token", "definitely-not-a-cursor")])
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    let response = client
        .get(format!("{}/auth/v1/tokens", server.url()))
        .query(&[("method", "password")])
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_get_by_id() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_caller(false).await?;
    let (_, other) = TestAuthenticationBuilder::oidc()
        .with_metadata("email", "dev@example.com")
        .create(server.store())
        .await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/auth/v1/tokens/{}", server.url(), other.id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["id"], other.id.as_str());
    assert_eq!(body["metadata"]["email"], "dev@example.com");

    let response = client
        .get(format!("{}/auth/v1/tokens/missing", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_delete_removes_authentication() -> Result<(), anyhow::Error> {
    let (server, token) = server_with_caller(false).await?;
    let (victim_token, victim) = TestAuthenticationBuilder::token()
        .create(server.store())
        .await?;
    let client = reqwest::Client::new();

    let response = client
        .delete(format!("{}/auth/v1/tokens/{}", server.url(), victim.id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({}));

    // The deleted client token no longer authenticates
    let response = client
        .get(format!("{}/auth/v1/self", server.url()))
        .bearer_auth(&victim_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{}/auth/v1/tokens/{}", server.url(), victim.id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
