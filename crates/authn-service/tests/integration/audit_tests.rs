//! Integration tests for delete auditing
//!
//! Events travel emitter -> channel -> exporter -> sink, so assertions wait
//! on the recording sink.

use authn_service::audit::{AuditAction, EventType};
use authn_test_utils::fixtures::TestAuthenticationBuilder;
use authn_test_utils::server_harness::TestAuthnServer;
use reqwest::StatusCode;
use std::time::Duration;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_token_delete_emits_one_audit_event() -> Result<(), anyhow::Error> {
    let server = TestAuthnServer::spawn(true).await?;
    let (caller_token, _) = TestAuthenticationBuilder::token()
        .with_metadata("client", "cli")
        .create(server.store())
        .await?;
    let (_, victim) = TestAuthenticationBuilder::token()
        .with_metadata("name", "ci-pipeline")
        .create(server.store())
        .await?;

    let response = reqwest::Client::new()
        .delete(format!("{}/auth/v1/tokens/{}", server.url(), victim.id))
        .bearer_auth(&caller_token)
        .header("x-forwarded-for", "203.0.113.5")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let events = server.audit_sink().wait_for(1, EXPORT_TIMEOUT).await;
    assert_eq!(events.len(), 1);

    let event = events
        .first()
        .ok_or_else(|| anyhow::anyhow!("no audit event exported"))?;
    assert_eq!(event.version, "0.1");
    assert_eq!(event.event_type, EventType::AuthenticationToken);
    assert_eq!(event.action, AuditAction::Delete);
    assert_eq!(event.actor.get("ip"), Some("203.0.113.5"));
    assert_eq!(event.actor.get("authentication"), Some("token"));
    assert_eq!(event.actor.get("client"), Some("cli"));
    assert_eq!(
        event.payload.get("name").map(String::as_str),
        Some("ci-pipeline")
    );
    Ok(())
}

#[tokio::test]
async fn test_oidc_delete_emits_nothing() -> Result<(), anyhow::Error> {
    let mut server = TestAuthnServer::spawn(true).await?;
    let (caller_token, _) = TestAuthenticationBuilder::token()
        .create(server.store())
        .await?;
    let (_, victim) = TestAuthenticationBuilder::oidc()
        .create(server.store())
        .await?;

    let response = reqwest::Client::new()
        .delete(format!("{}/auth/v1/tokens/{}", server.url(), victim.id))
        .bearer_auth(&caller_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Flush the exporter so nothing can still be in flight
    server.shutdown_audit().await;
    assert!(server.audit_sink().events().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_audit_disabled_emits_nothing() -> Result<(), anyhow::Error> {
    let mut server = TestAuthnServer::spawn(false).await?;
    let (caller_token, _) = TestAuthenticationBuilder::token()
        .create(server.store())
        .await?;
    let (_, victim) = TestAuthenticationBuilder::token()
        .create(server.store())
        .await?;

    let response = reqwest::Client::new()
        .delete(format!("{}/auth/v1/tokens/{}", server.url(), victim.id))
        .bearer_auth(&caller_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    server.shutdown_audit().await;
    assert!(server.audit_sink().events().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_audited_delete_of_unknown_id_fails() -> Result<(), anyhow::Error> {
    let mut server = TestAuthnServer::spawn(true).await?;
    let (caller_token, _) = TestAuthenticationBuilder::token()
        .create(server.store())
        .await?;

    let response = reqwest::Client::new()
        .delete(format!("{}/auth/v1/tokens/missing", server.url()))
        .bearer_auth(&caller_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.shutdown_audit().await;
    assert!(server.audit_sink().events().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_queued_events_are_flushed_on_shutdown() -> Result<(), anyhow::Error> {
    let mut server = TestAuthnServer::spawn(true).await?;
    let (caller_token, _) = TestAuthenticationBuilder::token()
        .create(server.store())
        .await?;
    let client = reqwest::Client::new();

    for _ in 0..5 {
        let (_, victim) = TestAuthenticationBuilder::token()
            .create(server.store())
            .await?;
        let response = client
            .delete(format!("{}/auth/v1/tokens/{}", server.url(), victim.id))
            .bearer_auth(&caller_token)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    server.shutdown_audit().await;
    assert_eq!(server.audit_sink().events().len(), 5);
    Ok(())
}
