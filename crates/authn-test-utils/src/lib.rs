//! # Authn Test Utilities
//!
//! Shared test utilities for the authentication service.
//!
//! This crate provides:
//! - Authentication builders and seeding helpers
//! - A recording audit sink for asserting on exported events
//! - Server test harness (TestAuthnServer for E2E tests over HTTP)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authn_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestAuthnServer::spawn(true).await?;
//!     let (token, _) = TestAuthenticationBuilder::token()
//!         .with_metadata("client", "cli")
//!         .create(server.store())
//!         .await?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/auth/v1/self", server.url()))
//!         .bearer_auth(&token)
//!         .send()
//!         .await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod recording_sink;
pub mod server_harness;

// Re-export commonly used items
pub use fixtures::*;
pub use recording_sink::*;
pub use server_harness::*;
