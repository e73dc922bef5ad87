//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use them for every
//! value that grants access: client tokens, bootstrap tokens, database URLs
//! carrying passwords.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` and holds one is safe to log via `{:?}` or tracing fields.
//! Secrets are zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct IssuedToken {
//!     authentication_id: String,
//!     client_token: SecretString,
//! }
//!
//! let issued = IssuedToken {
//!     authentication_id: "6c1c0bd2".to_string(),
//!     client_token: SecretString::from("s3cr3t"),
//! };
//!
//! assert!(!format!("{issued:?}").contains("s3cr3t"));
//! assert_eq!(issued.client_token.expose_secret(), "s3cr3t");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
