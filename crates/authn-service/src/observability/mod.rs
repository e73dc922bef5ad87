//! Observability for the authentication service.
//!
//! Instrumentation uses `#[instrument(skip_all)]` with explicit fields.
//! Authentication ids and methods are safe to log. Client tokens and their
//! hashes never appear in logs or metric labels.

pub mod metrics;

use crate::errors::AuthnError;

/// Bounded `status` label for an operation result.
pub fn status_label<T>(result: &Result<T, AuthnError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind().as_str(),
    }
}
