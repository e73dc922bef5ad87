pub mod auth;

pub use auth::{require_authentication, resolve_authentication};
