//! Common utilities and types shared across the authentication services.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for tracing subscriber setup
pub mod logging;

/// Module for secret types that prevent accidental logging
pub mod secret;
