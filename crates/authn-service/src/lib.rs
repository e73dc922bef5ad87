//! Authentication lifecycle service library
//!
//! Self lookup, lookup by id, filtered and paginated listing, extend-only
//! expiry and deletion of authentications, with audit events for deletions of
//! audited methods.
//!
//! # Modules
//!
//! - `actor` - Audit attribution derived from a request
//! - `audit` - Audit events, bounded emitter and background exporter
//! - `config` - Service configuration
//! - `context` - Explicit per-request context
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Client token resolution
//! - `models` - Data models
//! - `observability` - Metrics
//! - `repositories` - Store trait plus memory and PostgreSQL stores
//! - `routes` - Router and application state
//! - `services` - Business logic layer
//! - `tasks` - Background maintenance

pub mod actor;
pub mod audit;
pub mod config;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
