//! Background tasks.
//!
//! - `expired_cleanup` - deletes authentications past expiry plus a grace period

pub mod expired_cleanup;

pub use expired_cleanup::{start_expired_cleanup, ExpiredCleanupConfig};
