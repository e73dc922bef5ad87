pub mod authentication_handler;
pub mod health;

pub use health::{health_check, metrics_handler};
