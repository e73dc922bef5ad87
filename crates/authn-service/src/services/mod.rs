pub mod authentication_service;
pub mod bootstrap;
pub mod predicate;

pub use authentication_service::AuthenticationService;
