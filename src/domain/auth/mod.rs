// Access-review gate consulted before every mutating capability
pub mod access_service;

pub use access_service::ensure_authorized;
