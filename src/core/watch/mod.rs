// Watch-backed caches: one informer and one partition per (gvr, namespace) scope
pub mod backoff;
pub mod cache;
pub mod factory;
pub mod informer;

pub use cache::{CacheState, CacheStatus};
pub use factory::Factory;
