pub mod app_state;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod logging;

pub use app_state::{build_core_state, build_core_state_with, CoreState};
pub use errors::DaoError;
