pub mod auth;
pub mod dao;
pub mod logs;
