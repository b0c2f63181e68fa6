// Financiera historical market data API

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod observability;
pub mod rate_limit;

pub use config::Config;
pub use errors::{AppError, Result};
