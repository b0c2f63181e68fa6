pub mod data;
pub mod export;
pub mod health;
pub mod routes;

pub use routes::{create_router, AppState};
