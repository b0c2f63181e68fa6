pub mod pool;
pub mod schema;
pub mod stocks;

pub use pool::{create_pool, run_migrations};
pub use schema::{StockRecord, StockStatistics};
pub use stocks::{SqliteStockRepository, StockRepository};
