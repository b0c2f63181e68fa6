pub mod filters;

pub use filters::{Decade, ExportFormat, Market, StockFilter, Symbol};
