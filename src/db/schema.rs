// Row types read from the stock_data table

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Column list matching [`StockRecord`]. `created_at` is cast so it always
/// decodes as text.
pub const STOCK_COLUMNS: &str = "id, symbol, company_name, sector, market, decade, \
    start_date, end_date, start_price, end_price, total_return, avg_volume, volatility, \
    data_points, CAST(created_at AS TEXT) AS created_at";

/// One symbol's performance over one decade on one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockRecord {
    pub id: i64,
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub market: Option<String>,
    pub decade: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_price: Option<f64>,
    pub end_price: Option<f64>,
    pub total_return: Option<f64>,
    pub avg_volume: Option<f64>,
    pub volatility: Option<f64>,
    pub data_points: Option<i64>,
    pub created_at: Option<String>,
}

/// Aggregates over a filtered slice of stock_data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockStatistics {
    pub total_stocks: i64,
    pub avg_return: Option<f64>,
    pub max_return: Option<f64>,
    pub min_return: Option<f64>,
    pub avg_volatility: Option<f64>,
    pub markets_count: i64,
    pub decades_count: i64,
}

impl StockStatistics {
    /// Round the float aggregates to two decimals.
    pub fn rounded(mut self) -> Self {
        for value in [
            &mut self.avg_return,
            &mut self.max_return,
            &mut self.min_return,
            &mut self.avg_volatility,
        ] {
            *value = value.map(|v| (v * 100.0).round() / 100.0);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_rounding() {
        let stats = StockStatistics {
            total_stocks: 3,
            avg_return: Some(12.3456),
            max_return: Some(-0.005),
            min_return: None,
            avg_volatility: Some(1.0),
            markets_count: 1,
            decades_count: 2,
        }
        .rounded();

        assert_eq!(stats.avg_return, Some(12.35));
        assert_eq!(stats.min_return, None);
        assert_eq!(stats.avg_volatility, Some(1.0));
    }
}
