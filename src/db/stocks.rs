// Read-only queries against stock_data

use crate::db::schema::{StockRecord, StockStatistics, STOCK_COLUMNS};
use crate::domain::{Decade, Market, StockFilter, Symbol};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// The data store as seen by the query handlers.
///
/// Every method is a parameterized read; an empty result is a normal
/// outcome, not an error.
#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn ping(&self) -> Result<(), sqlx::Error>;

    async fn decades(&self) -> Result<Vec<String>, sqlx::Error>;

    async fn markets(&self) -> Result<Vec<String>, sqlx::Error>;

    /// Ordered by market, then symbol.
    async fn by_decade(&self, decade: Decade) -> Result<Vec<StockRecord>, sqlx::Error>;

    /// Ordered by decade, then symbol.
    async fn by_market(
        &self,
        market: Market,
        decade: Option<Decade>,
    ) -> Result<Vec<StockRecord>, sqlx::Error>;

    /// Case-insensitive symbol match, ordered by decade.
    async fn by_symbol(&self, symbol: &Symbol) -> Result<Vec<StockRecord>, sqlx::Error>;

    /// Highest total return first.
    async fn top_performers(
        &self,
        filter: StockFilter,
        limit: u32,
    ) -> Result<Vec<StockRecord>, sqlx::Error>;

    async fn statistics(&self, filter: StockFilter) -> Result<StockStatistics, sqlx::Error>;

    /// Ordered by decade, market, symbol.
    async fn export(&self, filter: StockFilter) -> Result<Vec<StockRecord>, sqlx::Error>;
}

/// SQLite-backed repository
#[derive(Clone)]
pub struct SqliteStockRepository {
    pool: SqlitePool,
}

impl SqliteStockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn select_stocks() -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT ");
        builder.push(STOCK_COLUMNS);
        builder.push(" FROM stock_data WHERE 1=1");
        builder
    }
}

fn push_filter(builder: &mut QueryBuilder<'static, Sqlite>, filter: StockFilter) {
    if let Some(decade) = filter.decade {
        builder.push(" AND decade = ").push_bind(decade.as_str());
    }
    if let Some(market) = filter.market {
        builder.push(" AND market = ").push_bind(market.as_str());
    }
}

#[async_trait]
impl StockRepository for SqliteStockRepository {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn decades(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT decade FROM stock_data WHERE decade IS NOT NULL ORDER BY decade",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn markets(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT market FROM stock_data WHERE market IS NOT NULL ORDER BY market",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn by_decade(&self, decade: Decade) -> Result<Vec<StockRecord>, sqlx::Error> {
        let mut builder = Self::select_stocks();
        push_filter(
            &mut builder,
            StockFilter {
                decade: Some(decade),
                market: None,
            },
        );
        builder.push(" ORDER BY market, symbol");

        builder
            .build_query_as::<StockRecord>()
            .fetch_all(&self.pool)
            .await
    }

    async fn by_market(
        &self,
        market: Market,
        decade: Option<Decade>,
    ) -> Result<Vec<StockRecord>, sqlx::Error> {
        let mut builder = Self::select_stocks();
        push_filter(
            &mut builder,
            StockFilter {
                decade,
                market: Some(market),
            },
        );
        builder.push(" ORDER BY decade, symbol");

        builder
            .build_query_as::<StockRecord>()
            .fetch_all(&self.pool)
            .await
    }

    async fn by_symbol(&self, symbol: &Symbol) -> Result<Vec<StockRecord>, sqlx::Error> {
        let mut builder = Self::select_stocks();
        builder
            .push(" AND UPPER(symbol) = UPPER(")
            .push_bind(symbol.as_str().to_string())
            .push(") ORDER BY decade");

        builder
            .build_query_as::<StockRecord>()
            .fetch_all(&self.pool)
            .await
    }

    async fn top_performers(
        &self,
        filter: StockFilter,
        limit: u32,
    ) -> Result<Vec<StockRecord>, sqlx::Error> {
        let mut builder = Self::select_stocks();
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY total_return DESC LIMIT ")
            .push_bind(i64::from(limit));

        builder
            .build_query_as::<StockRecord>()
            .fetch_all(&self.pool)
            .await
    }

    async fn statistics(&self, filter: StockFilter) -> Result<StockStatistics, sqlx::Error> {
        let mut builder: QueryBuilder<'static, Sqlite> = QueryBuilder::new(
            "SELECT \
                COUNT(*) AS total_stocks, \
                AVG(total_return) AS avg_return, \
                MAX(total_return) AS max_return, \
                MIN(total_return) AS min_return, \
                AVG(volatility) AS avg_volatility, \
                COUNT(DISTINCT market) AS markets_count, \
                COUNT(DISTINCT decade) AS decades_count \
            FROM stock_data WHERE 1=1",
        );
        push_filter(&mut builder, filter);

        let stats = builder
            .build_query_as::<StockStatistics>()
            .fetch_one(&self.pool)
            .await?;

        Ok(stats.rounded())
    }

    async fn export(&self, filter: StockFilter) -> Result<Vec<StockRecord>, sqlx::Error> {
        let mut builder = Self::select_stocks();
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY decade, market, symbol");

        builder
            .build_query_as::<StockRecord>()
            .fetch_all(&self.pool)
            .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    /// In-memory database with the schema applied and a few rows.
    pub async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let rows: [(&str, &str, &str, &str, f64, f64); 5] = [
            ("GE", "General Electric", "NYSE", "1920s", 120.5, 3.2),
            ("IBM", "International Business Machines", "NYSE", "1920s", 80.0, 2.1),
            ("GE", "General Electric", "NYSE", "1930s", -45.25, 5.7),
            ("SIE", "Siemens", "Frankfurt", "1950s", 210.0, 4.4),
            ("TM", "Toyota Motor", "Tokyo", "1950s", 15.0, 1.9),
        ];

        for (symbol, company, market, decade, total_return, volatility) in rows {
            sqlx::query(
                "INSERT INTO stock_data (symbol, company_name, sector, market, decade, \
                 start_date, end_date, start_price, end_price, total_return, avg_volume, \
                 volatility, data_points) \
                 VALUES (?, ?, 'Industrials', ?, ?, '1920-01-02', '1929-12-31', 10.0, 20.0, ?, 1000.0, ?, 2500)",
            )
            .bind(symbol)
            .bind(company)
            .bind(market)
            .bind(decade)
            .bind(total_return)
            .bind(volatility)
            .execute(&pool)
            .await
            .unwrap();
        }

        pool
    }
}
