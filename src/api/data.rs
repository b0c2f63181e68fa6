// Cached, rate-limited read endpoints under /api/data

use crate::{
    api::routes::AppState,
    cache::CacheKey,
    db::StockRecord,
    domain::{
        filters::{non_empty, parse_top_limit},
        Decade, Market, StockFilter, Symbol,
    },
    errors::{AppError, Result},
    gate::GatedResponse,
    rate_limit::ClientIdentity,
};
use axum::extract::{rejection::QueryRejection, Path, Query, State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DecadeParam {
    pub decade: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub decade: Option<String>,
    pub market: Option<String>,
    pub limit: Option<String>,
}

impl FilterParams {
    fn filter(&self) -> Result<StockFilter> {
        StockFilter::parse(self.decade.as_deref(), self.market.as_deref())
    }
}

fn filter_key(endpoint: &'static str, filter: &StockFilter) -> CacheKey {
    CacheKey::new(endpoint)
        .param("decade", filter.decade.map(|d| d.as_str()))
        .param("market", filter.market.map(|m| m.as_str()))
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DecadesResponse {
    pub decades: Vec<String>,
    pub count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct MarketsResponse {
    pub markets: Vec<String>,
    pub count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct MarketGroup {
    pub name: String,
    pub stocks: Vec<StockRecord>,
    pub total_stocks: usize,
}

#[derive(Debug, Serialize)]
pub struct DecadeResponse {
    pub decade: Decade,
    pub markets: BTreeMap<String, MarketGroup>,
    pub total_stocks: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct MarketResponse {
    pub market: Market,
    pub decade: Option<Decade>,
    pub stocks: Vec<StockRecord>,
    pub total_stocks: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub symbol: String,
    pub company_name: String,
    pub historical_data: Vec<StockRecord>,
    pub decades_count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct TopFilters {
    #[serde(flatten)]
    pub filter: StockFilter,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct TopPerformersResponse {
    pub top_performers: Vec<StockRecord>,
    pub filters: TopFilters,
    pub count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub statistics: crate::db::StockStatistics,
    pub filters: StockFilter,
    pub timestamp: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/data/decades
#[tracing::instrument(skip(state))]
pub async fn decades(
    State(state): State<AppState>,
    client: ClientIdentity,
) -> Result<GatedResponse> {
    let state = &state;
    state
        .gate
        .cached(&client, CacheKey::new("decades"), || async move {
            let decades = state
                .repository
                .decades()
                .await
                .map_err(AppError::query("decades"))?;

            Ok(DecadesResponse {
                count: decades.len(),
                decades,
                timestamp: state.timestamp(),
            })
        })
        .await
}

/// GET /api/data/markets
#[tracing::instrument(skip(state))]
pub async fn markets(
    State(state): State<AppState>,
    client: ClientIdentity,
) -> Result<GatedResponse> {
    let state = &state;
    state
        .gate
        .cached(&client, CacheKey::new("markets"), || async move {
            let markets = state
                .repository
                .markets()
                .await
                .map_err(AppError::query("markets"))?;

            Ok(MarketsResponse {
                count: markets.len(),
                markets,
                timestamp: state.timestamp(),
            })
        })
        .await
}

/// GET /api/data/decade/:decade
///
/// All stocks for one decade, grouped by market
#[tracing::instrument(skip(state))]
pub async fn decade_data(
    State(state): State<AppState>,
    client: ClientIdentity,
    Path(decade): Path<String>,
) -> Result<GatedResponse> {
    let state = &state;
    let decade = Decade::parse(&decade)?;
    let key = CacheKey::new("decade").param("decade", Some(decade.as_str()));

    state
        .gate
        .cached(&client, key, || async move {
            let stocks = state
                .repository
                .by_decade(decade)
                .await
                .map_err(AppError::query("decade data"))?;

            if stocks.is_empty() {
                return Err(AppError::NotFound("this decade"));
            }

            let total_stocks = stocks.len();
            let mut markets: BTreeMap<String, MarketGroup> = BTreeMap::new();
            for stock in stocks {
                let name = stock.market.clone().unwrap_or_default();
                let group = markets.entry(name.clone()).or_insert_with(|| MarketGroup {
                    name,
                    stocks: Vec::new(),
                    total_stocks: 0,
                });
                group.stocks.push(stock);
                group.total_stocks += 1;
            }

            Ok(DecadeResponse {
                decade,
                markets,
                total_stocks,
                timestamp: state.timestamp(),
            })
        })
        .await
}

/// GET /api/data/market/:market?decade=
#[tracing::instrument(skip(state))]
pub async fn market_data(
    State(state): State<AppState>,
    client: ClientIdentity,
    Path(market): Path<String>,
    params: std::result::Result<Query<DecadeParam>, QueryRejection>,
) -> Result<GatedResponse> {
    let Query(params) = params?;
    let state = &state;
    let market = Market::parse(&market)?;
    let decade = non_empty(params.decade.as_deref())
        .map(Decade::parse)
        .transpose()?;

    let key = CacheKey::new("market")
        .param("market", Some(market.as_str()))
        .param("decade", decade.map(|d| d.as_str()));

    state
        .gate
        .cached(&client, key, || async move {
            let stocks = state
                .repository
                .by_market(market, decade)
                .await
                .map_err(AppError::query("market data"))?;

            if stocks.is_empty() {
                return Err(AppError::NotFound("this market"));
            }

            Ok(MarketResponse {
                market,
                decade,
                total_stocks: stocks.len(),
                stocks,
                timestamp: state.timestamp(),
            })
        })
        .await
}

/// GET /api/data/stock/:symbol
#[tracing::instrument(skip(state))]
pub async fn stock_data(
    State(state): State<AppState>,
    client: ClientIdentity,
    Path(symbol): Path<String>,
) -> Result<GatedResponse> {
    let state = &state;
    let symbol = Symbol::parse(&symbol)?;
    let key = CacheKey::new("stock").param("symbol", Some(symbol.as_str()));

    state
        .gate
        .cached(&client, key, || async move {
            let stocks = state
                .repository
                .by_symbol(&symbol)
                .await
                .map_err(AppError::query("stock data"))?;

            let company_name = match stocks.first() {
                Some(first) => first.company_name.clone().unwrap_or_default(),
                None => return Err(AppError::NotFound("this stock")),
            };

            Ok(StockResponse {
                symbol: symbol.as_str().to_string(),
                company_name,
                decades_count: stocks.len(),
                historical_data: stocks,
                timestamp: state.timestamp(),
            })
        })
        .await
}

/// GET /api/data/top-performers?decade=&market=&limit=
#[tracing::instrument(skip(state))]
pub async fn top_performers(
    State(state): State<AppState>,
    client: ClientIdentity,
    params: std::result::Result<Query<FilterParams>, QueryRejection>,
) -> Result<GatedResponse> {
    let Query(params) = params?;
    let state = &state;
    let filter = params.filter()?;
    let limit = parse_top_limit(params.limit.as_deref())?;
    let key = filter_key("top_performers", &filter).param("limit", Some(&limit.to_string()));

    state
        .gate
        .cached(&client, key, || async move {
            let stocks = state
                .repository
                .top_performers(filter, limit)
                .await
                .map_err(AppError::query("top performers"))?;

            Ok(TopPerformersResponse {
                count: stocks.len(),
                top_performers: stocks,
                filters: TopFilters { filter, limit },
                timestamp: state.timestamp(),
            })
        })
        .await
}

/// GET /api/data/statistics?decade=&market=
#[tracing::instrument(skip(state))]
pub async fn statistics(
    State(state): State<AppState>,
    client: ClientIdentity,
    params: std::result::Result<Query<FilterParams>, QueryRejection>,
) -> Result<GatedResponse> {
    let Query(params) = params?;
    let state = &state;
    let filter = params.filter()?;
    let key = filter_key("statistics", &filter);

    state
        .gate
        .cached(&client, key, || async move {
            let statistics = state
                .repository
                .statistics(filter)
                .await
                .map_err(AppError::query("statistics"))?;

            Ok(StatisticsResponse {
                statistics,
                filters: filter,
                timestamp: state.timestamp(),
            })
        })
        .await
}
