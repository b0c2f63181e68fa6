// Bulk download of stock_data as CSV or JSON. Rate limited, never cached.

use crate::{
    api::routes::AppState,
    db::StockRecord,
    domain::{ExportFormat, StockFilter},
    errors::{AppError, Result},
    rate_limit::{add_rate_limit_headers, ClientIdentity},
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub decade: Option<String>,
    pub market: Option<String>,
    pub format: Option<String>,
}

/// GET /api/data/export?decade=&market=&format=csv|json
#[tracing::instrument(skip(state))]
pub async fn export_data(
    State(state): State<AppState>,
    client: ClientIdentity,
    params: std::result::Result<Query<ExportParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = params?;
    let format = ExportFormat::parse(params.format.as_deref())?;
    let filter = StockFilter::parse(params.decade.as_deref(), params.market.as_deref())?;

    let rate_limit = state.gate.admit("export", &client)?;

    let records = state
        .repository
        .export(filter)
        .await
        .map_err(AppError::query("export data"))?;

    if records.is_empty() {
        return Err(AppError::NotFound("export"));
    }

    let body = match format {
        ExportFormat::Csv => encode_csv(&records)?,
        ExportFormat::Json => serde_json::to_vec_pretty(&records)
            .map_err(|e| AppError::Internal(format!("JSON export failed: {}", e)))?,
    };

    tracing::info!(
        client = %client,
        rows = records.len(),
        format = format.extension(),
        "Exported stock data"
    );

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&filter, format)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    add_rate_limit_headers(headers, &rate_limit);

    Ok(response)
}

fn encode_csv(records: &[StockRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

fn content_disposition(filter: &StockFilter, format: ExportFormat) -> String {
    format!(
        "attachment; filename=\"financiera_data_{}_{}.{}\"",
        filter.decade.map_or("all", |d| d.as_str()),
        filter.market.map_or("all", |m| m.as_str()),
        format.extension()
    )
}
