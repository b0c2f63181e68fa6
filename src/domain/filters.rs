// Validated query parameters for the data endpoints

use crate::errors::{AppError, Result};
use serde::Serialize;

// ============================================================================
// Decade
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Decade {
    #[serde(rename = "1920s")]
    D1920s,
    #[serde(rename = "1930s")]
    D1930s,
    #[serde(rename = "1940s")]
    D1940s,
    #[serde(rename = "1950s")]
    D1950s,
    #[serde(rename = "1960s")]
    D1960s,
    #[serde(rename = "1970s")]
    D1970s,
    #[serde(rename = "1980s")]
    D1980s,
    #[serde(rename = "1990s")]
    D1990s,
    #[serde(rename = "2000s")]
    D2000s,
    #[serde(rename = "2010s")]
    D2010s,
    #[serde(rename = "2020s")]
    D2020s,
}

impl Decade {
    pub const ALL: [Decade; 11] = [
        Decade::D1920s,
        Decade::D1930s,
        Decade::D1940s,
        Decade::D1950s,
        Decade::D1960s,
        Decade::D1970s,
        Decade::D1980s,
        Decade::D1990s,
        Decade::D2000s,
        Decade::D2010s,
        Decade::D2020s,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Decade::D1920s => "1920s",
            Decade::D1930s => "1930s",
            Decade::D1940s => "1940s",
            Decade::D1950s => "1950s",
            Decade::D1960s => "1960s",
            Decade::D1970s => "1970s",
            Decade::D1980s => "1980s",
            Decade::D1990s => "1990s",
            Decade::D2000s => "2000s",
            Decade::D2010s => "2010s",
            Decade::D2020s => "2020s",
        }
    }

    /// Exact match against the recognized labels, e.g. `"1950s"`.
    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| AppError::invalid_param("decade"))
    }
}

// ============================================================================
// Market
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Market {
    #[serde(rename = "NYSE")]
    Nyse,
    Frankfurt,
    Tokyo,
    #[serde(rename = "Hong Kong")]
    HongKong,
}

impl Market {
    pub const ALL: [Market; 4] = [Market::Nyse, Market::Frankfurt, Market::Tokyo, Market::HongKong];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Nyse => "NYSE",
            Market::Frankfurt => "Frankfurt",
            Market::Tokyo => "Tokyo",
            Market::HongKong => "Hong Kong",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AppError::invalid_param("market"))
    }
}

// ============================================================================
// Optional filters shared by several endpoints
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StockFilter {
    pub decade: Option<Decade>,
    pub market: Option<Market>,
}

impl StockFilter {
    /// Parse optional `decade` / `market` query values. Empty strings count as absent.
    pub fn parse(decade: Option<&str>, market: Option<&str>) -> Result<Self> {
        Ok(Self {
            decade: non_empty(decade).map(Decade::parse).transpose()?,
            market: non_empty(market).map(Market::parse).transpose()?,
        })
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Symbol
// ============================================================================

pub const MAX_SYMBOL_LEN: usize = 10;

/// Upper-cased ticker symbol, 1 to 10 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_SYMBOL_LEN {
            return Err(AppError::invalid_param("symbol"));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Top performers limit
// ============================================================================

pub const DEFAULT_TOP_LIMIT: u32 = 10;
pub const MAX_TOP_LIMIT: u32 = 50;

/// `limit` defaults to 10 and is capped at 50; non-numeric or zero is rejected.
pub fn parse_top_limit(value: Option<&str>) -> Result<u32> {
    match non_empty(value) {
        None => Ok(DEFAULT_TOP_LIMIT),
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(AppError::invalid_param("limit")),
            Ok(n) => Ok(n.min(MAX_TOP_LIMIT)),
        },
    }
}

// ============================================================================
// Export format
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match non_empty(value).map(str::to_lowercase).as_deref() {
            None | Some("csv") => Ok(ExportFormat::Csv),
            Some("json") => Ok(ExportFormat::Json),
            Some(_) => Err(AppError::Validation(
                "Invalid format. Use csv or json".to_string(),
            )),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}
