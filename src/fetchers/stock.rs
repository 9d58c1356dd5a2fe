//! Equity quotes from Yahoo Finance's chart endpoint

use super::{log_failure, DataFetcher};
use crate::error::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};

/// Exchange suffix appended to bare tickers (National Stock Exchange)
pub const DEFAULT_EXCHANGE_SUFFIX: &str = ".NS";
pub const DEFAULT_CURRENCY: &str = "INR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockQuote {
    pub symbol: String,
    pub name: Option<String>,
    pub price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    currency: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

/// Upper-case the ticker and add the NSE suffix unless an exchange or index is given
pub fn normalize_symbol(symbol: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    if symbol.contains('.') || symbol.starts_with('^') {
        symbol
    } else {
        format!("{}{}", symbol, DEFAULT_EXCHANGE_SUFFIX)
    }
}

impl DataFetcher {
    pub async fn stock_price(&self, symbol: &str) -> FetchResult<StockQuote> {
        let result = self.stock_price_inner(symbol).await;
        log_failure("stock_price", symbol, result)
    }

    async fn stock_price_inner(&self, symbol: &str) -> FetchResult<StockQuote> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() || symbol == DEFAULT_EXCHANGE_SUFFIX {
            return Err(FetchError::NoData);
        }

        let url = format!("{}/v8/finance/chart/{}", self.config.stock_base_url, symbol);
        let response: ChartResponse = self
            .get_json(&url, &[("interval", "1d"), ("range", "1d")])
            .await?;

        let meta = response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .map(|r| r.meta)
            .ok_or(FetchError::NoData)?;

        quote_from_meta(symbol, meta)
    }
}

fn quote_from_meta(requested: String, meta: ChartMeta) -> FetchResult<StockQuote> {
    let price = meta.regular_market_price.ok_or(FetchError::NoData)?;
    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .unwrap_or(price);

    let change = price - previous_close;
    let change_percent = if previous_close != 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    };

    Ok(StockQuote {
        symbol: meta.symbol.unwrap_or(requested),
        name: meta.long_name.or(meta.short_name),
        price,
        previous_close,
        change,
        change_percent,
        currency: meta
            .currency
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    })
}
