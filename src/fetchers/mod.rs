//! External data fetchers
//!
//! Thin clients for public, unauthenticated finance endpoints. Every fetcher
//! returns a typed `FetchResult`; transport and parse failures are logged here
//! and never propagate as chat errors.

pub mod crypto;
pub mod gold;
pub mod mutual_fund;
pub mod search;
pub mod stock;

pub use crypto::{resolve_crypto_id, CryptoQuote};
pub use gold::GoldAdvisory;
pub use mutual_fund::FundNav;
pub use search::SearchResult;
pub use stock::StockQuote;

use crate::config::DataSourceConfig;
use crate::error::{FetchError, FetchResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Shared, connection-pooled client for all public data sources
#[derive(Clone)]
pub struct DataFetcher {
    client: Client,
    config: DataSourceConfig,
}

impl DataFetcher {
    pub fn new(config: DataSourceConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    /// Names of the active data sources, for health reporting
    pub fn source_names(&self) -> Vec<&'static str> {
        vec![
            "DuckDuckGo web search",
            "Yahoo Finance (NSE/BSE equities)",
            "CoinGecko (crypto)",
            "MFAPI (mutual fund NAV)",
            "Gold rate via trusted publishers",
        ]
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> FetchResult<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> FetchResult<String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "text/html")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// Log a fetch failure and pass the result through unchanged
fn log_failure<T>(source: &str, subject: &str, result: FetchResult<T>) -> FetchResult<T> {
    if let Err(e) = &result {
        warn!(source, subject, "Data fetch failed: {}", e);
    }
    result
}
