//! Crypto prices from CoinGecko's simple price endpoint

use super::{log_failure, DataFetcher};
use crate::error::{FetchError, FetchResult};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

lazy_static! {
    /// Ticker symbols and casual names mapped to CoinGecko ids
    static ref CRYPTO_ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        for (alias, id) in [
            ("btc", "bitcoin"),
            ("bitcoin", "bitcoin"),
            ("eth", "ethereum"),
            ("ether", "ethereum"),
            ("ethereum", "ethereum"),
            ("usdt", "tether"),
            ("tether", "tether"),
            ("bnb", "binancecoin"),
            ("binance", "binancecoin"),
            ("sol", "solana"),
            ("solana", "solana"),
            ("xrp", "ripple"),
            ("ripple", "ripple"),
            ("ada", "cardano"),
            ("cardano", "cardano"),
            ("doge", "dogecoin"),
            ("dogecoin", "dogecoin"),
            ("dot", "polkadot"),
            ("polkadot", "polkadot"),
            ("matic", "matic-network"),
            ("polygon", "matic-network"),
            ("shib", "shiba-inu"),
            ("shiba", "shiba-inu"),
            ("ltc", "litecoin"),
            ("litecoin", "litecoin"),
            ("trx", "tron"),
            ("tron", "tron"),
            ("avax", "avalanche-2"),
            ("avalanche", "avalanche-2"),
            ("link", "chainlink"),
            ("chainlink", "chainlink"),
        ] {
            m.insert(alias, id);
        }
        m
    };
}

/// Resolve a symbol or casual name to a CoinGecko id; unknown input is lower-cased
pub fn resolve_crypto_id(input: &str) -> String {
    let key = input.trim().to_lowercase();
    CRYPTO_ALIASES
        .get(key.as_str())
        .map(|id| id.to_string())
        .unwrap_or(key)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CryptoQuote {
    pub id: String,
    pub price_inr: f64,
    pub price_usd: f64,
    /// 24h change in percent, INR-denominated
    pub change_24h: f64,
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    inr: Option<f64>,
    usd: Option<f64>,
    inr_24h_change: Option<f64>,
    usd_24h_change: Option<f64>,
}

impl DataFetcher {
    pub async fn crypto_price(&self, crypto: &str) -> FetchResult<CryptoQuote> {
        let id = resolve_crypto_id(crypto);
        let result = self.crypto_price_inner(id).await;
        log_failure("crypto_price", crypto, result)
    }

    async fn crypto_price_inner(&self, id: String) -> FetchResult<CryptoQuote> {
        if id.is_empty() {
            return Err(FetchError::NoData);
        }

        let url = format!("{}/api/v3/simple/price", self.config.crypto_base_url);
        let mut prices: HashMap<String, SimplePrice> = self
            .get_json(
                &url,
                &[
                    ("ids", id.as_str()),
                    ("vs_currencies", "inr,usd"),
                    ("include_24hr_change", "true"),
                ],
            )
            .await?;

        let price = prices.remove(&id).ok_or(FetchError::NoData)?;
        let (Some(price_inr), Some(price_usd)) = (price.inr, price.usd) else {
            return Err(FetchError::NoData);
        };

        Ok(CryptoQuote {
            id,
            price_inr,
            price_usd,
            change_24h: price.inr_24h_change.or(price.usd_24h_change).unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSourceConfig;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    fn fetcher_for(server: &mockito::ServerGuard) -> DataFetcher {
        DataFetcher::new(DataSourceConfig {
            crypto_base_url: server.url(),
            ..DataSourceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(resolve_crypto_id("btc"), "bitcoin");
        assert_eq!(resolve_crypto_id(" BTC "), "bitcoin");
        assert_eq!(resolve_crypto_id("Ether"), "ethereum");
        assert_eq!(resolve_crypto_id("polygon"), "matic-network");
        assert_eq!(resolve_crypto_id("Pepe"), "pepe");
    }

    #[tokio::test]
    async fn test_crypto_price_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/simple/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "ethereum".into()),
                Matcher::UrlEncoded("vs_currencies".into(), "inr,usd".into()),
                Matcher::UrlEncoded("include_24hr_change".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ethereum":{"inr":250000.5,"usd":3000.0,"inr_24h_change":2.5,"usd_24h_change":2.4}}"#)
            .create_async()
            .await;

        let quote = fetcher_for(&server).crypto_price("eth").await.unwrap();

        mock.assert_async().await;
        assert_eq!(quote.id, "ethereum");
        assert_eq!(quote.price_inr, 250000.5);
        assert_eq!(quote.change_24h, 2.5);
    }

    #[tokio::test]
    async fn test_unknown_coin_is_no_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/simple/price")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let result = fetcher_for(&server).crypto_price("notacoin").await;
        assert_eq!(result, Err(FetchError::NoData));
    }

    #[tokio::test]
    async fn test_rate_limited_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/simple/price")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let result = fetcher_for(&server).crypto_price("btc").await;
        assert_eq!(result, Err(FetchError::Status(429)));
    }
}
