//! Tool dispatcher
//!
//! Runs a model-requested tool and renders the outcome as plain text for the
//! model. Fetch failures become remediation text naming authoritative sites;
//! nothing here returns an error.

use super::ToolRequest;
use crate::error::{FetchError, FetchResult};
use crate::fetchers::{resolve_crypto_id, CryptoQuote, DataFetcher, FundNav, GoldAdvisory, SearchResult, StockQuote};
use crate::models::{ToolInvocation, ToolResult};
use tracing::{info, warn};

pub struct ToolDispatcher {
    fetcher: DataFetcher,
}

impl ToolDispatcher {
    pub fn new(fetcher: DataFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &DataFetcher {
        &self.fetcher
    }

    /// Execute one invocation; always yields a result for the model
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolResult {
        let content = match ToolRequest::from_invocation(invocation) {
            None => {
                warn!(tool = %invocation.name, "Model requested unknown tool");
                unknown_function_text(&invocation.name)
            }
            Some(Err(reason)) => {
                warn!(tool = %invocation.name, "Invalid tool arguments: {}", reason);
                format!(
                    "{}. Ask the user for the missing detail or answer from general knowledge.",
                    reason
                )
            }
            Some(Ok(request)) => {
                info!(tool = %invocation.name, call_id = %invocation.id, "Executing tool");
                self.execute(request).await
            }
        };

        ToolResult {
            call_id: invocation.id.clone(),
            name: invocation.name.clone(),
            content,
        }
    }

    async fn execute(&self, request: ToolRequest) -> String {
        match request {
            ToolRequest::WebSearch { query } => {
                render_search(&query, self.fetcher.web_search(&query).await)
            }
            ToolRequest::GoldRate { city } => {
                render_gold(self.fetcher.gold_rate(city.as_deref()).await)
            }
            ToolRequest::StockPrice { symbol } => {
                render_stock(&symbol, self.fetcher.stock_price(&symbol).await)
            }
            ToolRequest::CryptoPrice { crypto_id } => {
                let id = resolve_crypto_id(&crypto_id);
                render_crypto(&crypto_id, self.fetcher.crypto_price(&id).await)
            }
            ToolRequest::MutualFundNav { scheme_code } => {
                render_fund(&scheme_code, self.fetcher.mutual_fund_nav(&scheme_code).await)
            }
        }
    }
}

pub fn unknown_function_text(name: &str) -> String {
    format!("Unknown function: {}", name)
}

/// Up/down glyph and explicit sign for a change value
pub fn direction(change: f64) -> (&'static str, &'static str) {
    if change >= 0.0 {
        ("📈", "+")
    } else {
        ("📉", "")
    }
}

pub fn render_search(query: &str, outcome: FetchResult<Vec<SearchResult>>) -> String {
    match outcome {
        Ok(results) => {
            let mut out = format!("Web search results for \"{}\":\n\n", query);
            for (i, r) in results.iter().enumerate() {
                out.push_str(&format!("{}. **{}**\n", i + 1, r.title));
                if !r.snippet.is_empty() {
                    out.push_str(&format!("   {}\n", r.snippet));
                }
                if !r.link.is_empty() {
                    out.push_str(&format!("   Source: {}\n", r.link));
                }
                out.push('\n');
            }
            out.trim_end().to_string()
        }
        Err(e) => format!(
            "No web results were available for \"{}\" ({}). Answer from general knowledge and \
             suggest checking Moneycontrol (moneycontrol.com), Economic Times \
             (economictimes.indiatimes.com) or the official government portal for the latest details.",
            query,
            failure_reason(&e)
        ),
    }
}

pub fn render_gold(outcome: FetchResult<GoldAdvisory>) -> String {
    match outcome {
        Ok(advisory) if advisory.sources.is_empty() => advisory.summary,
        Ok(advisory) => {
            let mut out = advisory.summary;
            out.push_str("\n\nSources:");
            for source in advisory.sources.iter().filter(|s| !s.is_empty()) {
                out.push_str(&format!("\n- {}", source));
            }
            out
        }
        Err(_) => "Live gold rates are unavailable right now. Suggest checking GoodReturns \
                   (goodreturns.in/gold-rates), the India Bullion and Jewellers Association \
                   (ibjarates.com) or a local jeweller for today's 22K and 24K rates."
            .to_string(),
    }
}

pub fn render_stock(requested: &str, outcome: FetchResult<StockQuote>) -> String {
    match outcome {
        Ok(q) => {
            let (glyph, sign) = direction(q.change);
            let title = match &q.name {
                Some(name) => format!("{} ({})", name, q.symbol),
                None => q.symbol.clone(),
            };
            format!(
                "{}\nPrice: {} {}\n{} Change: {}{:.2} ({}{:.2}%)\nPrevious close: {} {}",
                title,
                q.currency,
                format_amount(q.price, &q.currency),
                glyph,
                sign,
                q.change,
                sign,
                q.change_percent,
                q.currency,
                format_amount(q.previous_close, &q.currency),
            )
        }
        Err(e) => format!(
            "Could not fetch the stock price for {} ({}). Suggest checking NSE (nseindia.com), \
             BSE (bseindia.com) or Google Finance for the live quote, and verifying the ticker symbol.",
            requested.trim().to_uppercase(),
            failure_reason(&e)
        ),
    }
}

pub fn render_crypto(requested: &str, outcome: FetchResult<CryptoQuote>) -> String {
    match outcome {
        Ok(q) => {
            let (glyph, sign) = direction(q.change_24h);
            format!(
                "{} price:\n₹{} INR\n${} USD\n{} 24h change: {}{:.2}%",
                capitalize(&q.id),
                format_amount(q.price_inr, "INR"),
                format_amount(q.price_usd, "USD"),
                glyph,
                sign,
                q.change_24h
            )
        }
        Err(e) => format!(
            "Could not fetch the price of {} ({}). Suggest checking CoinGecko (coingecko.com), \
             CoinMarketCap (coinmarketcap.com) or an Indian exchange such as WazirX or CoinDCX.",
            requested.trim(),
            failure_reason(&e)
        ),
    }
}

pub fn render_fund(scheme_code: &str, outcome: FetchResult<FundNav>) -> String {
    match outcome {
        Ok(f) => {
            let mut out = format!("{}\n", f.scheme_name);
            if let Some(house) = &f.fund_house {
                out.push_str(&format!("Fund house: {}\n", house));
            }
            if let Some(category) = &f.category {
                out.push_str(&format!("Category: {}\n", category));
            }
            out.push_str(&format!("NAV: ₹{:.4} (as of {})", f.nav, f.date));
            out
        }
        Err(e) => format!(
            "Could not fetch the NAV for scheme code {} ({}). Suggest checking AMFI \
             (amfiindia.com), the fund house website, or looking up the correct scheme code on mfapi.in.",
            scheme_code.trim(),
            failure_reason(&e)
        ),
    }
}

fn failure_reason(e: &FetchError) -> &'static str {
    match e {
        FetchError::NoData => "no data found",
        FetchError::Status(_) | FetchError::Transport(_) => "data source unavailable",
        FetchError::Parse(_) => "unexpected data",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Two-decimal amount; INR uses lakh/crore digit grouping
pub fn format_amount(value: f64, currency: &str) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = if currency.eq_ignore_ascii_case("INR") {
        group_indian(int_part)
    } else {
        group_thousands(int_part)
    };

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last3) = digits.split_at(digits.len() - 3);
    let mut out = String::new();
    for (i, c) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{},{}", out, last3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSourceConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn invocation(name: &str, arguments: serde_json::Value) -> ToolInvocation {
        ToolInvocation {
            id: "call-1".to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1234567.5, "INR"), "12,34,567.50");
        assert_eq!(format_amount(999.0, "INR"), "999.00");
        assert_eq!(format_amount(1234567.5, "USD"), "1,234,567.50");
        assert_eq!(format_amount(-1500.0, "INR"), "-1,500.00");
    }

    #[test]
    fn test_direction_follows_sign() {
        assert_eq!(direction(1.2), ("📈", "+"));
        assert_eq!(direction(0.0), ("📈", "+"));
        assert_eq!(direction(-0.5), ("📉", ""));
    }

    #[test]
    fn test_render_stock_down() {
        let text = render_stock(
            "infy",
            Ok(StockQuote {
                symbol: "INFY.NS".to_string(),
                name: Some("Infosys Limited".to_string()),
                price: 1500.0,
                previous_close: 1600.0,
                change: -100.0,
                change_percent: -6.25,
                currency: "INR".to_string(),
            }),
        );

        assert!(text.starts_with("Infosys Limited (INFY.NS)"));
        assert!(text.contains("📉 Change: -100.00 (-6.25%)"));
        assert!(text.contains("Previous close: INR 1,600.00"));
    }

    #[test]
    fn test_render_search_numbers_results() {
        let results = vec![
            SearchResult { title: "A".into(), snippet: "first".into(), link: "https://a".into() },
            SearchResult { title: "B".into(), snippet: "".into(), link: "https://b".into() },
        ];
        let text = render_search("ppf", Ok(results));

        assert!(text.contains("1. **A**\n   first\n   Source: https://a"));
        assert!(text.contains("2. **B**\n   Source: https://b"));
    }

    #[test]
    fn test_render_gold_lists_sources() {
        let advisory = GoldAdvisory {
            summary: "Latest gold rate information for India (from web sources):".into(),
            sources: vec!["https://www.goodreturns.in/gold-rates/".into()],
        };
        let text = render_gold(Ok(advisory));

        assert!(text.starts_with("Latest gold rate information for India"));
        assert!(text.ends_with("Sources:\n- https://www.goodreturns.in/gold-rates/"));
    }

    #[test]
    fn test_failures_point_to_authoritative_sites() {
        assert!(render_stock("tcs", Err(FetchError::Status(500))).contains("nseindia.com"));
        assert!(render_crypto("btc", Err(FetchError::NoData)).contains("coingecko.com"));
        assert!(render_fund("1", Err(FetchError::NoData)).contains("amfiindia.com"));
        assert!(render_gold(Err(FetchError::NoData)).contains("ibjarates.com"));
        assert!(render_search("x", Err(FetchError::NoData)).contains("moneycontrol.com"));
        assert!(!render_stock("tcs", Err(FetchError::Status(500))).contains("500"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fixed_text() {
        let dispatcher = ToolDispatcher::new(DataFetcher::new(DataSourceConfig::default()).unwrap());
        let result = dispatcher.dispatch(&invocation("get_weather", json!({}))).await;

        assert_eq!(result.content, "Unknown function: get_weather");
        assert_eq!(result.call_id, "call-1");
    }

    #[tokio::test]
    async fn test_invalid_arguments_do_not_fetch() {
        let dispatcher = ToolDispatcher::new(DataFetcher::new(DataSourceConfig::default()).unwrap());
        let result = dispatcher.dispatch(&invocation("get_stock_price", json!({ "ticker": 5 }))).await;

        assert!(result.content.starts_with("Invalid arguments for get_stock_price"));
    }

    #[tokio::test]
    async fn test_crypto_alias_resolved_before_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/simple/price")
            .match_query(mockito::Matcher::UrlEncoded("ids".into(), "bitcoin".into()))
            .with_status(200)
            .with_body(r#"{"bitcoin":{"inr":5432100.0,"usd":65000.0,"inr_24h_change":-1.75}}"#)
            .create_async()
            .await;

        let dispatcher = ToolDispatcher::new(
            DataFetcher::new(DataSourceConfig {
                crypto_base_url: server.url(),
                ..DataSourceConfig::default()
            })
            .unwrap(),
        );
        let result = dispatcher
            .dispatch(&invocation("get_crypto_price", json!({ "crypto_id": "btc" })))
            .await;

        mock.assert_async().await;
        assert!(result.content.starts_with("Bitcoin price:"));
        assert!(result.content.contains("₹54,32,100.00 INR"));
        assert!(result.content.contains("📉 24h change: -1.75%"));
    }

    #[tokio::test]
    async fn test_upstream_failure_becomes_remediation_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/v8/finance/chart/.*".to_string()))
            .match_query(mockito::Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let dispatcher = ToolDispatcher::new(
            DataFetcher::new(DataSourceConfig {
                stock_base_url: server.url(),
                ..DataSourceConfig::default()
            })
            .unwrap(),
        );
        let result = dispatcher
            .dispatch(&invocation("get_stock_price", json!({ "symbol": "tcs" })))
            .await;

        assert!(result.content.starts_with("Could not fetch the stock price for TCS"));
    }
}
