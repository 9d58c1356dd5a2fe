//! Tool declarations exposed to the language model
//!
//! The set of tools is closed: every tool is a `ToolKind` variant with a static
//! description and JSON schema, so dispatch is checked exhaustively.

pub mod dispatcher;

pub use dispatcher::ToolDispatcher;

use crate::models::{ToolInvocation, ToolSpec};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WebSearch,
    GoldRate,
    StockPrice,
    CryptoPrice,
    MutualFundNav,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::WebSearch,
        ToolKind::GoldRate,
        ToolKind::StockPrice,
        ToolKind::CryptoPrice,
        ToolKind::MutualFundNav,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::GoldRate => "get_gold_rate",
            ToolKind::StockPrice => "get_stock_price",
            ToolKind::CryptoPrice => "get_crypto_price",
            ToolKind::MutualFundNav => "get_mutual_fund_nav",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => {
                "Search the web for current financial news, interest rates, tax rules, \
                 government scheme updates or any information that may have changed recently."
            }
            ToolKind::GoldRate => {
                "Get today's gold rate in India (22K and 24K per 10 grams), optionally for a city."
            }
            ToolKind::StockPrice => {
                "Get the live price of a stock. Indian NSE tickers like RELIANCE, TCS or INFY \
                 are supported; use the .BO suffix for BSE."
            }
            ToolKind::CryptoPrice => {
                "Get the current price of a cryptocurrency in INR and USD with its 24 hour change."
            }
            ToolKind::MutualFundNav => {
                "Get the latest NAV of an Indian mutual fund by its AMFI scheme code."
            }
        }
    }

    /// JSON schema of the arguments object
    pub fn parameters(&self) -> serde_json::Value {
        match self {
            ToolKind::WebSearch => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" }
                },
                "required": ["query"]
            }),
            ToolKind::GoldRate => json!({
                "type": "object",
                "properties": {
                    "city": { "type": "string", "description": "Indian city, e.g. Mumbai or Chennai" }
                }
            }),
            ToolKind::StockPrice => json!({
                "type": "object",
                "properties": {
                    "symbol": { "type": "string", "description": "Ticker symbol, e.g. RELIANCE or TCS.BO" }
                },
                "required": ["symbol"]
            }),
            ToolKind::CryptoPrice => json!({
                "type": "object",
                "properties": {
                    "crypto_id": { "type": "string", "description": "Coin name or symbol, e.g. bitcoin, btc, eth" }
                },
                "required": ["crypto_id"]
            }),
            ToolKind::MutualFundNav => json!({
                "type": "object",
                "properties": {
                    "scheme_code": { "type": "string", "description": "AMFI scheme code, e.g. 119551" }
                },
                "required": ["scheme_code"]
            }),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Typed, validated tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    WebSearch { query: String },
    GoldRate { city: Option<String> },
    StockPrice { symbol: String },
    CryptoPrice { crypto_id: String },
    MutualFundNav { scheme_code: String },
}

#[derive(Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Deserialize)]
struct GoldArgs {
    #[serde(default)]
    city: Option<String>,
}

#[derive(Deserialize)]
struct SymbolArgs {
    symbol: String,
}

#[derive(Deserialize)]
struct CryptoArgs {
    crypto_id: String,
}

#[derive(Deserialize)]
struct SchemeArgs {
    #[serde(deserialize_with = "string_or_number")]
    scheme_code: String,
}

/// Models sometimes send numeric scheme codes as JSON numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

impl ToolRequest {
    /// Parse the argument payload for a known tool kind
    pub fn parse(kind: ToolKind, arguments: &serde_json::Value) -> Result<Self, String> {
        // Some providers send null for argument-less calls
        let args = if arguments.is_null() {
            json!({})
        } else {
            arguments.clone()
        };

        let request = match kind {
            ToolKind::WebSearch => serde_json::from_value::<QueryArgs>(args)
                .map(|a| ToolRequest::WebSearch { query: a.query }),
            ToolKind::GoldRate => serde_json::from_value::<GoldArgs>(args)
                .map(|a| ToolRequest::GoldRate { city: a.city }),
            ToolKind::StockPrice => serde_json::from_value::<SymbolArgs>(args)
                .map(|a| ToolRequest::StockPrice { symbol: a.symbol }),
            ToolKind::CryptoPrice => serde_json::from_value::<CryptoArgs>(args)
                .map(|a| ToolRequest::CryptoPrice { crypto_id: a.crypto_id }),
            ToolKind::MutualFundNav => serde_json::from_value::<SchemeArgs>(args)
                .map(|a| ToolRequest::MutualFundNav { scheme_code: a.scheme_code }),
        };

        request.map_err(|e| format!("Invalid arguments for {}: {}", kind.name(), e))
    }

    pub fn from_invocation(invocation: &ToolInvocation) -> Option<Result<Self, String>> {
        ToolKind::from_name(&invocation.name).map(|kind| Self::parse(kind, &invocation.arguments))
    }
}

/// Static registry of tools offered to the model
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            specs: ToolKind::ALL.iter().map(ToolKind::spec).collect(),
        }
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn list(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
