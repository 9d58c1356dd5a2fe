//! Runtime configuration loaded from the environment (and `.env`)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://html.duckduckgo.com";
pub const DEFAULT_STOCK_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_CRYPTO_BASE_URL: &str = "https://api.coingecko.com";
pub const DEFAULT_MUTUAL_FUND_BASE_URL: &str = "https://api.mfapi.in";

/// Endpoints and timeout used by the public data fetchers
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    pub search_base_url: String,
    pub stock_base_url: String,
    pub crypto_base_url: String,
    pub mutual_fund_base_url: String,
    pub timeout: Duration,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            stock_base_url: DEFAULT_STOCK_BASE_URL.to_string(),
            crypto_base_url: DEFAULT_CRYPTO_BASE_URL.to_string(),
            mutual_fund_base_url: DEFAULT_MUTUAL_FUND_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Gemini client settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub llm: LlmConfig,
    pub data_sources: DataSourceConfig,
    pub max_tool_rounds: usize,
    pub frontend_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            llm: LlmConfig::default(),
            data_sources: DataSourceConfig::default(),
            max_tool_rounds: 5,
            frontend_dir: None,
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables.
    ///
    /// Call `dotenv::dotenv()` beforehand if a `.env` file should be honoured.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != "your_gemini_api_key_here");

        let port = env::var("PORT")
            .or_else(|_| env::var("API_PORT"))
            .ok()
            .map(|v| parse_or_default("PORT", &v, defaults.port))
            .unwrap_or(defaults.port);

        let llm = LlmConfig {
            api_key,
            model: string_var("GEMINI_MODEL", &defaults.llm.model),
            base_url: base_url_var("GEMINI_BASE_URL", &defaults.llm.base_url),
            temperature: numeric_var("LLM_TEMPERATURE", defaults.llm.temperature),
            timeout: Duration::from_secs(numeric_var("LLM_TIMEOUT_SECS", 60u64)),
        };

        let data_sources = DataSourceConfig {
            search_base_url: base_url_var("SEARCH_BASE_URL", DEFAULT_SEARCH_BASE_URL),
            stock_base_url: base_url_var("STOCK_BASE_URL", DEFAULT_STOCK_BASE_URL),
            crypto_base_url: base_url_var("CRYPTO_BASE_URL", DEFAULT_CRYPTO_BASE_URL),
            mutual_fund_base_url: base_url_var("MUTUAL_FUND_BASE_URL", DEFAULT_MUTUAL_FUND_BASE_URL),
            timeout: Duration::from_secs(numeric_var("FETCH_TIMEOUT_SECS", 15u64)),
        };

        let max_tool_rounds = numeric_var("MAX_TOOL_ROUNDS", defaults.max_tool_rounds).max(1);

        let frontend_dir = env::var("FRONTEND_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            port,
            llm,
            data_sources,
            max_tool_rounds,
            frontend_dir,
        }
    }
}

fn string_var(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn base_url_var(name: &str, default: &str) -> String {
    string_var(name, default).trim_end_matches('/').to_string()
}

fn numeric_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => parse_or_default(name, &value, default),
        Err(_) => default,
    }
}

fn parse_or_default<T: FromStr + Copy + std::fmt::Display>(name: &str, value: &str, default: T) -> T {
    value.trim().parse().unwrap_or_else(|_| {
        warn!("Invalid value {:?} for {}, using default {}", value, name, default);
        default
    })
}
