//! Mutual fund NAV from mfapi.in (AMFI data)

use super::{log_failure, DataFetcher};
use crate::error::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundNav {
    pub scheme_code: String,
    pub scheme_name: String,
    pub fund_house: Option<String>,
    pub category: Option<String>,
    pub nav: f64,
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct SchemeResponse {
    #[serde(default)]
    meta: Option<SchemeMeta>,
    #[serde(default)]
    data: Vec<NavPoint>,
}

#[derive(Debug, Default, Deserialize)]
struct SchemeMeta {
    scheme_name: Option<String>,
    fund_house: Option<String>,
    scheme_category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NavPoint {
    date: String,
    nav: String,
}

impl DataFetcher {
    pub async fn mutual_fund_nav(&self, scheme_code: &str) -> FetchResult<FundNav> {
        let result = self.mutual_fund_nav_inner(scheme_code.trim()).await;
        log_failure("mutual_fund_nav", scheme_code, result)
    }

    async fn mutual_fund_nav_inner(&self, scheme_code: &str) -> FetchResult<FundNav> {
        if scheme_code.is_empty() || !scheme_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(FetchError::Parse(format!(
                "scheme code must be numeric, got {:?}",
                scheme_code
            )));
        }

        let url = format!("{}/mf/{}", self.config.mutual_fund_base_url, scheme_code);
        let response: SchemeResponse = self.get_json(&url, &[]).await?;

        // Series is ordered newest first
        let latest = response.data.into_iter().next().ok_or(FetchError::NoData)?;
        let nav = latest
            .nav
            .trim()
            .parse::<f64>()
            .map_err(|_| FetchError::Parse(format!("invalid NAV value {:?}", latest.nav)))?;

        let meta = response.meta.unwrap_or_default();

        Ok(FundNav {
            scheme_code: scheme_code.to_string(),
            scheme_name: meta
                .scheme_name
                .unwrap_or_else(|| format!("Scheme {}", scheme_code)),
            fund_house: meta.fund_house,
            category: meta.scheme_category,
            nav,
            date: latest.date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSourceConfig;
    use pretty_assertions::assert_eq;

    fn fetcher_for(server: &mockito::ServerGuard) -> DataFetcher {
        DataFetcher::new(DataSourceConfig {
            mutual_fund_base_url: server.url(),
            ..DataSourceConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_takes_most_recent_point() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/mf/119551")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"meta":{"fund_house":"Aditya Birla Sun Life Mutual Fund","scheme_category":"Debt Scheme - Banking and PSU Fund",
                "scheme_code":119551,"scheme_name":"Aditya Birla Sun Life Banking & PSU Debt Fund - Direct - IDCW"},
                "data":[{"date":"18-10-2024","nav":"107.34560"},{"date":"17-10-2024","nav":"107.30000"}],"status":"SUCCESS"}"#,
            )
            .create_async()
            .await;

        let nav = fetcher_for(&server).mutual_fund_nav("119551").await.unwrap();

        mock.assert_async().await;
        assert_eq!(nav.nav, 107.3456);
        assert_eq!(nav.date, "18-10-2024");
        assert_eq!(nav.fund_house.as_deref(), Some("Aditya Birla Sun Life Mutual Fund"));
    }

    #[tokio::test]
    async fn test_empty_series_is_no_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/mf/999999")
            .with_status(200)
            .with_body(r#"{"meta":{},"data":[],"status":"SUCCESS"}"#)
            .create_async()
            .await;

        let result = fetcher_for(&server).mutual_fund_nav("999999").await;
        assert_eq!(result, Err(FetchError::NoData));
    }

    #[tokio::test]
    async fn test_non_numeric_code_rejected_without_request() {
        let fetcher = DataFetcher::new(DataSourceConfig::default()).unwrap();
        let result = fetcher.mutual_fund_nav("axis bluechip").await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_server_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/mf/100").with_status(500).create_async().await;

        let result = fetcher_for(&server).mutual_fund_nav("100").await;
        assert_eq!(result, Err(FetchError::Status(500)));
    }
}
