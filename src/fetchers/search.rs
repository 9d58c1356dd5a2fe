//! Web search via DuckDuckGo's HTML result page

use super::{log_failure, DataFetcher};
use crate::error::{FetchError, FetchResult};
use lazy_static::lazy_static;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum results parsed from one result page
pub const MAX_SEARCH_RESULTS: usize = 5;

lazy_static! {
    static ref RESULT_SELECTOR: Selector =
        Selector::parse("div.result").expect("valid result selector");
    static ref TITLE_SELECTOR: Selector =
        Selector::parse("a.result__a").expect("valid title selector");
    static ref SNIPPET_SELECTOR: Selector =
        Selector::parse(".result__snippet").expect("valid snippet selector");
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

impl DataFetcher {
    /// Run a web search and return up to five parsed results
    pub async fn web_search(&self, query: &str) -> FetchResult<Vec<SearchResult>> {
        let result = self.web_search_inner(query).await;
        log_failure("web_search", query, result)
    }

    async fn web_search_inner(&self, query: &str) -> FetchResult<Vec<SearchResult>> {
        let url = format!("{}/html/", self.config.search_base_url);
        let html = self.get_text(&url, &[("q", query)]).await?;

        let results = parse_search_results(&html, MAX_SEARCH_RESULTS);
        debug!(query, count = results.len(), "Parsed search results");

        if results.is_empty() {
            return Err(FetchError::NoData);
        }
        Ok(results)
    }
}

/// Extract result entries from a DuckDuckGo HTML page, skipping ads
pub fn parse_search_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT_SELECTOR)
        .filter(|node| !node.value().classes().any(|c| c == "result--ad"))
        .filter_map(parse_result_node)
        .take(limit)
        .collect()
}

fn parse_result_node(node: ElementRef<'_>) -> Option<SearchResult> {
    let anchor = node.select(&TITLE_SELECTOR).next()?;
    let title = collapse_whitespace(&anchor.text().collect::<String>());
    if title.is_empty() {
        return None;
    }

    let snippet = node
        .select(&SNIPPET_SELECTOR)
        .next()
        .map(|s| collapse_whitespace(&s.text().collect::<String>()))
        .unwrap_or_default();

    let link = anchor
        .value()
        .attr("href")
        .map(resolve_result_link)
        .unwrap_or_default();

    Some(SearchResult {
        title,
        snippet,
        link,
    })
}

/// Unwrap DuckDuckGo redirect links (`//duckduckgo.com/l/?uddg=...`)
fn resolve_result_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    if let Ok(url) = Url::parse(&absolute) {
        if url.path().starts_with("/l/") {
            if let Some((_, target)) = url.query_pairs().find(|(k, _)| k == "uddg") {
                return target.into_owned();
            }
        }
    }

    absolute
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
