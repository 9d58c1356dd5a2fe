//! Gold rate advisory
//!
//! There is no free gold price API for Indian retail rates, so the advisory is
//! assembled from web search snippets of trusted finance publishers.

use super::{log_failure, DataFetcher, SearchResult};
use crate::error::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const PRIMARY_QUERY: &str = "gold rate today India 22 carat 24 carat per 10 gram";
const FALLBACK_QUERY: &str = "gold price India today";
const SNIPPETS_IN_ADVISORY: usize = 3;

/// Publishers whose gold-rate pages are preferred over arbitrary results
const TRUSTED_SOURCES: &[&str] = &[
    "goodreturns",
    "economictimes",
    "moneycontrol",
    "livemint",
    "business-standard",
    "bankbazaar",
    "ibjarates",
    "financialexpress",
    "ndtv",
];

const DISCLAIMER: &str = "Note: Gold rates differ from city to city and jeweller to jeweller. \
Retail prices usually exclude 3% GST and making charges (typically 8-25% for jewellery). \
Please confirm today's rate with your local jeweller or the IBJA website before buying.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoldAdvisory {
    pub summary: String,
    pub sources: Vec<String>,
}

impl DataFetcher {
    /// Build a gold-rate advisory, optionally for a specific city
    pub async fn gold_rate(&self, city: Option<&str>) -> FetchResult<GoldAdvisory> {
        let subject = city.unwrap_or("India");
        let result = self.gold_rate_inner(city).await;
        log_failure("gold_rate", subject, result)
    }

    async fn gold_rate_inner(&self, city: Option<&str>) -> FetchResult<GoldAdvisory> {
        let primary = match city.map(str::trim).filter(|c| !c.is_empty()) {
            Some(city) => format!("{} {}", PRIMARY_QUERY, city),
            None => PRIMARY_QUERY.to_string(),
        };

        let results = match self.web_search(&primary).await {
            Ok(results) => results,
            Err(e) => {
                info!("Primary gold search gave nothing ({}), trying broader query", e);
                self.web_search(FALLBACK_QUERY).await.map_err(|_| FetchError::NoData)?
            }
        };

        let picked = prefer_trusted(&results, SNIPPETS_IN_ADVISORY);
        debug!(picked = picked.len(), "Gold rate sources selected");

        Ok(build_advisory(city, &picked))
    }
}

fn is_trusted(result: &SearchResult) -> bool {
    let link = result.link.to_lowercase();
    let title = result.title.to_lowercase();
    TRUSTED_SOURCES
        .iter()
        .any(|source| link.contains(source) || title.contains(source))
}

/// Trusted results first; when none match, the first unfiltered ones
fn prefer_trusted(results: &[SearchResult], limit: usize) -> Vec<&SearchResult> {
    let trusted: Vec<&SearchResult> = results.iter().filter(|r| is_trusted(r)).take(limit).collect();
    if trusted.is_empty() {
        results.iter().take(limit).collect()
    } else {
        trusted
    }
}

fn build_advisory(city: Option<&str>, picked: &[&SearchResult]) -> GoldAdvisory {
    let place = city
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("India");

    let mut summary = format!("Latest gold rate information for {} (from web sources):\n\n", place);
    for result in picked {
        if result.snippet.is_empty() {
            summary.push_str(&format!("• {}\n", result.title));
        } else {
            summary.push_str(&format!("• {}: {}\n", result.title, result.snippet));
        }
    }
    summary.push('\n');
    summary.push_str(DISCLAIMER);

    GoldAdvisory {
        summary,
        sources: picked.iter().map(|r| r.link.clone()).collect(),
    }
}
