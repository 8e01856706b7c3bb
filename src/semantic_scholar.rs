use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::SearchResult;
use crate::error::MinerError;
use crate::provider::SearchProvider;

const GRAPH_SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const SEARCH_FIELDS: &str = "title,authors,year,abstract,url,externalIds";

/// Semantic Scholar Graph API. The API key is optional; without one the
/// shared public rate pool applies.
pub struct SemanticScholarProvider {
    client: Client,
}

impl SemanticScholarProvider {
    pub fn new(api_key: &str) -> Result<Self, MinerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("edna-lm/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MinerError::SemanticScholarHttp(err.to_string()))?,
        );
        if !api_key.trim().is_empty() {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(api_key.trim())
                    .map_err(|err| MinerError::SemanticScholarHttp(err.to_string()))?,
            );
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| MinerError::SemanticScholarHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn try_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, MinerError> {
        let response = self
            .client
            .get(GRAPH_SEARCH_URL)
            .query(&[
                ("query", query),
                ("limit", &limit.to_string()),
                ("fields", SEARCH_FIELDS),
            ])
            .send()
            .map_err(|err| MinerError::SemanticScholarHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "Semantic Scholar request failed".to_string());
            return Err(MinerError::SemanticScholarStatus { status, message });
        }

        let payload: Value = response
            .json()
            .map_err(|err| MinerError::SemanticScholarHttp(err.to_string()))?;
        Ok(extract_results(&payload))
    }
}

impl SearchProvider for SemanticScholarProvider {
    fn name(&self) -> &'static str {
        "SemanticScholar"
    }

    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        match self.try_search(query, limit) {
            Ok(results) => {
                debug!(count = results.len(), "Semantic Scholar search complete");
                results
            }
            Err(err) => {
                warn!(error = %err, "Semantic Scholar search failed, returning no results");
                Vec::new()
            }
        }
    }
}

/// Every field defaults to empty when the payload omits it; a paper with a
/// null abstract or no external ids still yields a usable record.
fn extract_results(payload: &Value) -> Vec<SearchResult> {
    let Some(papers) = payload.get("data").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut results = Vec::with_capacity(papers.len());
    for paper in papers {
        let title = paper
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let authors = paper
            .get("authors")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|author| author.get("name").and_then(|v| v.as_str()))
                    .map(|name| name.to_string())
                    .collect()
            })
            .unwrap_or_default();
        let year = paper
            .get("year")
            .and_then(|v| v.as_i64())
            .map(|year| year.to_string())
            .unwrap_or_default();
        let doi = paper
            .get("externalIds")
            .and_then(|v| v.get("DOI"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let abstract_text = paper
            .get("abstract")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let url = paper
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        results.push(SearchResult {
            title,
            authors,
            year,
            doi,
            source: "SemanticScholar".to_string(),
            abstract_text,
            url,
        });
    }
    results
}
