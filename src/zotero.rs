use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use tracing::warn;

use crate::domain::SearchResult;
use crate::error::MinerError;

const ZOTERO_BASE: &str = "https://api.zotero.org";

/// Destination library for deduplicated records.
///
/// `ensure_collection` may fail hard (a species cannot be archived without
/// its collection); `add_item` never does, so one rejected item cannot
/// abort the rest of a batch.
pub trait ReferenceStore: Send + Sync {
    fn ensure_collection(&self, name: &str) -> Result<String, MinerError>;
    fn add_item(&self, record: &SearchResult, collection_id: &str) -> Option<String>;
}

pub struct ZoteroHttpClient {
    client: Client,
    base_url: String,
    library_prefix: String,
}

impl ZoteroHttpClient {
    pub fn new(library_id: &str, library_type: &str, api_key: &str) -> Result<Self, MinerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("edna-lm/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?,
        );
        headers.insert("Zotero-API-Version", HeaderValue::from_static("3"));
        headers.insert(
            "Zotero-API-Key",
            HeaderValue::from_str(api_key)
                .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: ZOTERO_BASE.to_string(),
            library_prefix: format!("{library_type}s/{library_id}"),
        })
    }

    fn library_url(&self, resource: &str) -> String {
        format!("{}/{}/{resource}", self.base_url, self.library_prefix)
    }

    fn try_add_item(
        &self,
        record: &SearchResult,
        collection_id: &str,
    ) -> Result<Option<String>, MinerError> {
        let payload = json!([build_item(record, collection_id)]);
        let url = self.library_url("items");
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?;
        let response = handle_status(response)?;
        let body: Value = response
            .json()
            .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?;
        Ok(first_successful_key(&body))
    }
}

impl ReferenceStore for ZoteroHttpClient {
    fn ensure_collection(&self, name: &str) -> Result<String, MinerError> {
        let url = self.library_url("collections");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?;
        let response = handle_status(response)?;
        let collections: Value = response
            .json()
            .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?;

        if let Some(key) = find_collection_key(&collections, name) {
            return Ok(key);
        }

        let payload = json!([{ "name": name }]);
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?;
        let response = handle_status(response)?;
        let body: Value = response
            .json()
            .map_err(|err| MinerError::ZoteroHttp(err.to_string()))?;

        first_successful_key(&body).ok_or_else(|| MinerError::CollectionCreate {
            name: name.to_string(),
            message: body.to_string(),
        })
    }

    fn add_item(&self, record: &SearchResult, collection_id: &str) -> Option<String> {
        match self.try_add_item(record, collection_id) {
            Ok(Some(key)) => Some(key),
            Ok(None) => {
                warn!(title = %record.title, "Zotero did not accept item");
                None
            }
            Err(err) => {
                warn!(title = %record.title, error = %err, "failed to add item to Zotero");
                None
            }
        }
    }
}

fn handle_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, MinerError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "Zotero request failed".to_string());
    Err(MinerError::ZoteroStatus { status, message })
}

/// Exact, case-sensitive name match over the library's collections.
fn find_collection_key(collections: &Value, name: &str) -> Option<String> {
    collections.as_array()?.iter().find_map(|collection| {
        let collection_name = collection.get("data")?.get("name")?.as_str()?;
        if collection_name == name {
            collection
                .get("key")
                .and_then(|key| key.as_str())
                .map(|key| key.to_string())
        } else {
            None
        }
    })
}

/// Write responses report per-index outcomes; index `"0"` is the single
/// object this client submits per request.
fn first_successful_key(body: &Value) -> Option<String> {
    body.get("successful")?
        .get("0")?
        .get("key")?
        .as_str()
        .map(|key| key.to_string())
}

fn build_item(record: &SearchResult, collection_id: &str) -> Value {
    let creators = record
        .authors
        .iter()
        .map(|author| creator_from_name(author))
        .collect::<Vec<_>>();

    json!({
        "itemType": "journalArticle",
        "title": record.title,
        "creators": creators,
        "date": record.year,
        "DOI": record.doi,
        "url": record.url,
        "abstractNote": record.abstract_text,
        "libraryCatalog": record.source,
        "collections": [collection_id],
    })
}

/// `"Last, First"` display names split into the two name fields; anything
/// else (bare names, collectives, multi-comma strings) stays freeform.
fn creator_from_name(name: &str) -> Value {
    if name.matches(',').count() == 1 {
        if let Some((last, first)) = name.split_once(',') {
            return json!({
                "creatorType": "author",
                "lastName": last.trim(),
                "firstName": first.trim(),
            });
        }
    }
    json!({ "creatorType": "author", "name": name.trim() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchResult;

    fn record() -> SearchResult {
        SearchResult {
            title: "Environmental DNA surveillance".to_string(),
            authors: vec!["Hansen, Brian".to_string(), "eDNA Consortium".to_string()],
            year: "2019".to_string(),
            doi: "10.1234/edna.2019.01".to_string(),
            source: "PubMed".to_string(),
            abstract_text: "Part one.".to_string(),
            url: "https://pubmed.ncbi.nlm.nih.gov/31411500/".to_string(),
        }
    }

    #[test]
    fn creator_with_single_comma_splits() {
        let creator = creator_from_name("Hansen, Brian");
        assert_eq!(creator["lastName"], "Hansen");
        assert_eq!(creator["firstName"], "Brian");
        assert!(creator.get("name").is_none());
    }

    #[test]
    fn creator_without_comma_stays_freeform() {
        let creator = creator_from_name("eDNA Consortium");
        assert_eq!(creator["name"], "eDNA Consortium");
        assert!(creator.get("lastName").is_none());
    }

    #[test]
    fn creator_with_two_commas_stays_freeform() {
        let creator = creator_from_name("Smith, John, Jr.");
        assert_eq!(creator["name"], "Smith, John, Jr.");
    }

    #[test]
    fn item_payload_carries_record_fields() {
        let item = build_item(&record(), "COL1");
        assert_eq!(item["itemType"], "journalArticle");
        assert_eq!(item["title"], "Environmental DNA surveillance");
        assert_eq!(item["date"], "2019");
        assert_eq!(item["DOI"], "10.1234/edna.2019.01");
        assert_eq!(item["abstractNote"], "Part one.");
        assert_eq!(item["libraryCatalog"], "PubMed");
        assert_eq!(item["collections"][0], "COL1");
        assert_eq!(item["creators"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn collection_lookup_is_exact_and_case_sensitive() {
        let collections: Value = serde_json::from_str(
            r#"[
                {"key": "AAA", "data": {"name": "eDNA - Gadus morhua"}},
                {"key": "BBB", "data": {"name": "edna - gadus morhua"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            find_collection_key(&collections, "eDNA - Gadus morhua"),
            Some("AAA".to_string())
        );
        assert_eq!(find_collection_key(&collections, "eDNA - Salmo salar"), None);
    }

    #[test]
    fn successful_key_extraction() {
        let body: Value =
            serde_json::from_str(r#"{"successful": {"0": {"key": "ITEM1"}}, "failed": {}}"#)
                .unwrap();
        assert_eq!(first_successful_key(&body), Some("ITEM1".to_string()));

        let failed: Value = serde_json::from_str(r#"{"successful": {}, "failed": {"0": {}}}"#)
            .unwrap();
        assert_eq!(first_successful_key(&failed), None);
    }
}
