use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::SearchResult;
use crate::error::MinerError;
use crate::provider::SearchProvider;

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const PUBMED_ARTICLE_BASE: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// PubMed over the NCBI E-utilities: `esearch` resolves the query to a PMID
/// list, `efetch` returns the article records as XML. NCBI asks clients to
/// identify themselves with a contact email on every request.
pub struct PubmedProvider {
    client: Client,
    email: String,
}

impl PubmedProvider {
    pub fn new(email: &str) -> Result<Self, MinerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("edna-lm/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MinerError::PubmedHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| MinerError::PubmedHttp(err.to_string()))?;
        Ok(Self {
            client,
            email: email.to_string(),
        })
    }

    fn try_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, MinerError> {
        let ids = self.esearch_ids(query, limit)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let xml = self.efetch_xml(&ids)?;
        parse_efetch_xml(&xml)
    }

    fn esearch_ids(&self, query: &str, limit: usize) -> Result<Vec<String>, MinerError> {
        let url = format!("{EUTILS_BASE}/esearch.fcgi");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("db", "pubmed"),
                ("term", query),
                ("retmax", &limit.to_string()),
                ("retmode", "json"),
                ("email", &self.email),
            ])
            .send()
            .map_err(|err| MinerError::PubmedHttp(err.to_string()))?;
        let response = handle_status(response)?;
        let payload: Value = response
            .json()
            .map_err(|err| MinerError::PubmedHttp(err.to_string()))?;
        Ok(extract_id_list(&payload))
    }

    fn efetch_xml(&self, ids: &[String]) -> Result<String, MinerError> {
        let url = format!("{EUTILS_BASE}/efetch.fcgi");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("db", "pubmed"),
                ("id", ids.join(",").as_str()),
                ("retmode", "xml"),
                ("email", &self.email),
            ])
            .send()
            .map_err(|err| MinerError::PubmedHttp(err.to_string()))?;
        let response = handle_status(response)?;
        response
            .text()
            .map_err(|err| MinerError::PubmedHttp(err.to_string()))
    }
}

impl SearchProvider for PubmedProvider {
    fn name(&self) -> &'static str {
        "PubMed"
    }

    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        match self.try_search(query, limit) {
            Ok(results) => {
                debug!(count = results.len(), "PubMed search complete");
                results
            }
            Err(err) => {
                warn!(error = %err, "PubMed search failed, returning no results");
                Vec::new()
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
        .unwrap_or_else(|_| "PubMed request failed".to_string());
    Err(MinerError::PubmedStatus { status, message })
}

fn extract_id_list(payload: &Value) -> Vec<String> {
    payload
        .get("esearchresult")
        .and_then(|v| v.get("idlist"))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|id| id.to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticle {
    #[serde(rename = "MedlineCitation")]
    citation: MedlineCitation,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: TextValue,
    #[serde(rename = "Article")]
    article: ArticleNode,
}

#[derive(Debug, Deserialize)]
struct ArticleNode {
    #[serde(rename = "ArticleTitle", default)]
    title: Option<TextValue>,
    #[serde(rename = "Journal", default)]
    journal: Option<JournalNode>,
    #[serde(rename = "Abstract", default)]
    abstract_node: Option<AbstractNode>,
    #[serde(rename = "AuthorList", default)]
    author_list: Option<AuthorList>,
    #[serde(rename = "ELocationID", default)]
    elocation_ids: Vec<ELocationId>,
}

#[derive(Debug, Deserialize, Default)]
struct TextValue {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct JournalNode {
    #[serde(rename = "JournalIssue", default)]
    issue: Option<JournalIssueNode>,
}

#[derive(Debug, Deserialize)]
struct JournalIssueNode {
    #[serde(rename = "PubDate", default)]
    pub_date: Option<PubDateNode>,
}

#[derive(Debug, Deserialize)]
struct PubDateNode {
    #[serde(rename = "Year", default)]
    year: Option<TextValue>,
    #[serde(rename = "MedlineDate", default)]
    medline_date: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct AbstractNode {
    #[serde(rename = "AbstractText", default)]
    sections: Vec<TextValue>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<AuthorNode>,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    #[serde(rename = "LastName", default)]
    last_name: Option<TextValue>,
    #[serde(rename = "ForeName", default)]
    fore_name: Option<TextValue>,
    #[serde(rename = "CollectiveName", default)]
    collective_name: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct ELocationId {
    #[serde(rename = "@EIdType", default)]
    id_type: String,
    #[serde(rename = "$text", default)]
    value: String,
}

fn parse_efetch_xml(xml: &str) -> Result<Vec<SearchResult>, MinerError> {
    let set: PubmedArticleSet =
        quick_xml::de::from_str(xml).map_err(|err| MinerError::PubmedParse(err.to_string()))?;

    let mut results = Vec::with_capacity(set.articles.len());
    for article in set.articles {
        let citation = article.citation;
        let node = citation.article;

        let title = node.title.map(|t| t.value).unwrap_or_default();

        let mut authors = Vec::new();
        if let Some(list) = node.author_list {
            for author in list.authors {
                if let Some(collective) = author.collective_name {
                    if !collective.value.is_empty() {
                        authors.push(collective.value);
                    }
                    continue;
                }
                let last = author.last_name.map(|t| t.value).unwrap_or_default();
                let fore = author.fore_name.map(|t| t.value).unwrap_or_default();
                if !last.is_empty() || !fore.is_empty() {
                    authors.push(format!("{last}, {fore}"));
                }
            }
        }

        let year = node
            .journal
            .and_then(|journal| journal.issue)
            .and_then(|issue| issue.pub_date)
            .map(|date| match date.year {
                Some(year) => year.value,
                None => date
                    .medline_date
                    .and_then(|text| year_from_medline_date(&text.value))
                    .unwrap_or_default(),
            })
            .unwrap_or_default();

        let doi = node
            .elocation_ids
            .iter()
            .find(|eid| eid.id_type == "doi")
            .map(|eid| eid.value.clone())
            .unwrap_or_default();

        let abstract_text = node
            .abstract_node
            .map(|node| {
                node.sections
                    .into_iter()
                    .map(|section| section.value)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let url = format!("{PUBMED_ARTICLE_BASE}/{}/", citation.pmid.value);

        results.push(SearchResult {
            title,
            authors,
            year,
            doi,
            source: "PubMed".to_string(),
            abstract_text,
            url,
        });
    }
    Ok(results)
}

/// `MedlineDate` holds ranges like `2019 Nov-Dec` or `1998-1999`; the first
/// four-digit year stands in when no `<Year>` element is present.
fn year_from_medline_date(medline_date: &str) -> Option<String> {
    let pattern = Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").unwrap();
    pattern
        .find(medline_date)
        .map(|found| found.as_str().to_string())
}
