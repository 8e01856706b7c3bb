use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One bibliographic record as returned by a search provider.
///
/// Records carry no identity field of their own; two records describe the
/// same logical paper when their [`dedup_key`](SearchResult::dedup_key)s
/// match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub authors: Vec<String>,
    pub year: String,
    pub doi: String,
    pub source: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub url: String,
}

impl SearchResult {
    /// DOI when present, otherwise the lower-cased, whitespace-trimmed title.
    pub fn dedup_key(&self) -> String {
        if self.doi.is_empty() {
            self.title.trim().to_lowercase()
        } else {
            self.doi.clone()
        }
    }
}

/// One unit of work: a species plus the synonyms and keywords to search
/// with. `date_range` is informational and not applied as a filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesQuery {
    pub species_name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub date_range: Option<String>,
}

impl SpeciesQuery {
    /// Builds the boolean search string sent to every provider, e.g.
    /// `("Gadus morhua" OR "Atlantic cod") AND ("eDNA" OR "environmental DNA")`.
    ///
    /// Name and synonym terms are individually quoted and OR-combined; the
    /// group is parenthesized only when there is more than one term. The
    /// keyword clause follows the same rule and is appended with `AND`.
    pub fn build_query(&self) -> String {
        let mut terms = Vec::with_capacity(1 + self.synonyms.len());
        terms.push(format!("\"{}\"", self.species_name));
        for synonym in &self.synonyms {
            terms.push(format!("\"{synonym}\""));
        }

        let mut query = if terms.len() > 1 {
            format!("({})", terms.join(" OR "))
        } else {
            terms.swap_remove(0)
        };

        if !self.keywords.is_empty() {
            let keyword_terms = self
                .keywords
                .iter()
                .map(|keyword| format!("\"{keyword}\""))
                .collect::<Vec<_>>();
            if keyword_terms.len() > 1 {
                query.push_str(&format!(" AND ({})", keyword_terms.join(" OR ")));
            } else {
                query.push_str(&format!(" AND {}", keyword_terms[0]));
            }
        }

        query
    }
}

/// Collapses the concatenated provider results for one species to a single
/// record per logical paper. The first occurrence of a key wins, including
/// across providers, and output order is first-seen order.
pub fn deduplicate(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for result in results {
        if seen.insert(result.dedup_key()) {
            unique.push(result);
        }
    }
    unique
}
