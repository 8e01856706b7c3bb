use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::SearchResult;
use crate::error::MinerError;

/// Document-level bookkeeping. The counts are recomputed from the live
/// contents on every commit, never incremented, so they cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub created_at: String,
    pub last_updated: String,
    pub total_species: usize,
    pub total_papers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperEntry {
    pub zotero_key: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: String,
    pub doi: String,
    pub source: String,
    pub url: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub added_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub name: String,
    pub keywords: Vec<String>,
    pub papers: Vec<PaperEntry>,
    pub added_at: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDocument {
    pub metadata: CacheMetadata,
    pub species: Vec<SpeciesEntry>,
}

/// Durable, species-partitioned store of archived papers and their
/// abstracts, one YAML document for the whole run history.
///
/// Every mutation is a scoped load-modify-store transaction: [`begin`]
/// reads the document, [`CacheTransaction::commit`] recomputes the metadata
/// and replaces the file atomically. A single process must own the file for
/// the duration of a run; there is no cross-process locking.
///
/// [`begin`]: AbstractCache::begin
pub struct AbstractCache {
    path: Utf8PathBuf,
}

impl AbstractCache {
    /// Opens the cache at `path`, creating parent directories and an empty
    /// document (both top-level keys present, zero counts) on first use.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Result<Self, MinerError> {
        let cache = Self { path: path.into() };
        if !cache.path.as_std_path().exists() {
            let now = Utc::now().to_rfc3339();
            let document = CacheDocument {
                metadata: CacheMetadata {
                    created_at: now.clone(),
                    last_updated: now,
                    total_species: 0,
                    total_papers: 0,
                },
                species: Vec::new(),
            };
            cache.write_document(&document)?;
        }
        Ok(cache)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn begin(&self) -> Result<CacheTransaction<'_>, MinerError> {
        Ok(CacheTransaction {
            cache: self,
            document: self.read_document()?,
        })
    }

    /// Appends one paper entry per record/key pair to `species_name`,
    /// creating the species entry (with `keywords`) when absent, in a
    /// single transaction. `records` and `zotero_keys` are positionally
    /// paired and must have equal length.
    pub fn add_papers(
        &self,
        species_name: &str,
        records: &[SearchResult],
        zotero_keys: &[String],
        keywords: &[String],
    ) -> Result<(), MinerError> {
        let mut txn = self.begin()?;
        txn.add_papers(species_name, records, zotero_keys, keywords)?;
        txn.commit()
    }

    pub fn get_species(&self, species_name: &str) -> Result<Option<SpeciesEntry>, MinerError> {
        let document = self.read_document()?;
        Ok(document
            .species
            .into_iter()
            .find(|species| species.name == species_name))
    }

    /// Plain-text rendering of every cached paper for one species, for
    /// downstream LLM analysis. An unknown species renders as an empty
    /// string; a known species with zero papers still gets its header.
    pub fn render_abstracts_text(&self, species_name: &str) -> Result<String, MinerError> {
        let Some(species) = self.get_species(species_name)? else {
            return Ok(String::new());
        };

        let mut text = format!("Species: {species_name}\n");
        text.push_str(&format!("Total papers: {}\n\n", species.papers.len()));

        for (index, paper) in species.papers.iter().enumerate() {
            text.push_str(&format!("--- Paper {} ---\n", index + 1));
            text.push_str(&format!("Title: {}\n", paper.title));
            text.push_str(&format!("Authors: {}\n", paper.authors.join(", ")));
            text.push_str(&format!("Year: {}\n", paper.year));
            text.push_str(&format!("DOI: {}\n", paper.doi));
            text.push_str(&format!("Source: {}\n", paper.source));
            text.push_str(&format!("Zotero Key: {}\n", paper.zotero_key));
            text.push_str(&format!("\nAbstract:\n{}\n\n", paper.abstract_text));
        }
        Ok(text)
    }

    pub fn get_statistics(&self) -> Result<CacheMetadata, MinerError> {
        Ok(self.read_document()?.metadata)
    }

    fn read_document(&self) -> Result<CacheDocument, MinerError> {
        let content = fs::read_to_string(self.path.as_std_path())
            .map_err(|err| MinerError::Filesystem(format!("read {}: {err}", self.path)))?;
        serde_yaml::from_str(&content).map_err(|err| MinerError::CacheParse(err.to_string()))
    }

    fn write_document(&self, document: &CacheDocument) -> Result<(), MinerError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;

        let content = serde_yaml::to_string(document)
            .map_err(|err| MinerError::Cache(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("abstracts-cache")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        if self.path.as_std_path().exists() {
            fs::remove_file(self.path.as_std_path())
                .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        }
        temp.persist(self.path.as_std_path())
            .map_err(|err| MinerError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// In-memory view of the cache document between `begin` and `commit`.
/// Dropping the transaction without committing discards its mutations.
pub struct CacheTransaction<'a> {
    cache: &'a AbstractCache,
    document: CacheDocument,
}

impl CacheTransaction<'_> {
    pub fn add_papers(
        &mut self,
        species_name: &str,
        records: &[SearchResult],
        zotero_keys: &[String],
        keywords: &[String],
    ) -> Result<(), MinerError> {
        if records.len() != zotero_keys.len() {
            return Err(MinerError::Cache(format!(
                "papers/keys length mismatch for {species_name}: {} records, {} keys",
                records.len(),
                zotero_keys.len()
            )));
        }

        let now = Utc::now().to_rfc3339();
        let index = match self
            .document
            .species
            .iter()
            .position(|species| species.name == species_name)
        {
            Some(index) => {
                self.document.species[index].last_updated = now.clone();
                index
            }
            None => {
                self.document.species.push(SpeciesEntry {
                    name: species_name.to_string(),
                    keywords: keywords.to_vec(),
                    papers: Vec::new(),
                    added_at: now.clone(),
                    last_updated: now.clone(),
                });
                self.document.species.len() - 1
            }
        };

        let entry = &mut self.document.species[index];
        for (record, zotero_key) in records.iter().zip(zotero_keys) {
            entry.papers.push(PaperEntry {
                zotero_key: zotero_key.clone(),
                title: record.title.clone(),
                authors: record.authors.clone(),
                year: record.year.clone(),
                doi: record.doi.clone(),
                source: record.source.clone(),
                url: record.url.clone(),
                abstract_text: record.abstract_text.clone(),
                added_at: now.clone(),
            });
        }
        Ok(())
    }

    /// Recomputes the document metadata from the live contents and replaces
    /// the cache file atomically.
    pub fn commit(mut self) -> Result<(), MinerError> {
        self.document.metadata.last_updated = Utc::now().to_rfc3339();
        self.document.metadata.total_species = self.document.species.len();
        self.document.metadata.total_papers = self
            .document
            .species
            .iter()
            .map(|species| species.papers.len())
            .sum();
        self.cache.write_document(&self.document)
    }
}
