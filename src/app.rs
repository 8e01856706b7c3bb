use serde::Serialize;
use tracing::{error, info, warn};

use crate::cache::AbstractCache;
use crate::domain::{SearchResult, SpeciesQuery, deduplicate};
use crate::error::MinerError;
use crate::provider::SearchProvider;
use crate::zotero::ReferenceStore;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub limit: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub species: Vec<SpeciesRunSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesRunSummary {
    pub name: String,
    pub query: String,
    pub found: usize,
    pub unique: usize,
    pub archived: usize,
    pub cached: usize,
    pub persistence_error: Option<String>,
}

/// Sequences one run: per species, build the query, fan out to every
/// provider in order, deduplicate, then archive and cache unless dry-run.
/// `store` is `None` when persistence is disabled.
pub struct App {
    providers: Vec<Box<dyn SearchProvider>>,
    store: Option<Box<dyn ReferenceStore>>,
    cache: AbstractCache,
}

impl App {
    pub fn new(
        providers: Vec<Box<dyn SearchProvider>>,
        store: Option<Box<dyn ReferenceStore>>,
        cache: AbstractCache,
    ) -> Self {
        Self {
            providers,
            store,
            cache,
        }
    }

    /// Species are processed strictly sequentially; a species that fails to
    /// persist is logged and skipped, never aborting the remainder of the
    /// run. The returned summary is therefore always complete.
    pub fn run(&self, species_list: &[SpeciesQuery], options: &RunOptions) -> RunResult {
        let mut species = Vec::with_capacity(species_list.len());
        for query in species_list {
            species.push(self.process_species(query, options));
        }
        RunResult { species }
    }

    fn process_species(&self, species: &SpeciesQuery, options: &RunOptions) -> SpeciesRunSummary {
        info!(species = %species.species_name, "processing species");
        let query = species.build_query();
        info!(query = %query, "built search query");

        let mut all_results = Vec::new();
        for provider in &self.providers {
            let results = provider.search(&query, options.limit);
            info!(provider = provider.name(), count = results.len(), "provider search done");
            all_results.extend(results);
        }

        let found = all_results.len();
        let unique = deduplicate(all_results);
        info!(found, unique = unique.len(), "deduplicated provider results");

        let mut summary = SpeciesRunSummary {
            name: species.species_name.clone(),
            query,
            found,
            unique: unique.len(),
            archived: 0,
            cached: 0,
            persistence_error: None,
        };

        if options.dry_run {
            for record in unique.iter().take(3) {
                info!(
                    source = %record.source,
                    year = %record.year,
                    title = %record.title,
                    "dry run result"
                );
            }
            return summary;
        }

        let Some(store) = &self.store else {
            return summary;
        };

        match self.persist_species(species, &unique, store.as_ref()) {
            Ok(persisted) => {
                summary.archived = persisted;
                summary.cached = persisted;
            }
            Err(err) => {
                error!(
                    species = %species.species_name,
                    error = %err,
                    "persistence failed, skipping species"
                );
                summary.persistence_error = Some(err.to_string());
            }
        }
        summary
    }

    /// Archives the deduplicated records and caches the ones the store
    /// accepted, paired with their item keys. Returns how many made it.
    fn persist_species(
        &self,
        species: &SpeciesQuery,
        unique: &[SearchResult],
        store: &dyn ReferenceStore,
    ) -> Result<usize, MinerError> {
        let collection_name = format!("eDNA - {}", species.species_name);
        let collection_id = store.ensure_collection(&collection_name)?;
        info!(collection = %collection_name, id = %collection_id, "target collection ready");

        let mut archived = Vec::new();
        let mut zotero_keys = Vec::new();
        for record in unique {
            match store.add_item(record, &collection_id) {
                Some(key) => {
                    archived.push(record.clone());
                    zotero_keys.push(key);
                }
                None => {
                    warn!(title = %record.title, "item not stored, omitting from cache");
                }
            }
        }

        if zotero_keys.is_empty() {
            return Ok(0);
        }

        self.cache.add_papers(
            &species.species_name,
            &archived,
            &zotero_keys,
            &species.keywords,
        )?;
        info!(count = zotero_keys.len(), cache = %self.cache.path(), "papers cached");
        Ok(zotero_keys.len())
    }
}
