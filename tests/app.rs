use std::sync::Mutex;

use camino::Utf8PathBuf;

use edna_literature_miner::app::{App, RunOptions};
use edna_literature_miner::cache::AbstractCache;
use edna_literature_miner::domain::{SearchResult, SpeciesQuery};
use edna_literature_miner::error::MinerError;
use edna_literature_miner::provider::SearchProvider;
use edna_literature_miner::zotero::ReferenceStore;

struct StaticProvider {
    name: &'static str,
    results: Vec<SearchResult>,
}

impl SearchProvider for StaticProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn search(&self, _query: &str, _limit: usize) -> Vec<SearchResult> {
        self.results.clone()
    }
}

#[derive(Default)]
struct MockStore {
    fail_collection_containing: Option<String>,
    reject_title_containing: Option<String>,
    items_added: Mutex<usize>,
}

impl ReferenceStore for MockStore {
    fn ensure_collection(&self, name: &str) -> Result<String, MinerError> {
        if let Some(fragment) = &self.fail_collection_containing {
            if name.contains(fragment.as_str()) {
                return Err(MinerError::CollectionCreate {
                    name: name.to_string(),
                    message: "simulated store failure".to_string(),
                });
            }
        }
        Ok(format!("COL-{name}"))
    }

    fn add_item(&self, record: &SearchResult, _collection_id: &str) -> Option<String> {
        if let Some(fragment) = &self.reject_title_containing {
            if record.title.contains(fragment.as_str()) {
                return None;
            }
        }
        let mut guard = self.items_added.lock().unwrap();
        *guard += 1;
        Some(format!("ITEM{}", *guard))
    }
}

fn record(title: &str, doi: &str, source: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        authors: vec!["Hansen, Brian".to_string()],
        year: "2019".to_string(),
        doi: doi.to_string(),
        source: source.to_string(),
        abstract_text: format!("Abstract of {title}."),
        url: format!("https://example.org/{doi}"),
    }
}

fn species(name: &str) -> SpeciesQuery {
    SpeciesQuery {
        species_name: name.to_string(),
        synonyms: Vec::new(),
        keywords: vec!["eDNA".to_string()],
        date_range: None,
    }
}

fn temp_cache(temp: &tempfile::TempDir) -> AbstractCache {
    let path = Utf8PathBuf::from_path_buf(temp.path().join("abstracts_cache.yaml")).unwrap();
    AbstractCache::new(path).unwrap()
}

#[test]
fn run_archives_and_caches_results_from_both_providers() {
    let temp = tempfile::tempdir().unwrap();
    let providers: Vec<Box<dyn SearchProvider>> = vec![
        Box::new(StaticProvider {
            name: "PubMed",
            results: vec![record("Cod in the North Sea", "10.1234/1", "PubMed")],
        }),
        Box::new(StaticProvider {
            name: "SemanticScholar",
            results: vec![record("Cod metabarcoding", "10.1234/2", "SemanticScholar")],
        }),
    ];
    let app = App::new(
        providers,
        Some(Box::new(MockStore::default())),
        temp_cache(&temp),
    );

    let result = app.run(
        &[species("Gadus morhua")],
        &RunOptions {
            limit: 10,
            dry_run: false,
        },
    );

    let summary = &result.species[0];
    assert_eq!(summary.found, 2);
    assert_eq!(summary.unique, 2);
    assert_eq!(summary.archived, 2);
    assert_eq!(summary.cached, 2);
    assert!(summary.persistence_error.is_none());

    let cache = temp_cache(&temp);
    let entry = cache.get_species("Gadus morhua").unwrap().unwrap();
    assert_eq!(entry.papers.len(), 2);
    assert_ne!(entry.papers[0].zotero_key, entry.papers[1].zotero_key);
    assert_eq!(entry.keywords, vec!["eDNA".to_string()]);

    let stats = cache.get_statistics().unwrap();
    assert_eq!(stats.total_species, 1);
    assert_eq!(stats.total_papers, 2);
}

#[test]
fn duplicate_doi_across_providers_is_archived_once() {
    let temp = tempfile::tempdir().unwrap();
    let providers: Vec<Box<dyn SearchProvider>> = vec![
        Box::new(StaticProvider {
            name: "PubMed",
            results: vec![record("Original record", "10.1234/1", "PubMed")],
        }),
        Box::new(StaticProvider {
            name: "SemanticScholar",
            results: vec![record("Same paper, other index", "10.1234/1", "SemanticScholar")],
        }),
    ];
    let app = App::new(
        providers,
        Some(Box::new(MockStore::default())),
        temp_cache(&temp),
    );

    let result = app.run(
        &[species("Gadus morhua")],
        &RunOptions {
            limit: 10,
            dry_run: false,
        },
    );

    assert_eq!(result.species[0].found, 2);
    assert_eq!(result.species[0].unique, 1);

    let cache = temp_cache(&temp);
    let entry = cache.get_species("Gadus morhua").unwrap().unwrap();
    assert_eq!(entry.papers.len(), 1);
    assert_eq!(entry.papers[0].title, "Original record");
    assert_eq!(entry.papers[0].source, "PubMed");
}

#[test]
fn collection_failure_for_one_species_does_not_abort_run() {
    let temp = tempfile::tempdir().unwrap();
    let providers: Vec<Box<dyn SearchProvider>> = vec![Box::new(StaticProvider {
        name: "PubMed",
        results: vec![record("Shared record", "10.1234/1", "PubMed")],
    })];
    let store = MockStore {
        fail_collection_containing: Some("Gadus morhua".to_string()),
        ..MockStore::default()
    };
    let app = App::new(providers, Some(Box::new(store)), temp_cache(&temp));

    let result = app.run(
        &[species("Gadus morhua"), species("Salmo salar")],
        &RunOptions {
            limit: 10,
            dry_run: false,
        },
    );

    let failed = &result.species[0];
    assert!(failed.persistence_error.is_some());
    assert_eq!(failed.archived, 0);

    let succeeded = &result.species[1];
    assert!(succeeded.persistence_error.is_none());
    assert_eq!(succeeded.archived, 1);

    let cache = temp_cache(&temp);
    assert!(cache.get_species("Gadus morhua").unwrap().is_none());
    assert!(cache.get_species("Salmo salar").unwrap().is_some());
}

#[test]
fn rejected_items_are_omitted_from_cache() {
    let temp = tempfile::tempdir().unwrap();
    let providers: Vec<Box<dyn SearchProvider>> = vec![Box::new(StaticProvider {
        name: "PubMed",
        results: vec![
            record("Keep this paper", "10.1234/1", "PubMed"),
            record("Broken upload", "10.1234/2", "PubMed"),
        ],
    })];
    let store = MockStore {
        reject_title_containing: Some("Broken".to_string()),
        ..MockStore::default()
    };
    let app = App::new(providers, Some(Box::new(store)), temp_cache(&temp));

    let result = app.run(
        &[species("Gadus morhua")],
        &RunOptions {
            limit: 10,
            dry_run: false,
        },
    );

    assert_eq!(result.species[0].unique, 2);
    assert_eq!(result.species[0].archived, 1);

    let cache = temp_cache(&temp);
    let entry = cache.get_species("Gadus morhua").unwrap().unwrap();
    assert_eq!(entry.papers.len(), 1);
    assert_eq!(entry.papers[0].title, "Keep this paper");
}

#[test]
fn dry_run_skips_store_and_cache() {
    let temp = tempfile::tempdir().unwrap();
    let providers: Vec<Box<dyn SearchProvider>> = vec![Box::new(StaticProvider {
        name: "PubMed",
        results: vec![record("Cod in the North Sea", "10.1234/1", "PubMed")],
    })];
    let app = App::new(
        providers,
        Some(Box::new(MockStore::default())),
        temp_cache(&temp),
    );

    let result = app.run(
        &[species("Gadus morhua")],
        &RunOptions {
            limit: 10,
            dry_run: true,
        },
    );

    assert_eq!(result.species[0].unique, 1);
    assert_eq!(result.species[0].archived, 0);

    let cache = temp_cache(&temp);
    assert!(cache.get_species("Gadus morhua").unwrap().is_none());
    assert_eq!(cache.get_statistics().unwrap().total_papers, 0);
}
