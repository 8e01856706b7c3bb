use edna_literature_miner::domain::{SearchResult, deduplicate};
use edna_literature_miner::input::SpeciesListLoader;

fn record(title: &str, doi: &str, source: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        authors: Vec::new(),
        year: String::new(),
        doi: doi.to_string(),
        source: source.to_string(),
        abstract_text: String::new(),
        url: String::new(),
    }
}

#[test]
fn loaded_species_build_the_documented_query() {
    let content = r#"
species:
  - name: Gadus morhua
    synonyms:
      - Atlantic cod
    keywords:
      - eDNA
      - environmental DNA
"#;
    let species = SpeciesListLoader::parse(content).unwrap();
    assert_eq!(
        species[0].build_query(),
        r#"("Gadus morhua" OR "Atlantic cod") AND ("eDNA" OR "environmental DNA")"#
    );
}

#[test]
fn four_records_with_two_duplicate_pairs_collapse_to_two() {
    let results = vec![
        record("DOI paper", "doi1", "PubMed"),
        record("DOI paper again", "doi1", "SemanticScholar"),
        record("  Unique Title  ", "", "PubMed"),
        record("unique title", "", "SemanticScholar"),
    ];

    let unique = deduplicate(results);
    assert_eq!(unique.len(), 2);
    assert_eq!(unique[0].title, "DOI paper");
    assert_eq!(unique[0].source, "PubMed");
    assert_eq!(unique[1].title, "  Unique Title  ");
}
