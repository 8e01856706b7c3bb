use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use edna_literature_miner::app::{App, RunOptions, RunResult};
use edna_literature_miner::cache::AbstractCache;
use edna_literature_miner::config::Config;
use edna_literature_miner::error::MinerError;
use edna_literature_miner::input::SpeciesListLoader;
use edna_literature_miner::output::JsonOutput;
use edna_literature_miner::provider::SearchProvider;
use edna_literature_miner::pubmed::PubmedProvider;
use edna_literature_miner::semantic_scholar::SemanticScholarProvider;
use edna_literature_miner::zotero::{ReferenceStore, ZoteroHttpClient};

#[derive(Parser)]
#[command(name = "edna-lm")]
#[command(
    about = "Mine PubMed and Semantic Scholar for species literature, archive to Zotero, cache abstracts"
)]
#[command(version, author)]
struct Cli {
    /// Path to the YAML species list
    species_list: Utf8PathBuf,

    /// Search and deduplicate only; skip Zotero and the abstract cache
    #[arg(long)]
    dry_run: bool,

    /// Results per provider per species
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Abstract cache file
    #[arg(long, default_value = "data/abstracts_cache.yaml")]
    cache_file: Utf8PathBuf,

    /// Print the run summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env();
    if !cli.dry_run {
        config.validate()?;
    }
    info!("configuration loaded");

    let species_list = SpeciesListLoader::load(&cli.species_list)?;
    info!(
        count = species_list.len(),
        path = %cli.species_list,
        "species list loaded"
    );

    let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();
    if !config.email.is_empty() {
        match PubmedProvider::new(&config.email) {
            Ok(provider) => {
                providers.push(Box::new(provider));
                info!("PubMed provider initialized");
            }
            Err(err) => warn!(error = %err, "failed to initialize PubMed provider"),
        }
    } else if cli.dry_run {
        info!("dry run: using placeholder contact email for PubMed");
        match PubmedProvider::new("dryrun@example.com") {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(err) => warn!(error = %err, "failed to initialize PubMed provider"),
        }
    } else {
        warn!("EMAIL not set, skipping PubMed");
    }

    match SemanticScholarProvider::new(&config.semantic_scholar_api_key) {
        Ok(provider) => {
            providers.push(Box::new(provider));
            info!("Semantic Scholar provider initialized");
        }
        Err(err) => warn!(error = %err, "failed to initialize Semantic Scholar provider"),
    }

    if providers.is_empty() {
        return Err(MinerError::NoProviders.into());
    }

    let store: Option<Box<dyn ReferenceStore>> = if cli.dry_run {
        None
    } else {
        let client = ZoteroHttpClient::new(
            &config.zotero_library_id,
            &config.zotero_library_type,
            &config.zotero_api_key,
        )?;
        info!("Zotero client initialized");
        Some(Box::new(client))
    };

    let cache = AbstractCache::new(cli.cache_file.clone())?;
    info!(path = %cache.path(), "abstract cache ready");

    let app = App::new(providers, store, cache);
    let options = RunOptions {
        limit: cli.limit,
        dry_run: cli.dry_run,
    };
    let result = app.run(&species_list, &options);

    if cli.json {
        JsonOutput::print_run(&result).into_diagnostic()?;
    } else {
        print_run_summary(&result);
    }
    Ok(())
}

fn print_run_summary(result: &RunResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}eDNA literature miner summary{reset}");
    for species in &result.species {
        match &species.persistence_error {
            Some(error) => println!(
                "{yellow}  {}: {} unique results, persistence skipped ({error}){reset}",
                species.name, species.unique
            ),
            None => println!(
                "{green}  {}: {} found, {} unique, {} archived{reset}",
                species.name, species.found, species.unique, species.archived
            ),
        }
    }
    println!("Processing complete.");
}
