use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MinerError {
    #[error("configuration errors: {0}")]
    MissingConfig(String),

    #[error("species list not found: {0}")]
    InputNotFound(Utf8PathBuf),

    #[error("failed to read species list at {0}")]
    InputRead(Utf8PathBuf),

    #[error("failed to parse species list: {0}")]
    InputParse(String),

    #[error("no search providers available")]
    NoProviders,

    #[error("PubMed request failed: {0}")]
    PubmedHttp(String),

    #[error("PubMed returned status {status}: {message}")]
    PubmedStatus { status: u16, message: String },

    #[error("failed to parse PubMed response: {0}")]
    PubmedParse(String),

    #[error("Semantic Scholar request failed: {0}")]
    SemanticScholarHttp(String),

    #[error("Semantic Scholar returned status {status}: {message}")]
    SemanticScholarStatus { status: u16, message: String },

    #[error("Zotero request failed: {0}")]
    ZoteroHttp(String),

    #[error("Zotero returned status {status}: {message}")]
    ZoteroStatus { status: u16, message: String },

    #[error("failed to create Zotero collection {name}: {message}")]
    CollectionCreate { name: String, message: String },

    #[error("abstract cache error: {0}")]
    Cache(String),

    #[error("failed to parse abstract cache: {0}")]
    CacheParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
