use std::env;

use crate::error::MinerError;

/// Environment-based runtime configuration. The binary loads a `.env` file
/// first (via `dotenvy`), then reads the process environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub zotero_library_id: String,
    pub zotero_api_key: String,
    pub zotero_library_type: String,
    pub semantic_scholar_api_key: String,
    pub email: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            zotero_library_id: env_string("ZOTERO_LIBRARY_ID"),
            zotero_api_key: env_string("ZOTERO_API_KEY"),
            zotero_library_type: {
                let value = env_string("ZOTERO_LIBRARY_TYPE");
                if value.is_empty() {
                    "group".to_string()
                } else {
                    value
                }
            },
            semantic_scholar_api_key: env_string("SEMANTIC_SCHOLAR_API_KEY"),
            email: env_string("EMAIL"),
        }
    }

    /// Checks the variables required for a persisting run. Reports every
    /// missing variable in one error so the operator fixes them in one pass.
    pub fn validate(&self) -> Result<(), MinerError> {
        let mut errors = Vec::new();
        if self.zotero_library_id.is_empty() {
            errors.push("ZOTERO_LIBRARY_ID is missing");
        }
        if self.zotero_api_key.is_empty() {
            errors.push("ZOTERO_API_KEY is missing");
        }
        if self.email.is_empty() {
            errors.push("EMAIL is missing (required for PubMed)");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MinerError::MissingConfig(errors.join(", ")))
        }
    }
}

fn env_string(key: &str) -> String {
    env::var(key).map(|value| value.trim().to_string()).unwrap_or_default()
}
