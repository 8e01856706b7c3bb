use std::fs;

use camino::Utf8Path;
use serde::Deserialize;

use crate::domain::SpeciesQuery;
use crate::error::MinerError;

#[derive(Debug, Deserialize)]
struct SpeciesFile {
    species: Vec<SpeciesFileEntry>,
}

#[derive(Debug, Deserialize)]
struct SpeciesFileEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    date_range: Option<String>,
}

pub struct SpeciesListLoader;

impl SpeciesListLoader {
    /// Loads the YAML species list. A missing or unreadable file and a
    /// malformed document are startup failures; entries without a `name`
    /// are skipped silently.
    pub fn load(path: &Utf8Path) -> Result<Vec<SpeciesQuery>, MinerError> {
        if !path.as_std_path().exists() {
            return Err(MinerError::InputNotFound(path.to_owned()));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| MinerError::InputRead(path.to_owned()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Vec<SpeciesQuery>, MinerError> {
        let file: SpeciesFile =
            serde_yaml::from_str(content).map_err(|err| MinerError::InputParse(err.to_string()))?;

        let species = file
            .species
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name?;
                Some(SpeciesQuery {
                    species_name: name,
                    synonyms: entry.synonyms,
                    keywords: entry.keywords,
                    date_range: entry.date_range,
                })
            })
            .collect();
        Ok(species)
    }
}
