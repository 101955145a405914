use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::Phenotype;
use crate::error::KiraError;
use crate::ontology::{PhenotypeExpander, TraversalPolicy};
use crate::output::OutputFormat;
use crate::prioritize::Prioritizer;

pub const DEFAULT_CONFIG: &str = "kira-gp.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: Option<Utf8PathBuf>,
    #[serde(default)]
    pub ontology: Option<Utf8PathBuf>,
    #[serde(default)]
    pub phenotypes: Vec<PhenotypeEntry>,
    #[serde(default)]
    pub max_distance: Option<u32>,
    #[serde(default)]
    pub traversal: Option<TraversalPolicy>,
    #[serde(default)]
    pub prioritizer: Option<Prioritizer>,
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub output: Option<Utf8PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PhenotypeEntry {
    Shorthand(String),
    Detailed(PhenotypeEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PhenotypeEntryObject {
    pub id: String,
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<Utf8PathBuf>,
    pub ontology: Option<Utf8PathBuf>,
    /// Replaces the configured phenotypes when non-empty.
    pub phenotypes: Vec<String>,
    pub max_distance: Option<u32>,
    pub traversal: Option<TraversalPolicy>,
    pub prioritizer: Option<Prioritizer>,
    pub output_format: Option<OutputFormat>,
    pub output: Option<Utf8PathBuf>,
}

impl ConfigOverrides {
    /// Whether the overrides alone describe a runnable request.
    fn is_standalone(&self) -> bool {
        self.database.is_some() && !self.phenotypes.is_empty()
    }
}

impl Config {
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if overrides.database.is_some() {
            self.database = overrides.database;
        }
        if overrides.ontology.is_some() {
            self.ontology = overrides.ontology;
        }
        if !overrides.phenotypes.is_empty() {
            self.phenotypes = overrides
                .phenotypes
                .into_iter()
                .map(PhenotypeEntry::Shorthand)
                .collect();
        }
        if overrides.max_distance.is_some() {
            self.max_distance = overrides.max_distance;
        }
        if overrides.traversal.is_some() {
            self.traversal = overrides.traversal;
        }
        if overrides.prioritizer.is_some() {
            self.prioritizer = overrides.prioritizer;
        }
        if overrides.output_format.is_some() {
            self.output_format = overrides.output_format;
        }
        if overrides.output.is_some() {
            self.output = overrides.output;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    pub ontology: Utf8PathBuf,
    pub expander: PhenotypeExpander,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub database: Utf8PathBuf,
    pub phenotypes: Vec<Phenotype>,
    /// Present iff a maximum distance was configured.
    pub expansion: Option<ExpansionConfig>,
    pub prioritizer: Prioritizer,
    pub output_format: OutputFormat,
    pub output: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        Self::resolve_config(Self::load(path)?)
    }

    /// Loads the config file, if any, and layers the overrides on top. Without
    /// an explicit path a missing default file is fine when the overrides name
    /// both a database and phenotypes.
    pub fn resolve_with_overrides(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let mut config = match Self::load(path) {
            Ok(config) => config,
            Err(KiraError::MissingConfig) if overrides.is_standalone() => Config::default(),
            Err(err) => return Err(err),
        };
        config.apply(overrides);
        Self::resolve_config(config)
    }

    pub fn load(path: Option<&str>) -> Result<Config, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG),
        };

        if path.is_none() && !config_path.exists() {
            return Err(KiraError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let database = config
            .database
            .ok_or_else(|| KiraError::InvalidConfig("no database configured".to_string()))?;

        let phenotypes = config
            .phenotypes
            .into_iter()
            .map(|entry| match entry {
                PhenotypeEntry::Shorthand(value) => value.parse(),
                PhenotypeEntry::Detailed(obj) => obj.id.parse(),
            })
            .collect::<Result<Vec<Phenotype>, KiraError>>()?;
        if phenotypes.is_empty() {
            return Err(KiraError::InvalidConfig(
                "at least one phenotype is required".to_string(),
            ));
        }

        let expansion = match config.max_distance {
            None => None,
            Some(max_distance) => {
                let ontology = config.ontology.ok_or_else(|| {
                    KiraError::InvalidConfig(
                        "max_distance requires an ontology file".to_string(),
                    )
                })?;
                Some(ExpansionConfig {
                    ontology,
                    expander: PhenotypeExpander::new(
                        config.traversal.unwrap_or_default(),
                        max_distance,
                    ),
                })
            }
        };

        Ok(ResolvedConfig {
            database,
            phenotypes,
            expansion,
            prioritizer: config.prioritizer.unwrap_or_default(),
            output_format: config.output_format.unwrap_or_default(),
            output: config.output,
        })
    }
}
