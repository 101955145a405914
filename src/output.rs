use std::fmt::{self, Write as _};
use std::io::{self, Write};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::app::{RunMode, RunResult};
use crate::association::GeneDiseaseAssociation;
use crate::domain::{Entity, EntityKind};
use crate::error::KiraError;
use crate::fs_util::write_new_file_atomic;

const PRIMARY_SEPARATOR: char = '\t';
const KEY_VALUE_PAIR_SEPARATOR: char = '|';
const KEY_VALUE_SEPARATOR: char = ':';
const VALUES_SEPARATOR: char = ',';

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Prioritized gene ids on one line.
    Simple,
    /// One line per gene with ids and simplified evidence.
    #[default]
    RegularId,
    /// One line per gene with URIs and full evidence.
    RegularUri,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Simple => write!(f, "simple"),
            OutputFormat::RegularId => write!(f, "regular-id"),
            OutputFormat::RegularUri => write!(f, "regular-uri"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    /// A file that must not exist yet.
    File(Utf8PathBuf),
}

impl OutputTarget {
    pub fn from_path(path: Option<Utf8PathBuf>) -> Self {
        path.map(OutputTarget::File).unwrap_or(OutputTarget::Stdout)
    }

    pub fn write(&self, content: &str) -> Result<(), KiraError> {
        match self {
            OutputTarget::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(content.as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|err| KiraError::Filesystem(err.to_string()))
            }
            OutputTarget::File(path) => {
                write_new_file_atomic(path.as_std_path(), content.as_bytes())
            }
        }
    }
}

/// Writes a prioritized run result in one format to one target.
pub struct PrioritizedOutput {
    format: OutputFormat,
    target: OutputTarget,
}

impl PrioritizedOutput {
    pub fn new(format: OutputFormat, target: OutputTarget) -> Self {
        Self { format, target }
    }

    pub fn write(&self, result: &RunResult) -> Result<(), KiraError> {
        self.target.write(&render(self.format, result)?)
    }
}

pub fn render(format: OutputFormat, result: &RunResult) -> Result<String, KiraError> {
    match format {
        OutputFormat::Simple => Ok(render_simple(result)),
        OutputFormat::RegularId => Ok(render_per_gene(result, &IdStyle)),
        OutputFormat::RegularUri => Ok(render_per_gene(result, &UriStyle)),
        OutputFormat::Json => render_json(result, Utc::now()),
    }
}

fn render_simple(result: &RunResult) -> String {
    let ids: Vec<&str> = result.ranking.iter().map(|ranked| ranked.entity.id()).collect();
    let mut line = ids.join(&VALUES_SEPARATOR.to_string());
    line.push('\n');
    line
}

/// How the per-gene formats spell entities and evidence.
trait EntityStyle {
    fn entity<K: EntityKind>(&self, entity: &Entity<K>) -> String;
    fn evidence<'a>(&self, association: &'a GeneDiseaseAssociation) -> Vec<&'a str>;
}

struct IdStyle;

impl EntityStyle for IdStyle {
    fn entity<K: EntityKind>(&self, entity: &Entity<K>) -> String {
        entity.id().to_string()
    }

    fn evidence<'a>(&self, association: &'a GeneDiseaseAssociation) -> Vec<&'a str> {
        association.all_evidence_simplified_ordered()
    }
}

struct UriStyle;

impl EntityStyle for UriStyle {
    fn entity<K: EntityKind>(&self, entity: &Entity<K>) -> String {
        entity.uri()
    }

    fn evidence<'a>(&self, association: &'a GeneDiseaseAssociation) -> Vec<&'a str> {
        association.all_evidence_ordered()
    }
}

// gene<TAB>symbol<TAB>score<TAB>disease:evidence,evidence|disease:...
fn render_per_gene<S: EntityStyle>(result: &RunResult, style: &S) -> String {
    let mut out = String::new();
    for ranked in &result.ranking {
        let gene = &ranked.entity;
        let diseases: Vec<String> = result
            .collection
            .by_left(gene)
            .map(|association| {
                let evidence = style.evidence(association).join(&VALUES_SEPARATOR.to_string());
                format!(
                    "{}{KEY_VALUE_SEPARATOR}{evidence}",
                    style.entity(association.disease())
                )
            })
            .collect();
        let _ = writeln!(
            out,
            "{}{PRIMARY_SEPARATOR}{}{PRIMARY_SEPARATOR}{}{PRIMARY_SEPARATOR}{}",
            style.entity(gene),
            gene.name().unwrap_or_default(),
            ranked.score.map(|score| score.to_string()).unwrap_or_default(),
            diseases.join(&KEY_VALUE_PAIR_SEPARATOR.to_string()),
        );
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonReport {
    generated_at: String,
    mode: RunMode,
    phenotypes: Vec<JsonPhenotype>,
    genes: Vec<JsonGene>,
}

#[derive(Debug, Serialize)]
struct JsonPhenotype {
    id: String,
    uri: String,
    distance: Option<u32>,
}

#[derive(Debug, Serialize)]
struct JsonGene {
    id: String,
    uri: String,
    symbol: Option<String>,
    score: Option<f64>,
    diseases: Vec<JsonDisease>,
}

#[derive(Debug, Serialize)]
struct JsonDisease {
    id: String,
    uri: String,
    name: Option<String>,
    score: Option<f64>,
    sources: Vec<JsonSource>,
}

#[derive(Debug, Serialize)]
struct JsonSource {
    id: String,
    level: String,
    count: u32,
    evidence: Vec<String>,
}

pub fn render_json(result: &RunResult, generated_at: DateTime<Utc>) -> Result<String, KiraError> {
    let phenotypes = result
        .phenotypes
        .iter()
        .map(|phenotype| JsonPhenotype {
            id: phenotype.formatted_id(),
            uri: phenotype.uri(),
            distance: match &result.network {
                Some(network) => network.distance(phenotype),
                None => Some(0),
            },
        })
        .collect();

    let genes = result
        .ranking
        .iter()
        .map(|ranked| JsonGene {
            id: ranked.entity.formatted_id(),
            uri: ranked.entity.uri(),
            symbol: ranked.entity.name().map(str::to_string),
            score: ranked.score,
            diseases: result
                .collection
                .by_left(&ranked.entity)
                .map(json_disease)
                .collect(),
        })
        .collect();

    let report = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        mode: result.mode,
        phenotypes,
        genes,
    };
    let mut json = serde_json::to_string_pretty(&report)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    json.push('\n');
    Ok(json)
}

fn json_disease(association: &GeneDiseaseAssociation) -> JsonDisease {
    let disease = association.disease();
    JsonDisease {
        id: disease.formatted_id(),
        uri: disease.uri(),
        name: disease.name().map(str::to_string),
        score: association.score(),
        sources: association
            .sources_ordered()
            .into_iter()
            .map(|source| JsonSource {
                id: source.id().to_string(),
                level: source.level().to_string(),
                count: association.count_for_source(source),
                evidence: association
                    .evidence_for_source(source)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default(),
            })
            .collect(),
    }
}
