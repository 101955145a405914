//! A local, read-only dump of the gene-disease association graph.
//!
//! The dump is a JSON document (optionally gzip-compressed) with three tables:
//!
//! ```json
//! {
//!   "sources": [{ "uri": "http://rdf.disgenet.org/v6.0.0/void/BEFREE",
//!                 "title": "BeFree 2018 Dataset Distribution", "level": "literature" }],
//!   "phenotype_diseases": [{ "phenotype": "hp:0008438", "disease": "umls:C0265292" }],
//!   "associations": [{ "gene": "ncbigene:479", "gene_symbol": "ATP12A",
//!                      "disease": "umls:C0265292", "score": 0.02,
//!                      "source": "http://rdf.disgenet.org/v6.0.0/void/BEFREE",
//!                      "evidence": "http://identifiers.org/pubmed/8630510" }]
//! }
//! ```
//!
//! Each entry of `associations` is one observation and is returned at most
//! once per query, in dump order.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::domain::{Disease, Gene, Phenotype, SourceLevel};
use crate::error::KiraError;
use crate::fs_util::open_input;
use crate::query::{self, Binding, GraphQuery, QueryCursor, QueryEngine, QuerySolution};

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    sources: Vec<SourceRecord>,
    #[serde(default)]
    phenotype_diseases: Vec<PhenotypeDiseaseRecord>,
    #[serde(default)]
    associations: Vec<AssociationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceRecord {
    uri: String,
    title: String,
    level: SourceLevel,
}

#[derive(Debug, Deserialize)]
struct PhenotypeDiseaseRecord {
    phenotype: String,
    disease: String,
}

#[derive(Debug, Deserialize)]
struct AssociationRecord {
    gene: String,
    #[serde(default)]
    gene_symbol: Option<String>,
    disease: String,
    #[serde(default)]
    disease_name: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    source: String,
    #[serde(default)]
    evidence: Option<String>,
}

#[derive(Debug, Clone)]
struct Observation {
    gene: Gene,
    gene_symbol: Option<String>,
    disease: Disease,
    disease_name: Option<String>,
    score: Option<f64>,
    source: String,
    evidence: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatasetEngine {
    sources: Vec<SourceRecord>,
    diseases_by_phenotype: HashMap<Phenotype, Vec<Disease>>,
    observations: Vec<Observation>,
}

impl DatasetEngine {
    pub fn open(path: &Path) -> Result<Self, KiraError> {
        let reader = open_input(path)
            .map_err(|err| KiraError::SourceUnavailable(format!("{}: {err}", path.display())))?;
        let file: DatasetFile = serde_json::from_reader(reader)
            .map_err(|err| KiraError::DatasetParse(err.to_string()))?;
        Self::from_file(file)
    }

    pub fn from_json(content: &str) -> Result<Self, KiraError> {
        let file: DatasetFile = serde_json::from_str(content)
            .map_err(|err| KiraError::DatasetParse(err.to_string()))?;
        Self::from_file(file)
    }

    fn from_file(file: DatasetFile) -> Result<Self, KiraError> {
        let mut diseases_by_phenotype: HashMap<Phenotype, Vec<Disease>> = HashMap::new();
        for link in file.phenotype_diseases {
            let phenotype = Phenotype::parse(&link.phenotype)?;
            let disease = Disease::parse(&link.disease)?;
            let diseases = diseases_by_phenotype.entry(phenotype).or_default();
            if !diseases.contains(&disease) {
                diseases.push(disease);
            }
        }

        let observations = file
            .associations
            .into_iter()
            .map(|record| {
                Ok(Observation {
                    gene: Gene::parse(&record.gene)?,
                    gene_symbol: record.gene_symbol,
                    disease: Disease::parse(&record.disease)?,
                    disease_name: record.disease_name,
                    score: record.score,
                    source: record.source,
                    evidence: record.evidence,
                })
            })
            .collect::<Result<Vec<_>, KiraError>>()?;

        Ok(Self {
            sources: file.sources,
            diseases_by_phenotype,
            observations,
        })
    }

    fn source_solutions(&self) -> Vec<QuerySolution> {
        self.sources
            .iter()
            .map(|source| {
                QuerySolution::new()
                    .bind(query::SOURCE, Binding::Uri(source.uri.clone()))
                    .bind(query::SOURCE_TITLE, Binding::Literal(source.title.clone()))
                    .bind(query::SOURCE_LEVEL, Binding::Literal(source.level.to_string()))
            })
            .collect()
    }

    fn association_solutions(&self, phenotypes: &[Phenotype]) -> Vec<QuerySolution> {
        let diseases: HashSet<&Disease> = phenotypes
            .iter()
            .filter_map(|phenotype| self.diseases_by_phenotype.get(phenotype))
            .flatten()
            .collect();

        self.observations
            .iter()
            .filter(|observation| diseases.contains(&observation.disease))
            .map(observation_solution)
            .collect()
    }
}

fn observation_solution(observation: &Observation) -> QuerySolution {
    let mut solution = QuerySolution::new()
        .bind(query::GENE, Binding::Uri(observation.gene.uri()))
        .bind(query::DISEASE, Binding::Uri(observation.disease.uri()))
        .bind(query::GDA_SOURCE, Binding::Uri(observation.source.clone()));
    if let Some(symbol) = &observation.gene_symbol {
        solution = solution.bind(query::GENE_SYMBOL_TITLE, Binding::Literal(symbol.clone()));
    }
    if let Some(name) = &observation.disease_name {
        solution = solution.bind(query::DISEASE_TITLE, Binding::Literal(name.clone()));
    }
    if let Some(score) = observation.score {
        solution = solution.bind(query::GDA_SCORE, Binding::Double(score));
    }
    if let Some(evidence) = &observation.evidence {
        solution = solution.bind(query::EVIDENCE, Binding::Uri(evidence.clone()));
    }
    solution
}

impl QueryEngine for DatasetEngine {
    type Cursor = DatasetCursor;

    fn execute(&self, query: &GraphQuery) -> Result<DatasetCursor, KiraError> {
        let solutions = match query {
            GraphQuery::Sources => self.source_solutions(),
            GraphQuery::GeneDiseaseAssociations { phenotypes } => {
                self.association_solutions(phenotypes)
            }
        };
        Ok(DatasetCursor {
            solutions: solutions.into_iter(),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct DatasetCursor {
    solutions: std::vec::IntoIter<QuerySolution>,
    closed: bool,
}

impl QueryCursor for DatasetCursor {
    fn has_next(&mut self) -> bool {
        !self.closed && self.solutions.len() > 0
    }

    fn next_solution(&mut self) -> Result<QuerySolution, KiraError> {
        if self.closed {
            return Err(KiraError::Query("cursor already closed".to_string()));
        }
        self.solutions
            .next()
            .ok_or_else(|| KiraError::Query("cursor exhausted".to_string()))
    }

    fn close(&mut self) {
        self.closed = true;
        self.solutions = Vec::new().into_iter();
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const DUMP: &str = r#"{
        "sources": [
            { "uri": "http://rdf.disgenet.org/v6.0.0/void/HPO", "title": "HPO", "level": "curated" }
        ],
        "phenotype_diseases": [
            { "phenotype": "hp:0008438", "disease": "umls:C1835764" },
            { "phenotype": "hp:0000001", "disease": "umls:C0000001" }
        ],
        "associations": [
            { "gene": "ncbigene:29123", "disease": "umls:C1835764", "score": 0.1,
              "source": "http://rdf.disgenet.org/v6.0.0/void/HPO" },
            { "gene": "ncbigene:1", "disease": "umls:C0000001",
              "source": "http://rdf.disgenet.org/v6.0.0/void/HPO" }
        ]
    }"#;

    #[test]
    fn association_query_filters_on_linked_diseases() {
        let engine = DatasetEngine::from_json(DUMP).unwrap();
        let phenotype: Phenotype = "hp:0008438".parse().unwrap();
        let mut cursor = engine
            .execute(&GraphQuery::gene_disease_associations([&phenotype]))
            .unwrap();
        assert!(cursor.has_next());
        let solution = cursor.next_solution().unwrap();
        assert_eq!(
            solution.uri(query::GENE).unwrap(),
            "http://identifiers.org/ncbigene/29123"
        );
        assert_eq!(solution.optional_double(query::GDA_SCORE).unwrap(), Some(0.1));
        assert!(!cursor.has_next());
    }

    #[test]
    fn closed_cursor_yields_nothing() {
        let engine = DatasetEngine::from_json(DUMP).unwrap();
        let mut cursor = engine.execute(&GraphQuery::Sources).unwrap();
        cursor.close();
        cursor.close();
        assert!(!cursor.has_next());
        assert_matches!(cursor.next_solution(), Err(KiraError::Query(_)));
    }

    #[test]
    fn invalid_gene_id_is_rejected() {
        let err = DatasetEngine::from_json(
            r#"{ "associations": [ { "gene": "gene:1", "disease": "umls:C1", "source": "x" } ] }"#,
        )
        .unwrap_err();
        assert_matches!(err, KiraError::InvalidFormat { kind: "gene", .. });
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = DatasetEngine::open(Path::new("/nonexistent/disgenet.json")).unwrap_err();
        assert_matches!(err, KiraError::SourceUnavailable(_));
    }
}
