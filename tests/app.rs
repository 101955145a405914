use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use assert_matches::assert_matches;

use kira_gene_prioritizer::aggregate::{aggregate, retrieve_sources};
use kira_gene_prioritizer::app::{App, RunMode};
use kira_gene_prioritizer::config::{ConfigLoader, ConfigOverrides};
use kira_gene_prioritizer::dataset::{DatasetCursor, DatasetEngine};
use kira_gene_prioritizer::domain::{Disease, Gene, Phenotype};
use kira_gene_prioritizer::error::KiraError;
use kira_gene_prioritizer::ontology::{OboOntology, PhenotypeExpander, TraversalPolicy};
use kira_gene_prioritizer::prioritize::Prioritizer;
use kira_gene_prioritizer::query::{
    Binding, GraphQuery, QueryCursor, QueryEngine, QuerySolution, GDA_SOURCE,
};

const DATABASE: &str = "tests/fixtures/disgenet_hp0008438.json";
const ONTOLOGY: &str = "tests/fixtures/hp_mini.obo";

fn engine() -> DatasetEngine {
    DatasetEngine::open(Path::new(DATABASE)).unwrap()
}

fn seed() -> Vec<Phenotype> {
    vec!["hp:0008438".parse().unwrap()]
}

fn gene(id: &str) -> Gene {
    id.parse().unwrap()
}

fn disease(id: &str) -> Disease {
    id.parse().unwrap()
}

fn ranked_ids(ranking: &[kira_gene_prioritizer::prioritize::RankedEntity<Gene>]) -> Vec<&str> {
    ranking.iter().map(|ranked| ranked.entity.id()).collect()
}

#[test]
fn genes_for_single_phenotype() {
    let result = App::new(engine())
        .genes_for_phenotypes(&seed(), Prioritizer::HighestScore)
        .unwrap();

    assert_eq!(result.mode, RunMode::GenesForPhenotypes);
    assert!(result.network.is_none());
    assert_eq!(result.collection.len(), 6);
    assert_eq!(result.collection.diseases().count(), 3);
    assert_eq!(result.collection.genes().count(), 5);
    assert_eq!(
        ranked_ids(&result.ranking),
        vec!["29123", "56172", "2697", "286", "479"]
    );
    assert_eq!(result.ranking[0].entity.name(), Some("ANKRD11"));
    assert_eq!(result.ranking[0].score, Some(0.8));
}

#[test]
fn per_source_counts_and_evidence() {
    let engine = engine();
    let sources = retrieve_sources(&engine).unwrap();
    assert_eq!(sources.len(), 6);
    let source = |id: &str| {
        sources
            .get(&format!("http://rdf.disgenet.org/v6.0.0/void/{id}"))
            .unwrap()
            .clone()
    };

    let collection = aggregate(&engine, &seed(), &sources).unwrap();

    let kbg = collection
        .get(&gene("ncbigene:29123"), &disease("umls:C0220687"))
        .unwrap();
    assert_eq!(kbg.score(), Some(0.8));
    assert_eq!(kbg.count_for_source(&source("BEFREE")), 14);
    assert_eq!(kbg.count_for_source(&source("CLINVAR")), 12);
    assert_eq!(kbg.evidence_for_source(&source("CLINVAR")).unwrap().len(), 11);
    assert_eq!(kbg.count_for_source(&source("UNIPROT")), 2);
    assert_eq!(kbg.count_for_source(&source("CTD_human")), 1);
    assert!(kbg.evidence_for_source(&source("CTD_human")).is_none());
    assert_eq!(kbg.count_for_source(&source("ORPHANET")), 1);
    assert_eq!(kbg.total_count(), 30);
    assert_eq!(kbg.all_evidence().len(), 23);

    let ankh = collection
        .get(&gene("ncbigene:56172"), &disease("umls:C0265292"))
        .unwrap();
    assert_eq!(ankh.count_for_source(&source("BEFREE")), 7);
    assert_eq!(ankh.count_for_source(&source("ORPHANET")), 1);
    assert_eq!(ankh.sources_with_evidence().count(), 1);
    assert_eq!(ankh.disease().name(), Some("Craniometaphyseal dysplasia"));

    let hpo = collection
        .get(&gene("ncbigene:29123"), &disease("umls:C1835764"))
        .unwrap();
    assert_eq!(hpo.count_for_source(&source("HPO")), 1);
    assert!(hpo.all_evidence().is_empty());
    assert_eq!(hpo.disease().name(), None);

    let atp12a = collection
        .get(&gene("ncbigene:479"), &disease("umls:C0265292"))
        .unwrap();
    assert_eq!(
        atp12a.all_evidence_simplified_ordered(),
        vec!["7678608", "8630510"]
    );
}

#[test]
fn grouped_by_disease_then_gene() {
    let result = App::new(engine())
        .genes_for_phenotypes(&seed(), Prioritizer::HighestScore)
        .unwrap();
    let pairs: Vec<(&str, &str)> = result
        .collection
        .all_ordered_by_right()
        .into_iter()
        .map(|gda| (gda.disease().id(), gda.gene().id()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("C0220687", "29123"),
            ("C0265292", "286"),
            ("C0265292", "479"),
            ("C0265292", "2697"),
            ("C0265292", "56172"),
            ("C1835764", "29123"),
        ]
    );
}

#[test]
fn expansion_adds_ancestor_associations() {
    let ontology = OboOntology::open(Path::new(ONTOLOGY)).unwrap();
    let app = App::new(engine());

    let zero = app
        .genes_for_expanded_phenotypes(
            &ontology,
            PhenotypeExpander::new(TraversalPolicy::Both, 0),
            &seed(),
            Prioritizer::HighestScore,
        )
        .unwrap();
    assert_eq!(zero.phenotypes, seed());
    assert_eq!(zero.ranking.len(), 5);

    let one = app
        .genes_for_expanded_phenotypes(
            &ontology,
            PhenotypeExpander::new(TraversalPolicy::Ancestors, 1),
            &seed(),
            Prioritizer::HighestScore,
        )
        .unwrap();
    assert_eq!(one.mode, RunMode::GenesForPhenotypesWithAssociatedPhenotypes);
    assert_eq!(one.phenotypes.len(), 2);
    assert_eq!(
        ranked_ids(&one.ranking),
        vec!["2200", "29123", "56172", "2697", "286", "479"]
    );
    assert!(!one.collection.genes().any(|g| g.id() == "7157"));
}

#[test]
fn run_from_overrides() {
    let overrides = ConfigOverrides {
        database: Some(DATABASE.into()),
        ontology: Some(ONTOLOGY.into()),
        phenotypes: vec!["HP:0008438".to_string()],
        max_distance: Some(1),
        traversal: Some(TraversalPolicy::Descendants),
        ..ConfigOverrides::default()
    };
    let config = ConfigLoader::resolve_with_overrides(
        Some("tests/fixtures/does-not-exist.json"),
        overrides.clone(),
    );
    assert_matches!(config, Err(KiraError::ConfigRead(_)));

    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-gp.json");
    std::fs::write(&path, r#"{ "phenotypes": ["hp:0000001"], "output_format": "simple" }"#)
        .unwrap();
    let config =
        ConfigLoader::resolve_with_overrides(path.to_str(), overrides).unwrap();
    assert_eq!(RunMode::for_config(&config), RunMode::GenesForPhenotypesWithAssociatedPhenotypes);

    let result = App::new(engine()).run(&config).unwrap();
    let network = result.network.unwrap();
    assert_eq!(network.len(), 2);
    assert_eq!(result.ranking.len(), 5);
}

#[test]
fn missing_database_is_unavailable() {
    let err = DatasetEngine::open(Path::new("tests/fixtures/missing.json")).unwrap_err();
    assert_matches!(err, KiraError::SourceUnavailable(_));
}

/// Delegates to a dataset cursor and counts `close` calls.
struct CountingCursor {
    inner: DatasetCursor,
    closes: Rc<Cell<usize>>,
}

impl QueryCursor for CountingCursor {
    fn has_next(&mut self) -> bool {
        self.inner.has_next()
    }

    fn next_solution(&mut self) -> Result<QuerySolution, KiraError> {
        self.inner.next_solution()
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
        self.inner.close();
    }
}

struct CountingEngine {
    inner: DatasetEngine,
    closes: Rc<Cell<usize>>,
}

impl QueryEngine for CountingEngine {
    type Cursor = CountingCursor;

    fn execute(&self, query: &GraphQuery) -> Result<CountingCursor, KiraError> {
        Ok(CountingCursor {
            inner: self.inner.execute(query)?,
            closes: Rc::clone(&self.closes),
        })
    }
}

#[test]
fn cursors_are_closed_on_success_and_failure() {
    let closes = Rc::new(Cell::new(0));
    let engine = CountingEngine {
        inner: engine(),
        closes: Rc::clone(&closes),
    };

    let sources = retrieve_sources(&engine).unwrap();
    aggregate(&engine, &seed(), &sources).unwrap();
    assert_eq!(closes.get(), 2);

    let mut partial = sources.clone();
    partial.remove("http://rdf.disgenet.org/v6.0.0/void/BEFREE");
    let err = aggregate(&engine, &seed(), &partial).unwrap_err();
    assert_matches!(err, KiraError::UnknownSource(_));
    assert_eq!(closes.get(), 3);
}

#[test]
fn malformed_row_aborts_the_run() {
    let solution = QuerySolution::new().bind(GDA_SOURCE, Binding::Literal("HPO".to_string()));
    let sources = Default::default();
    let err =
        kira_gene_prioritizer::aggregate::ObservationRow::from_solution(&solution, &sources)
            .unwrap_err();
    assert_matches!(err, KiraError::MissingBinding(_));
}
