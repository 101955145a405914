use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::aggregate::{aggregate, retrieve_sources};
use crate::collection::GeneDiseaseCollection;
use crate::config::ResolvedConfig;
use crate::domain::{Gene, Phenotype};
use crate::error::KiraError;
use crate::ontology::{OboOntology, OntologyGraph, PhenotypeExpander, PhenotypeNetwork};
use crate::prioritize::{Prioritizer, RankedEntity};
use crate::query::QueryEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    GenesForPhenotypes,
    GenesForPhenotypesWithAssociatedPhenotypes,
}

impl RunMode {
    pub fn for_config(config: &ResolvedConfig) -> Self {
        if config.expansion.is_some() {
            RunMode::GenesForPhenotypesWithAssociatedPhenotypes
        } else {
            RunMode::GenesForPhenotypes
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::GenesForPhenotypes => write!(f, "genes for phenotypes"),
            RunMode::GenesForPhenotypesWithAssociatedPhenotypes => {
                write!(f, "genes for phenotypes with associated phenotypes")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub mode: RunMode,
    /// The phenotypes the association query was run with, ordered.
    pub phenotypes: Vec<Phenotype>,
    pub network: Option<PhenotypeNetwork>,
    pub collection: GeneDiseaseCollection,
    pub ranking: Vec<RankedEntity<Gene>>,
}

pub struct App<E: QueryEngine> {
    engine: E,
}

impl<E: QueryEngine> App<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn run(&self, config: &ResolvedConfig) -> Result<RunResult, KiraError> {
        let mode = RunMode::for_config(config);
        info!(%mode, phenotypes = config.phenotypes.len(), "starting run");
        match &config.expansion {
            None => self.genes_for_phenotypes(&config.phenotypes, config.prioritizer),
            Some(expansion) => {
                let started = Instant::now();
                let ontology = OboOntology::open(expansion.ontology.as_std_path())?;
                info!(
                    terms = ontology.len(),
                    version = ontology.data_version().unwrap_or("unknown"),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "loaded ontology"
                );
                self.genes_for_expanded_phenotypes(
                    &ontology,
                    expansion.expander,
                    &config.phenotypes,
                    config.prioritizer,
                )
            }
        }
    }

    pub fn genes_for_phenotypes(
        &self,
        phenotypes: &[Phenotype],
        prioritizer: Prioritizer,
    ) -> Result<RunResult, KiraError> {
        let mut phenotypes = phenotypes.to_vec();
        phenotypes.sort();
        phenotypes.dedup();
        let (collection, ranking) = self.collect(&phenotypes, prioritizer)?;
        Ok(RunResult {
            mode: RunMode::GenesForPhenotypes,
            phenotypes,
            network: None,
            collection,
            ranking,
        })
    }

    pub fn genes_for_expanded_phenotypes<G: OntologyGraph + ?Sized>(
        &self,
        ontology: &G,
        expander: PhenotypeExpander,
        seeds: &[Phenotype],
        prioritizer: Prioritizer,
    ) -> Result<RunResult, KiraError> {
        let started = Instant::now();
        let network = expander.expand(ontology, seeds.iter().cloned());
        info!(
            seeds = seeds.len(),
            phenotypes = network.len(),
            max_distance = expander.max_distance,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "expanded phenotype network"
        );

        let phenotypes: Vec<Phenotype> =
            network.phenotypes_ordered().into_iter().cloned().collect();
        let (collection, ranking) = self.collect(&phenotypes, prioritizer)?;
        Ok(RunResult {
            mode: RunMode::GenesForPhenotypesWithAssociatedPhenotypes,
            phenotypes,
            network: Some(network),
            collection,
            ranking,
        })
    }

    fn collect(
        &self,
        phenotypes: &[Phenotype],
        prioritizer: Prioritizer,
    ) -> Result<(GeneDiseaseCollection, Vec<RankedEntity<Gene>>), KiraError> {
        let started = Instant::now();
        let sources = retrieve_sources(&self.engine)?;
        info!(
            sources = sources.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieved sources"
        );

        let started = Instant::now();
        let collection = aggregate(&self.engine, phenotypes, &sources)?;
        info!(
            genes = collection.genes().count(),
            diseases = collection.diseases().count(),
            associations = collection.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregated gene-disease associations"
        );

        let started = Instant::now();
        let ranking = prioritizer.rank_with_scores(&collection);
        info!(
            %prioritizer,
            genes = ranking.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "prioritized genes"
        );
        Ok((collection, ranking))
    }
}
