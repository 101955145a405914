//! Phenotype ontology access and distance-bounded expansion.
//!
//! [`OboOntology`] loads the HPO `hp.obo` file into parent and child adjacency
//! maps. [`Expansion`] walks any [`OntologyGraph`] breadth-first from a seed
//! set, one distance layer per [`Expansion::step`], and yields a
//! [`PhenotypeNetwork`].

use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Phenotype;
use crate::error::KiraError;
use crate::fs_util::open_input;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Parent,
    Child,
}

/// Read-only view of a phenotype hierarchy.
pub trait OntologyGraph {
    fn contains(&self, phenotype: &Phenotype) -> bool;

    /// Phenotypes one edge away from `phenotype` under `relation`.
    fn adjacent(&self, phenotype: &Phenotype, relation: Relation) -> Vec<Phenotype>;
}

/// Which hierarchy edges the expansion follows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalPolicy {
    /// Parents only.
    #[value(alias = "parents")]
    #[serde(alias = "parents")]
    Ancestors,
    /// Children only.
    #[value(alias = "children")]
    #[serde(alias = "children")]
    Descendants,
    /// Parents and children; the distance is the undirected edge count.
    #[default]
    #[value(alias = "distance")]
    #[serde(alias = "distance")]
    Both,
}

impl TraversalPolicy {
    pub fn relations(self) -> &'static [Relation] {
        match self {
            TraversalPolicy::Ancestors => &[Relation::Parent],
            TraversalPolicy::Descendants => &[Relation::Child],
            TraversalPolicy::Both => &[Relation::Parent, Relation::Child],
        }
    }
}

/// The HPO hierarchy as read from an OBO 1.2 file.
#[derive(Debug, Clone, Default)]
pub struct OboOntology {
    data_version: Option<String>,
    names: HashMap<Phenotype, String>,
    parents: HashMap<Phenotype, BTreeSet<Phenotype>>,
    children: HashMap<Phenotype, BTreeSet<Phenotype>>,
}

#[derive(Debug, Default)]
struct TermStanza {
    line: usize,
    id: Option<Phenotype>,
    name: Option<String>,
    parents: Vec<Phenotype>,
    obsolete: bool,
}

enum Section {
    Header,
    Term(TermStanza),
    Other,
}

impl OboOntology {
    pub fn open(path: &Path) -> Result<Self, KiraError> {
        Self::parse(open_input(path)?)
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self, KiraError> {
        let mut ontology = Self::default();
        let mut section = Section::Header;

        for (index, line) in reader.lines().enumerate() {
            let number = index + 1;
            let line = line.map_err(|err| KiraError::Filesystem(err.to_string()))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('!') {
                continue;
            }
            if line.starts_with('[') {
                if let Section::Term(stanza) = section {
                    ontology.commit(stanza)?;
                }
                section = if line == "[Term]" {
                    Section::Term(TermStanza {
                        line: number,
                        ..TermStanza::default()
                    })
                } else {
                    Section::Other
                };
                continue;
            }
            let Some((tag, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match &mut section {
                Section::Header => {
                    if tag == "data-version" {
                        ontology.data_version = Some(value.to_string());
                    }
                }
                Section::Term(stanza) => match tag {
                    "id" => stanza.id = Some(parse_term_id(value, number)?),
                    "name" => stanza.name = Some(value.to_string()),
                    "is_a" => stanza.parents.push(parse_term_id(value, number)?),
                    "is_obsolete" => stanza.obsolete = value == "true",
                    _ => {}
                },
                Section::Other => {}
            }
        }
        if let Section::Term(stanza) = section {
            ontology.commit(stanza)?;
        }
        debug!(terms = ontology.len(), "parsed ontology");
        Ok(ontology)
    }

    fn commit(&mut self, stanza: TermStanza) -> Result<(), KiraError> {
        let Some(id) = stanza.id else {
            return Err(KiraError::OntologyParse {
                line: stanza.line,
                message: "term stanza without id".to_string(),
            });
        };
        if stanza.obsolete {
            return Ok(());
        }
        for parent in stanza.parents {
            self.children
                .entry(parent.clone())
                .or_default()
                .insert(id.clone());
            self.parents.entry(id.clone()).or_default().insert(parent);
        }
        self.names.insert(id, stanza.name.unwrap_or_default());
        Ok(())
    }

    pub fn data_version(&self) -> Option<&str> {
        self.data_version.as_deref()
    }

    pub fn name(&self, phenotype: &Phenotype) -> Option<&str> {
        self.names.get(phenotype).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// `HP:0000118 ! Phenotypic abnormality` or `HP:0000118 {source="x"}`.
fn parse_term_id(value: &str, line: usize) -> Result<Phenotype, KiraError> {
    let token = value.split_whitespace().next().unwrap_or_default();
    Phenotype::parse(token).map_err(|err| KiraError::OntologyParse {
        line,
        message: err.to_string(),
    })
}

impl OntologyGraph for OboOntology {
    fn contains(&self, phenotype: &Phenotype) -> bool {
        self.names.contains_key(phenotype)
    }

    fn adjacent(&self, phenotype: &Phenotype, relation: Relation) -> Vec<Phenotype> {
        let index = match relation {
            Relation::Parent => &self.parents,
            Relation::Child => &self.children,
        };
        index
            .get(phenotype)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    /// Only the seeds are admitted.
    Seeded,
    /// The layer at `distance` was the last one admitted.
    Expanding { distance: u32 },
    Done,
}

/// Breadth-first expansion of a seed set, one distance layer per step.
///
/// A phenotype is admitted at the smallest distance it is reachable at and
/// never again, however many paths lead to it.
pub struct Expansion<'g, G: OntologyGraph + ?Sized> {
    graph: &'g G,
    policy: TraversalPolicy,
    max_distance: u32,
    state: ExpansionState,
    distances: HashMap<Phenotype, u32>,
    admitted: Vec<Phenotype>,
    frontier: Vec<Phenotype>,
}

impl<'g, G: OntologyGraph + ?Sized> Expansion<'g, G> {
    pub fn new(
        graph: &'g G,
        seeds: impl IntoIterator<Item = Phenotype>,
        policy: TraversalPolicy,
        max_distance: u32,
    ) -> Self {
        let seeds: BTreeSet<Phenotype> = seeds.into_iter().collect();
        let mut distances = HashMap::new();
        for seed in &seeds {
            if !graph.contains(seed) {
                warn!(phenotype = %seed, "seed phenotype not found in ontology");
            }
            distances.insert(seed.clone(), 0);
        }
        let frontier: Vec<Phenotype> = seeds.into_iter().collect();
        Self {
            graph,
            policy,
            max_distance,
            state: ExpansionState::Seeded,
            distances,
            admitted: frontier.clone(),
            frontier,
        }
    }

    pub fn state(&self) -> ExpansionState {
        self.state
    }

    /// Admits the next distance layer, or moves to `Done` when there is none.
    pub fn step(&mut self) -> ExpansionState {
        let current = match self.state {
            ExpansionState::Done => return ExpansionState::Done,
            ExpansionState::Seeded => 0,
            ExpansionState::Expanding { distance } => distance,
        };
        if current >= self.max_distance || self.frontier.is_empty() {
            self.state = ExpansionState::Done;
            return self.state;
        }

        let next = current + 1;
        let mut layer = Vec::new();
        let mut neighbours = Vec::new();
        for node in &self.frontier {
            neighbours_into(self.graph, node, self.policy, &mut neighbours);
            for neighbour in neighbours.drain(..) {
                if !self.distances.contains_key(&neighbour) {
                    self.distances.insert(neighbour.clone(), next);
                    layer.push(neighbour);
                }
            }
        }
        layer.sort();
        debug!(distance = next, admitted = layer.len(), "expanded ontology layer");

        self.admitted.extend(layer.iter().cloned());
        self.frontier = layer;
        self.state = if self.frontier.is_empty() {
            ExpansionState::Done
        } else {
            ExpansionState::Expanding { distance: next }
        };
        self.state
    }

    pub fn run(mut self) -> PhenotypeNetwork {
        while self.step() != ExpansionState::Done {}
        self.into_network()
    }

    /// The phenotypes admitted so far.
    pub fn into_network(self) -> PhenotypeNetwork {
        PhenotypeNetwork {
            distances: self.distances,
            admitted: self.admitted,
        }
    }
}

// Clears `buf`, then fills it with the sorted, distinct neighbours of `node`.
fn neighbours_into<G: OntologyGraph + ?Sized>(
    graph: &G,
    node: &Phenotype,
    policy: TraversalPolicy,
    buf: &mut Vec<Phenotype>,
) {
    buf.clear();
    for relation in policy.relations() {
        buf.extend(graph.adjacent(node, *relation));
    }
    buf.sort();
    buf.dedup();
}

/// Expansion settings chosen before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhenotypeExpander {
    pub policy: TraversalPolicy,
    pub max_distance: u32,
}

impl PhenotypeExpander {
    pub fn new(policy: TraversalPolicy, max_distance: u32) -> Self {
        Self {
            policy,
            max_distance,
        }
    }

    pub fn expand<G: OntologyGraph + ?Sized>(
        &self,
        graph: &G,
        seeds: impl IntoIterator<Item = Phenotype>,
    ) -> PhenotypeNetwork {
        Expansion::new(graph, seeds, self.policy, self.max_distance).run()
    }
}

/// Phenotypes reachable from a seed set, each with its ontology distance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhenotypeNetwork {
    distances: HashMap<Phenotype, u32>,
    admitted: Vec<Phenotype>,
}

impl PhenotypeNetwork {
    /// In admission order: by distance, then by phenotype order.
    pub fn phenotypes(&self) -> impl Iterator<Item = &Phenotype> {
        self.admitted.iter()
    }

    pub fn phenotypes_ordered(&self) -> Vec<&Phenotype> {
        let mut phenotypes: Vec<&Phenotype> = self.admitted.iter().collect();
        phenotypes.sort();
        phenotypes
    }

    pub fn distance(&self, phenotype: &Phenotype) -> Option<u32> {
        self.distances.get(phenotype).copied()
    }

    pub fn at_distance(&self, distance: u32) -> Vec<&Phenotype> {
        self.admitted
            .iter()
            .filter(|phenotype| self.distances.get(*phenotype) == Some(&distance))
            .collect()
    }

    pub fn contains(&self, phenotype: &Phenotype) -> bool {
        self.distances.contains_key(phenotype)
    }

    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }
}
