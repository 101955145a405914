use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::domain::{Disease, Gene, Source};

/// Evidence URIs with this prefix simplify to the bare PubMed id.
pub const PUBMED_PREFIX: &str = "http://identifiers.org/pubmed/";

/// A relationship between two entities, identified by the pair alone.
pub trait Association {
    type Left: Clone + Debug + Eq + Hash + Ord;
    type Right: Clone + Debug + Eq + Hash + Ord;

    fn left(&self) -> &Self::Left;
    fn right(&self) -> &Self::Right;

    /// Folds the data of another instance of the same pair into this one.
    fn absorb(&mut self, other: Self)
    where
        Self: Sized;
}

pub trait Scored {
    fn score(&self) -> Option<f64>;
}

/// Evidence for one gene-disease pair, accumulated over every observation.
///
/// Sources are counted on each observation; evidence URIs are kept per source
/// in observation order, duplicates included. A source can be counted without
/// having any evidence.
#[derive(Debug, Clone)]
pub struct GeneDiseaseAssociation {
    gene: Gene,
    disease: Disease,
    score: Option<f64>,
    source_counts: HashMap<Source, u32>,
    source_evidence: HashMap<Source, Vec<String>>,
}

impl GeneDiseaseAssociation {
    pub fn new(gene: Gene, disease: Disease) -> Self {
        Self {
            gene,
            disease,
            score: None,
            source_counts: HashMap::new(),
            source_evidence: HashMap::new(),
        }
    }

    pub fn with_score(gene: Gene, disease: Disease, score: f64) -> Self {
        let mut association = Self::new(gene, disease);
        association.score = Some(score);
        association
    }

    pub fn gene(&self) -> &Gene {
        &self.gene
    }

    pub fn disease(&self) -> &Disease {
        &self.disease
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Sets the score unless one is already known; returns whether it was set.
    pub fn adopt_score(&mut self, score: f64) -> bool {
        if self.score.is_some() {
            return false;
        }
        self.score = Some(score);
        true
    }

    pub fn record(&mut self, source: &Source) {
        *self.source_counts.entry(source.clone()).or_insert(0) += 1;
    }

    pub fn record_with_evidence(&mut self, source: &Source, evidence: impl Into<String>) {
        self.record(source);
        self.source_evidence
            .entry(source.clone())
            .or_default()
            .push(evidence.into());
    }

    pub fn source_counts(&self) -> &HashMap<Source, u32> {
        &self.source_counts
    }

    pub fn count_for_source(&self, source: &Source) -> u32 {
        self.source_counts.get(source).copied().unwrap_or(0)
    }

    pub fn total_count(&self) -> u32 {
        self.source_counts.values().sum()
    }

    pub fn sources_with_evidence(&self) -> impl Iterator<Item = &Source> {
        self.source_evidence.keys()
    }

    pub fn sources_ordered(&self) -> Vec<&Source> {
        let mut sources: Vec<&Source> = self.source_counts.keys().collect();
        sources.sort();
        sources
    }

    /// `None` when the source never delivered evidence for this pair.
    pub fn evidence_for_source(&self, source: &Source) -> Option<&[String]> {
        self.source_evidence.get(source).map(Vec::as_slice)
    }

    pub fn all_evidence(&self) -> HashSet<&str> {
        self.source_evidence
            .values()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    pub fn all_evidence_ordered(&self) -> Vec<&str> {
        let mut evidence: Vec<&str> = self.all_evidence().into_iter().collect();
        evidence.sort_unstable();
        evidence
    }

    pub fn all_evidence_simplified(&self) -> HashSet<&str> {
        self.all_evidence().into_iter().map(simplify_evidence).collect()
    }

    /// Sorted simplified evidence. References that collapse to the same id after the
    /// `pubmed/` prefix is stripped appear once.
    pub fn all_evidence_simplified_ordered(&self) -> Vec<&str> {
        let mut evidence: Vec<&str> = self.all_evidence_simplified().into_iter().collect();
        evidence.sort_unstable();
        evidence
    }
}

impl Association for GeneDiseaseAssociation {
    type Left = Gene;
    type Right = Disease;

    fn left(&self) -> &Gene {
        &self.gene
    }

    fn right(&self) -> &Disease {
        &self.disease
    }

    fn absorb(&mut self, other: Self) {
        if let Some(score) = other.score {
            self.adopt_score(score);
        }
        for (source, count) in other.source_counts {
            *self.source_counts.entry(source).or_insert(0) += count;
        }
        for (source, evidence) in other.source_evidence {
            self.source_evidence
                .entry(source)
                .or_default()
                .extend(evidence);
        }
    }
}

impl Scored for GeneDiseaseAssociation {
    fn score(&self) -> Option<f64> {
        self.score
    }
}

impl PartialEq for GeneDiseaseAssociation {
    fn eq(&self, other: &Self) -> bool {
        self.gene == other.gene && self.disease == other.disease
    }
}

impl Eq for GeneDiseaseAssociation {}

impl Hash for GeneDiseaseAssociation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.gene.hash(state);
        self.disease.hash(state);
    }
}

pub fn simplify_evidence(uri: &str) -> &str {
    uri.strip_prefix(PUBMED_PREFIX).unwrap_or(uri)
}
