use std::collections::HashMap;

use tracing::debug;

use crate::association::GeneDiseaseAssociation;
use crate::collection::GeneDiseaseCollection;
use crate::domain::{Disease, Gene, Phenotype, Source, SourceLevel};
use crate::error::KiraError;
use crate::query::{self, CursorGuard, GraphQuery, QueryCursor, QueryEngine, QuerySolution};

/// Evidence sources keyed by their URI.
pub type SourceRegistry = HashMap<String, Source>;

pub fn retrieve_sources<E: QueryEngine>(engine: &E) -> Result<SourceRegistry, KiraError> {
    let cursor = CursorGuard::new(engine.execute(&GraphQuery::Sources)?);
    let mut sources = SourceRegistry::new();
    for solution in cursor {
        let solution = solution?;
        let uri = solution.uri(query::SOURCE)?;
        let title = solution.literal(query::SOURCE_TITLE)?;
        let level: SourceLevel = solution.text(query::SOURCE_LEVEL)?.parse()?;
        sources.insert(uri.to_string(), Source::from_uri(uri, title, level)?);
    }
    Ok(sources)
}

/// One raw observation of a gene-disease pair by a source.
#[derive(Debug, Clone)]
pub struct ObservationRow {
    pub gene: Gene,
    pub disease: Disease,
    pub source: Source,
    pub evidence: Option<String>,
    pub score: Option<f64>,
}

impl ObservationRow {
    pub fn from_solution(
        solution: &QuerySolution,
        sources: &SourceRegistry,
    ) -> Result<Self, KiraError> {
        let mut gene = Gene::from_uri(solution.uri(query::GENE)?)?;
        if let Some(symbol) = solution.optional_literal(query::GENE_SYMBOL_TITLE)? {
            gene = gene.with_name(symbol);
        }
        let mut disease = Disease::from_uri(solution.uri(query::DISEASE)?)?;
        if let Some(title) = solution.optional_literal(query::DISEASE_TITLE)? {
            disease = disease.with_name(title);
        }
        let source_uri = solution.uri(query::GDA_SOURCE)?;
        let source = sources
            .get(source_uri)
            .cloned()
            .ok_or_else(|| KiraError::UnknownSource(source_uri.to_string()))?;
        Ok(Self {
            gene,
            disease,
            source,
            evidence: solution.optional_uri(query::EVIDENCE)?.map(str::to_string),
            score: solution.optional_double(query::GDA_SCORE)?,
        })
    }
}

/// Folds observation rows into one association per gene-disease pair.
#[derive(Debug, Default)]
pub struct EvidenceAggregator {
    collection: GeneDiseaseCollection,
    rows: usize,
}

impl EvidenceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, row: ObservationRow) {
        let ObservationRow {
            gene,
            disease,
            source,
            evidence,
            score,
        } = row;
        self.rows += 1;

        let association = self
            .collection
            .get_or_insert(GeneDiseaseAssociation::new(gene, disease));
        if let Some(score) = score {
            if !association.adopt_score(score) && association.score() != Some(score) {
                debug!(
                    gene = %association.gene(),
                    disease = %association.disease(),
                    kept = ?association.score(),
                    ignored = score,
                    "conflicting score for gene-disease pair"
                );
            }
        }
        match evidence {
            Some(evidence) => association.record_with_evidence(&source, evidence),
            None => association.record(&source),
        }
    }

    /// Drains the cursor completely; the cursor is closed on every exit path.
    pub fn consume<C: QueryCursor>(
        &mut self,
        cursor: CursorGuard<C>,
        sources: &SourceRegistry,
    ) -> Result<(), KiraError> {
        for solution in cursor {
            let row = ObservationRow::from_solution(&solution?, sources)?;
            self.add(row);
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> GeneDiseaseCollection {
        self.collection
    }
}

impl Extend<ObservationRow> for EvidenceAggregator {
    fn extend<I: IntoIterator<Item = ObservationRow>>(&mut self, rows: I) {
        for row in rows {
            self.add(row);
        }
    }
}

/// Runs the association query for `phenotypes` and aggregates every row.
pub fn aggregate<'a, E: QueryEngine>(
    engine: &E,
    phenotypes: impl IntoIterator<Item = &'a Phenotype>,
    sources: &SourceRegistry,
) -> Result<GeneDiseaseCollection, KiraError> {
    let query = GraphQuery::gene_disease_associations(phenotypes);
    let cursor = CursorGuard::new(engine.execute(&query)?);
    let mut aggregator = EvidenceAggregator::new();
    aggregator.consume(cursor, sources)?;
    debug!(rows = aggregator.rows(), "aggregated association rows");
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str) -> Source {
        Source::from_uri(
            &format!("http://rdf.disgenet.org/v6.0.0/void/{id}"),
            id,
            SourceLevel::Curated,
        )
        .unwrap()
    }

    fn row(gene: &str, disease: &str, source: &Source, evidence: Option<&str>) -> ObservationRow {
        ObservationRow {
            gene: gene.parse().unwrap(),
            disease: disease.parse().unwrap(),
            source: source.clone(),
            evidence: evidence.map(str::to_string),
            score: Some(0.5),
        }
    }

    #[test]
    fn repeated_rows_become_one_association() {
        let clinvar = source("CLINVAR");
        let uniprot = source("UNIPROT");
        let mut aggregator = EvidenceAggregator::new();
        aggregator.extend([
            row("ncbigene:1", "umls:C1", &clinvar, Some("http://identifiers.org/pubmed/1")),
            row("ncbigene:1", "umls:C1", &clinvar, None),
            row("ncbigene:1", "umls:C1", &uniprot, Some("http://identifiers.org/pubmed/1")),
        ]);
        let collection = aggregator.finish();
        assert_eq!(collection.len(), 1);

        let gda = collection
            .get(&"ncbigene:1".parse().unwrap(), &"umls:C1".parse().unwrap())
            .unwrap();
        assert_eq!(gda.count_for_source(&clinvar), 2);
        assert_eq!(gda.count_for_source(&uniprot), 1);
        assert_eq!(gda.evidence_for_source(&clinvar).unwrap().len(), 1);
        assert_eq!(gda.all_evidence().len(), 1);
    }

    #[test]
    fn late_score_is_adopted_when_first_row_has_none() {
        let hpo = source("HPO");
        let mut first = row("ncbigene:2", "umls:C2", &hpo, None);
        first.score = None;
        let mut second = row("ncbigene:2", "umls:C2", &hpo, None);
        second.score = Some(0.7);
        let mut third = row("ncbigene:2", "umls:C2", &hpo, None);
        third.score = Some(0.1);

        let mut aggregator = EvidenceAggregator::new();
        aggregator.extend([first, second, third]);
        let collection = aggregator.finish();
        let gda = collection.iter().next().unwrap();
        assert_eq!(gda.score(), Some(0.7));
        assert_eq!(gda.count_for_source(&hpo), 3);
    }
}
