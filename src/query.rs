use std::collections::HashMap;
use std::fmt::Write;

use crate::domain::Phenotype;
use crate::error::KiraError;

pub const SOURCE: &str = "source";
pub const SOURCE_TITLE: &str = "sourceTitle";
pub const SOURCE_LEVEL: &str = "sourceLevel";

pub const GENE: &str = "gene";
pub const GENE_SYMBOL_TITLE: &str = "geneSymbolTitle";
pub const DISEASE: &str = "disease";
pub const DISEASE_TITLE: &str = "diseaseTitle";
pub const GDA_SCORE: &str = "gdaScoreNumber";
pub const GDA_SOURCE: &str = "gdaSource";
pub const EVIDENCE: &str = "evidence";

const PREFIXES: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX dcterms: <http://purl.org/dc/terms/>
PREFIX sio: <http://semanticscience.org/resource/>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
PREFIX obo: <http://purl.obolibrary.org/obo/>
PREFIX void: <http://rdfs.org/ns/void#>
PREFIX wi: <http://purl.org/ontology/wi/core#>
PREFIX ncit: <http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#>
";

/// The queries the pipeline sends to the association graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphQuery {
    Sources,
    GeneDiseaseAssociations { phenotypes: Vec<Phenotype> },
}

impl GraphQuery {
    pub fn gene_disease_associations<'a>(
        phenotypes: impl IntoIterator<Item = &'a Phenotype>,
    ) -> Self {
        let mut phenotypes: Vec<Phenotype> = phenotypes.into_iter().cloned().collect();
        phenotypes.sort();
        phenotypes.dedup();
        GraphQuery::GeneDiseaseAssociations { phenotypes }
    }

    pub fn to_sparql(&self) -> String {
        let mut query = String::from(PREFIXES);
        match self {
            GraphQuery::Sources => {
                query.push_str(
                    "SELECT ?source ?sourceTitle ?sourceLevel\n\
                     WHERE {\n\
                     \t?source rdf:type void:Dataset ;\n\
                     \t\tdcterms:title ?sourceTitle ;\n\
                     \t\twi:evidence ?sourceLevel .\n\
                     }\n",
                );
            }
            GraphQuery::GeneDiseaseAssociations { phenotypes } => {
                query.push_str(
                    "SELECT DISTINCT ?gda ?gene ?geneSymbolTitle ?disease ?diseaseTitle \
                     ?gdaScoreNumber ?gdaSource ?evidence\n\
                     WHERE {\n\tVALUES ?hpo {",
                );
                for phenotype in phenotypes {
                    let _ = write!(query, " obo:HP_{}", phenotype.id());
                }
                query.push_str(
                    " }\n\
                     \t?hpo sio:SIO_000001|sio:SIO_000212|skos:exactMatch ?linked .\n\
                     \t{ ?linked skos:exactMatch ?disease } UNION { BIND(?linked AS ?disease) }\n\
                     \t?disease rdf:type ncit:C7057 ;\n\
                     \t\tdcterms:title ?diseaseTitle .\n\
                     \t?gda sio:SIO_000628 ?gene, ?disease ;\n\
                     \t\tsio:SIO_000216/sio:SIO_000300 ?gdaScoreNumber ;\n\
                     \t\tsio:SIO_000253 ?gdaSource .\n\
                     \t?gene rdf:type ncit:C16612 .\n\
                     \tOPTIONAL { ?gene sio:SIO_000205/dcterms:title ?geneSymbolTitle }\n\
                     \tOPTIONAL { ?gda sio:SIO_000772 ?evidence }\n\
                     }\n",
                );
            }
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Uri(String),
    Literal(String),
    Double(f64),
}

/// One result row: named bindings, some of which may be unbound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySolution {
    bindings: HashMap<String, Binding>,
}

impl QuerySolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: &str, value: Binding) -> Self {
        self.bindings.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn uri(&self, name: &str) -> Result<&str, KiraError> {
        self.optional_uri(name)?
            .ok_or_else(|| KiraError::MissingBinding(name.to_string()))
    }

    pub fn optional_uri(&self, name: &str) -> Result<Option<&str>, KiraError> {
        match self.bindings.get(name) {
            None => Ok(None),
            Some(Binding::Uri(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(KiraError::BindingType {
                name: name.to_string(),
                expected: "resource",
            }),
        }
    }

    pub fn literal(&self, name: &str) -> Result<&str, KiraError> {
        self.optional_literal(name)?
            .ok_or_else(|| KiraError::MissingBinding(name.to_string()))
    }

    pub fn optional_literal(&self, name: &str) -> Result<Option<&str>, KiraError> {
        match self.bindings.get(name) {
            None => Ok(None),
            Some(Binding::Literal(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(KiraError::BindingType {
                name: name.to_string(),
                expected: "literal",
            }),
        }
    }

    /// Either a resource or a literal, as text.
    pub fn text(&self, name: &str) -> Result<&str, KiraError> {
        match self.bindings.get(name) {
            None => Err(KiraError::MissingBinding(name.to_string())),
            Some(Binding::Uri(value)) | Some(Binding::Literal(value)) => Ok(value.as_str()),
            Some(Binding::Double(_)) => Err(KiraError::BindingType {
                name: name.to_string(),
                expected: "resource or literal",
            }),
        }
    }

    /// A finite double; `NaN` and infinities are rejected like any other malformed value.
    pub fn optional_double(&self, name: &str) -> Result<Option<f64>, KiraError> {
        let not_a_double = || KiraError::BindingType {
            name: name.to_string(),
            expected: "double",
        };
        let value = match self.bindings.get(name) {
            None => return Ok(None),
            Some(Binding::Double(value)) => *value,
            Some(Binding::Literal(value)) => {
                value.trim().parse::<f64>().map_err(|_| not_a_double())?
            }
            Some(Binding::Uri(_)) => return Err(not_a_double()),
        };
        if value.is_finite() {
            Ok(Some(value))
        } else {
            Err(not_a_double())
        }
    }
}

/// A forward-only stream of query results.
pub trait QueryCursor {
    fn has_next(&mut self) -> bool;
    fn next_solution(&mut self) -> Result<QuerySolution, KiraError>;
    /// Releases the underlying connection. Calling it twice is harmless.
    fn close(&mut self);
}

pub trait QueryEngine {
    type Cursor: QueryCursor;

    fn execute(&self, query: &GraphQuery) -> Result<Self::Cursor, KiraError>;
}

/// Closes the wrapped cursor when dropped, whatever path leaves the scope.
pub struct CursorGuard<C: QueryCursor> {
    cursor: C,
}

impl<C: QueryCursor> CursorGuard<C> {
    pub fn new(cursor: C) -> Self {
        Self { cursor }
    }
}

impl<C: QueryCursor> Iterator for CursorGuard<C> {
    type Item = Result<QuerySolution, KiraError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.has_next() {
            Some(self.cursor.next_solution())
        } else {
            None
        }
    }
}

impl<C: QueryCursor> Drop for CursorGuard<C> {
    fn drop(&mut self) {
        self.cursor.close();
    }
}
