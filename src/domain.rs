use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

/// How ids of one entity kind are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdOrdering {
    /// Numeric value of the digits that follow `skip` leading characters.
    Numeric { skip: usize },
    Lexical,
}

/// The fixed validation rules of one entity kind.
#[derive(Debug)]
pub struct KindDescriptor {
    pub name: &'static str,
    /// Canonical (lowercase) prefix used by [`Entity::formatted_id`].
    pub prefix: &'static str,
    pub pattern: &'static str,
    /// Capture group of `pattern` holding the unprefixed id.
    pub id_group: usize,
    pub uri_namespace: &'static str,
    pub ordering: IdOrdering,
}

pub trait EntityKind {
    fn descriptor() -> &'static KindDescriptor;
    fn regex() -> &'static Regex;
}

macro_rules! entity_kind {
    ($marker:ident, $descriptor:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $marker {}

        impl EntityKind for $marker {
            fn descriptor() -> &'static KindDescriptor {
                static DESCRIPTOR: KindDescriptor = $descriptor;
                &DESCRIPTOR
            }

            fn regex() -> &'static Regex {
                static REGEX: LazyLock<Regex> =
                    LazyLock::new(|| Regex::new($marker::descriptor().pattern).unwrap());
                &REGEX
            }
        }
    };
}

entity_kind!(
    PhenotypeKind,
    KindDescriptor {
        name: "phenotype",
        prefix: "hp",
        pattern: r"^(hp|HP):([0-9]{7})$",
        id_group: 2,
        uri_namespace: "http://purl.obolibrary.org/obo/HP_",
        ordering: IdOrdering::Numeric { skip: 0 },
    }
);

entity_kind!(
    DiseaseKind,
    KindDescriptor {
        name: "disease",
        prefix: "umls",
        pattern: r"^(umls|UMLS):(C[0-9]+)$",
        id_group: 2,
        uri_namespace: "http://linkedlifedata.com/resource/umls/id/",
        ordering: IdOrdering::Numeric { skip: 1 },
    }
);

entity_kind!(
    GeneKind,
    KindDescriptor {
        name: "gene",
        prefix: "ncbigene",
        pattern: r"^(ncbigene|NCBIGENE):([0-9]+)$",
        id_group: 2,
        uri_namespace: "http://identifiers.org/ncbigene/",
        ordering: IdOrdering::Numeric { skip: 0 },
    }
);

entity_kind!(
    SourceKind,
    KindDescriptor {
        name: "source",
        prefix: "disgenet",
        pattern: r"^(disgenet|DISGENET):([A-Za-z0-9_]+)$",
        id_group: 2,
        uri_namespace: "http://rdf.disgenet.org/v6.0.0/void/",
        ordering: IdOrdering::Lexical,
    }
);

pub type Phenotype = Entity<PhenotypeKind>;
pub type Disease = Entity<DiseaseKind>;
pub type Gene = Entity<GeneKind>;

/// A biomedical entity identified by its canonical URI.
///
/// The display name is cached data only: two entities with the same URI are
/// equal whatever their names are.
#[derive(Debug, Clone)]
pub struct Entity<K: EntityKind> {
    id: String,
    name: Option<String>,
    kind: PhantomData<K>,
}

impl<K: EntityKind> Entity<K> {
    /// Parses the prefixed short form, e.g. `hp:0012345` or `HP:0012345`.
    pub fn parse(value: &str) -> Result<Self, KiraError> {
        let descriptor = K::descriptor();
        let invalid = || KiraError::InvalidFormat {
            kind: descriptor.name,
            value: value.to_string(),
            pattern: descriptor.pattern,
        };
        let captures = K::regex().captures(value).ok_or_else(invalid)?;
        let id = captures
            .get(descriptor.id_group)
            .map(|m| m.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(invalid)?;
        Ok(Self::from_valid_id(id.to_string()))
    }

    pub fn from_uri(uri: &str) -> Result<Self, KiraError> {
        let descriptor = K::descriptor();
        let invalid = || KiraError::InvalidUri {
            kind: descriptor.name,
            uri: uri.to_string(),
            namespace: descriptor.uri_namespace,
        };
        let rest = uri.strip_prefix(descriptor.uri_namespace).ok_or_else(invalid)?;
        let formatted = format!("{}:{rest}", descriptor.prefix);
        let captures = K::regex().captures(&formatted).ok_or_else(invalid)?;
        match captures.get(descriptor.id_group) {
            Some(id) if id.as_str() == rest && !rest.is_empty() => {
                Ok(Self::from_valid_id(rest.to_string()))
            }
            _ => Err(invalid()),
        }
    }

    /// Builds an entity from both representations, which must agree.
    pub fn from_uri_and_id(uri: &str, id: &str) -> Result<Self, KiraError> {
        let from_uri = Self::from_uri(uri)?;
        let parsed = Self::parse(id)?;
        if from_uri.id != parsed.id {
            return Err(KiraError::IdentityMismatch {
                kind: K::descriptor().name,
                id: id.to_string(),
                uri: uri.to_string(),
            });
        }
        Ok(from_uri)
    }

    fn from_valid_id(id: String) -> Self {
        Self {
            id,
            name: None,
            kind: PhantomData,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn formatted_id(&self) -> String {
        format!("{}:{}", K::descriptor().prefix, self.id)
    }

    pub fn uri(&self) -> String {
        format!("{}{}", K::descriptor().uri_namespace, self.id)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<K: EntityKind> PartialEq for Entity<K> {
    fn eq(&self, other: &Self) -> bool {
        // Same namespace for every entity of a kind, so the id decides the URI.
        self.id == other.id
    }
}

impl<K: EntityKind> Eq for Entity<K> {}

impl<K: EntityKind> Hash for Entity<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: EntityKind> Ord for Entity<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_key = match K::descriptor().ordering {
            IdOrdering::Numeric { skip } => {
                compare_digits(self.id.get(skip..), other.id.get(skip..))
            }
            IdOrdering::Lexical => Ordering::Equal,
        };
        by_key.then_with(|| self.id.cmp(&other.id))
    }
}

impl<K: EntityKind> PartialOrd for Entity<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: EntityKind> fmt::Display for Entity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", K::descriptor().prefix, self.id)
    }
}

impl<K: EntityKind> FromStr for Entity<K> {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

// Digit strings of any length, compared by numeric value without parsing.
fn compare_digits(left: Option<&str>, right: Option<&str>) -> Ordering {
    let left = left.unwrap_or_default().trim_start_matches('0');
    let right = right.unwrap_or_default().trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLevel {
    Curated,
    Inferred,
    AnimalModel,
    Literature,
}

impl fmt::Display for SourceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLevel::Curated => write!(f, "curated"),
            SourceLevel::Inferred => write!(f, "inferred"),
            SourceLevel::AnimalModel => write!(f, "animal_model"),
            SourceLevel::Literature => write!(f, "literature"),
        }
    }
}

impl FromStr for SourceLevel {
    type Err = KiraError;

    /// Accepts a bare level name or a URI whose last segment is one.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let segment = value
            .trim()
            .rsplit(['/', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match segment.as_str() {
            "curated" => Ok(SourceLevel::Curated),
            "inferred" => Ok(SourceLevel::Inferred),
            "animal_model" | "animal_models" => Ok(SourceLevel::AnimalModel),
            "literature" => Ok(SourceLevel::Literature),
            _ => Err(KiraError::InvalidSourceLevel(value.to_string())),
        }
    }
}

/// A dataset that provides gene-disease evidence.
#[derive(Debug, Clone)]
pub struct Source {
    entity: Entity<SourceKind>,
    level: SourceLevel,
}

impl Source {
    pub fn new(entity: Entity<SourceKind>, level: SourceLevel) -> Self {
        Self { entity, level }
    }

    pub fn from_uri(uri: &str, title: &str, level: SourceLevel) -> Result<Self, KiraError> {
        Ok(Self::new(Entity::from_uri(uri)?.with_name(title), level))
    }

    pub fn id(&self) -> &str {
        self.entity.id()
    }

    pub fn uri(&self) -> String {
        self.entity.uri()
    }

    pub fn title(&self) -> Option<&str> {
        self.entity.name()
    }

    pub fn level(&self) -> SourceLevel {
        self.level
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl Eq for Source {}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
    }
}

impl Ord for Source {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entity.cmp(&other.entity)
    }
}

impl PartialOrd for Source {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity.id())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_phenotype_both_cases() {
        let lower = Phenotype::parse("hp:0012345").unwrap();
        let upper = Phenotype::parse("HP:0012345").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.formatted_id(), "hp:0012345");
        assert_eq!(upper.uri(), "http://purl.obolibrary.org/obo/HP_0012345");
    }

    #[test]
    fn parse_phenotype_mixed_case_prefix() {
        for value in ["Hp:0012345", "hP:0012345"] {
            let err = Phenotype::parse(value).unwrap_err();
            assert_matches!(err, KiraError::InvalidFormat { kind: "phenotype", .. });
        }
    }

    #[test]
    fn uri_outside_namespace() {
        let err = Gene::from_uri("http://identifiers.org/ncbi/1234").unwrap_err();
        assert_matches!(err, KiraError::InvalidUri { kind: "gene", .. });
    }

    #[test]
    fn uri_without_id() {
        let err = Gene::from_uri("http://identifiers.org/ncbigene/").unwrap_err();
        assert_matches!(err, KiraError::InvalidUri { .. });
    }

    #[test]
    fn id_and_uri_must_agree() {
        let err = Disease::from_uri_and_id(
            "http://linkedlifedata.com/resource/umls/id/C0123456",
            "umls:C0000001",
        )
        .unwrap_err();
        assert_matches!(err, KiraError::IdentityMismatch { kind: "disease", .. });
    }

    #[test]
    fn numeric_ordering_ignores_width() {
        let mut genes: Vec<Gene> = ["ncbigene:100", "ncbigene:20", "ncbigene:3"]
            .iter()
            .map(|value| value.parse().unwrap())
            .collect();
        genes.sort();
        let ids: Vec<&str> = genes.iter().map(Gene::id).collect();
        assert_eq!(ids, vec!["3", "20", "100"]);
    }

    #[test]
    fn source_level_from_uri() {
        let level: SourceLevel = "http://example.org/level#LITERATURE".parse().unwrap();
        assert_eq!(level, SourceLevel::Literature);
        assert_matches!(
            "unknown".parse::<SourceLevel>(),
            Err(KiraError::InvalidSourceLevel(_))
        );
    }
}
