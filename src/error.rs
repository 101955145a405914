use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("{value} does not adhere to the required {kind} format: {pattern}")]
    InvalidFormat {
        kind: &'static str,
        value: String,
        pattern: &'static str,
    },

    #[error("{uri} is not a valid {kind} URI (expected {namespace}<id>)")]
    InvalidUri {
        kind: &'static str,
        uri: String,
        namespace: &'static str,
    },

    #[error("{kind} id {id} does not match URI {uri}")]
    IdentityMismatch {
        kind: &'static str,
        id: String,
        uri: String,
    },

    #[error("invalid source level: {0}")]
    InvalidSourceLevel(String),

    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("query solution is missing binding `{0}`")]
    MissingBinding(String),

    #[error("binding `{name}` is not a {expected}")]
    BindingType {
        name: String,
        expected: &'static str,
    },

    #[error("association references unknown source: {0}")]
    UnknownSource(String),

    #[error("failed to parse ontology at line {line}: {message}")]
    OntologyParse { line: usize, message: String },

    #[error("failed to parse dataset: {0}")]
    DatasetParse(String),

    #[error("missing config file kira-gp.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("output file already exists: {0}")]
    OutputExists(PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("knowledge base request failed: {0}")]
    KnowledgeHttp(String),

    #[error("knowledge base returned status {status}: {message}")]
    KnowledgeStatus { status: u16, message: String },
}
