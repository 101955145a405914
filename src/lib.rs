pub mod aggregate;
pub mod app;
pub mod association;
pub mod collection;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod knowledge;
pub mod ontology;
pub mod output;
pub mod prioritize;
pub mod query;
