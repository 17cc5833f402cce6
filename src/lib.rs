//! LibCat Core Library
//!
//! Resolves classification data (LCC, DDC, LCSH, the full catalog record)
//! for a book identifier by querying library catalogs in a configured order,
//! falling back to alternate editions of the same work when catalogs come up
//! short.
//!
//! # Architecture
//!
//! - [`identifier`] - identifier kinds, ISBN normalization, ISBN lists
//! - [`fields`] - classifiers and the first-writer-wins field set
//! - [`record`] - MARCXML and Open Library record accessors
//! - [`extract`] - classifier extraction with a language allow-list
//! - [`catalog`] - SRU, Alma, HathiTrust, Open Library and ReShare backends
//! - [`retry`] - bounded retry with fixed backoff
//! - [`editions`] - alternate-edition discovery through Open Library
//! - [`resolver`] - the catalog and alternate-edition loop
//! - [`config`] - TOML configuration and catalog descriptors
//! - [`db`] / [`ledger`] - SQLite job ledger with CSV export
//! - [`report`] - plain-text reports

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod db;
pub mod editions;
pub mod extract;
pub mod fields;
pub mod identifier;
pub mod ledger;
pub mod record;
pub mod report;
pub mod resolver;
pub mod retry;
mod user_agent;

// Re-export commonly used types
pub use catalog::{
    BackendKind, CatalogBackend, CatalogError, build_backend, build_catalog_http_client,
};
pub use config::{AppConfig, CatalogDescriptor, ConfigError, ConfigOverrides};
pub use db::{Database, DbError};
pub use editions::{AlternateEditions, EditionLookup, OpenLibraryEditions};
pub use fields::{Classifier, FieldMap, FieldSet, Resolution, ResolutionStatus, Supplementary};
pub use identifier::{
    Identifier, IdentifierError, IdentifierKind, IsbnList, normalize_isbn, parse_isbn_list,
};
pub use ledger::{JobRow, JobType, Ledger, LedgerError};
pub use record::{BibliographicRecord, ParsedRecord, RecordError, RecordSchema};
pub use resolver::{CatalogResolver, ResolveOptions, ResolveRequest};
pub use retry::{RetryDecision, RetryPolicy};
