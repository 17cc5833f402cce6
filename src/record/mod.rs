//! Catalog record schemas and per-classifier accessors.
//!
//! Catalogs return records in one of two shapes, declared per catalog by its
//! [`RecordSchema`]:
//! - [`RecordSchema::Marcxml`] - MARC 21 records in MARCXML ([`MarcRecord`])
//! - [`RecordSchema::Openl`] - Open Library key/value edition records ([`OpenLibraryRecord`])
//!
//! Both implement [`BibliographicRecord`], which exposes one accessor per
//! classifier so callers never look fields up by name.

mod marc;
mod openlibrary;

pub use marc::{MarcDataField, MarcRecord};
pub(crate) use marc::{MarcxmlRecord, strip_marcxml_ns};
pub use openlibrary::OpenLibraryRecord;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::Classifier;

/// Record document shape a catalog returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSchema {
    /// MARC 21 in MARCXML markup.
    Marcxml,
    /// Open Library JSON edition record.
    Openl,
}

impl RecordSchema {
    /// Returns the stable label stored in the ledger's `recordtype` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Marcxml => "marcxml",
            Self::Openl => "openl",
        }
    }
}

impl fmt::Display for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "marcxml" => Ok(Self::Marcxml),
            "openl" => Ok(Self::Openl),
            other => Err(format!("unknown record schema: {other}")),
        }
    }
}

/// Errors raised when a record document cannot be read.
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    /// The document is not valid for its declared schema
    #[error("malformed {schema} record: {reason}\n  Suggestion: Check the catalog's record_type setting")]
    Malformed {
        /// Declared schema of the document
        schema: RecordSchema,
        /// Parser failure detail
        reason: String,
    },
}

impl RecordError {
    /// Creates a `Malformed` error.
    #[must_use]
    pub fn malformed(schema: RecordSchema, reason: impl Into<String>) -> Self {
        Self::Malformed {
            schema,
            reason: reason.into(),
        }
    }
}

/// Per-classifier accessors over a matched catalog record.
///
/// Accessors return `None` when the record does not carry the data; a missing
/// classifier is never an error.
pub trait BibliographicRecord {
    /// The record document as stored in the ledger.
    fn document(&self) -> Option<String>;

    /// Library of Congress Classification.
    fn lcc(&self) -> Option<String>;

    /// Dewey Decimal Classification.
    fn ddc(&self) -> Option<String>;

    /// Library of Congress Subject Headings, joined with ` | `.
    fn lcsh(&self) -> Option<String>;

    /// ISBNs carried on the record.
    fn isbns(&self) -> Vec<String>;

    /// Three-letter MARC language code.
    fn language(&self) -> Option<String>;

    /// Reads the accessor for `classifier`.
    fn classifier(&self, classifier: Classifier) -> Option<String> {
        match classifier {
            Classifier::Record => self.document(),
            Classifier::Lcc => self.lcc(),
            Classifier::Ddc => self.ddc(),
            Classifier::Lcsh => self.lcsh(),
            Classifier::Isbn => {
                let isbns = self.isbns();
                (!isbns.is_empty()).then(|| isbns.join(" | "))
            }
        }
    }
}

/// A record parsed according to its catalog's declared schema.
#[derive(Debug, Clone)]
pub enum ParsedRecord {
    /// MARCXML record.
    Marc(MarcRecord),
    /// Open Library edition record.
    OpenLibrary(OpenLibraryRecord),
}

impl ParsedRecord {
    /// Parses `document` with the strategy for `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] if the document cannot be parsed.
    pub fn parse(schema: RecordSchema, document: &str) -> Result<Self, RecordError> {
        match schema {
            RecordSchema::Marcxml => MarcRecord::from_marcxml(document).map(Self::Marc),
            RecordSchema::Openl => OpenLibraryRecord::from_json(document).map(Self::OpenLibrary),
        }
    }

    /// Returns the schema this record was parsed with.
    #[must_use]
    pub fn schema(&self) -> RecordSchema {
        match self {
            Self::Marc(_) => RecordSchema::Marcxml,
            Self::OpenLibrary(_) => RecordSchema::Openl,
        }
    }

    /// Title for display, when the record carries one.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        match self {
            Self::Marc(record) => record.title(),
            Self::OpenLibrary(record) => record.title(),
        }
    }

    /// Main author for display, when the record carries one.
    #[must_use]
    pub fn author(&self) -> Option<String> {
        match self {
            Self::Marc(record) => record.author(),
            Self::OpenLibrary(record) => record.author(),
        }
    }

    /// Borrows the record through its accessor interface.
    #[must_use]
    pub fn accessors(&self) -> &dyn BibliographicRecord {
        match self {
            Self::Marc(record) => record,
            Self::OpenLibrary(record) => record,
        }
    }
}

/// Trims trailing ISBD punctuation (`[ ] , . : / ;`) and surrounding whitespace.
pub(crate) fn tidy(text: &str) -> String {
    const ISBD_TRAILERS: [char; 7] = ['[', ']', ',', '.', ':', '/', ';'];
    text.trim_start()
        .trim_end_matches(|c: char| c.is_whitespace() || ISBD_TRAILERS.contains(&c))
        .to_string()
}
