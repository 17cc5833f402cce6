//! Classifier field state accumulated during one resolution.
//!
//! [`FieldSet`] holds one slot per requested [`Classifier`]. A slot is filled
//! at most once: later catalogs can fill empty slots but never replace a
//! value that is already present.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifier::{Identifier, IdentifierKind};
use crate::record::RecordSchema;

/// A category of bibliographic data requested from catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classifier {
    /// The full catalog record document.
    Record,
    /// Library of Congress Classification.
    Lcc,
    /// Dewey Decimal Classification.
    Ddc,
    /// Library of Congress Subject Headings.
    Lcsh,
    /// ISBNs listed on the record.
    Isbn,
}

impl Classifier {
    /// Every classifier in canonical column order.
    pub const ALL: [Self; 5] = [Self::Record, Self::Lcc, Self::Ddc, Self::Lcsh, Self::Isbn];

    /// Returns the stable lowercase label used in config, columns and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Lcc => "lcc",
            Self::Ddc => "ddc",
            Self::Lcsh => "lcsh",
            Self::Isbn => "isbn",
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Classifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(Self::Record),
            "lcc" => Ok(Self::Lcc),
            "ddc" => Ok(Self::Ddc),
            "lcsh" => Ok(Self::Lcsh),
            "isbn" => Ok(Self::Isbn),
            other => Err(format!("unknown classifier: {other}")),
        }
    }
}

/// Values extracted from one catalog record, keyed by classifier.
pub type FieldMap = BTreeMap<Classifier, String>;

/// Per-classifier slots for one resolution, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    slots: Vec<(Classifier, Option<String>)>,
}

impl FieldSet {
    /// Creates a field set with every requested classifier unset.
    ///
    /// Duplicate classifiers keep their first position.
    #[must_use]
    pub fn new(classifiers: &[Classifier]) -> Self {
        let mut slots: Vec<(Classifier, Option<String>)> = Vec::with_capacity(classifiers.len());
        for classifier in classifiers {
            if !slots.iter().any(|(c, _)| c == classifier) {
                slots.push((*classifier, None));
            }
        }
        Self { slots }
    }

    /// Pre-populates a slot with a value known before any catalog is queried.
    ///
    /// Unlike [`FieldSet::merge`], an empty string is accepted here and counts
    /// as set. Returns false if the classifier was not requested or already set.
    pub fn prefill(&mut self, classifier: Classifier, value: impl Into<String>) -> bool {
        match self.slot_mut(classifier) {
            Some(slot) if slot.is_none() => {
                *slot = Some(value.into());
                true
            }
            _ => false,
        }
    }

    /// Merges catalog values into unset slots and returns the classifiers that
    /// were filled.
    ///
    /// Set slots are never overwritten, unrequested classifiers are ignored,
    /// and empty or whitespace-only values are not merged.
    pub fn merge(&mut self, values: &FieldMap) -> Vec<Classifier> {
        let mut filled = Vec::new();
        for (classifier, value) in values {
            if value.trim().is_empty() {
                continue;
            }
            if let Some(slot) = self.slot_mut(*classifier)
                && slot.is_none()
            {
                *slot = Some(value.clone());
                filled.push(*classifier);
            }
        }
        filled
    }

    /// Returns true when every requested classifier holds a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|(_, value)| value.is_some())
    }

    /// Returns the classifiers still unset, in request order.
    #[must_use]
    pub fn missing(&self) -> Vec<Classifier> {
        self.slots
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(classifier, _)| *classifier)
            .collect()
    }

    /// Returns true if the classifier was requested.
    #[must_use]
    pub fn requests(&self, classifier: Classifier) -> bool {
        self.slots.iter().any(|(c, _)| *c == classifier)
    }

    /// Returns true if the classifier was requested and is still unset.
    #[must_use]
    pub fn is_missing(&self, classifier: Classifier) -> bool {
        self.slots
            .iter()
            .any(|(c, value)| *c == classifier && value.is_none())
    }

    /// Returns the value for a classifier, if set.
    #[must_use]
    pub fn get(&self, classifier: Classifier) -> Option<&str> {
        self.slots
            .iter()
            .find(|(c, _)| *c == classifier)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Iterates over all slots in request order.
    pub fn iter(&self) -> impl Iterator<Item = (Classifier, Option<&str>)> {
        self.slots.iter().map(|(c, value)| (*c, value.as_deref()))
    }

    fn slot_mut(&mut self, classifier: Classifier) -> Option<&mut Option<String>> {
        self.slots
            .iter_mut()
            .find(|(c, _)| *c == classifier)
            .map(|(_, value)| value)
    }
}

/// Bookkeeping about where resolved values came from.
///
/// Not part of the completeness test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Supplementary {
    /// Short-code of the catalog that last contributed a value.
    pub catalog: Option<String>,
    /// The identifier that produced the last contributed value (or the input).
    pub identifier: Option<Identifier>,
    /// Schema of the stored `record` value.
    pub record_type: Option<RecordSchema>,
    /// Pre-populated values that are not requested classifiers.
    pub extra: BTreeMap<String, String>,
}

/// Terminal state of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// Every requested classifier has a value.
    Complete,
    /// Catalogs and alternates were exhausted with classifiers still unset.
    Incomplete,
}

impl ResolutionStatus {
    /// Returns the stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one resolution: supplementary data plus classifier fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Where the values came from.
    pub supplementary: Supplementary,
    /// Classifier values, unset where nothing was found.
    pub fields: FieldSet,
    /// Whether every requested classifier was satisfied.
    pub status: ResolutionStatus,
}

impl Resolution {
    /// Flattens the resolution into ordered `(column, value)` pairs.
    ///
    /// Supplementary columns come first (`catalog`, the identifier kind, any
    /// extra pre-populated values, `recordtype`), then classifiers. A classifier
    /// column shadows a supplementary column of the same name.
    #[must_use]
    pub fn columns(&self) -> Vec<(String, Option<String>)> {
        let mut columns: Vec<(String, Option<String>)> = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(existing) = columns.iter_mut().find(|(n, _)| n == name) {
                existing.1 = value;
            } else {
                columns.push((name.to_string(), value));
            }
        };

        push("catalog", self.supplementary.catalog.clone());
        if let Some(identifier) = &self.supplementary.identifier {
            push(identifier.kind.as_str(), Some(identifier.value.clone()));
        }
        for (key, value) in &self.supplementary.extra {
            push(key, Some(value.clone()));
        }
        push(
            "recordtype",
            self.supplementary
                .record_type
                .map(|schema| schema.as_str().to_string()),
        );
        for (classifier, value) in self.fields.iter() {
            let shadowed_identifier = classifier == Classifier::Isbn
                && value.is_none()
                && self
                    .supplementary
                    .identifier
                    .as_ref()
                    .is_some_and(|id| id.kind == IdentifierKind::Isbn);
            if shadowed_identifier {
                continue;
            }
            push(classifier.as_str(), value.map(str::to_string));
        }
        columns
    }

    /// Returns the identifier value of the given kind, if one was recorded.
    #[must_use]
    pub fn identifier_of(&self, kind: IdentifierKind) -> Option<&str> {
        self.supplementary
            .identifier
            .as_ref()
            .filter(|id| id.kind == kind)
            .map(|id| id.value.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn map(pairs: &[(Classifier, &str)]) -> FieldMap {
        pairs.iter().map(|(c, v)| (*c, (*v).to_string())).collect()
    }

    #[test]
    fn test_new_field_set_starts_unset_and_incomplete() {
        let fields = FieldSet::new(&[Classifier::Lcc, Classifier::Ddc]);
        assert!(!fields.is_complete());
        assert_eq!(fields.missing(), vec![Classifier::Lcc, Classifier::Ddc]);
        assert_eq!(fields.get(Classifier::Lcc), None);
    }

    #[test]
    fn test_merge_is_first_writer_wins() {
        let mut fields = FieldSet::new(&[Classifier::Lcc, Classifier::Ddc]);
        let filled = fields.merge(&map(&[(Classifier::Lcc, "PR6037")]));
        assert_eq!(filled, vec![Classifier::Lcc]);

        let filled = fields.merge(&map(&[
            (Classifier::Lcc, "PZ3"),
            (Classifier::Ddc, "823.912"),
        ]));
        assert_eq!(filled, vec![Classifier::Ddc]);
        assert_eq!(fields.get(Classifier::Lcc), Some("PR6037"));
        assert_eq!(fields.get(Classifier::Ddc), Some("823.912"));
        assert!(fields.is_complete());
    }

    #[test]
    fn test_merge_ignores_unrequested_classifiers() {
        let mut fields = FieldSet::new(&[Classifier::Lcc]);
        let filled = fields.merge(&map(&[(Classifier::Lcsh, "Fiction")]));
        assert!(filled.is_empty());
        assert!(!fields.requests(Classifier::Lcsh));
        assert_eq!(fields.iter().count(), 1);
    }

    #[test]
    fn test_merge_skips_empty_catalog_values() {
        let mut fields = FieldSet::new(&[Classifier::Lcsh]);
        let filled = fields.merge(&map(&[(Classifier::Lcsh, "  ")]));
        assert!(filled.is_empty());
        assert!(fields.is_missing(Classifier::Lcsh));
    }

    #[test]
    fn test_prefilled_empty_string_counts_as_set() {
        let mut fields = FieldSet::new(&[Classifier::Lcc, Classifier::Ddc]);
        assert!(fields.prefill(Classifier::Lcc, ""));
        assert_eq!(fields.missing(), vec![Classifier::Ddc]);
        // a later catalog value does not replace the prefilled one
        fields.merge(&map(&[(Classifier::Lcc, "PR6037")]));
        assert_eq!(fields.get(Classifier::Lcc), Some(""));
        assert!(!fields.prefill(Classifier::Lcc, "QA76"));
        assert!(!fields.prefill(Classifier::Isbn, "9780140449136"));
    }

    #[test]
    fn test_duplicate_classifiers_collapse() {
        let fields = FieldSet::new(&[Classifier::Lcc, Classifier::Lcc, Classifier::Ddc]);
        assert_eq!(fields.missing(), vec![Classifier::Lcc, Classifier::Ddc]);
    }

    #[test]
    fn test_classifier_labels_parse() {
        for classifier in Classifier::ALL {
            assert_eq!(classifier.as_str().parse::<Classifier>().unwrap(), classifier);
        }
        assert!("title".parse::<Classifier>().is_err());
    }

    #[test]
    fn test_resolution_columns_order_and_isbn_shadowing() {
        let mut fields = FieldSet::new(&[Classifier::Lcc, Classifier::Isbn]);
        fields.merge(&map(&[(Classifier::Lcc, "PR6037")]));
        let resolution = Resolution {
            supplementary: Supplementary {
                catalog: Some("loc".to_string()),
                identifier: Some(Identifier::new(IdentifierKind::Isbn, "9780140449136")),
                record_type: None,
                extra: BTreeMap::new(),
            },
            fields,
            status: ResolutionStatus::Incomplete,
        };

        let columns = resolution.columns();
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["catalog", "isbn", "recordtype", "lcc"]);
        assert_eq!(columns[1].1.as_deref(), Some("9780140449136"));
        assert_eq!(resolution.identifier_of(IdentifierKind::Isbn), Some("9780140449136"));
    }
}
