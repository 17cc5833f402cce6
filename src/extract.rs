//! Turns one matched record into the classifier values a caller asked for.

use tracing::{debug, info};

use crate::fields::{Classifier, FieldMap};
use crate::record::ParsedRecord;

/// Reads the requested classifiers from `record`, honoring a language
/// allow-list.
///
/// With a non-empty `languages` list, a record whose language code is not in
/// the list (or cannot be read) yields an empty map; no partial extraction
/// happens from an excluded record. Classifiers the record does not carry are
/// omitted. Never fails.
#[must_use]
pub fn extract_fields(
    record: &ParsedRecord,
    classifiers: &[Classifier],
    languages: &[String],
) -> FieldMap {
    let accessors = record.accessors();

    if !languages.is_empty() {
        let language = accessors.language();
        let allowed = language
            .as_deref()
            .is_some_and(|code| languages.iter().any(|l| l.eq_ignore_ascii_case(code)));
        if !allowed {
            info!(
                language = language.as_deref().unwrap_or("unknown"),
                allowed = %languages.join(","),
                "record rejected by language filter"
            );
            return FieldMap::new();
        }
    }

    let mut values = FieldMap::new();
    for &classifier in classifiers {
        match accessors.classifier(classifier) {
            Some(value) if !value.trim().is_empty() => {
                values.insert(classifier, value);
            }
            _ => debug!(%classifier, schema = %record.schema(), "classifier not on record"),
        }
    }
    values
}
