//! Open Library edition records.

use serde_json::{Map, Value};

use super::{BibliographicRecord, RecordError, RecordSchema};

/// An Open Library edition record.
///
/// Accepts both a bare edition object and a `records` entry from the brief
/// volumes API, where edition fields sit under `details.details` and display
/// data under `data`.
#[derive(Debug, Clone)]
pub struct OpenLibraryRecord {
    document: String,
    edition: Map<String, Value>,
    data: Option<Map<String, Value>>,
}

impl OpenLibraryRecord {
    /// Parses an Open Library JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] if the text is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| RecordError::malformed(RecordSchema::Openl, e.to_string()))?;
        Self::with_document(json.to_string(), value)
    }

    /// Builds a record from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        Self::with_document(value.to_string(), value)
    }

    fn with_document(document: String, value: Value) -> Result<Self, RecordError> {
        let Value::Object(mut root) = value else {
            return Err(RecordError::malformed(
                RecordSchema::Openl,
                "expected a JSON object",
            ));
        };

        let data = match root.remove("data") {
            Some(Value::Object(data)) => Some(data),
            _ => None,
        };
        let nested = match root.get_mut("details").and_then(|d| d.get_mut("details")) {
            Some(Value::Object(nested)) => Some(std::mem::take(nested)),
            _ => None,
        };
        let edition = nested.unwrap_or(root);

        Ok(Self {
            document,
            edition,
            data,
        })
    }

    fn strings(&self, key: &str) -> Vec<String> {
        self.edition
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Edition title, else the title from the display data block.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.edition
            .get("title")
            .or_else(|| self.data.as_ref()?.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// First author name from the display data block.
    #[must_use]
    pub fn author(&self) -> Option<String> {
        self.data
            .as_ref()?
            .get("authors")?
            .as_array()?
            .first()?
            .get("name")?
            .as_str()
            .map(str::to_string)
    }
}

impl BibliographicRecord for OpenLibraryRecord {
    fn document(&self) -> Option<String> {
        Some(self.document.clone())
    }

    fn lcc(&self) -> Option<String> {
        self.strings("lc_classifications").into_iter().next()
    }

    fn ddc(&self) -> Option<String> {
        self.strings("dewey_decimal_class").into_iter().next()
    }

    fn lcsh(&self) -> Option<String> {
        None
    }

    fn isbns(&self) -> Vec<String> {
        let mut isbns = self.strings("isbn_13");
        isbns.extend(self.strings("isbn_10"));
        isbns
    }

    fn language(&self) -> Option<String> {
        let key = self
            .edition
            .get("languages")?
            .as_array()?
            .first()?
            .get("key")?
            .as_str()?;
        let start = key.char_indices().rev().nth(2).map(|(i, _)| i)?;
        Some(key[start..].to_string())
    }
}
