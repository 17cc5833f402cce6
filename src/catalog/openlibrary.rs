//! Open Library brief volumes API as a catalog.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::identifier::Identifier;
use crate::record::{OpenLibraryRecord, ParsedRecord};

use super::{BackendKind, CatalogBackend, CatalogError, fetch_json, with_scheme};

/// Open Library catalog.
#[derive(Debug, Clone)]
pub struct OpenLibraryBackend {
    name: String,
    client: Client,
    base_url: String,
}

impl OpenLibraryBackend {
    /// Creates a backend against `base_url`
    /// (e.g. `openlibrary.org/api/volumes/brief/isbn`).
    #[must_use]
    pub fn new(name: &str, client: Client, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            client,
            base_url: with_scheme(base_url),
        }
    }

    /// Request URL for `identifier`.
    #[must_use]
    pub fn query_url(&self, identifier: &Identifier) -> String {
        format!("{}/{}.json", self.base_url, urlencoding::encode(&identifier.value))
    }
}

#[async_trait]
impl CatalogBackend for OpenLibraryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Openlibrary
    }

    #[tracing::instrument(skip(self), fields(catalog = %self.name, identifier = %identifier))]
    async fn query(&self, identifier: &Identifier) -> Result<Option<ParsedRecord>, CatalogError> {
        let url = self.query_url(identifier);
        let body = fetch_json(&self.client, &url).await?;
        parse_brief_volumes(&url, &body)
    }
}

/// Takes the first entry of `records`. Empty bodies mean no match.
pub(crate) fn parse_brief_volumes(
    url: &str,
    body: &Value,
) -> Result<Option<ParsedRecord>, CatalogError> {
    let root = match body {
        Value::Array(items) if items.is_empty() => {
            info!(url, "no records in catalog");
            return Ok(None);
        }
        Value::Object(root) if root.is_empty() => {
            info!(url, "no records in catalog");
            return Ok(None);
        }
        Value::Object(root) => root,
        _ => {
            return Err(CatalogError::unexpected_response(
                url,
                "expected a JSON object or empty array",
            ));
        }
    };

    let records = root
        .get("records")
        .and_then(Value::as_object)
        .ok_or_else(|| CatalogError::unexpected_response(url, "missing records object"))?;

    let Some(entry) = records.values().next() else {
        info!(url, "no records in catalog");
        return Ok(None);
    };

    let text = serde_json::to_string(entry)
        .map_err(|e| CatalogError::unexpected_response(url, e.to_string()))?;
    OpenLibraryRecord::from_json(&text)
        .map(|record| Some(ParsedRecord::OpenLibrary(record)))
        .map_err(|e| CatalogError::malformed_record(url, e))
}
