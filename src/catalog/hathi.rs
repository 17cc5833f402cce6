//! HathiTrust full-record volumes API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::identifier::Identifier;
use crate::record::{MarcRecord, ParsedRecord};

use super::{BackendKind, CatalogBackend, CatalogError, fetch_json, with_scheme};

/// HathiTrust catalog.
#[derive(Debug, Clone)]
pub struct HathiBackend {
    name: String,
    client: Client,
    base_url: String,
}

impl HathiBackend {
    /// Creates a backend against `base_url` (e.g. `https://catalog.hathitrust.org`).
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
        format!(
            "{}/api/volumes/full/{}/{}.json",
            self.base_url,
            identifier.kind,
            urlencoding::encode(&identifier.value)
        )
    }
}

#[async_trait]
impl CatalogBackend for HathiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Hathi
    }

    #[tracing::instrument(skip(self), fields(catalog = %self.name, identifier = %identifier))]
    async fn query(&self, identifier: &Identifier) -> Result<Option<ParsedRecord>, CatalogError> {
        let url = self.query_url(identifier);
        let body = fetch_json(&self.client, &url).await?;
        parse_full_record(&url, &body)
    }
}

/// Takes the `marc-xml` of the first entry in `records`.
pub(crate) fn parse_full_record(
    url: &str,
    body: &Value,
) -> Result<Option<ParsedRecord>, CatalogError> {
    let records = body
        .get("records")
        .and_then(Value::as_object)
        .ok_or_else(|| CatalogError::unexpected_response(url, "missing records object"))?;

    let Some((record_id, entry)) = records.iter().next() else {
        info!(url, "no records in catalog");
        return Ok(None);
    };

    let marcxml = entry
        .get("marc-xml")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CatalogError::unexpected_response(url, format!("record {record_id} has no marc-xml"))
        })?;

    MarcRecord::from_marcxml(marcxml)
        .map(|record| Some(ParsedRecord::Marc(record)))
        .map_err(|e| CatalogError::malformed_record(url, e))
}
