//! ReShare (BorrowDirect) search API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::identifier::Identifier;
use crate::record::{MarcRecord, ParsedRecord};

use super::{BackendKind, CatalogBackend, CatalogError, fetch_json, with_scheme};

/// ReShare shared-index catalog.
#[derive(Debug, Clone)]
pub struct ReshareBackend {
    name: String,
    client: Client,
    base_url: String,
}

impl ReshareBackend {
    /// Creates a backend against `base_url`
    /// (e.g. `https://borrowdirect.reshare.indexdata.com`).
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
            "{}/api/v1/search?type=AllFields&field[]=fullRecord&lookfor={}",
            self.base_url,
            urlencoding::encode(&identifier.value)
        )
    }
}

#[async_trait]
impl CatalogBackend for ReshareBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Reshare
    }

    #[tracing::instrument(skip(self), fields(catalog = %self.name, identifier = %identifier))]
    async fn query(&self, identifier: &Identifier) -> Result<Option<ParsedRecord>, CatalogError> {
        let url = self.query_url(identifier);
        let body = fetch_json(&self.client, &url).await?;
        parse_search_results(&url, &body)
    }
}

/// Reads `resultCount` and the first hit's `fullRecord`.
pub(crate) fn parse_search_results(
    url: &str,
    body: &Value,
) -> Result<Option<ParsedRecord>, CatalogError> {
    let count = body
        .get("resultCount")
        .and_then(Value::as_u64)
        .ok_or_else(|| CatalogError::unexpected_response(url, "missing resultCount"))?;
    if count == 0 {
        info!(url, "no records in catalog");
        return Ok(None);
    }

    let marcxml = body
        .get("records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
        .and_then(|hit| hit.get("fullRecord"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CatalogError::unexpected_response(url, "first hit carries no fullRecord")
        })?;

    MarcRecord::from_marcxml(marcxml)
        .map(|record| Some(ParsedRecord::Marc(record)))
        .map_err(|e| CatalogError::malformed_record(url, e))
}
