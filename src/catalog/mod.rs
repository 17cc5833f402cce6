//! Catalog backends behind one `query` capability.
//!
//! Each configured catalog is described by a
//! [`CatalogDescriptor`](crate::config::CatalogDescriptor) whose `backend` tag
//! selects one of:
//! - [`SruBackend`] - SRU `searchRetrieve` (plain or Alma institution-scoped)
//! - [`HathiBackend`] - HathiTrust full-record volumes API
//! - [`OpenLibraryBackend`] - Open Library brief volumes API
//! - [`ReshareBackend`] - ReShare (BorrowDirect) search API
//!
//! A backend returns `Ok(Some(record))` on a match, `Ok(None)` when the
//! catalog explicitly reports zero results, and `Err` for anything else so the
//! retry policy can act.

mod error;
mod hathi;
mod http_client;
mod openlibrary;
mod reshare;
mod sru;

pub use error::CatalogError;
pub use hathi::HathiBackend;
pub use http_client::build_catalog_http_client;
pub use openlibrary::OpenLibraryBackend;
pub use reshare::ReshareBackend;
pub use sru::SruBackend;

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CatalogDescriptor;
use crate::extract::extract_fields;
use crate::fields::{Classifier, FieldMap};
use crate::identifier::Identifier;
use crate::record::{ParsedRecord, RecordSchema};

/// Backend protocol a catalog speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SRU `searchRetrieve` against a configurable endpoint and index.
    Sru,
    /// SRU scoped to an Ex Libris Alma institution.
    Alma,
    /// HathiTrust identifier-keyed JSON API.
    Hathi,
    /// Open Library brief volumes API.
    Openlibrary,
    /// ReShare search API.
    Reshare,
}

impl BackendKind {
    /// Returns the configuration label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sru => "sru",
            Self::Alma => "alma",
            Self::Hathi => "hathi",
            Self::Openlibrary => "openlibrary",
            Self::Reshare => "reshare",
        }
    }

    /// Record schema this protocol returns.
    #[must_use]
    pub fn record_schema(self) -> RecordSchema {
        match self {
            Self::Openlibrary => RecordSchema::Openl,
            Self::Sru | Self::Alma | Self::Hathi | Self::Reshare => RecordSchema::Marcxml,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One external catalog.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Catalog short-code from configuration.
    fn name(&self) -> &str;

    /// Protocol variant.
    fn kind(&self) -> BackendKind;

    /// Schema of the records this catalog returns.
    fn record_schema(&self) -> RecordSchema {
        self.kind().record_schema()
    }

    /// Makes one request for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for transport failures, non-success statuses,
    /// unexpected response shapes, and unreadable records.
    async fn query(&self, identifier: &Identifier) -> Result<Option<ParsedRecord>, CatalogError>;

    /// Queries for `identifier` and extracts `classifiers` from the match.
    ///
    /// `Ok(None)` is a clean no-match; a match rejected by the language
    /// allow-list yields an empty map.
    ///
    /// # Errors
    ///
    /// Propagates [`CatalogBackend::query`] failures.
    async fn lookup(
        &self,
        identifier: &Identifier,
        classifiers: &[Classifier],
        languages: &[String],
    ) -> Result<Option<FieldMap>, CatalogError> {
        let Some(record) = self.query(identifier).await? else {
            return Ok(None);
        };
        Ok(Some(extract_fields(&record, classifiers, languages)))
    }
}

/// Builds the backend for catalog `name` from its descriptor.
#[must_use]
pub fn build_backend(
    name: &str,
    descriptor: &CatalogDescriptor,
    client: Client,
) -> Box<dyn CatalogBackend> {
    match descriptor.backend {
        BackendKind::Sru => Box::new(SruBackend::new(
            name,
            client,
            &descriptor.base_url,
            descriptor.query.as_deref().unwrap_or(sru::DEFAULT_SRU_INDEX),
        )),
        BackendKind::Alma => Box::new(SruBackend::alma(
            name,
            client,
            &descriptor.base_url,
            descriptor.inst_code.as_deref().unwrap_or_default(),
            descriptor.query.as_deref().unwrap_or(sru::DEFAULT_ALMA_INDEX),
        )),
        BackendKind::Hathi => Box::new(HathiBackend::new(name, client, &descriptor.base_url)),
        BackendKind::Openlibrary => {
            Box::new(OpenLibraryBackend::new(name, client, &descriptor.base_url))
        }
        BackendKind::Reshare => Box::new(ReshareBackend::new(name, client, &descriptor.base_url)),
    }
}

/// Prefixes `https://` when `base` carries no scheme, and drops a trailing `/`.
pub(crate) fn with_scheme(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.contains("://") {
        base.to_string()
    } else {
        format!("https://{base}")
    }
}

/// Sends a GET and returns the body of a success response.
pub(crate) async fn fetch_text(client: &Client, url: &str) -> Result<String, CatalogError> {
    debug!(url, "catalog request");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CatalogError::from_transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::http_status(url, status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| CatalogError::from_transport(url, e))
}

/// Sends a GET and parses the body as JSON.
pub(crate) async fn fetch_json(client: &Client, url: &str) -> Result<Value, CatalogError> {
    let body = fetch_text(client, url).await?;
    serde_json::from_str(&body)
        .map_err(|e| CatalogError::unexpected_response(url, format!("invalid JSON: {e}")))
}
