//! SRU `searchRetrieve` backend, plain and Alma institution-scoped.

use std::sync::LazyLock;

use async_trait::async_trait;
use quick_xml::de::from_str as xml_from_str;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::identifier::Identifier;
use crate::record::{MarcRecord, MarcxmlRecord, ParsedRecord, strip_marcxml_ns};

use super::{BackendKind, CatalogBackend, CatalogError, fetch_text, with_scheme};

/// Fixed request parameters; only the query clause varies.
const SEARCH_RETRIEVE_PARAMS: &str =
    "operation=searchRetrieve&version=1.2&maximumRecords=1&recordSchema=marcxml";

pub(crate) const DEFAULT_SRU_INDEX: &str = "bath.isbn";
pub(crate) const DEFAULT_ALMA_INDEX: &str = "alma.isbn";

#[allow(clippy::expect_used)]
static RECORD_DATA_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:\w+:)?recordData\b[^>]*>").expect("recordData regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static RECORD_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<((?:\w+:)?record)[\s>]").expect("record regex is valid") // Static pattern, safe to panic
});

#[derive(Debug, Deserialize)]
struct SearchRetrieveResponse {
    #[serde(rename = "numberOfRecords", default)]
    number_of_records: Option<String>,
    #[serde(default)]
    records: Option<SruRecords>,
}

#[derive(Debug, Deserialize)]
struct SruRecords {
    #[serde(default)]
    record: Vec<SruRecord>,
}

#[derive(Debug, Deserialize)]
struct SruRecord {
    #[serde(rename = "recordData", default)]
    record_data: Option<SruRecordData>,
}

#[derive(Debug, Deserialize)]
struct SruRecordData {
    #[serde(default)]
    record: Option<MarcxmlRecord>,
}

/// SRU catalog.
#[derive(Debug, Clone)]
pub struct SruBackend {
    name: String,
    kind: BackendKind,
    client: Client,
    endpoint: String,
    index: String,
}

impl SruBackend {
    /// Creates a plain SRU backend querying `index` at `base_url`.
    #[must_use]
    pub fn new(name: &str, client: Client, base_url: &str, index: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: BackendKind::Sru,
            client,
            endpoint: base_url.trim().to_string(),
            index: index.to_string(),
        }
    }

    /// Creates an Alma SRU backend for `inst_code` hosted at `base_url`.
    #[must_use]
    pub fn alma(name: &str, client: Client, base_url: &str, inst_code: &str, index: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: BackendKind::Alma,
            client,
            endpoint: format!("{}/view/sru/{inst_code}", with_scheme(base_url)),
            index: index.to_string(),
        }
    }

    /// Request URL for `identifier`.
    #[must_use]
    pub fn query_url(&self, identifier: &Identifier) -> String {
        format!(
            "{}?{SEARCH_RETRIEVE_PARAMS}&query={}={}",
            self.endpoint,
            self.index,
            urlencoding::encode(&identifier.value)
        )
    }
}

#[async_trait]
impl CatalogBackend for SruBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    #[tracing::instrument(skip(self), fields(catalog = %self.name, identifier = %identifier))]
    async fn query(&self, identifier: &Identifier) -> Result<Option<ParsedRecord>, CatalogError> {
        let url = self.query_url(identifier);
        let body = fetch_text(&self.client, &url).await?;
        parse_search_retrieve(&url, &body)
    }
}

/// Reads a `searchRetrieveResponse`.
///
/// A record element is a match; `numberOfRecords` of zero is a clean no-match;
/// anything else (diagnostics, HTML error pages) is an error.
pub(crate) fn parse_search_retrieve(
    url: &str,
    body: &str,
) -> Result<Option<ParsedRecord>, CatalogError> {
    let cleaned = strip_marcxml_ns(body);
    let response: SearchRetrieveResponse = xml_from_str(&cleaned)
        .map_err(|e| CatalogError::unexpected_response(url, format!("invalid SRU XML: {e}")))?;

    let has_record = response
        .records
        .and_then(|records| records.record.into_iter().next())
        .and_then(|record| record.record_data)
        .and_then(|data| data.record)
        .is_some_and(|record| !record.is_empty());

    if has_record {
        debug!(url, "SRU record found");
        let raw = first_record_text(body).ok_or_else(|| {
            CatalogError::unexpected_response(url, "record element has no closing tag")
        })?;
        return MarcRecord::from_marcxml(raw)
            .map(|record| Some(ParsedRecord::Marc(record)))
            .map_err(|e| CatalogError::malformed_record(url, e));
    }

    match response.number_of_records.as_deref().map(str::trim) {
        Some("0") => {
            info!(url, "no records in catalog");
            Ok(None)
        }
        Some(count) => Err(CatalogError::unexpected_response(
            url,
            format!("numberOfRecords is {count} but no record element was returned"),
        )),
        None => Err(CatalogError::unexpected_response(
            url,
            "response has no numberOfRecords",
        )),
    }
}

/// Slices the first `<record>` element inside `<recordData>` out of the
/// response, byte for byte.
fn first_record_text(body: &str) -> Option<&str> {
    let data = RECORD_DATA_OPEN.find(body)?;
    let open = RECORD_OPEN.captures(&body[data.end()..])?;
    let element = open.get(0)?;
    let start = data.end() + element.start();
    let close = format!("</{}>", &open[1]);
    let end = start + body[start..].find(&close)? + close.len();
    Some(&body[start..end])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fields::Classifier;
    use crate::record::BibliographicRecord;

    const URL: &str = "http://sru.test/LCDB";

    #[test]
    fn test_query_url_is_byte_exact() {
        let client = Client::new();
        let backend = SruBackend::new("loc", client, "http://lx2.loc.gov:210/LCDB", "bath.isbn");
        let url = backend.query_url(&Identifier::isbn("9780140449136").unwrap());
        assert_eq!(
            url,
            "http://lx2.loc.gov:210/LCDB?operation=searchRetrieve&version=1.2&maximumRecords=1&recordSchema=marcxml&query=bath.isbn=9780140449136"
        );
    }

    #[test]
    fn test_alma_url_templates_institution() {
        let client = Client::new();
        let backend = SruBackend::alma(
            "yale",
            client,
            "yale.alma.exlibrisgroup.com",
            "01YALE_INST",
            DEFAULT_ALMA_INDEX,
        );
        let url = backend.query_url(&Identifier::isbn("0140449132").unwrap());
        assert_eq!(
            url,
            "https://yale.alma.exlibrisgroup.com/view/sru/01YALE_INST?operation=searchRetrieve&version=1.2&maximumRecords=1&recordSchema=marcxml&query=alma.isbn=0140449132"
        );
        assert_eq!(backend.kind(), BackendKind::Alma);
    }

    #[test]
    fn test_parse_prefixed_envelope_with_record() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<zs:searchRetrieveResponse xmlns:zs="http://docs.oasis-open.org/ns/search-ws/sruResponse">
  <zs:version>1.2</zs:version>
  <zs:numberOfRecords>1</zs:numberOfRecords>
  <zs:records>
    <zs:record>
      <zs:recordSchema>marcxml</zs:recordSchema>
      <zs:recordPacking>xml</zs:recordPacking>
      <zs:recordData>
        <record xmlns="http://www.loc.gov/MARC21/slim">
          <leader>01142cam  2200301 a 4500</leader>
          <controlfield tag="008">950516s1996    nyu           001 0 eng  </controlfield>
          <datafield tag="050" ind1="0" ind2="0">
            <subfield code="a">PA4025.A5</subfield>
            <subfield code="b">F33 1996</subfield>
          </datafield>
        </record>
      </zs:recordData>
      <zs:recordPosition>1</zs:recordPosition>
    </zs:record>
  </zs:records>
</zs:searchRetrieveResponse>"#;
        let parsed = parse_search_retrieve(URL, body).unwrap().unwrap();
        let accessors = parsed.accessors();
        assert_eq!(accessors.lcc().as_deref(), Some("PA4025.A5 F33 1996"));
        assert_eq!(accessors.language().as_deref(), Some("eng"));
        let document = accessors.classifier(Classifier::Record).unwrap();
        assert!(document.contains("http://www.loc.gov/MARC21/slim"));
        assert!(document.contains("PA4025.A5"));
    }

    #[test]
    fn test_stored_record_is_catalog_text() {
        let record = r#"<marc:record xmlns:marc="http://www.loc.gov/MARC21/slim">
          <marc:controlfield tag="008">950516s1996    nyu           001 0 eng  </marc:controlfield>
          <marc:datafield tag="082" ind1="0" ind2="0">
            <marc:subfield code="a"> 883/.01 </marc:subfield>
          </marc:datafield>
        </marc:record>"#;
        let body = format!(
            r#"<zs:searchRetrieveResponse xmlns:zs="http://docs.oasis-open.org/ns/search-ws/sruResponse">
  <zs:numberOfRecords>1</zs:numberOfRecords>
  <zs:records><zs:record><zs:recordData>{record}</zs:recordData></zs:record></zs:records>
</zs:searchRetrieveResponse>"#
        );
        let parsed = parse_search_retrieve(URL, &body).unwrap().unwrap();
        let document = parsed.accessors().document().unwrap();
        assert_eq!(document, record);
        let fixed = "950516s1996    nyu           001 0 eng  ";
        assert_eq!(fixed.len(), 40);
        assert!(document.contains(&format!(">{fixed}<")));
        assert_eq!(parsed.accessors().ddc().as_deref(), Some("883/.01"));
    }

    #[test]
    fn test_first_record_text_skips_record_data_wrapper() {
        let body = "<recordData><record><controlfield tag=\"001\">1</controlfield></record></recordData>";
        assert_eq!(
            first_record_text(body),
            Some("<record><controlfield tag=\"001\">1</controlfield></record>")
        );
        assert_eq!(first_record_text("<recordData><record>"), None);
    }

    #[test]
    fn test_parse_zero_records_is_clean_no_match() {
        let body = r#"<searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
            <version>1.1</version><numberOfRecords>0</numberOfRecords>
        </searchRetrieveResponse>"#;
        assert!(parse_search_retrieve(URL, body).unwrap().is_none());
    }

    #[test]
    fn test_parse_diagnostics_is_error() {
        let body = r#"<srw:searchRetrieveResponse xmlns:srw="http://www.loc.gov/zing/srw/">
            <srw:diagnostics><diag:diagnostic xmlns:diag="http://www.loc.gov/zing/srw/diagnostic/">
            <diag:message>Permanent system error</diag:message></diag:diagnostic></srw:diagnostics>
        </srw:searchRetrieveResponse>"#;
        let err = parse_search_retrieve(URL, body).unwrap_err();
        assert!(matches!(err, CatalogError::UnexpectedResponse { .. }));
    }

    #[test]
    fn test_parse_non_xml_is_error() {
        assert!(parse_search_retrieve(URL, "Service Unavailable").is_err());
    }
}
