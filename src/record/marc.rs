//! MARCXML records and their classifier accessors.
//!
//! Accepts the forms catalogs actually send:
//! - `<record xmlns="http://www.loc.gov/MARC21/slim">` (default namespace)
//! - `<marc:record xmlns:marc="...">` (prefixed namespace)
//! - `<collection><record>...</record></collection>` (first record is used)
//!
//! Field selection follows MARC 21: 050 for LCC, 082 for DDC, 650 for topical
//! subject headings, 020 for ISBN and 008/35-37 for the language code.

use std::sync::LazyLock;

use quick_xml::de::from_str as xml_from_str;
use regex::Regex;
use serde::Deserialize;

use super::{BibliographicRecord, RecordError, RecordSchema, tidy};

/// Subfields that make up one subject heading string.
const LCSH_SUBFIELDS: [char; 5] = ['a', 'v', 'x', 'y', 'z'];

#[allow(clippy::expect_used)]
static XMLNS_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+xmlns(?::\w+)?="[^"]*""#).expect("xmlns regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ELEMENT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)(\w+):").expect("element prefix regex is valid") // Static pattern, safe to panic
});

/// Serde shape of a MARCXML `<record>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MarcxmlRecord {
    #[serde(default)]
    pub controlfield: Vec<MarcxmlControlField>,
    #[serde(default)]
    pub datafield: Vec<MarcxmlDataField>,
}

impl MarcxmlRecord {
    /// Returns true when the element carried no MARC fields at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.controlfield.is_empty() && self.datafield.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MarcxmlControlField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "$value", default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MarcxmlDataField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "@ind1", default)]
    pub ind1: String,
    #[serde(rename = "@ind2", default)]
    pub ind2: String,
    #[serde(default)]
    pub subfield: Vec<MarcxmlSubfield>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MarcxmlSubfield {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "$value", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct MarcxmlCollection {
    #[serde(default, rename = "record")]
    records: Vec<MarcxmlRecord>,
}

/// Strips namespace declarations and element prefixes so one set of serde
/// types reads every namespace form.
pub(crate) fn strip_marcxml_ns(xml: &str) -> String {
    let stripped = XMLNS_DECLARATION.replace_all(xml, "");
    ELEMENT_PREFIX.replace_all(&stripped, "<$1").to_string()
}

/// One MARC data field with its subfields in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarcDataField {
    /// Three-character field tag, e.g. `"650"`.
    pub tag: String,
    /// First indicator.
    pub ind1: char,
    /// Second indicator.
    pub ind2: char,
    /// `(code, value)` pairs.
    pub subfields: Vec<(char, String)>,
}

impl MarcDataField {
    /// Returns the first value of subfield `code`.
    #[must_use]
    pub fn first(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, value)| value.as_str())
    }
}

/// A parsed MARCXML bibliographic record.
#[derive(Debug, Clone)]
pub struct MarcRecord {
    document: String,
    control_fields: Vec<(String, String)>,
    data_fields: Vec<MarcDataField>,
}

impl MarcRecord {
    /// Parses a MARCXML record or collection document.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] if the XML cannot be read or holds no
    /// MARC fields.
    pub fn from_marcxml(xml: &str) -> Result<Self, RecordError> {
        let cleaned = strip_marcxml_ns(xml);
        let direct: MarcxmlRecord = xml_from_str(&cleaned)
            .map_err(|e| RecordError::malformed(RecordSchema::Marcxml, e.to_string()))?;

        let parsed = if direct.is_empty() {
            let collection: MarcxmlCollection = xml_from_str(&cleaned)
                .map_err(|e| RecordError::malformed(RecordSchema::Marcxml, e.to_string()))?;
            collection
                .records
                .into_iter()
                .find(|record| !record.is_empty())
                .ok_or_else(|| {
                    RecordError::malformed(RecordSchema::Marcxml, "document holds no MARC fields")
                })?
        } else {
            direct
        };

        Ok(Self::from_parts(xml.to_string(), parsed))
    }

    fn from_parts(document: String, record: MarcxmlRecord) -> Self {
        let control_fields = record
            .controlfield
            .into_iter()
            .map(|cf| (cf.tag, cf.value))
            .collect();
        let data_fields = record
            .datafield
            .into_iter()
            .map(|df| MarcDataField {
                tag: df.tag,
                ind1: df.ind1.chars().next().unwrap_or(' '),
                ind2: df.ind2.chars().next().unwrap_or(' '),
                subfields: df
                    .subfield
                    .into_iter()
                    .filter_map(|sf| sf.code.chars().next().map(|code| (code, sf.value)))
                    .collect(),
            })
            .collect();

        Self {
            document,
            control_fields,
            data_fields,
        }
    }

    /// Returns the value of control field `tag`.
    #[must_use]
    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over data fields with the given tag.
    pub fn fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a MarcDataField> + 'a {
        self.data_fields.iter().filter(move |field| field.tag == tag)
    }

    /// Title statement (245 `$a` `$b`).
    #[must_use]
    pub fn title(&self) -> Option<String> {
        let field = self.fields("245").next()?;
        let parts: Vec<&str> = field
            .subfields
            .iter()
            .filter(|(code, _)| matches!(code, 'a' | 'b'))
            .map(|(_, value)| value.trim())
            .collect();
        let title = tidy(&parts.join(" "));
        (!title.is_empty()).then_some(title)
    }

    /// Main entry personal name (100 `$a`).
    #[must_use]
    pub fn author(&self) -> Option<String> {
        self.fields("100")
            .find_map(|field| field.first('a'))
            .map(tidy)
            .filter(|name| !name.is_empty())
    }
}

impl BibliographicRecord for MarcRecord {
    fn document(&self) -> Option<String> {
        Some(self.document.clone())
    }

    fn lcc(&self) -> Option<String> {
        let field = self.fields("050").find(|field| field.first('a').is_some())?;
        let class_number = field.first('a').unwrap_or_default().trim();
        let lcc = match field.first('b') {
            Some(item) => format!("{class_number} {}", item.trim()),
            None => class_number.to_string(),
        };
        let lcc = lcc.trim().to_string();
        (!lcc.is_empty()).then_some(lcc)
    }

    fn ddc(&self) -> Option<String> {
        self.fields("082")
            .find_map(|field| field.first('a'))
            .map(|ddc| ddc.trim().to_string())
            .filter(|ddc| !ddc.is_empty())
    }

    fn lcsh(&self) -> Option<String> {
        let headings: Vec<String> = self
            .fields("650")
            .map(|field| {
                let parts: Vec<&str> = field
                    .subfields
                    .iter()
                    .filter(|(code, _)| LCSH_SUBFIELDS.contains(code))
                    .map(|(_, value)| value.trim())
                    .collect();
                tidy(&parts.join("--"))
            })
            .filter(|heading| !heading.is_empty())
            .collect();
        (!headings.is_empty()).then(|| headings.join(" | "))
    }

    fn isbns(&self) -> Vec<String> {
        self.fields("020")
            .flat_map(|field| field.subfields.iter())
            .filter(|(code, _)| *code == 'a')
            .map(|(_, value)| value.trim().to_string())
            .filter(|isbn| !isbn.is_empty())
            .collect()
    }

    fn language(&self) -> Option<String> {
        let fixed = self.control_field("008")?;
        let code: String = fixed.chars().skip(35).take(3).collect();
        (code.chars().count() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
            .then_some(code)
    }
}
