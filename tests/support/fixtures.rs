//! Canned catalog responses.

use serde_json::{Value, json};

/// A MARCXML record for Fagles' Odyssey in the given 008 language.
pub fn odyssey_marcxml(language: &str) -> String {
    format!(
        r#"<record xmlns="http://www.loc.gov/MARC21/slim">
  <leader>01142cam  2200301 a 4500</leader>
  <controlfield tag="001">12345</controlfield>
  <controlfield tag="008">950516s1996    nyu           001 0 {language}  </controlfield>
  <datafield tag="020" ind1=" " ind2=" ">
    <subfield code="a">9780140449136</subfield>
  </datafield>
  <datafield tag="050" ind1="0" ind2="0">
    <subfield code="a">PA4025.A5</subfield>
    <subfield code="b">F33 1996</subfield>
  </datafield>
  <datafield tag="082" ind1="0" ind2="0">
    <subfield code="a">883/.01</subfield>
  </datafield>
  <datafield tag="650" ind1=" " ind2="0">
    <subfield code="a">Epic poetry, Greek</subfield>
    <subfield code="v">Translations into English.</subfield>
  </datafield>
</record>"#
    )
}

/// A MARCXML record carrying only a 050 and an English 008.
pub fn lcc_only_marcxml(lcc: &str) -> String {
    format!(
        r#"<record xmlns="http://www.loc.gov/MARC21/slim">
  <controlfield tag="008">950516s1996    nyu           001 0 eng  </controlfield>
  <datafield tag="050" ind1="0" ind2="0">
    <subfield code="a">{lcc}</subfield>
  </datafield>
</record>"#
    )
}

/// SRU response wrapping one record.
pub fn sru_hit(record: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<zs:searchRetrieveResponse xmlns:zs="http://docs.oasis-open.org/ns/search-ws/sruResponse">
  <zs:version>1.2</zs:version>
  <zs:numberOfRecords>1</zs:numberOfRecords>
  <zs:records>
    <zs:record>
      <zs:recordSchema>marcxml</zs:recordSchema>
      <zs:recordData>{record}</zs:recordData>
      <zs:recordPosition>1</zs:recordPosition>
    </zs:record>
  </zs:records>
</zs:searchRetrieveResponse>"#
    )
}

/// SRU response reporting zero records.
pub fn sru_miss() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<zs:searchRetrieveResponse xmlns:zs="http://docs.oasis-open.org/ns/search-ws/sruResponse">
  <zs:version>1.2</zs:version>
  <zs:numberOfRecords>0</zs:numberOfRecords>
</zs:searchRetrieveResponse>"#
        .to_string()
}

/// HathiTrust full-record response with one record.
pub fn hathi_hit(record: &str) -> Value {
    json!({
        "records": {
            "000123456": {
                "recordURL": "https://catalog.hathitrust.org/Record/000123456",
                "marc-xml": record
            }
        },
        "items": []
    })
}

/// Open Library brief volumes response with one record.
pub fn openlibrary_hit() -> Value {
    json!({
        "records": {
            "/books/OL1M": {
                "recordURL": "https://openlibrary.org/books/OL1M",
                "data": {"authors": [{"name": "Homer"}]},
                "details": {
                    "details": {
                        "isbn_13": ["9780140449136"],
                        "lc_classifications": ["PA4025.A5 F33 1996"],
                        "dewey_decimal_class": ["883/.01"],
                        "languages": [{"key": "/languages/eng"}]
                    }
                }
            }
        },
        "items": []
    })
}

/// ReShare search response with one hit.
pub fn reshare_hit(record: &str) -> Value {
    json!({
        "resultCount": 1,
        "records": [{"id": "1", "fullRecord": record}],
        "status": "OK"
    })
}

/// One Open Library edition entry.
pub fn edition_entry(isbn: &str, language: &str) -> Value {
    json!({
        "key": format!("/books/{isbn}"),
        "isbn_13": [isbn],
        "languages": [{"key": format!("/languages/{language}")}]
    })
}
