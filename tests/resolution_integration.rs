//! End-to-end resolution against mock catalogs and a mock Open Library.

use std::time::Duration;

use libcat_core::catalog::SruBackend;
use libcat_core::{
    CatalogBackend, CatalogResolver, Classifier, Identifier, OpenLibraryEditions, RecordSchema,
    ResolutionStatus, ResolveOptions, ResolveRequest, RetryPolicy, build_catalog_http_client,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fixtures;
use support::socket_guard::start_mock_server_or_skip;

const ISBN: &str = "9780140449136";

fn options(classifiers: &[Classifier], languages: &[&str], max_alts: usize) -> ResolveOptions {
    ResolveOptions {
        classifiers: classifiers.to_vec(),
        languages: languages.iter().map(|l| (*l).to_string()).collect(),
        alt_isbns: true,
        max_alts,
        wait: Duration::ZERO,
        policy: RetryPolicy::new(0, Duration::ZERO),
    }
}

fn resolver(server: &MockServer, catalogs: &[&str], options: ResolveOptions) -> CatalogResolver {
    let client = build_catalog_http_client(Duration::from_secs(5)).unwrap();
    let backends: Vec<Box<dyn CatalogBackend>> = catalogs
        .iter()
        .map(|name| {
            Box::new(SruBackend::new(
                name,
                client.clone(),
                &format!("{}/{name}", server.uri()),
                "bath.isbn",
            )) as Box<dyn CatalogBackend>
        })
        .collect();
    let editions = OpenLibraryEditions::with_base_url(client, &server.uri(), options.policy);
    CatalogResolver::new(backends, Box::new(editions), options)
}

async fn mount_sru(server: &MockServer, name: &str, body: String, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_values_merge_across_catalogs_until_complete() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    mount_sru(&mock_server, "a", fixtures::sru_hit(&fixtures::lcc_only_marcxml("PR6037")), 1).await;
    mount_sru(&mock_server, "b", fixtures::sru_hit(&fixtures::odyssey_marcxml("eng")), 1).await;
    mount_sru(&mock_server, "c", fixtures::sru_miss(), 0).await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"docs": []})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = resolver(
        &mock_server,
        &["a", "b", "c"],
        options(&[Classifier::Record, Classifier::Lcc, Classifier::Ddc], &[], 50),
    );
    let resolution = resolver
        .resolve(ResolveRequest::new(Identifier::isbn(ISBN).unwrap()))
        .await;

    assert_eq!(resolution.status, ResolutionStatus::Complete);
    assert_eq!(resolution.fields.get(Classifier::Lcc), Some("PR6037"));
    assert_eq!(resolution.fields.get(Classifier::Ddc), Some("883/.01"));
    // a matched first, so its document is the stored record
    let record = resolution.fields.get(Classifier::Record).unwrap();
    assert!(record.contains("PR6037"));
    assert!(!record.contains("Epic poetry"));
    assert_eq!(resolution.supplementary.catalog.as_deref(), Some("b"));
    assert_eq!(resolution.supplementary.record_type, Some(RecordSchema::Marcxml));
}

#[tokio::test]
async fn test_language_filter_skips_foreign_record() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    mount_sru(&mock_server, "a", fixtures::sru_hit(&fixtures::odyssey_marcxml("fre")), 1).await;
    mount_sru(&mock_server, "b", fixtures::sru_hit(&fixtures::odyssey_marcxml("eng")), 1).await;

    let resolver = resolver(
        &mock_server,
        &["a", "b"],
        options(&[Classifier::Lcc], &["eng"], 50),
    );
    let resolution = resolver
        .resolve(ResolveRequest::new(Identifier::isbn(ISBN).unwrap()))
        .await;

    assert_eq!(resolution.status, ResolutionStatus::Complete);
    assert_eq!(resolution.supplementary.catalog.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_work_level_lcc_completes_without_edition_pages() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    mount_sru(&mock_server, "a", fixtures::sru_miss(), 1).await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("q", format!("isbn={ISBN}")))
        .and(query_param("fields", "isbn,lcc,ddc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numFound": 1,
            "docs": [{
                "isbn": [ISBN, "0140449132"],
                "lcc": ["PA-4025.00000000.A5 F33 1996", "PA-4025.00000000.A5", "PR-6037"]
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/isbn/{ISBN}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "works": [{"key": "/works/OL61982W"}]
        })))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = resolver(&mock_server, &["a"], options(&[Classifier::Lcc], &["eng"], 50));
    let resolution = resolver
        .resolve(ResolveRequest::new(Identifier::isbn(ISBN).unwrap()))
        .await;

    assert_eq!(resolution.status, ResolutionStatus::Complete);
    assert_eq!(resolution.fields.get(Classifier::Lcc), Some("PA4025.A5"));
}

fn edition_page(range: std::ops::Range<u32>) -> Value {
    let entries: Vec<Value> = range
        .map(|n| {
            let language = if n % 2 == 0 { "eng" } else { "fre" };
            fixtures::edition_entry(&format!("979{n:010}"), language)
        })
        .collect();
    json!({"links": {}, "size": 250, "entries": entries})
}

async fn mount_page(server: &MockServer, offset: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/works/OL61982W/editions.json"))
        .and(query_param("limit", "100"))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_filtered_edition_pass_pages_until_empty_and_caps_alternates() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    // primary plus two alternates
    mount_sru(&mock_server, "a", fixtures::sru_miss(), 3).await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{"isbn": [ISBN, "0140449132"]}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/isbn/{ISBN}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "/books/OL1M",
            "works": [{"key": "/works/OL61982W"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, 0, edition_page(0..100)).await;
    mount_page(&mock_server, 100, edition_page(100..200)).await;
    mount_page(&mock_server, 200, edition_page(200..250)).await;
    mount_page(&mock_server, 300, edition_page(0..0)).await;

    let resolver = resolver(&mock_server, &["a"], options(&[Classifier::Lcc], &["eng"], 2));
    let resolution = resolver
        .resolve(ResolveRequest::new(Identifier::isbn(ISBN).unwrap()))
        .await;

    assert_eq!(resolution.status, ResolutionStatus::Incomplete);
    assert_eq!(resolution.fields.get(Classifier::Lcc), None);

    let requests = mock_server.received_requests().await.unwrap();
    let alternates: Vec<String> = requests
        .iter()
        .filter(|request| request.url.path() == "/a")
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "query")
                .map(|(_, value)| value.into_owned())
        })
        .collect();
    assert_eq!(
        alternates,
        vec![
            format!("bath.isbn={ISBN}"),
            "bath.isbn=9790000000000".to_string(),
            "bath.isbn=9790000000002".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_catalog_failure_falls_through_to_next_catalog() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_sru(&mock_server, "b", fixtures::sru_hit(&fixtures::lcc_only_marcxml("PR6037")), 1).await;

    let mut opts = options(&[Classifier::Lcc], &[], 50);
    opts.policy = RetryPolicy::new(1, Duration::ZERO);
    let resolver = resolver(&mock_server, &["a", "b"], opts);
    let resolution = resolver
        .resolve(ResolveRequest::new(Identifier::isbn(ISBN).unwrap()))
        .await;

    assert_eq!(resolution.status, ResolutionStatus::Complete);
    assert_eq!(resolution.supplementary.catalog.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_allowed_edition_lcc_fills_gap_left_by_work_hit() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    mount_sru(&mock_server, "a", fixtures::sru_miss(), 1).await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{"isbn": [ISBN, "0140449132"]}]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/isbn/{ISBN}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "works": [{"key": "/works/OL61982W"}]
        })))
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        0,
        json!({"entries": [
            {"isbn_10": ["0140449132"], "lc_classifications": ["PA4025.A5 F33"],
             "languages": [{"key": "/languages/eng"}]},
            {"isbn_10": ["2070408507"], "lc_classifications": ["PA4026"],
             "languages": [{"key": "/languages/fre"}]}
        ]}),
    )
    .await;
    mount_page(&mock_server, 100, json!({"entries": []})).await;

    let resolver = resolver(&mock_server, &["a"], options(&[Classifier::Lcc], &["eng"], 5));
    let resolution = resolver
        .resolve(ResolveRequest::new(Identifier::isbn(ISBN).unwrap()))
        .await;

    assert_eq!(resolution.status, ResolutionStatus::Complete);
    assert_eq!(resolution.fields.get(Classifier::Lcc), Some("PA4025.A5"));
}
