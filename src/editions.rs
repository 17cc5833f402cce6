//! Alternate-edition discovery through Open Library.
//!
//! Discovery has two stages, run separately so a caller can stop after the
//! first:
//! 1. [`EditionLookup::search_work`]: a work-level search by ISBN. Its first
//!    hit lists every ISBN of the work plus the LCC and DDC values Open
//!    Library holds for it.
//! 2. [`EditionLookup::filtered_editions`]: the work's full edition list,
//!    paged 100 entries at a time until a page comes back empty, keeping the
//!    ISBNs, LCC and DDC of editions in an allowed language.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, fetch_json, with_scheme};
use crate::identifier::normalize_isbn;
use crate::record::{BibliographicRecord, OpenLibraryRecord};
use crate::retry::RetryPolicy;

/// Default Open Library host.
pub const DEFAULT_OPENLIBRARY_URL: &str = "https://openlibrary.org";

/// Entries requested per edition page.
pub const EDITION_PAGE_SIZE: usize = 100;

/// What one discovery stage found for a primary ISBN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlternateEditions {
    /// Sibling ISBNs in discovery order, without the primary or duplicates.
    pub isbns: Vec<String>,
    /// LCC values, as Open Library prints them.
    pub lccs: Vec<String>,
    /// DDC values, as Open Library prints them.
    pub ddcs: Vec<String>,
}

/// Source of alternate editions for an ISBN. Failures yield an empty result.
#[async_trait]
pub trait EditionLookup: Send + Sync {
    /// Work-level search for `isbn`.
    async fn search_work(&self, isbn: &str) -> AlternateEditions;

    /// Editions of `isbn`'s work whose language is in `languages`.
    async fn filtered_editions(&self, isbn: &str, languages: &[String]) -> AlternateEditions;

    /// Runs both stages: the language-filtered ISBNs replace the work-level
    /// ones when `languages` is non-empty, and work-level LCC/DDC win over
    /// edition values.
    async fn expand(&self, isbn: &str, languages: &[String]) -> AlternateEditions {
        let work = self.search_work(isbn).await;
        if languages.is_empty() || work.isbns.is_empty() {
            return work;
        }
        let filtered = self.filtered_editions(isbn, languages).await;
        AlternateEditions {
            isbns: filtered.isbns,
            lccs: if work.lccs.is_empty() { filtered.lccs } else { work.lccs },
            ddcs: if work.ddcs.is_empty() { filtered.ddcs } else { work.ddcs },
        }
    }
}

/// Open Library implementation of [`EditionLookup`].
#[derive(Debug, Clone)]
pub struct OpenLibraryEditions {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl OpenLibraryEditions {
    /// Creates an expander against the public Open Library host.
    #[must_use]
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self::with_base_url(client, DEFAULT_OPENLIBRARY_URL, policy)
    }

    /// Creates an expander against a custom host, for tests.
    #[must_use]
    pub fn with_base_url(client: Client, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url: with_scheme(base_url),
            policy,
        }
    }

    async fn fetch_work_hit(&self, isbn: &str) -> Result<AlternateEditions, CatalogError> {
        let url = format!(
            "{}/search.json?q=isbn={}&fields=isbn,lcc,ddc",
            self.base_url,
            urlencoding::encode(isbn)
        );
        let body = fetch_json(&self.client, &url).await?;
        let docs = body
            .get("docs")
            .and_then(Value::as_array)
            .ok_or_else(|| CatalogError::unexpected_response(&url, "missing docs"))?;

        let Some(first) = docs.first() else {
            return Ok(AlternateEditions::default());
        };
        Ok(AlternateEditions {
            isbns: string_list(first, "isbn"),
            lccs: string_list(first, "lcc"),
            ddcs: string_list(first, "ddc"),
        })
    }

    async fn work_key(&self, isbn: &str) -> Result<String, CatalogError> {
        let url = format!("{}/isbn/{}.json", self.base_url, urlencoding::encode(isbn));
        let body = fetch_json(&self.client, &url).await?;
        body.get("works")
            .and_then(Value::as_array)
            .and_then(|works| works.first())
            .and_then(|work| work.get("key"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CatalogError::unexpected_response(&url, "edition has no works[0].key"))
    }

    async fn edition_page(&self, work: &str, offset: usize) -> Result<Vec<Value>, CatalogError> {
        let url = format!(
            "{}{work}/editions.json?limit={EDITION_PAGE_SIZE}&offset={offset}",
            self.base_url
        );
        let body = fetch_json(&self.client, &url).await?;
        body.get("entries")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| CatalogError::unexpected_response(&url, "missing entries"))
    }
}

#[async_trait]
impl EditionLookup for OpenLibraryEditions {
    #[tracing::instrument(skip(self), fields(isbn = %isbn))]
    async fn search_work(&self, isbn: &str) -> AlternateEditions {
        let Some(hit) = self
            .policy
            .run("openlibrary search", || self.fetch_work_hit(isbn))
            .await
        else {
            return AlternateEditions::default();
        };

        let editions = AlternateEditions {
            isbns: dedupe_alternates(isbn, hit.isbns),
            ..hit
        };
        info!(
            alternates = editions.isbns.len(),
            lccs = editions.lccs.len(),
            ddcs = editions.ddcs.len(),
            "work editions fetched"
        );
        editions
    }

    #[tracing::instrument(skip(self, languages), fields(isbn = %isbn))]
    async fn filtered_editions(&self, isbn: &str, languages: &[String]) -> AlternateEditions {
        let Some(work) = self
            .policy
            .run("openlibrary edition", || self.work_key(isbn))
            .await
        else {
            warn!(isbn, "work lookup failed; no language-filtered alternates");
            return AlternateEditions::default();
        };

        let mut filtered = AlternateEditions::default();
        let mut offset = 0;
        loop {
            let Some(entries) = self
                .policy
                .run("openlibrary editions page", || self.edition_page(&work, offset))
                .await
            else {
                warn!(work = %work, offset, "edition page failed; ending pass");
                break;
            };
            if entries.is_empty() {
                break;
            }
            debug!(work = %work, offset, entries = entries.len(), "edition page");

            for entry in entries {
                let Ok(edition) = OpenLibraryRecord::from_value(entry) else {
                    continue;
                };
                let allowed = edition
                    .language()
                    .is_some_and(|code| languages.iter().any(|l| l.eq_ignore_ascii_case(&code)));
                if !allowed {
                    continue;
                }
                filtered.isbns.extend(edition.isbns());
                filtered.lccs.extend(edition.lcc());
                filtered.ddcs.extend(edition.ddc());
            }
            offset += EDITION_PAGE_SIZE;
        }

        filtered.isbns = dedupe_alternates(isbn, filtered.isbns);
        info!(
            alternates = filtered.isbns.len(),
            lccs = filtered.lccs.len(),
            ddcs = filtered.ddcs.len(),
            "language-filtered editions fetched"
        );
        filtered
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
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

/// Normalizes, removes duplicates and the primary ISBN, keeping first-seen order.
fn dedupe_alternates(primary: &str, candidates: Vec<String>) -> Vec<String> {
    let primary = normalize_isbn(primary).unwrap_or_else(|_| primary.to_string());
    let mut seen: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Ok(isbn) = normalize_isbn(&candidate) else {
            debug!(candidate = %candidate, "skipping malformed alternate ISBN");
            continue;
        };
        if isbn != primary && !seen.contains(&isbn) {
            seen.push(isbn);
        }
    }
    seen
}

/// Picks the most frequent value; ties go to the first seen.
fn most_common(values: impl IntoIterator<Item = String>) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        if value.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some(entry) => entry.1 += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().is_none_or(|(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Most common LCC class, cut at the first space and stripped of Open
/// Library's zero padding.
///
/// ```
/// use libcat_core::editions::most_common_lcc;
///
/// let lccs = vec!["PR-6037.00000000.O9 G7".to_string(), "PR-6037.00000000.O9".to_string()];
/// assert_eq!(most_common_lcc(&lccs).as_deref(), Some("PR6037.O9"));
/// ```
#[must_use]
pub fn most_common_lcc(values: &[String]) -> Option<String> {
    let heads = values
        .iter()
        .map(|value| value.trim().split(' ').next().unwrap_or_default().to_string());
    most_common(heads).map(|class| {
        class
            .replace(".00000000", "")
            .replace("-000", "")
            .replace("-00", "")
            .replace("-0", "")
            .replace('-', "")
    })
}

/// Most common DDC, compared on the first five characters.
#[must_use]
pub fn most_common_ddc(values: &[String]) -> Option<String> {
    most_common(
        values
            .iter()
            .map(|value| value.trim().chars().take(5).collect::<String>()),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_most_common_lcc_counts_class_heads() {
        let lccs = strings(&[
            "PA-4025.00000000.A5",
            "PR-6037.00000000.O9 G7",
            "PR-6037.00000000.O9",
        ]);
        assert_eq!(most_common_lcc(&lccs).as_deref(), Some("PR6037.O9"));
    }

    #[test]
    fn test_most_common_tie_goes_to_first_seen() {
        let lccs = strings(&["QA76", "PR6037", "PR6037", "QA76"]);
        assert_eq!(most_common_lcc(&lccs).as_deref(), Some("QA76"));
        let ddcs = strings(&["823.912", "500.1", "823.91209"]);
        assert_eq!(most_common_ddc(&ddcs).as_deref(), Some("823.9"));
    }

    #[test]
    fn test_most_common_ddc_uses_first_five_chars() {
        let ddcs = strings(&["883.01", "883.0109", "823"]);
        assert_eq!(most_common_ddc(&ddcs).as_deref(), Some("883.0"));
    }

    #[test]
    fn test_most_common_of_nothing() {
        assert_eq!(most_common_lcc(&[]), None);
        assert_eq!(most_common_ddc(&strings(&[""])), None);
    }

    #[test]
    fn test_dedupe_removes_primary_duplicates_and_junk() {
        let candidates = strings(&[
            "9780140449136",
            "0140449132",
            "0140449132",
            "n/a",
            "9780141026282",
        ]);
        assert_eq!(
            dedupe_alternates("978-0-14-044913-6", candidates),
            vec!["0140449132", "9780141026282"]
        );
    }

    struct Staged {
        work: AlternateEditions,
        filtered: AlternateEditions,
    }

    #[async_trait]
    impl EditionLookup for Staged {
        async fn search_work(&self, _isbn: &str) -> AlternateEditions {
            self.work.clone()
        }

        async fn filtered_editions(&self, _isbn: &str, _languages: &[String]) -> AlternateEditions {
            self.filtered.clone()
        }
    }

    #[tokio::test]
    async fn test_expand_combines_stages() {
        let lookup = Staged {
            work: AlternateEditions {
                isbns: strings(&["0140449132", "2070408507"]),
                lccs: Vec::new(),
                ddcs: strings(&["883.01"]),
            },
            filtered: AlternateEditions {
                isbns: strings(&["0140449132"]),
                lccs: strings(&["PA4025"]),
                ddcs: strings(&["823"]),
            },
        };

        let unfiltered = lookup.expand("9780140449136", &[]).await;
        assert_eq!(unfiltered, lookup.work);

        let filtered = lookup.expand("9780140449136", &strings(&["eng"])).await;
        assert_eq!(filtered.isbns, strings(&["0140449132"]));
        assert_eq!(filtered.lccs, strings(&["PA4025"]));
        assert_eq!(filtered.ddcs, strings(&["883.01"]));
    }
}
