//! Resolution across catalogs and alternate editions.
//!
//! # Flow
//!
//! For one identifier, every configured catalog is queried in order and the
//! values it yields are merged into a [`FieldSet`] (first writer wins). As soon
//! as every requested classifier holds a value the resolution is complete and
//! nothing else is queried.
//!
//! When the catalogs are exhausted and the identifier is an ISBN, alternate
//! editions are fetched once. The most common LCC and DDC of the work are
//! merged first. With a language allow-list the work's editions are then
//! filtered by language, again merging their most common LCC and DDC. If
//! classifiers are still unset, each alternate ISBN (up to `max_alts`) is run
//! through the same catalog loop, pausing `wait` before each, until one
//! completes the set.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog::{CatalogBackend, CatalogError, build_backend, build_catalog_http_client};
use crate::config::AppConfig;
use crate::editions::{
    AlternateEditions, EditionLookup, OpenLibraryEditions, most_common_ddc, most_common_lcc,
};
use crate::fields::{Classifier, FieldMap, FieldSet, Resolution, ResolutionStatus, Supplementary};
use crate::identifier::{Identifier, IdentifierKind};
use crate::retry::RetryPolicy;

/// Per-run resolution settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Classifiers to resolve, in report order.
    pub classifiers: Vec<Classifier>,
    /// MARC language allow-list; empty accepts all.
    pub languages: Vec<String>,
    /// Whether ISBNs may be expanded into alternate editions.
    pub alt_isbns: bool,
    /// Hard cap on alternates attempted.
    pub max_alts: usize,
    /// Pause before each alternate attempt.
    pub wait: Duration,
    /// Retry policy for every catalog request.
    pub policy: RetryPolicy,
}

impl ResolveOptions {
    /// Builds options from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            classifiers: config.classifiers.clone(),
            languages: config.languages.clone(),
            alt_isbns: config.alt_isbns,
            max_alts: config.max_alts,
            wait: config.wait_duration(),
            policy: config.retry_policy(),
        }
    }
}

/// Input for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Identifier to search catalogs with; `None` only reports prefilled data.
    pub identifier: Option<Identifier>,
    /// Values known beforehand, keyed by classifier or column name.
    pub prefilled: BTreeMap<String, String>,
}

impl ResolveRequest {
    /// Creates a request for one identifier.
    #[must_use]
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier: Some(identifier),
            prefilled: BTreeMap::new(),
        }
    }

    /// Adds a value known before any catalog is queried.
    #[must_use]
    pub fn with_prefilled(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.prefilled.insert(key.into(), value.into());
        self
    }
}

/// Working state of one resolution, threaded through every attempt.
#[derive(Debug)]
struct Accumulator {
    fields: FieldSet,
    supplementary: Supplementary,
}

impl Accumulator {
    fn is_complete(&self) -> bool {
        self.fields.is_complete()
    }

    fn into_resolution(self) -> Resolution {
        let status = if self.fields.is_complete() {
            ResolutionStatus::Complete
        } else {
            ResolutionStatus::Incomplete
        };
        Resolution {
            supplementary: self.supplementary,
            fields: self.fields,
            status,
        }
    }
}

/// Drives catalogs and alternate editions for one identifier at a time.
pub struct CatalogResolver {
    catalogs: Vec<Box<dyn CatalogBackend>>,
    editions: Box<dyn EditionLookup>,
    options: ResolveOptions,
}

impl fmt::Debug for CatalogResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogResolver")
            .field("catalogs", &self.catalog_names())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CatalogResolver {
    /// Creates a resolver over `catalogs`, tried in the given order.
    #[must_use]
    pub fn new(
        catalogs: Vec<Box<dyn CatalogBackend>>,
        editions: Box<dyn EditionLookup>,
        options: ResolveOptions,
    ) -> Self {
        Self {
            catalogs,
            editions,
            options,
        }
    }

    /// Builds every catalog in `config.order` plus the Open Library expander,
    /// sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ClientBuild`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, CatalogError> {
        let client = build_catalog_http_client(config.timeout_duration())?;
        let mut catalogs = Vec::with_capacity(config.order.len());
        for name in &config.order {
            match config.descriptor(name) {
                Some(descriptor) => catalogs.push(build_backend(name, descriptor, client.clone())),
                None => warn!(catalog = %name, "no descriptor for catalog; skipping"),
            }
        }
        let editions = Box::new(OpenLibraryEditions::new(client, config.retry_policy()));
        Ok(Self::new(catalogs, editions, ResolveOptions::from_config(config)))
    }

    /// Catalog short-codes in search order.
    #[must_use]
    pub fn catalog_names(&self) -> Vec<&str> {
        self.catalogs.iter().map(|catalog| catalog.name()).collect()
    }

    /// Returns the active options.
    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolves one request. Never fails: classifiers nothing could supply
    /// stay unset and the resolution is marked incomplete.
    #[tracing::instrument(
        skip(self, request),
        fields(identifier = ?request.identifier.as_ref().map(|id| id.value.as_str()))
    )]
    pub async fn resolve(&self, request: ResolveRequest) -> Resolution {
        let mut state = self.initial_state(&request);

        let Some(identifier) = request.identifier else {
            return state.into_resolution();
        };
        if state.is_complete() {
            debug!("prefilled values already satisfy every classifier");
            return state.into_resolution();
        }

        self.search_catalogs(&mut state, &identifier, None).await;
        if state.is_complete() {
            return state.into_resolution();
        }

        if identifier.is_isbn() && self.options.alt_isbns {
            self.search_alternates(&mut state, &identifier).await;
        }

        let resolution = state.into_resolution();
        info!(status = %resolution.status, "resolution finished");
        resolution
    }

    fn initial_state(&self, request: &ResolveRequest) -> Accumulator {
        let mut fields = FieldSet::new(&self.options.classifiers);
        let mut supplementary = Supplementary {
            identifier: request.identifier.clone(),
            ..Supplementary::default()
        };

        // The input identifier satisfies its own classifier when one is requested.
        if let Some(identifier) = &request.identifier
            && let Ok(classifier) = identifier.kind.as_str().parse::<Classifier>()
        {
            fields.prefill(classifier, identifier.value.clone());
        }

        for (key, value) in &request.prefilled {
            match key.parse::<Classifier>() {
                Ok(classifier) if fields.requests(classifier) => {
                    fields.prefill(classifier, value.clone());
                }
                _ => {
                    supplementary.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Accumulator {
            fields,
            supplementary,
        }
    }

    /// Runs every catalog for `identifier`, stopping early once complete.
    async fn search_catalogs(
        &self,
        state: &mut Accumulator,
        identifier: &Identifier,
        alternate: Option<(usize, usize)>,
    ) {
        for catalog in &self.catalogs {
            let missing = state.fields.missing();
            let progress = alternate.map(|(n, total)| format!("{n}/{total}"));
            info!(
                catalog = catalog.name(),
                identifier = %identifier,
                alternate = progress.as_deref().unwrap_or(""),
                classifiers = %join_classifiers(&missing),
                "searching catalog"
            );

            let languages = &self.options.languages;
            let values = self
                .options
                .policy
                .run(catalog.name(), || catalog.lookup(identifier, &missing, languages))
                .await
                .flatten();
            let Some(values) = values else {
                continue;
            };

            let filled = state.fields.merge(&values);
            if !filled.is_empty() {
                for classifier in &filled {
                    info!(catalog = catalog.name(), %classifier, "classifier found");
                }
                state.supplementary.catalog = Some(catalog.name().to_string());
                state.supplementary.identifier = Some(identifier.clone());
                if filled.contains(&Classifier::Record) {
                    state.supplementary.record_type = Some(catalog.record_schema());
                }
            }

            if state.is_complete() {
                return;
            }
        }
    }

    /// Discovers alternate editions once and tries them in discovery order.
    ///
    /// The work-level search runs first; the language-filtered edition pass
    /// only runs when its LCC/DDC did not complete the set.
    async fn search_alternates(&self, state: &mut Accumulator, identifier: &Identifier) {
        info!(isbn = %identifier, "fetching alternate editions");
        let work = self.editions.search_work(&identifier.value).await;
        merge_most_common(state, &work);
        if state.is_complete() {
            return;
        }

        let languages = &self.options.languages;
        let mut isbns = work.isbns;
        if !languages.is_empty() && !isbns.is_empty() {
            let filtered = self
                .editions
                .filtered_editions(&identifier.value, languages)
                .await;
            merge_most_common(state, &filtered);
            if state.is_complete() {
                return;
            }
            isbns = filtered.isbns;
        }

        if isbns.is_empty() {
            info!("no alternate ISBNs found");
            return;
        }

        let total = isbns.len();
        for (index, isbn) in isbns.iter().take(self.options.max_alts).enumerate() {
            if !self.options.wait.is_zero() {
                tokio::time::sleep(self.options.wait).await;
            }
            let alternate = Identifier::new(IdentifierKind::Isbn, isbn.clone());
            self.search_catalogs(state, &alternate, Some((index + 1, total)))
                .await;
            if state.is_complete() {
                return;
            }
        }
        if total > self.options.max_alts {
            info!(max_alts = self.options.max_alts, total, "alternate limit reached");
        }
    }
}

/// Merges the most common LCC and DDC of `editions` into still-unset fields.
fn merge_most_common(state: &mut Accumulator, editions: &AlternateEditions) {
    let mut derived = FieldMap::new();
    if state.fields.is_missing(Classifier::Lcc)
        && let Some(lcc) = most_common_lcc(&editions.lccs)
    {
        derived.insert(Classifier::Lcc, lcc);
    }
    if state.fields.is_missing(Classifier::Ddc)
        && let Some(ddc) = most_common_ddc(&editions.ddcs)
    {
        derived.insert(Classifier::Ddc, ddc);
    }
    for classifier in state.fields.merge(&derived) {
        info!(%classifier, "classifier taken from alternate editions");
    }
}

fn join_classifiers(classifiers: &[Classifier]) -> String {
    classifiers
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
