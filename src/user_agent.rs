//! Shared User-Agent string for catalog and Open Library requests.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/libcat";

/// User-Agent sent on every outbound request.
#[must_use]
pub(crate) fn default_catalog_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("libcat/{version} (catalog-lookup; +{PROJECT_UA_URL})")
}
