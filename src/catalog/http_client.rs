//! Shared HTTP client construction for catalog backends and the edition
//! expander.
//!
//! One client is built per run so every request carries the same User-Agent,
//! compression setting and timeouts.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

use super::CatalogError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Builds the catalog HTTP client with `timeout` as the per-request limit.
///
/// # Errors
///
/// Returns [`CatalogError::ClientBuild`] when client construction fails.
pub fn build_catalog_http_client(timeout: Duration) -> Result<Client, CatalogError> {
    match try_build_client(timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; fall back to environment proxies only.
            warn!("catalog client hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(CatalogError::client_build(
                    "HTTP client construction panicked",
                )),
                Err(BuildClientFailure::Build(error)) => {
                    Err(CatalogError::client_build(error.to_string()))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(CatalogError::client_build(error.to_string())),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
        .timeout(timeout)
        .user_agent(user_agent::default_catalog_user_agent())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
