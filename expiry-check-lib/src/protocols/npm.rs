//! npm registry client.
//!
//! Fetches the package document from the registry and picks out the active
//! version object (`versions[dist-tags.latest]`). Every failure along the way
//! (transport, status, body shape) degrades to "no metadata" for the caller.

use crate::error::ExpiryCheckError;
use crate::types::{CheckConfig, RegistryMetadata, DEFAULT_REGISTRY_URL};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Source of package metadata for a batch run.
///
/// The registry client is the production implementation; tests plug in
/// in-memory sources.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Metadata of the package's latest version, or `None` when it cannot be
    /// obtained for any reason.
    async fn fetch(&self, package: &str) -> Option<RegistryMetadata>;
}

/// HTTP client for the npm registry.
#[derive(Clone)]
pub struct NpmRegistryClient {
    /// HTTP client for registry requests
    http_client: reqwest::Client,
    /// Registry base URL without trailing slash
    base_url: String,
}

impl NpmRegistryClient {
    /// Create a client for the public npm registry with a 30 second timeout.
    pub fn new() -> Result<Self, ExpiryCheckError> {
        Self::with_config(DEFAULT_REGISTRY_URL, Duration::from_secs(30))
    }

    /// Create a client for a custom registry URL and timeout.
    pub fn with_config(base_url: &str, timeout: Duration) -> Result<Self, ExpiryCheckError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("expiry-check/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ExpiryCheckError::network_with_source(
                    "Failed to create registry HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_check_config(config: &CheckConfig) -> Result<Self, ExpiryCheckError> {
        Self::with_config(&config.registry_url, config.registry_timeout)
    }

    /// Fetch and resolve the latest version of `package`.
    ///
    /// # Errors
    ///
    /// Returns `ExpiryCheckError` if:
    /// - The package name is blank
    /// - The request fails or returns a non-success status
    /// - The body is not JSON or lacks `dist-tags.latest` / `versions[latest]`
    pub async fn try_fetch(&self, package: &str) -> Result<RegistryMetadata, ExpiryCheckError> {
        let package = package.trim();
        if package.is_empty() {
            return Err(ExpiryCheckError::invalid_input(
                package,
                "Package name cannot be empty",
            ));
        }

        let url = format!("{}/{}", self.base_url, encode_package_name(package));
        tracing::debug!(package, %url, "fetching registry metadata");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExpiryCheckError::registry(package, format!("Request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                let json = response.json::<Value>().await.map_err(|e| {
                    ExpiryCheckError::registry(package, format!("Failed to parse JSON: {}", e))
                })?;
                resolve_latest_version(package, &json)
            }
            StatusCode::NOT_FOUND => Err(ExpiryCheckError::registry_with_status(
                package,
                "Package not found",
                404,
            )),
            code => Err(ExpiryCheckError::registry_with_status(
                package,
                format!("Registry returned error: {}", code),
                code.as_u16(),
            )),
        }
    }
}

#[async_trait]
impl MetadataSource for NpmRegistryClient {
    async fn fetch(&self, package: &str) -> Option<RegistryMetadata> {
        if package.trim().is_empty() {
            return None;
        }

        match self.try_fetch(package).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(package, error = %e, "registry lookup failed, no domains");
                None
            }
        }
    }
}

/// Pick `versions[dist-tags.latest]` out of a registry document.
pub fn resolve_latest_version(
    package: &str,
    document: &Value,
) -> Result<RegistryMetadata, ExpiryCheckError> {
    let latest = document
        .get("dist-tags")
        .and_then(|tags| tags.get("latest"))
        .and_then(Value::as_str)
        .ok_or_else(|| ExpiryCheckError::parse(format!("{}: missing dist-tags.latest", package)))?;

    let version = document
        .get("versions")
        .and_then(|versions| versions.get(latest))
        .ok_or_else(|| {
            ExpiryCheckError::parse(format!("{}: missing versions[{}]", package, latest))
        })?;

    Ok(RegistryMetadata {
        name: package.to_string(),
        latest_version: latest.to_string(),
        version: version.clone(),
    })
}

/// Path-encode a package name; scoped names keep `@` but escape the `/`.
pub fn encode_package_name(package: &str) -> String {
    package.replace('/', "%2F")
}
