//! Ordered provider fallback.
//!
//! A chain holds the enabled providers in priority order (native, docker,
//! custom) and asks each in turn until one produces a date.

use crate::error::ExpiryCheckError;
#[cfg(feature = "process")]
use crate::protocols::CommandProvider;
#[cfg(feature = "native")]
use crate::protocols::{NativeWhoisProvider, WhoisClient};
use crate::types::{CheckConfig, ExpirationResult, ProviderConfig, ProviderKind};
use async_trait::async_trait;
use std::sync::Arc;

/// A mechanism that can look up a domain's expiration date.
///
/// `Ok(Unknown)` means "ran, found nothing" and lets the chain continue.
/// An `Err` aborts the chain for this attempt.
#[async_trait]
pub trait ExpirationProvider: Send + Sync {
    /// Which mechanism this is.
    fn kind(&self) -> ProviderKind;

    /// Look up `domain`.
    async fn resolve(&self, domain: &str) -> Result<ExpirationResult, ExpiryCheckError>;
}

/// First-success-wins sequence of providers.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ExpirationProvider>>,
}

impl ProviderChain {
    /// Chain over the given providers, tried in the order given.
    pub fn new(providers: Vec<Arc<dyn ExpirationProvider>>) -> Self {
        Self { providers }
    }

    /// Build the standard chain for a provider selection.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when no provider is enabled, the custom
    /// provider has no command, or a selected provider was compiled out
    /// (`native` and `process` features).
    pub fn from_config(
        providers: &ProviderConfig,
        config: &CheckConfig,
    ) -> Result<Self, ExpiryCheckError> {
        providers.validate()?;

        let mut chain: Vec<Arc<dyn ExpirationProvider>> = Vec::new();
        for kind in providers.enabled() {
            chain.push(match kind {
                ProviderKind::Native => native_provider(config)?,
                ProviderKind::Docker | ProviderKind::Custom => {
                    process_provider(kind, &providers.custom_command, config)?
                }
            });
        }

        Ok(Self::new(chain))
    }

    /// Kinds in the order they are tried.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve one domain.
    ///
    /// Stops at the first `Known`. Providers that come back `Unknown` are
    /// skipped; an exhausted chain yields `Unknown`. Provider errors are
    /// returned so the caller can retry the attempt.
    pub async fn resolve(&self, domain: &str) -> Result<ExpirationResult, ExpiryCheckError> {
        for provider in &self.providers {
            tracing::debug!(provider = %provider.kind(), domain, "trying provider");
            match provider.resolve(domain).await? {
                ExpirationResult::Known(date) => {
                    tracing::debug!(provider = %provider.kind(), domain, %date, "expiration found");
                    return Ok(ExpirationResult::Known(date));
                }
                _ => continue,
            }
        }

        Ok(ExpirationResult::Unknown)
    }
}

#[cfg(feature = "native")]
fn native_provider(config: &CheckConfig) -> Result<Arc<dyn ExpirationProvider>, ExpiryCheckError> {
    Ok(Arc::new(NativeWhoisProvider::new(WhoisClient::from_check_config(config))))
}

#[cfg(not(feature = "native"))]
fn native_provider(_config: &CheckConfig) -> Result<Arc<dyn ExpirationProvider>, ExpiryCheckError> {
    Err(unavailable(ProviderKind::Native, "native"))
}

#[cfg(feature = "process")]
fn process_provider(
    kind: ProviderKind,
    custom_command: &str,
    config: &CheckConfig,
) -> Result<Arc<dyn ExpirationProvider>, ExpiryCheckError> {
    Ok(match kind {
        ProviderKind::Custom => Arc::new(CommandProvider::custom_from_config(custom_command, config)),
        _ => Arc::new(CommandProvider::docker_from_config(config)),
    })
}

#[cfg(not(feature = "process"))]
fn process_provider(
    kind: ProviderKind,
    _custom_command: &str,
    _config: &CheckConfig,
) -> Result<Arc<dyn ExpirationProvider>, ExpiryCheckError> {
    Err(unavailable(kind, "process"))
}

#[cfg(not(all(feature = "native", feature = "process")))]
fn unavailable(kind: ProviderKind, feature: &str) -> ExpiryCheckError {
    ExpiryCheckError::config(format!(
        "The {} provider requires the '{}' feature, which this build does not include",
        kind, feature
    ))
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.kinds())
            .finish()
    }
}
