//! Core data types for expiration lookups.
//!
//! This module defines the values that flow through a batch run: lookup
//! results, output rows, provider selection and engine tuning, plus the
//! events a run reports back to its caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Default npm registry endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.com";

/// Default container image used by the docker provider.
pub const DEFAULT_DOCKER_IMAGE: &str = "dentych/whois";

/// Outcome of resolving one domain's expiration date.
///
/// Only `Known` carries a date; the time of day is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpirationResult {
    /// The lookup found an expiration date
    Known(NaiveDate),
    /// The lookup ran but no provider produced an expiration date
    Unknown,
    /// The lookup could not complete after all attempts
    Error,
}

impl ExpirationResult {
    /// Returns the expiration date when known.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Known(date) => Some(*date),
            _ => None,
        }
    }

    /// Whether this result carries a date.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for ExpirationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Unknown => write!(f, "Unknown"),
            Self::Error => write!(f, "Error"),
        }
    }
}

// Rows are exported as `"YYYY-MM-DD"`, `"Unknown"` or `"Error"`.
impl Serialize for ExpirationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One output row: a package, one of its maintainer domains, and the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionRow {
    /// Package name as it appeared in the input (trimmed)
    pub package: String,

    /// Maintainer domain derived from the registry metadata
    pub domain: String,

    /// Expiration lookup result for the domain
    pub expiration: ExpirationResult,
}

impl ResolutionRow {
    pub fn new<P: Into<String>, D: Into<String>>(
        package: P,
        domain: D,
        expiration: ExpirationResult,
    ) -> Self {
        Self {
            package: package.into(),
            domain: domain.into(),
            expiration,
        }
    }
}

/// The parts of a registry document the extractor needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryMetadata {
    /// Package name the document was fetched for
    pub name: String,

    /// Value of `dist-tags.latest`
    pub latest_version: String,

    /// The `versions[latest]` object
    pub version: serde_json::Value,
}

/// The lookup mechanisms a provider chain can use, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Built-in WHOIS client talking to port 43 directly
    #[serde(rename = "native")]
    Native,

    /// `whois` running inside an ephemeral docker container
    #[serde(rename = "docker")]
    Docker,

    /// Operator-specified executable
    #[serde(rename = "custom")]
    Custom,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Native => write!(f, "native"),
            ProviderKind::Docker => write!(f, "docker"),
            ProviderKind::Custom => write!(f, "custom"),
        }
    }
}

/// Which providers a batch may use.
///
/// At least one provider must be enabled, see [`ProviderConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Use the built-in WHOIS client
    pub native: bool,

    /// Use `docker run --rm <image> <domain>`
    pub docker: bool,

    /// Use the custom command below
    pub custom: bool,

    /// Executable path or name for the custom provider
    pub custom_command: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            native: true,
            docker: false,
            custom: false,
            custom_command: "whois".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Configuration with every provider disabled.
    pub fn none() -> Self {
        Self {
            native: false,
            docker: false,
            custom: false,
            custom_command: String::new(),
        }
    }

    pub fn with_native(mut self, enabled: bool) -> Self {
        self.native = enabled;
        self
    }

    pub fn with_docker(mut self, enabled: bool) -> Self {
        self.docker = enabled;
        self
    }

    /// Enable the custom provider with the given command.
    pub fn with_custom<C: Into<String>>(mut self, command: C) -> Self {
        self.custom = true;
        self.custom_command = command.into();
        self
    }

    /// Enabled providers in chain order.
    pub fn enabled(&self) -> Vec<ProviderKind> {
        let mut kinds = Vec::with_capacity(3);
        if self.native {
            kinds.push(ProviderKind::Native);
        }
        if self.docker {
            kinds.push(ProviderKind::Docker);
        }
        if self.custom {
            kinds.push(ProviderKind::Custom);
        }
        kinds
    }

    /// Reject configurations a batch cannot start with.
    pub fn validate(&self) -> Result<(), crate::ExpiryCheckError> {
        if !self.native && !self.docker && !self.custom {
            return Err(crate::ExpiryCheckError::config(
                "No whois provider has been selected",
            ));
        }
        if self.custom && self.custom_command.trim().is_empty() {
            return Err(crate::ExpiryCheckError::config(
                "The custom provider is enabled but no command was given",
            ));
        }
        Ok(())
    }
}

/// Engine tuning for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Maximum number of domains resolved at once within a package
    /// Default: 4, Range: 1-32
    pub concurrency: usize,

    /// Base URL of the package registry
    pub registry_url: String,

    /// Timeout for registry requests
    /// Default: 30 seconds
    #[serde(skip)]
    pub registry_timeout: Duration,

    /// Timeout for a whole native WHOIS lookup, referrals included
    /// Default: 30 seconds
    #[serde(skip)]
    pub whois_timeout: Duration,

    /// Timeout for the docker provider process
    /// Default: 30 seconds
    #[serde(skip)]
    pub docker_timeout: Option<Duration>,

    /// Timeout for the custom provider process
    /// Default: none (waits for the process to exit)
    #[serde(skip)]
    pub custom_timeout: Option<Duration>,

    /// Resolution attempts per domain before the row is marked `Error`
    /// Default: 2
    pub max_attempts: usize,

    /// Image used by the docker provider
    pub docker_image: String,

    /// Whether the native client follows WHOIS referrals
    pub follow_referrals: bool,

    /// Maximum referral hops after the IANA query
    pub max_referrals: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_timeout: Duration::from_secs(30),
            whois_timeout: Duration::from_secs(30),
            docker_timeout: Some(Duration::from_secs(30)),
            custom_timeout: None,
            max_attempts: 2,
            docker_image: DEFAULT_DOCKER_IMAGE.to_string(),
            follow_referrals: true,
            max_referrals: 3,
        }
    }
}

impl CheckConfig {
    /// Set concurrency, capped at 32 to stay polite with WHOIS servers.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 32);
        self
    }

    pub fn with_registry_url<U: Into<String>>(mut self, url: U) -> Self {
        self.registry_url = url.into();
        self
    }

    /// Apply one timeout to the registry, native WHOIS and docker lookups.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.registry_timeout = timeout;
        self.whois_timeout = timeout;
        self.docker_timeout = Some(timeout);
        self
    }

    pub fn with_custom_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.custom_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_docker_image<I: Into<String>>(mut self, image: I) -> Self {
        self.docker_image = image.into();
        self
    }
}

/// Counters reported while a batch runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// Domains that produced a row so far
    pub completed_domains: usize,
    /// Packages whose domains are all processed
    pub completed_packages: usize,
    /// Number of input lines in the batch
    pub total_packages: usize,
}

/// Messages a running batch sends to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// A domain finished resolving
    Row(ResolutionRow),
    /// Counters changed
    Progress(BatchProgress),
}

/// Final state of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every package was processed
    Completed,
    /// Cancellation was observed; later domains were skipped
    Cancelled,
    /// The run loop itself failed
    Failed(String),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "Operation complete."),
            RunOutcome::Cancelled => write!(f, "Operation cancelled."),
            RunOutcome::Failed(message) => write!(f, "Error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_display() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        assert_eq!(ExpirationResult::Known(date).to_string(), "2030-01-15");
        assert_eq!(ExpirationResult::Unknown.to_string(), "Unknown");
        assert_eq!(ExpirationResult::Error.to_string(), "Error");
    }

    #[test]
    fn test_row_serializes_expiration_as_string() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let row = ResolutionRow::new("left-pad", "example.com", ExpirationResult::Known(date));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "package": "left-pad",
                "domain": "example.com",
                "expiration": "2025-06-01"
            })
        );
    }

    #[test]
    fn test_provider_config_validation() {
        assert!(ProviderConfig::default().validate().is_ok());
        assert!(ProviderConfig::none().validate().is_err());
        assert!(ProviderConfig::none().with_custom("  ").validate().is_err());
        assert!(ProviderConfig::none().with_docker(true).validate().is_ok());
    }

    #[test]
    fn test_enabled_order_is_fixed() {
        let config = ProviderConfig::none()
            .with_custom("whois")
            .with_docker(true)
            .with_native(true);
        assert_eq!(
            config.enabled(),
            vec![ProviderKind::Native, ProviderKind::Docker, ProviderKind::Custom]
        );
    }

    #[test]
    fn test_check_config_builders() {
        let config = CheckConfig::default()
            .with_concurrency(500)
            .with_max_attempts(0)
            .with_timeout(Duration::from_secs(10));
        assert_eq!(config.concurrency, 32);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.whois_timeout, Duration::from_secs(10));
        assert_eq!(config.custom_timeout, None);
    }
}
