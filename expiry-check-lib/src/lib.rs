//! # Expiry Check Library
//!
//! Finds npm packages whose maintainers sign in with email addresses on
//! domains that are about to lapse. Such a domain can be re-registered by
//! anyone, who then controls the maintainer's mailbox and the password
//! reset that comes with it.
//!
//! For each package the library fetches the latest version's metadata from
//! the registry, collects the domains of the publisher and maintainers, and
//! resolves each domain's registration expiration through a chain of WHOIS
//! providers (native port-43 client, docker image, custom command). Results
//! are cached per domain across runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use expiry_check_lib::{BatchOrchestrator, CheckConfig, ExpirationCache, ProviderConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(ExpirationCache::new());
//!     let orchestrator =
//!         BatchOrchestrator::from_config(&ProviderConfig::default(), CheckConfig::default(), cache)?;
//!
//!     let handle = orchestrator.spawn(vec!["left-pad".to_string()])?;
//!     let (rows, outcome) = handle.collect().await;
//!     for row in rows {
//!         println!("{} {} {}", row.package, row.domain, row.expiration);
//!     }
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Provider chain**: first provider with a date wins, the rest are skipped
//! - **Shared cache**: at most one lookup per domain, even across runs
//! - **Cooperative cancellation**: runs stop between domains
//! - **Forgiving**: registry and WHOIS failures become result values

// Re-export main public API types and functions
// This makes them available as expiry_check_lib::TypeName
pub use batch::{BatchHandle, BatchOrchestrator, BatchSummary};
pub use cache::ExpirationCache;
pub use chain::{ExpirationProvider, ProviderChain};
pub use config::{
    load_env_config, load_env_config_from, merge_configs, parse_timeout_string, ConfigManager,
    DefaultsConfig, EnvConfig, FileConfig, OutputConfig, ProvidersSection,
};
pub use error::ExpiryCheckError;
pub use extract::{domain_from_identity, extract_domains, extract_from_version, DomainSet};
pub use parser::{parse_date, parse_expiration};
pub use protocols::{
    detect_command, detect_docker, CommandProvider, MetadataSource, NativeWhoisProvider,
    NpmRegistryClient, WhoisClient, WhoisRecord,
};
pub use types::{
    BatchEvent, BatchProgress, CheckConfig, ExpirationResult, ProviderConfig, ProviderKind,
    RegistryMetadata, ResolutionRow, RunOutcome, DEFAULT_DOCKER_IMAGE, DEFAULT_REGISTRY_URL,
};
pub use tokio_util::sync::CancellationToken;
pub use utils::{
    count_package_names, read_packages_from_file, read_packages_from_reader, split_package_lines,
};

// Public modules
pub mod protocols;

// Internal modules - these are not part of the public API
mod batch;
mod cache;
mod chain;
mod config;
mod error;
mod extract;
mod parser;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ExpiryCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "native")]
    features.push("native");

    #[cfg(feature = "process")]
    features.push("process");

    features
}
