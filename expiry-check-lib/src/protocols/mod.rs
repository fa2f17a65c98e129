//! Protocol implementations for expiration lookups.
//!
//! This module contains the network and process plumbing: the npm registry
//! client, the native WHOIS client and the command-backed WHOIS providers.

/// npm registry metadata client
pub mod npm;

/// WHOIS protocol implementation
pub mod whois;

/// Docker and custom-command WHOIS providers
pub mod command;

// Re-export commonly used functions and types
pub use command::{detect_command, detect_docker, CommandProvider};
pub use npm::{encode_package_name, resolve_latest_version, MetadataSource, NpmRegistryClient};
pub use whois::{NativeWhoisProvider, WhoisClient, WhoisRecord};
