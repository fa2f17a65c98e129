//! Maintainer domain extraction from registry metadata.

use crate::types::RegistryMetadata;
use serde_json::Value;

/// Candidate domains of one package, deduplicated, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet {
    domains: Vec<String>,
}

impl DomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a domain; returns `false` when it was already present.
    pub fn insert<D: Into<String>>(&mut self, domain: D) -> bool {
        let domain = domain.into();
        if self
            .domains
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&domain))
        {
            return false;
        }
        self.domains.push(domain);
        true
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d.eq_ignore_ascii_case(domain))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }
}

impl IntoIterator for DomainSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.domains.into_iter()
    }
}

impl<S: Into<String>> FromIterator<S> for DomainSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = DomainSet::new();
        for domain in iter {
            set.insert(domain);
        }
        set
    }
}

/// Derive the domain of a maintainer identity.
///
/// The identity is split on `@` and the last segment is kept, so a string
/// without `@` comes back whole. No validation is performed.
pub fn domain_from_identity(identity: &str) -> String {
    identity
        .rsplit('@')
        .next()
        .unwrap_or(identity)
        .trim()
        .to_ascii_lowercase()
}

/// Collect the publisher and maintainer domains of the active version.
///
/// Reads `_npmUser.email` and every `maintainers[].email`. A missing field
/// skips that one identity; it never fails the whole extraction.
pub fn extract_domains(metadata: &RegistryMetadata) -> DomainSet {
    extract_from_version(&metadata.version)
}

/// Same as [`extract_domains`], working on a bare version object.
pub fn extract_from_version(version: &Value) -> DomainSet {
    let mut domains = DomainSet::new();

    match version
        .get("_npmUser")
        .and_then(|user| user.get("email"))
        .and_then(Value::as_str)
    {
        Some(email) => {
            domains.insert(domain_from_identity(email));
        }
        None => tracing::debug!("version has no _npmUser.email"),
    }

    if let Some(maintainers) = version.get("maintainers").and_then(Value::as_array) {
        for maintainer in maintainers {
            match maintainer.get("email").and_then(Value::as_str) {
                Some(email) => {
                    domains.insert(domain_from_identity(email));
                }
                None => tracing::debug!(?maintainer, "skipping maintainer without email"),
            }
        }
    }

    domains
}
