//! Native WHOIS client (RFC 3912, TCP port 43).
//!
//! The lookup starts at the IANA WHOIS server, which answers with a referral
//! to the registry's server; thin registries refer again to the registrar.
//! The client follows those referrals and hands back every response it saw,
//! so the expiration can be read from the most specific record that has one.

use crate::chain::ExpirationProvider;
use crate::error::ExpiryCheckError;
use crate::parser::parse_date;
use crate::types::{CheckConfig, ExpirationResult, ProviderKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Root of every native lookup.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

const WHOIS_PORT: u16 = 43;

/// Upper bound on one server's response; anything past it is dropped.
const MAX_RESPONSE_BYTES: u64 = 1 << 20;

/// Field names (lowercase) that carry an expiration date in WHOIS records.
const EXPIRATION_FIELDS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expiration time",
    "domain expires",
    "expires on",
    "expires",
    "expire",
    "paid-till",
];

/// Responses collected while following referrals for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct WhoisRecord {
    /// The domain that was looked up
    pub domain: String,
    /// `(server, raw response)` in query order, IANA first
    pub responses: Vec<(String, String)>,
}

impl WhoisRecord {
    /// Server that produced the last response.
    pub fn server(&self) -> Option<&str> {
        self.responses.last().map(|(server, _)| server.as_str())
    }

    /// Raw text of the last response.
    pub fn raw(&self) -> Option<&str> {
        self.responses.last().map(|(_, raw)| raw.as_str())
    }

    /// Expiration date from the most specific response that carries one.
    pub fn expiration(&self) -> Option<NaiveDate> {
        self.responses
            .iter()
            .rev()
            .find_map(|(_, raw)| extract_expiration_field(raw))
    }
}

/// WHOIS client speaking the protocol directly.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Timeout for a whole lookup, referrals included
    timeout: Duration,
    /// Whether to follow referrals past the first server
    follow_referrals: bool,
    /// Maximum referral hops
    max_referrals: usize,
    /// First server queried (`host` or `host:port`)
    root_server: String,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            follow_referrals: true,
            max_referrals: 3,
            root_server: IANA_WHOIS_SERVER.to_string(),
        }
    }

    /// Create a new WHOIS client with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::new()
        }
    }

    pub fn from_check_config(config: &CheckConfig) -> Self {
        Self {
            timeout: config.whois_timeout,
            follow_referrals: config.follow_referrals,
            max_referrals: config.max_referrals,
            root_server: IANA_WHOIS_SERVER.to_string(),
        }
    }

    /// Start lookups at another server instead of IANA.
    pub fn with_root_server<S: Into<String>>(mut self, server: S) -> Self {
        self.root_server = server.into();
        self
    }

    pub fn with_referrals(mut self, follow: bool, max_hops: usize) -> Self {
        self.follow_referrals = follow;
        self.max_referrals = max_hops;
        self
    }

    /// Look up a domain, following referrals.
    ///
    /// # Errors
    ///
    /// Returns `ExpiryCheckError` if:
    /// - The whole lookup exceeds the timeout
    /// - The root server cannot be queried
    ///
    /// A failing referral target is not an error: the responses gathered so
    /// far are returned.
    pub async fn lookup(&self, domain: &str) -> Result<WhoisRecord, ExpiryCheckError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(ExpiryCheckError::invalid_input(
                domain,
                "Domain name cannot be empty",
            ));
        }

        tokio::time::timeout(self.timeout, self.lookup_with_referrals(domain))
            .await
            .map_err(|_| ExpiryCheckError::timeout("WHOIS lookup", self.timeout))?
    }

    async fn lookup_with_referrals(&self, domain: &str) -> Result<WhoisRecord, ExpiryCheckError> {
        let mut server = self.root_server.clone();
        let raw = query_server(&server, domain).await?;
        let mut record = WhoisRecord {
            domain: domain.to_string(),
            responses: vec![(server.clone(), raw)],
        };

        if !self.follow_referrals {
            return Ok(record);
        }

        for _ in 0..self.max_referrals {
            let Some(next) = record.raw().and_then(parse_referral) else {
                break;
            };
            if next.eq_ignore_ascii_case(&server)
                || record.responses.iter().any(|(s, _)| s.eq_ignore_ascii_case(&next))
            {
                break;
            }

            tracing::debug!(domain, from = %server, to = %next, "following whois referral");
            match query_server(&next, domain).await {
                Ok(raw) if !raw.trim().is_empty() => {
                    record.responses.push((next.clone(), raw));
                    server = next;
                }
                Ok(_) => break,
                Err(e) => {
                    tracing::warn!(domain, server = %next, error = %e, "whois referral failed");
                    break;
                }
            }
        }

        Ok(record)
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Expiration provider backed by [`WhoisClient`].
///
/// Reads the expiration from the structured record; lookup errors are
/// returned to the chain unchanged.
#[derive(Debug, Clone, Default)]
pub struct NativeWhoisProvider {
    client: WhoisClient,
}

impl NativeWhoisProvider {
    pub fn new(client: WhoisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExpirationProvider for NativeWhoisProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Native
    }

    async fn resolve(&self, domain: &str) -> Result<ExpirationResult, ExpiryCheckError> {
        let record = self.client.lookup(domain).await?;
        Ok(match record.expiration() {
            Some(date) => ExpirationResult::Known(date),
            None => ExpirationResult::Unknown,
        })
    }
}

/// Send one query and read the response until the server closes or
/// `MAX_RESPONSE_BYTES` have arrived.
async fn query_server(server: &str, query: &str) -> Result<String, ExpiryCheckError> {
    let (host, port) = split_server(server);

    let mut stream = TcpStream::connect((host, port)).await.map_err(|e| {
        ExpiryCheckError::network_with_source(format!("Failed to connect to {}", server), e.to_string())
    })?;

    stream
        .write_all(format!("{}\r\n", query).as_bytes())
        .await
        .map_err(|e| ExpiryCheckError::whois(query, format!("Failed to send query to {}: {}", server, e)))?;

    let mut buffer = Vec::new();
    (&mut stream)
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| ExpiryCheckError::whois(query, format!("Failed to read from {}: {}", server, e)))?;

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn split_server(server: &str) -> (&str, u16) {
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, port),
            Err(_) => (server, WHOIS_PORT),
        },
        None => (server, WHOIS_PORT),
    }
}

/// Find the next WHOIS server named in a response.
///
/// IANA answers use `refer:` (preferred) or `whois:`; registry answers name
/// the registrar's server in `Registrar WHOIS Server:`.
///
/// ```text
/// refer:        whois.verisign-grs.com
/// Registrar WHOIS Server: whois.example-registrar.com
/// ```
fn parse_referral(response: &str) -> Option<String> {
    let mut fallback = None;

    for line in response.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let value = clean_server(value);
        if value.is_empty() {
            continue;
        }

        match key.trim().to_ascii_lowercase().as_str() {
            "refer" | "registrar whois server" => return Some(value),
            "whois" => fallback = Some(value),
            _ => {}
        }
    }

    fallback
}

fn clean_server(value: &str) -> String {
    let value = value.trim();
    let value = value
        .strip_prefix("whois://")
        .or_else(|| value.strip_prefix("rwhois://"))
        .unwrap_or(value);
    value.trim_end_matches('/').to_string()
}

fn extract_expiration_field(raw: &str) -> Option<NaiveDate> {
    for line in raw.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if EXPIRATION_FIELDS.contains(&key.as_str()) {
            if let Some(date) = parse_date(value) {
                return Some(date);
            }
        }
    }
    None
}
