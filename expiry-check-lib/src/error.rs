//! Error handling for expiration lookups.
//!
//! Most failures in this crate are absorbed close to where they happen and
//! turned into degraded values (`Unknown`, `Error`, an empty domain set).
//! The variants here describe what is left: errors that travel between
//! layers before being degraded, and the few that reach the caller.

use std::fmt;
use std::time::Duration;

/// Main error type for expiration lookups and batch runs.
#[derive(Debug, Clone)]
pub enum ExpiryCheckError {
    /// Input that cannot be processed (empty domain, bad package name, etc.)
    InvalidInput {
        input: String,
        reason: String,
    },

    /// Network-related errors (connection, DNS, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// Package registry request failures
    RegistryError {
        package: String,
        message: String,
        status_code: Option<u16>,
    },

    /// WHOIS protocol errors from the native client
    WhoisError {
        domain: String,
        message: String,
    },

    /// External provider process errors (launch failure, bad exit status)
    ProviderError {
        provider: String,
        domain: String,
        message: String,
    },

    /// Parsing errors for JSON bodies, dates and WHOIS text
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Configuration errors (no provider enabled, invalid settings, etc.)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading package lists or config files
    FileError {
        path: String,
        message: String,
    },

    /// Timeout errors when operations take too long
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// A batch was started while another one is still running
    AlreadyRunning,

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl ExpiryCheckError {
    /// Create a new invalid input error.
    pub fn invalid_input<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidInput {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new registry error.
    pub fn registry<P: Into<String>, M: Into<String>>(package: P, message: M) -> Self {
        Self::RegistryError {
            package: package.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new registry error with HTTP status code.
    pub fn registry_with_status<P: Into<String>, M: Into<String>>(
        package: P,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RegistryError {
            package: package.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new WHOIS error.
    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new provider process error.
    pub fn provider<P: Into<String>, D: Into<String>, M: Into<String>>(
        provider: P,
        domain: D,
        message: M,
    ) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error suggests the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::WhoisError { .. }
                | Self::ProviderError { .. }
                | Self::RegistryError {
                    status_code: Some(500..=599),
                    ..
                }
        )
    }
}

impl fmt::Display for ExpiryCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { input, reason } => {
                write!(f, "Invalid input '{}': {}", input, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::RegistryError {
                package,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(
                        f,
                        "Registry error for '{}' (HTTP {}): {}",
                        package, code, message
                    )
                } else {
                    write!(f, "Registry error for '{}': {}", package, message)
                }
            }
            Self::WhoisError { domain, message } => {
                write!(f, "WHOIS error for '{}': {}", domain, message)
            }
            Self::ProviderError {
                provider,
                domain,
                message,
            } => {
                write!(f, "{} provider failed for '{}': {}", provider, domain, message)
            }
            Self::ParseError { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::AlreadyRunning => {
                write!(f, "A batch is already running")
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ExpiryCheckError {}

impl From<reqwest::Error> for ExpiryCheckError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExpiryCheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<toml::de::Error> for ExpiryCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

impl From<std::io::Error> for ExpiryCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
