//! Process-backed WHOIS providers.
//!
//! Both providers run an external program with the domain as its last
//! argument and feed standard output to the text parser:
//!
//! - docker: `docker run --rm <image> <domain>`
//! - custom: `<command> <domain>`
//!
//! Timeouts, non-zero exits and unparseable output count as "no result" and
//! let the chain move on. A custom command that cannot be launched at all is
//! the exception: that error is returned so a bad path is visible.

use crate::chain::ExpirationProvider;
use crate::error::ExpiryCheckError;
use crate::parser::parse_expiration;
use crate::types::{CheckConfig, ExpirationResult, ProviderKind};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Provider that shells out to a WHOIS program.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    kind: ProviderKind,
    /// Program to launch
    program: String,
    /// Arguments placed before the domain
    args: Vec<String>,
    /// Kill the process after this long
    timeout: Option<Duration>,
    /// Return launch failures instead of treating them as "no result"
    launch_errors_fatal: bool,
}

impl CommandProvider {
    /// General constructor; prefer [`CommandProvider::docker`] and
    /// [`CommandProvider::custom`].
    pub fn new<P: Into<String>>(
        kind: ProviderKind,
        program: P,
        args: Vec<String>,
        timeout: Option<Duration>,
        launch_errors_fatal: bool,
    ) -> Self {
        Self {
            kind,
            program: program.into(),
            args,
            timeout,
            launch_errors_fatal,
        }
    }

    /// `docker run --rm <image> <domain>`; every failure falls through.
    pub fn docker<I: Into<String>>(image: I, timeout: Option<Duration>) -> Self {
        Self::new(
            ProviderKind::Docker,
            "docker",
            vec!["run".to_string(), "--rm".to_string(), image.into()],
            timeout,
            false,
        )
    }

    /// `<command> <domain>`; launch failures are returned as errors.
    pub fn custom<C: Into<String>>(command: C, timeout: Option<Duration>) -> Self {
        Self::new(
            ProviderKind::Custom,
            command.into().trim().to_string(),
            Vec::new(),
            timeout,
            true,
        )
    }

    pub fn docker_from_config(config: &CheckConfig) -> Self {
        Self::docker(config.docker_image.clone(), config.docker_timeout)
    }

    pub fn custom_from_config(command: &str, config: &CheckConfig) -> Self {
        Self::custom(command, config.custom_timeout)
    }

    /// Launch the program and wait for its output.
    async fn run(&self, domain: &str) -> Result<Output, RunFailure> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(domain)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunFailure::Launch(e.to_string()))?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| RunFailure::TimedOut(limit))?,
            None => child.wait_with_output().await,
        };

        output.map_err(|e| RunFailure::Io(e.to_string()))
    }
}

enum RunFailure {
    Launch(String),
    TimedOut(Duration),
    Io(String),
}

#[async_trait]
impl ExpirationProvider for CommandProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn resolve(&self, domain: &str) -> Result<ExpirationResult, ExpiryCheckError> {
        let output = match self.run(domain).await {
            Ok(output) => output,
            Err(RunFailure::Launch(message)) if self.launch_errors_fatal => {
                return Err(ExpiryCheckError::provider(
                    self.kind.to_string(),
                    domain,
                    format!("Failed to launch '{}': {}", self.program, message),
                ));
            }
            Err(RunFailure::Launch(message)) | Err(RunFailure::Io(message)) => {
                tracing::warn!(provider = %self.kind, domain, error = %message, "provider process failed");
                return Ok(ExpirationResult::Unknown);
            }
            Err(RunFailure::TimedOut(limit)) => {
                tracing::warn!(provider = %self.kind, domain, ?limit, "provider process timed out");
                return Ok(ExpirationResult::Unknown);
            }
        };

        if !output.status.success() {
            tracing::warn!(provider = %self.kind, domain, status = %output.status, "provider exited unsuccessfully");
            return Ok(ExpirationResult::Unknown);
        }

        Ok(parse_expiration(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Check whether docker can be launched on this host.
///
/// Only the launch matters; the daemon may still be unreachable.
pub async fn detect_docker() -> bool {
    can_launch("docker", "version").await
}

/// Check whether a WHOIS command can be launched on this host.
pub async fn detect_command(command: &str) -> bool {
    let command = command.trim();
    !command.is_empty() && can_launch(command, "-v").await
}

async fn can_launch(program: &str, arg: &str) -> bool {
    let probe = Command::new(program)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(Duration::from_secs(10), probe).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::debug!(program, error = %e, "provider not available");
            false
        }
        // It started, which is all detection needs.
        Err(_) => true,
    }
}
