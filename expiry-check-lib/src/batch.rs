//! Batch orchestration.
//!
//! A batch walks the input package names in order. For each package it
//! fetches registry metadata, derives the maintainer domains and resolves
//! every domain through the cache and the provider chain. Each resolved
//! domain produces a [`ResolutionRow`] on the event channel, followed by a
//! progress snapshot; each finished package produces one more snapshot.
//!
//! Per-item failures never stop the batch: a registry failure yields no
//! domains, an exhausted chain yields `Unknown`, and a domain whose every
//! attempt errors yields `Error`.

use crate::cache::ExpirationCache;
use crate::chain::ProviderChain;
use crate::error::ExpiryCheckError;
use crate::extract::{extract_domains, DomainSet};
use crate::protocols::{MetadataSource, NpmRegistryClient};
use crate::types::{
    BatchEvent, BatchProgress, CheckConfig, ExpirationResult, ProviderConfig, ResolutionRow,
    RunOutcome,
};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Drives batch runs over a shared cache.
///
/// Cloning is cheap; clones share the cache and the running flag, so only
/// one run at a time is accepted across all of them.
#[derive(Clone)]
pub struct BatchOrchestrator {
    /// Where package metadata comes from
    source: Arc<dyn MetadataSource>,
    /// Providers used on cache misses
    chain: ProviderChain,
    /// Results shared across runs
    cache: Arc<ExpirationCache>,
    /// Engine tuning
    config: CheckConfig,
    /// Set while a run is active
    running: Arc<AtomicBool>,
}

/// What happened to one domain of a package.
enum DomainStep {
    Emitted,
    Cancelled,
}

impl BatchOrchestrator {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        chain: ProviderChain,
        cache: Arc<ExpirationCache>,
        config: CheckConfig,
    ) -> Self {
        Self {
            source,
            chain,
            cache,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build an orchestrator backed by the npm registry and the standard
    /// provider chain.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the provider selection is unusable, before
    /// any work is started.
    pub fn from_config(
        providers: &ProviderConfig,
        config: CheckConfig,
        cache: Arc<ExpirationCache>,
    ) -> Result<Self, ExpiryCheckError> {
        let chain = ProviderChain::from_config(providers, &config)?;
        let registry = NpmRegistryClient::from_check_config(&config)?;
        Ok(Self::new(Arc::new(registry), chain, cache, config))
    }

    /// The cache this orchestrator reads and fills.
    pub fn cache(&self) -> &Arc<ExpirationCache> {
        &self.cache
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a run on a background task.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` if another run has not finished yet.
    pub fn spawn(&self, packages: Vec<String>) -> Result<BatchHandle, ExpiryCheckError> {
        let guard = RunGuard::acquire(&self.running)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let orchestrator = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            orchestrator.run_guarded(&packages, &events_tx, &token).await
        });

        Ok(BatchHandle {
            events: events_rx,
            cancel,
            task,
        })
    }

    /// Run a batch to completion on the current task.
    ///
    /// Rows and progress snapshots are sent on `events` as they happen.
    /// `cancel` is polled before each package and before each domain.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` if another run has not finished yet. Every
    /// other failure is reported through the returned [`RunOutcome`].
    pub async fn run(
        &self,
        packages: &[String],
        events: &UnboundedSender<BatchEvent>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, ExpiryCheckError> {
        let _guard = RunGuard::acquire(&self.running)?;
        Ok(self.run_guarded(packages, events, cancel).await)
    }

    async fn run_guarded(
        &self,
        packages: &[String],
        events: &UnboundedSender<BatchEvent>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        tracing::info!(packages = packages.len(), providers = ?self.chain.kinds(), "batch started");

        let outcome = match self.run_packages(packages, events, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Failed(e.to_string()),
        };

        tracing::info!(%outcome, "batch finished");
        outcome
    }

    async fn run_packages(
        &self,
        packages: &[String],
        events: &UnboundedSender<BatchEvent>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, ExpiryCheckError> {
        let progress = ProgressCounter::new(packages.len());

        for line in packages {
            if cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled);
            }

            let package = line.trim();
            let domains = self.domains_for(package).await;
            tracing::debug!(package, domains = domains.len(), "package domains");

            let concurrency = self.config.concurrency.max(1);
            let mut steps = stream::iter(domains)
                .map(|domain| self.process_domain(package, domain, events, cancel, &progress))
                .buffer_unordered(concurrency);

            let mut cancelled = false;
            while let Some(step) = steps.next().await {
                if let DomainStep::Cancelled = step? {
                    cancelled = true;
                }
            }
            if cancelled {
                return Ok(RunOutcome::Cancelled);
            }

            progress.package_done();
            emit(events, BatchEvent::Progress(progress.snapshot()))?;
        }

        Ok(RunOutcome::Completed)
    }

    async fn domains_for(&self, package: &str) -> DomainSet {
        if package.is_empty() {
            return DomainSet::new();
        }
        match self.source.fetch(package).await {
            Some(metadata) => extract_domains(&metadata),
            None => DomainSet::new(),
        }
    }

    async fn process_domain(
        &self,
        package: &str,
        domain: String,
        events: &UnboundedSender<BatchEvent>,
        cancel: &CancellationToken,
        progress: &ProgressCounter,
    ) -> Result<DomainStep, ExpiryCheckError> {
        if cancel.is_cancelled() {
            return Ok(DomainStep::Cancelled);
        }

        let expiration = self.resolve_domain(&domain).await;
        emit(
            events,
            BatchEvent::Row(ResolutionRow::new(package, domain, expiration)),
        )?;
        progress.domain_done();
        emit(events, BatchEvent::Progress(progress.snapshot()))?;

        Ok(DomainStep::Emitted)
    }

    /// Resolve one domain through the cache, retrying failed attempts.
    ///
    /// A cache hit never touches the providers. Only transient failures (see
    /// [`ExpiryCheckError::is_retryable`]) get another attempt. When the
    /// attempts run out the result is `Error` and nothing is cached.
    pub async fn resolve_domain(&self, domain: &str) -> ExpirationResult {
        let attempts = self.config.max_attempts.max(1);

        let resolved = self
            .cache
            .get_or_try_resolve(domain, || async {
                let mut last_error = None;
                for attempt in 1..=attempts {
                    match self.chain.resolve(domain).await {
                        Ok(result) => return Ok(result),
                        Err(e) => {
                            let retryable = e.is_retryable();
                            tracing::warn!(domain, attempt, retryable, error = %e, "resolution attempt failed");
                            last_error = Some(e);
                            if !retryable {
                                break;
                            }
                        }
                    }
                }
                Err(last_error
                    .unwrap_or_else(|| ExpiryCheckError::internal("no resolution attempt was made")))
            })
            .await;

        match resolved {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(domain, error = %e, "giving up on domain");
                ExpirationResult::Error
            }
        }
    }
}

fn emit(events: &UnboundedSender<BatchEvent>, event: BatchEvent) -> Result<(), ExpiryCheckError> {
    events
        .send(event)
        .map_err(|_| ExpiryCheckError::internal("batch event receiver was dropped"))
}

/// Marks the orchestrator as running until dropped.
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    fn acquire(running: &Arc<AtomicBool>) -> Result<Self, ExpiryCheckError> {
        running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ExpiryCheckError::AlreadyRunning)?;
        Ok(Self {
            running: running.clone(),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

struct ProgressCounter {
    domains: AtomicUsize,
    packages: AtomicUsize,
    total: usize,
}

impl ProgressCounter {
    fn new(total: usize) -> Self {
        Self {
            domains: AtomicUsize::new(0),
            packages: AtomicUsize::new(0),
            total,
        }
    }

    fn domain_done(&self) {
        self.domains.fetch_add(1, Ordering::SeqCst);
    }

    fn package_done(&self) {
        self.packages.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> BatchProgress {
        BatchProgress {
            completed_domains: self.domains.load(Ordering::SeqCst),
            completed_packages: self.packages.load(Ordering::SeqCst),
            total_packages: self.total,
        }
    }
}

/// A run started with [`BatchOrchestrator::spawn`].
pub struct BatchHandle {
    events: UnboundedReceiver<BatchEvent>,
    cancel: CancellationToken,
    task: JoinHandle<RunOutcome>,
}

impl BatchHandle {
    /// Next row or progress snapshot; `None` once the run has ended and
    /// every event was received.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Ask the run to stop at its next check point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observed by the run, for wiring to signal handlers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to end. A panicked run is reported as `Failed`.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Failed(format!("batch task failed: {}", e)),
        }
    }

    /// Drain every remaining event and wait for the outcome.
    pub async fn collect(mut self) -> (Vec<ResolutionRow>, RunOutcome) {
        let mut rows = Vec::new();
        while let Some(event) = self.next_event().await {
            if let BatchEvent::Row(row) = event {
                rows.push(row);
            }
        }
        (rows, self.wait().await)
    }
}

/// Counts over a finished (or cancelled) batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows: usize,
    pub known: usize,
    pub unknown: usize,
    pub errors: usize,
    /// Rows whose expiration falls on or before the reference date
    pub lapsing: Vec<ResolutionRow>,
}

impl BatchSummary {
    pub fn from_rows(rows: &[ResolutionRow], reference: NaiveDate) -> Self {
        let mut summary = Self {
            rows: rows.len(),
            ..Self::default()
        };

        for row in rows {
            match row.expiration {
                ExpirationResult::Known(date) => {
                    summary.known += 1;
                    if date <= reference {
                        summary.lapsing.push(row.clone());
                    }
                }
                ExpirationResult::Unknown => summary.unknown += 1,
                ExpirationResult::Error => summary.errors += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::FakeProvider;
    use crate::chain::ExpirationProvider;
    use crate::types::{ProviderKind, RegistryMetadata};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    struct FakeSource {
        versions: HashMap<String, Value>,
        delay: Option<Duration>,
    }

    impl FakeSource {
        fn new(packages: &[(&str, &[&str])]) -> Arc<Self> {
            let versions = packages
                .iter()
                .map(|(name, emails)| (name.to_string(), version_with(emails)))
                .collect();
            Arc::new(Self {
                versions,
                delay: None,
            })
        }
    }

    /// First email is the publisher, the rest are maintainers.
    fn version_with(emails: &[&str]) -> Value {
        let maintainers: Vec<Value> = emails[1..]
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();
        json!({ "_npmUser": { "email": emails[0] }, "maintainers": maintainers })
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        async fn fetch(&self, package: &str) -> Option<RegistryMetadata> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.versions.get(package).map(|version| RegistryMetadata {
                name: package.to_string(),
                latest_version: "1.0.0".to_string(),
                version: version.clone(),
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> ExpirationResult {
        ExpirationResult::Known(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn orchestrator(
        source: Arc<dyn MetadataSource>,
        provider: Arc<dyn ExpirationProvider>,
        concurrency: usize,
    ) -> BatchOrchestrator {
        BatchOrchestrator::new(
            source,
            ProviderChain::new(vec![provider]),
            Arc::new(ExpirationCache::new()),
            CheckConfig::default().with_concurrency(concurrency),
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn run_to_end(
        orchestrator: &BatchOrchestrator,
        packages: &[&str],
        cancel: &CancellationToken,
    ) -> (Vec<BatchEvent>, RunOutcome) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = orchestrator.run(&names(packages), &tx, cancel).await.unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (events, outcome)
    }

    fn rows_of(events: &[BatchEvent]) -> Vec<ResolutionRow> {
        events
            .iter()
            .filter_map(|event| match event {
                BatchEvent::Row(row) => Some(row.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_cached_domain_and_blank_lines() {
        let source = FakeSource::new(&[("left-pad", &["dev@example.com"])]);
        let provider = FakeProvider::returning(ProviderKind::Native, date(2099, 1, 1));
        let orchestrator = orchestrator(source, provider.clone(), 1);
        orchestrator.cache().put("example.com", date(2025, 6, 1));

        let (events, outcome) =
            run_to_end(&orchestrator, &["left-pad", "", "  "], &CancellationToken::new()).await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(
            rows_of(&events),
            vec![ResolutionRow::new("left-pad", "example.com", date(2025, 6, 1))]
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_after_each_row_and_package() {
        let source = FakeSource::new(&[("a", &["x@one.com", "y@two.com"])]);
        let provider = FakeProvider::returning(ProviderKind::Native, ExpirationResult::Unknown);
        let orchestrator = orchestrator(source, provider, 1);

        let (events, _) = run_to_end(&orchestrator, &["a", ""], &CancellationToken::new()).await;

        let kinds: Vec<&str> = events
            .iter()
            .map(|event| match event {
                BatchEvent::Row(_) => "row",
                BatchEvent::Progress(_) => "progress",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["row", "progress", "row", "progress", "progress", "progress"]
        );
        assert_eq!(
            events.last(),
            Some(&BatchEvent::Progress(BatchProgress {
                completed_domains: 2,
                completed_packages: 2,
                total_packages: 2,
            }))
        );
    }

    #[tokio::test]
    async fn test_cancellation_mid_package() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let provider = FakeProvider::new(ProviderKind::Native, move |domain| {
            if domain == "b.com" {
                token.cancel();
            }
            Ok(ExpirationResult::Unknown)
        });
        let source = FakeSource::new(&[
            ("first", &["p@a.com"]),
            ("second", &["p@b.com", "q@c.com"]),
            ("third", &["p@d.com"]),
        ]);
        let orchestrator = orchestrator(source, provider.clone(), 1);

        let (events, outcome) =
            run_to_end(&orchestrator, &["first", "second", "third"], &cancel).await;

        assert_eq!(outcome, RunOutcome::Cancelled);
        let rows = rows_of(&events);
        let domains: Vec<&str> = rows.iter().map(|row| row.domain.as_str()).collect();
        assert_eq!(domains, vec!["a.com", "b.com"]);
        assert!(rows.iter().all(|row| row.package != "third"));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let source = FakeSource::new(&[("first", &["p@a.com"])]);
        let provider = FakeProvider::returning(ProviderKind::Native, ExpirationResult::Unknown);
        let orchestrator = orchestrator(source, provider.clone(), 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (events, outcome) = run_to_end(&orchestrator, &["first"], &cancel).await;
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(events.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_domain_yields_single_error_row() {
        let provider = FakeProvider::new(ProviderKind::Native, |domain| {
            Err(ExpiryCheckError::whois(domain, "connection reset"))
        });
        let source = FakeSource::new(&[("pkg", &["p@broken.net"])]);
        let orchestrator = orchestrator(source, provider.clone(), 1);

        let (events, outcome) = run_to_end(&orchestrator, &["pkg"], &CancellationToken::new()).await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(
            rows_of(&events),
            vec![ResolutionRow::new("pkg", "broken.net", ExpirationResult::Error)]
        );
        assert_eq!(provider.call_count(), 2);
        assert_eq!(orchestrator.cache().get("broken.net"), None);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let provider = FakeProvider::new(ProviderKind::Native, |domain| {
            Err(ExpiryCheckError::invalid_input(domain, "not a domain name"))
        });
        let source = FakeSource::new(&[("pkg", &["p@bad..name"])]);
        let orchestrator = orchestrator(source, provider.clone(), 1);

        let (events, outcome) = run_to_end(&orchestrator, &["pkg"], &CancellationToken::new()).await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(
            rows_of(&events),
            vec![ResolutionRow::new("pkg", "bad..name", ExpirationResult::Error)]
        );
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_second_attempt_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = FakeProvider::new(ProviderKind::Native, move |domain| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ExpiryCheckError::whois(domain, "timeout"))
            } else {
                Ok(date(2027, 2, 2))
            }
        });
        let source = FakeSource::new(&[("pkg", &["p@flaky.org"])]);
        let orchestrator = orchestrator(source, provider, 1);

        let (events, _) = run_to_end(&orchestrator, &["pkg"], &CancellationToken::new()).await;
        assert_eq!(rows_of(&events)[0].expiration, date(2027, 2, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_survives_runs_until_cleared() {
        let provider = FakeProvider::returning(ProviderKind::Native, ExpirationResult::Unknown);
        let source = FakeSource::new(&[("a", &["p@shared.com"]), ("b", &["q@shared.com"])]);
        let orchestrator = orchestrator(source, provider.clone(), 4);
        let cancel = CancellationToken::new();

        let (events, _) = run_to_end(&orchestrator, &["a", "b"], &cancel).await;
        assert_eq!(rows_of(&events).len(), 2);
        assert_eq!(provider.call_count(), 1);

        run_to_end(&orchestrator, &["a"], &cancel).await;
        assert_eq!(provider.call_count(), 1);

        orchestrator.cache().clear();
        run_to_end(&orchestrator, &["a"], &cancel).await;
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_registry_package_yields_no_rows() {
        let provider = FakeProvider::returning(ProviderKind::Native, ExpirationResult::Unknown);
        let orchestrator = orchestrator(FakeSource::new(&[]), provider, 1);

        let (events, outcome) =
            run_to_end(&orchestrator, &["does-not-exist"], &CancellationToken::new()).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert!(rows_of(&events).is_empty());
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_run_and_already_running() {
        let source = Arc::new(FakeSource {
            versions: HashMap::from([("slow".to_string(), version_with(&["p@slow.io"]))]),
            delay: Some(Duration::from_millis(200)),
        });
        let provider = FakeProvider::returning(ProviderKind::Native, date(2030, 3, 3));
        let orchestrator = orchestrator(source, provider, 1);

        let handle = orchestrator.spawn(names(&["slow"])).unwrap();
        assert!(orchestrator.is_running());

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = orchestrator
            .run(&names(&["slow"]), &tx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExpiryCheckError::AlreadyRunning));
        assert!(matches!(
            orchestrator.spawn(names(&["slow"])),
            Err(ExpiryCheckError::AlreadyRunning)
        ));

        let (rows, outcome) = handle.collect().await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(rows, vec![ResolutionRow::new("slow", "slow.io", date(2030, 3, 3))]);
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_dropped_receiver_fails_the_run() {
        let source = FakeSource::new(&[("pkg", &["p@a.com"])]);
        let provider = FakeProvider::returning(ProviderKind::Native, ExpirationResult::Unknown);
        let orchestrator = orchestrator(source, provider, 1);

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let outcome = orchestrator
            .run(&names(&["pkg"]), &tx, &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_panicking_provider_fails_spawned_run() {
        let source = FakeSource::new(&[("pkg", &["p@a.com"])]);
        let provider = FakeProvider::new(ProviderKind::Native, |_| panic!("provider bug"));
        let orchestrator = orchestrator(source, provider, 1);

        let handle = orchestrator.spawn(names(&["pkg"])).unwrap();
        let (_, outcome) = handle.collect().await;
        assert!(matches!(outcome, RunOutcome::Failed(_)));
        assert!(!orchestrator.is_running());
    }

    #[test]
    fn test_summary_counts() {
        let rows = vec![
            ResolutionRow::new("a", "old.com", date(2020, 1, 1)),
            ResolutionRow::new("a", "new.com", date(2040, 1, 1)),
            ResolutionRow::new("b", "none.com", ExpirationResult::Unknown),
            ResolutionRow::new("c", "bad.com", ExpirationResult::Error),
        ];
        let summary =
            BatchSummary::from_rows(&rows, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.known, 2);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.lapsing, vec![rows[0].clone()]);
    }
}
