// expiry-check-lib/tests/integration.rs

//! Integration tests for expiry-check-lib exports and batch behavior

use async_trait::async_trait;
use chrono::NaiveDate;
use expiry_check_lib::{
    BatchEvent, BatchOrchestrator, CancellationToken, CheckConfig, ExpirationCache,
    ExpirationProvider, ExpirationResult, ExpiryCheckError, MetadataSource, NativeWhoisProvider,
    ProviderChain, ProviderConfig, ProviderKind, RegistryMetadata, ResolutionRow, RunOutcome,
    WhoisClient,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Registry stand-in keyed by package name.
struct StaticRegistry {
    versions: HashMap<String, Value>,
}

impl StaticRegistry {
    fn new(entries: &[(&str, Value)]) -> Arc<Self> {
        Arc::new(Self {
            versions: entries
                .iter()
                .map(|(name, version)| (name.to_string(), version.clone()))
                .collect(),
        })
    }
}

#[async_trait]
impl MetadataSource for StaticRegistry {
    async fn fetch(&self, package: &str) -> Option<RegistryMetadata> {
        self.versions.get(package).map(|version| RegistryMetadata {
            name: package.to_string(),
            latest_version: "1.0.0".to_string(),
            version: version.clone(),
        })
    }
}

/// Provider answering from a table and counting lookups.
struct TableProvider {
    kind: ProviderKind,
    answers: HashMap<String, Result<ExpirationResult, String>>,
    lookups: AtomicUsize,
}

impl TableProvider {
    fn new(kind: ProviderKind, answers: &[(&str, Result<ExpirationResult, &str>)]) -> Arc<Self> {
        Arc::new(Self {
            kind,
            answers: answers
                .iter()
                .map(|(domain, answer)| {
                    (domain.to_string(), answer.clone().map_err(str::to_string))
                })
                .collect(),
            lookups: AtomicUsize::new(0),
        })
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExpirationProvider for TableProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn resolve(&self, domain: &str) -> Result<ExpirationResult, ExpiryCheckError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(domain) {
            Some(Ok(result)) => Ok(*result),
            Some(Err(message)) => Err(ExpiryCheckError::provider(self.kind.to_string(), domain, message.clone())),
            None => Ok(ExpirationResult::Unknown),
        }
    }
}

fn known(y: i32, m: u32, d: u32) -> ExpirationResult {
    ExpirationResult::Known(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn lines(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_first_provider_with_a_date_wins() {
    let registry = StaticRegistry::new(&[(
        "left-pad",
        json!({
            "_npmUser": { "email": "a@Foo.com" },
            "maintainers": [{ "email": "b@bar.com" }, { "email": "c@foo.com" }, { "name": "no-email" }]
        }),
    )]);
    let native = TableProvider::new(ProviderKind::Native, &[("foo.com", Ok(known(2030, 1, 15)))]);
    let docker = TableProvider::new(
        ProviderKind::Docker,
        &[("foo.com", Ok(known(1999, 1, 1))), ("bar.com", Ok(known(2026, 7, 4)))],
    );
    let providers: Vec<Arc<dyn ExpirationProvider>> = vec![native.clone(), docker.clone()];

    let orchestrator = BatchOrchestrator::new(
        registry,
        ProviderChain::new(providers),
        Arc::new(ExpirationCache::new()),
        CheckConfig::default(),
    );
    let (rows, outcome) = orchestrator
        .spawn(lines(&["left-pad"]))
        .unwrap()
        .collect()
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    let mut rows = rows;
    rows.sort_by(|a, b| a.domain.cmp(&b.domain));
    assert_eq!(
        rows,
        vec![
            ResolutionRow::new("left-pad", "bar.com", known(2026, 7, 4)),
            ResolutionRow::new("left-pad", "foo.com", known(2030, 1, 15)),
        ]
    );
    assert_eq!(native.lookups(), 2);
    assert_eq!(docker.lookups(), 1);
}

#[tokio::test]
async fn test_cached_domain_skips_providers() {
    let registry = StaticRegistry::new(&[("left-pad", json!({ "_npmUser": { "email": "x@example.com" } }))]);
    let native = TableProvider::new(ProviderKind::Native, &[]);
    let providers: Vec<Arc<dyn ExpirationProvider>> = vec![native.clone()];

    let cache = Arc::new(ExpirationCache::new());
    cache.put("example.com", known(2025, 6, 1));

    let orchestrator = BatchOrchestrator::new(
        registry,
        ProviderChain::new(providers),
        cache,
        CheckConfig::default(),
    );
    let (rows, outcome) = orchestrator
        .spawn(lines(&["left-pad", "", "  "]))
        .unwrap()
        .collect()
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        rows,
        vec![ResolutionRow::new("left-pad", "example.com", known(2025, 6, 1))]
    );
    assert_eq!(native.lookups(), 0);
}

#[tokio::test]
async fn test_provider_failure_becomes_error_row() {
    let registry = StaticRegistry::new(&[
        ("broken", json!({ "_npmUser": { "email": "x@down.net" } })),
        ("fine", json!({ "_npmUser": { "email": "y@up.net" } })),
    ]);
    let native = TableProvider::new(
        ProviderKind::Native,
        &[("down.net", Err("connection refused")), ("up.net", Ok(known(2028, 8, 8)))],
    );
    let providers: Vec<Arc<dyn ExpirationProvider>> = vec![native.clone()];
    let cache = Arc::new(ExpirationCache::new());

    let orchestrator = BatchOrchestrator::new(
        registry,
        ProviderChain::new(providers),
        cache.clone(),
        CheckConfig::default().with_concurrency(1),
    );
    let (rows, outcome) = orchestrator
        .spawn(lines(&["broken", "fine"]))
        .unwrap()
        .collect()
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        rows,
        vec![
            ResolutionRow::new("broken", "down.net", ExpirationResult::Error),
            ResolutionRow::new("fine", "up.net", known(2028, 8, 8)),
        ]
    );
    // two attempts for the failing domain, one for the healthy one
    assert_eq!(native.lookups(), 3);
    assert_eq!(cache.get("down.net"), None);
    assert_eq!(cache.get("up.net"), Some(known(2028, 8, 8)));
}

/// Requests cancellation while resolving one particular domain.
struct CancelOn {
    domain: &'static str,
    token: CancellationToken,
}

#[async_trait]
impl ExpirationProvider for CancelOn {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    async fn resolve(&self, domain: &str) -> Result<ExpirationResult, ExpiryCheckError> {
        if domain == self.domain {
            self.token.cancel();
        }
        Ok(ExpirationResult::Unknown)
    }
}

#[tokio::test]
async fn test_cancellation_stops_between_domains() {
    let registry = StaticRegistry::new(&[
        ("one", json!({ "_npmUser": { "email": "a@one.io" } })),
        ("two", json!({ "_npmUser": { "email": "a@two.io" }, "maintainers": [{ "email": "b@three.io" }] })),
        ("four", json!({ "_npmUser": { "email": "a@four.io" } })),
    ]);
    let cancel = CancellationToken::new();
    let providers: Vec<Arc<dyn ExpirationProvider>> = vec![Arc::new(CancelOn {
        domain: "two.io",
        token: cancel.clone(),
    })];
    let orchestrator = BatchOrchestrator::new(
        registry,
        ProviderChain::new(providers),
        Arc::new(ExpirationCache::new()),
        CheckConfig::default().with_concurrency(1),
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = orchestrator
        .run(&lines(&["one", "two", "four"]), &tx, &cancel)
        .await
        .unwrap();
    drop(tx);

    let mut rows = Vec::new();
    while let Some(event) = rx.recv().await {
        if let BatchEvent::Row(row) = event {
            rows.push(row);
        }
    }

    assert_eq!(outcome, RunOutcome::Cancelled);
    let domains: Vec<&str> = rows.iter().map(|row| row.domain.as_str()).collect();
    assert_eq!(domains, vec!["one.io", "two.io"]);
}

#[cfg(feature = "native")]
#[test]
fn test_chain_from_default_config_is_native_only() {
    let chain = ProviderChain::from_config(&ProviderConfig::default(), &CheckConfig::default())
        .unwrap();
    assert_eq!(chain.kinds(), vec![ProviderKind::Native]);

    let err = BatchOrchestrator::from_config(
        &ProviderConfig::none(),
        CheckConfig::default(),
        Arc::new(ExpirationCache::new()),
    )
    .err()
    .unwrap();
    assert_eq!(err.to_string(), "Configuration error: No whois provider has been selected");
}

/// Answers the IANA-style root query with a referral to `registry`, and the
/// registry query with an expiry line.
async fn fake_whois_pair() -> String {
    let registry = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let registry_addr = registry.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = registry.accept().await {
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"Domain Name: EXAMPLE.COM\r\nRegistry Expiry Date: 2031-08-13T04:00:00Z\r\n")
                .await;
        }
    });

    let root = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let root_addr = root.local_addr().unwrap().to_string();
    let referral = format!("% IANA WHOIS server\n\nrefer:        {}\n", registry_addr);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = root.accept().await {
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(referral.as_bytes()).await;
        }
    });

    root_addr
}

#[test]
fn test_native_provider_follows_referral() {
    tokio_test::block_on(async {
        let root = fake_whois_pair().await;
        let provider = NativeWhoisProvider::new(WhoisClient::new().with_root_server(root));

        assert_eq!(provider.kind(), ProviderKind::Native);
        assert_eq!(
            provider.resolve("example.com").await.unwrap(),
            known(2031, 8, 13)
        );
    });
}
