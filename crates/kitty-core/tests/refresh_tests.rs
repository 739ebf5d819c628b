//! Integration tests for the refresh adapter
//! Uses paused tokio time so the settle wait costs nothing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kitty_core::{
    ConfigSource, DecodeError, KittyError, RawConfig, Refresher, Result, SettingsTree,
};
use tokio::time::Instant;

struct StaticSource {
    raw: RawConfig,
    fetches: AtomicUsize,
}

impl StaticSource {
    fn new(raw: RawConfig) -> Self {
        Self {
            raw,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    async fn fetch(&self) -> Result<RawConfig> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.raw.clone())
    }
}

struct FailingSource;

#[async_trait]
impl ConfigSource for FailingSource {
    async fn fetch(&self) -> Result<RawConfig> {
        Err(KittyError::Source("connection refused".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_notification_waits_for_settle_duration() {
    let tree = SettingsTree::shared();
    let refresher = Refresher::new(Arc::clone(&tree));
    refresher
        .refresh(&RawConfig::properties(
            "kitty.threadpools.nacosWaitRefreshConfigSeconds=5",
        ))
        .unwrap();

    let source = StaticSource::new(RawConfig::yaml(
        "kitty.threadpools:\n  owner: alice\n",
    ));
    let started = Instant::now();
    let result = refresher.on_notification(&source).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(result.applied_field_count, 1);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(tree.read().owner.as_deref(), Some("alice"));
}

#[tokio::test(start_paused = true)]
async fn test_zero_settle_duration_fetches_immediately() {
    let tree = SettingsTree::shared();
    let refresher = Refresher::new(Arc::clone(&tree));
    refresher
        .refresh(&RawConfig::properties(
            "kitty.threadpools.nacosWaitRefreshConfigSeconds=0",
        ))
        .unwrap();

    let source = StaticSource::new(RawConfig::properties("kitty.threadpools.owner=bob"));
    let started = Instant::now();
    refresher.on_notification(&source).await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(tree.read().owner.as_deref(), Some("bob"));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_notifications_converge() {
    let tree = SettingsTree::shared();
    let refresher = Refresher::new(Arc::clone(&tree));
    let source = StaticSource::new(RawConfig::properties(
        "kitty.threadpools.executors[0].name=orders\n\
         kitty.threadpools.executors[0].coreSize=2\n\
         kitty.threadpools.executors[0].maxSize=4\n",
    ));

    refresher.on_notification(&source).await.unwrap();
    let first = tree.snapshot();
    refresher.on_notification(&source).await.unwrap();

    assert_eq!(tree.snapshot(), first);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_is_returned() {
    let tree = SettingsTree::shared();
    let refresher = Refresher::new(Arc::clone(&tree));

    let err = refresher.on_notification(&FailingSource).await.unwrap_err();

    assert!(matches!(err, KittyError::Source(_)));
    assert_eq!(tree.version(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_decode_failure_leaves_tree_unchanged() {
    let tree = SettingsTree::shared();
    let refresher = Refresher::new(Arc::clone(&tree));
    refresher
        .refresh(&RawConfig::properties("kitty.threadpools.owner=alice"))
        .unwrap();
    let before = tree.snapshot();

    let source = StaticSource::new(RawConfig::yaml("# nothing\n"));
    let err = refresher.on_notification(&source).await.unwrap_err();

    assert!(matches!(err, KittyError::Decode(DecodeError::EmptyDocument)));
    assert_eq!(tree.snapshot(), before);
    assert_eq!(tree.version(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_properties_payload() {
    let tree = SettingsTree::shared();
    let refresher = Refresher::new(Arc::clone(&tree));
    let source = StaticSource::new(RawConfig::properties(
        b"kitty.threadpools.owner=\xc3\x28".to_vec(),
    ));

    let err = refresher.on_notification(&source).await.unwrap_err();

    assert!(matches!(
        err,
        KittyError::Decode(DecodeError::MalformedLine { line: 1, .. })
    ));
    assert!(tree.read().owner.is_none());
}
