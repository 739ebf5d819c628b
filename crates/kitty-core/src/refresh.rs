//! Refresh adapter
//!
//! Glue between a remote config transport and the binder: wait for the
//! upstream change to settle, fetch the raw text, decode, bind, log.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::bind::{BindResult, Binder};
use crate::decode::ConfigFormat;
use crate::error::Result;
use crate::settings::SettingsTree;

/// Raw configuration text tagged with its serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConfig {
    pub format: ConfigFormat,
    pub content: Vec<u8>,
}

impl RawConfig {
    pub fn new(format: ConfigFormat, content: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            content: content.into(),
        }
    }

    pub fn properties(content: impl Into<Vec<u8>>) -> Self {
        Self::new(ConfigFormat::Properties, content)
    }

    pub fn yaml(content: impl Into<Vec<u8>>) -> Self {
        Self::new(ConfigFormat::Yaml, content)
    }
}

/// Delivers the authoritative raw text of a watched remote config.
///
/// Implemented by the transport that watches the remote source; retries
/// and timeouts belong to the implementation.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<RawConfig>;
}

/// Applies refreshed configuration onto the shared settings tree.
pub struct Refresher {
    tree: Arc<SettingsTree>,
    binder: Binder,
}

impl Refresher {
    pub fn new(tree: Arc<SettingsTree>) -> Self {
        Self::with_binder(tree, Binder::default())
    }

    pub fn with_binder(tree: Arc<SettingsTree>, binder: Binder) -> Self {
        Self { tree, binder }
    }

    pub fn tree(&self) -> &Arc<SettingsTree> {
        &self.tree
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Decode `raw` and bind it onto the tree.
    ///
    /// A decode failure is returned before binding starts and leaves the
    /// tree unchanged. Field and record problems are reported in the
    /// returned [`BindResult`].
    pub fn refresh(&self, raw: &RawConfig) -> Result<BindResult> {
        let map = raw.format.decode(&raw.content).map_err(|e| {
            warn!(format = %raw.format, error = %e, "Failed to decode config payload");
            e
        })?;
        debug!(format = %raw.format, keys = map.len(), "Decoded config payload");

        let result = self.binder.bind(&map, &self.tree);
        if result.is_clean() {
            info!(
                applied = result.applied_field_count,
                version = self.tree.version(),
                "Thread pool settings refreshed"
            );
        } else {
            warn!(
                applied = result.applied_field_count,
                errors = result.errors.len(),
                version = self.tree.version(),
                "Thread pool settings refreshed with errors"
            );
        }
        Ok(result)
    }

    /// Handle a change notification: wait for the configured settle
    /// duration, fetch the current text from `source`, then refresh.
    pub async fn on_notification(&self, source: &dyn ConfigSource) -> Result<BindResult> {
        let wait = self.tree.refresh_wait();
        if !wait.is_zero() {
            debug!(wait_secs = wait.as_secs(), "Waiting for config change to settle");
            tokio::time::sleep(wait).await;
        }

        let raw = source.fetch().await.map_err(|e| {
            warn!(error = %e, "Failed to fetch config payload");
            e
        })?;
        self.refresh(&raw)
    }
}
