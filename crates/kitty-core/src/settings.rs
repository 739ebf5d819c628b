//! The settings tree
//!
//! [`SettingsTree`] is the single long-lived object holding the current
//! configuration. It is created once at startup, shared as
//! `Arc<SettingsTree>`, and mutated in place by the binder. Consumers must
//! hold on to the tree itself (its identity), not to a [`Settings`] value
//! copied out of it, to observe later updates.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use serde::Serialize;

use crate::convert::Redacted;
use crate::pool::PoolSetting;

pub const DEFAULT_REFRESH_WAIT_SECONDS: u64 = 1;
pub const DEFAULT_ALARM_INTERVAL_MINUTES: u64 = 1;

/// Plain values of the settings tree.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub nacos_data_id: Option<String>,
    pub nacos_group: Option<String>,
    /// Seconds to wait after a change notification before reading values.
    pub nacos_wait_refresh_config_seconds: u64,
    pub apollo_namespace: Option<String>,
    pub alarm_api_url: Option<String>,
    #[serde(serialize_with = "crate::convert::serialize_redacted")]
    pub access_token: Option<String>,
    #[serde(serialize_with = "crate::convert::serialize_redacted")]
    pub secret: Option<String>,
    /// Minimum minutes between two alarms.
    pub alarm_time_interval: u64,
    pub owner: Option<String>,
    /// Swapped as a whole, never edited element by element.
    pub executors: Arc<Vec<PoolSetting>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nacos_data_id: None,
            nacos_group: None,
            nacos_wait_refresh_config_seconds: DEFAULT_REFRESH_WAIT_SECONDS,
            apollo_namespace: None,
            alarm_api_url: None,
            access_token: None,
            secret: None,
            alarm_time_interval: DEFAULT_ALARM_INTERVAL_MINUTES,
            owner: None,
            executors: Arc::new(Vec::new()),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("nacos_data_id", &self.nacos_data_id)
            .field("nacos_group", &self.nacos_group)
            .field(
                "nacos_wait_refresh_config_seconds",
                &self.nacos_wait_refresh_config_seconds,
            )
            .field("apollo_namespace", &self.apollo_namespace)
            .field("alarm_api_url", &self.alarm_api_url)
            .field("access_token", &Redacted(&self.access_token))
            .field("secret", &Redacted(&self.secret))
            .field("alarm_time_interval", &self.alarm_time_interval)
            .field("owner", &self.owner)
            .field("executors", &self.executors)
            .finish()
    }
}

impl Settings {
    pub fn refresh_wait(&self) -> Duration {
        Duration::from_secs(self.nacos_wait_refresh_config_seconds)
    }

    pub fn alarm_interval(&self) -> Duration {
        Duration::from_secs(self.alarm_time_interval.saturating_mul(60))
    }

    pub fn executor(&self, name: &str) -> Option<&PoolSetting> {
        self.executors.iter().find(|pool| pool.name == name)
    }
}

#[derive(Debug, Default)]
struct TreeState {
    settings: Settings,
    version: u64,
    updated_at: Option<DateTime<Utc>>,
}

/// The process-wide, mutated-in-place settings object.
///
/// A single writer lock is held for the duration of one bind, so readers
/// observe either the complete pre-bind or the complete post-bind state.
#[derive(Debug, Default)]
pub struct SettingsTree {
    state: RwLock<TreeState>,
}

impl SettingsTree {
    /// Create a tree holding default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree ready to be handed to every consumer.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            state: RwLock::new(TreeState {
                settings,
                ..TreeState::default()
            }),
        }
    }

    /// Copy out the current values. Cheap: the pool collection is shared.
    pub fn snapshot(&self) -> Settings {
        self.state.read().settings.clone()
    }

    /// Borrow the current values without cloning. Blocks binds while held.
    pub fn read(&self) -> MappedRwLockReadGuard<'_, Settings> {
        RwLockReadGuard::map(self.state.read(), |state| &state.settings)
    }

    pub fn executors(&self) -> Arc<Vec<PoolSetting>> {
        Arc::clone(&self.state.read().settings.executors)
    }

    pub fn refresh_wait(&self) -> Duration {
        self.read().refresh_wait()
    }

    /// Incremented once for every bind that applied at least one field.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().updated_at
    }

    /// Run `f` under the writer lock. `f` reports how many fields it
    /// applied; the version only moves when that count is non-zero.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Settings) -> (R, usize)) -> R {
        let mut state = self.state.write();
        let (result, applied) = f(&mut state.settings);
        if applied > 0 {
            state.version += 1;
            state.updated_at = Some(Utc::now());
        }
        result
    }
}
