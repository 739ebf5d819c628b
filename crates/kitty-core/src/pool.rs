//! Pool setting records
//!
//! A [`PoolSetting`] is plain data describing one worker pool's tunables.
//! Records are rebuilt from scratch on every bind; they carry no identity
//! across updates.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::BindErrorKind;

pub const DEFAULT_CORE_SIZE: usize = 1;
pub const DEFAULT_MAX_SIZE: usize = 16;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_QUEUE_CAPACITY_THRESHOLD: u8 = 80;

/// What a pool does with a task it cannot accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RejectPolicy {
    #[default]
    Abort,
    Discard,
    DiscardOldest,
    CallerRuns,
    /// A handler registered by the consuming service under this name.
    Custom(String),
}

impl RejectPolicy {
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl FromStr for RejectPolicy {
    type Err = String;

    /// Accepts `ABORT`, `AbortPolicy`, `abort-policy` and friends for the
    /// built-ins; any other non-empty name is a custom policy.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err("rejection policy must not be empty".to_string());
        }
        let canonical: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let canonical = canonical.strip_suffix("policy").unwrap_or(&canonical);
        Ok(match canonical {
            "abort" => Self::Abort,
            "discard" => Self::Discard,
            "discardoldest" => Self::DiscardOldest,
            "callerruns" => Self::CallerRuns,
            _ => Self::Custom(name.to_string()),
        })
    }
}

impl fmt::Display for RejectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "ABORT"),
            Self::Discard => write!(f, "DISCARD"),
            Self::DiscardOldest => write!(f, "DISCARD_OLDEST"),
            Self::CallerRuns => write!(f, "CALLER_RUNS"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl Serialize for RejectPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One worker pool's tunable parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSetting {
    pub name: String,
    pub core_size: usize,
    pub max_size: usize,
    /// 0 means direct hand-off: tasks are never queued.
    pub queue_capacity: usize,
    #[serde(serialize_with = "crate::convert::serialize_duration")]
    pub keep_alive: Duration,
    pub rejection_policy: RejectPolicy,
    /// Queue saturation percentage (0-100) at which an alarm is raised.
    pub queue_capacity_threshold: u8,
    pub fair: bool,
}

impl Default for PoolSetting {
    fn default() -> Self {
        Self {
            name: String::new(),
            core_size: DEFAULT_CORE_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            keep_alive: Duration::ZERO,
            rejection_policy: RejectPolicy::default(),
            queue_capacity_threshold: DEFAULT_QUEUE_CAPACITY_THRESHOLD,
            fair: false,
        }
    }
}

impl PoolSetting {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_sizes(mut self, core_size: usize, max_size: usize) -> Self {
        self.core_size = core_size;
        self.max_size = max_size;
        self
    }

    /// Check the record-level invariants. Violations are rejected, never
    /// clamped.
    pub fn validate(&self) -> Result<(), BindErrorKind> {
        if self.core_size > self.max_size {
            return Err(BindErrorKind::RecordInvariant {
                core_size: self.core_size,
                max_size: self.max_size,
            });
        }
        Ok(())
    }

    /// Whether `queued` tasks reach the alarm threshold for this pool.
    pub fn is_queue_saturated(&self, queued: usize) -> bool {
        if self.queue_capacity == 0 {
            return false;
        }
        queued.saturating_mul(100)
            >= self
                .queue_capacity
                .saturating_mul(usize::from(self.queue_capacity_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_policy_builtin_spellings() {
        for raw in ["ABORT", "AbortPolicy", "abort-policy", "abort_policy"] {
            assert_eq!(raw.parse::<RejectPolicy>(), Ok(RejectPolicy::Abort), "{raw}");
        }
        assert_eq!(
            "DISCARD_OLDEST".parse::<RejectPolicy>(),
            Ok(RejectPolicy::DiscardOldest)
        );
        assert_eq!(
            "CallerRunsPolicy".parse::<RejectPolicy>(),
            Ok(RejectPolicy::CallerRuns)
        );
        assert_eq!("discard".parse::<RejectPolicy>(), Ok(RejectPolicy::Discard));
    }

    #[test]
    fn test_reject_policy_custom() {
        let policy: RejectPolicy = "LogAndRetryPolicy".parse().unwrap();
        assert!(policy.is_custom());
        assert_eq!(policy.to_string(), "LogAndRetryPolicy");
        assert!("  ".parse::<RejectPolicy>().is_err());
    }

    #[test]
    fn test_reject_policy_display() {
        assert_eq!(RejectPolicy::DiscardOldest.to_string(), "DISCARD_OLDEST");
        assert_eq!(RejectPolicy::CallerRuns.to_string(), "CALLER_RUNS");
    }

    #[test]
    fn test_pool_setting_defaults_are_valid() {
        let pool = PoolSetting::default();
        assert_eq!(pool.core_size, DEFAULT_CORE_SIZE);
        assert_eq!(pool.max_size, DEFAULT_MAX_SIZE);
        assert!(pool.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_core_above_max() {
        let pool = PoolSetting::named("orders").with_sizes(10, 5);
        assert_eq!(
            pool.validate(),
            Err(BindErrorKind::RecordInvariant {
                core_size: 10,
                max_size: 5
            })
        );

        let pool = PoolSetting::named("orders").with_sizes(5, 5);
        assert!(pool.validate().is_ok());
    }

    #[test]
    fn test_queue_saturation() {
        let mut pool = PoolSetting::named("io");
        pool.queue_capacity = 200;
        pool.queue_capacity_threshold = 80;
        assert!(!pool.is_queue_saturated(159));
        assert!(pool.is_queue_saturated(160));

        pool.queue_capacity = 0;
        assert!(!pool.is_queue_saturated(1_000));
    }

    #[test]
    fn test_serialize_pool_setting() {
        let mut pool = PoolSetting::named("io");
        pool.keep_alive = Duration::from_secs(30);
        pool.rejection_policy = RejectPolicy::CallerRuns;
        let json = serde_json::to_value(&pool).unwrap();
        assert_eq!(json["name"], "io");
        assert_eq!(json["coreSize"], 1);
        assert_eq!(json["keepAlive"], "30s");
        assert_eq!(json["rejectionPolicy"], "CALLER_RUNS");
    }
}
