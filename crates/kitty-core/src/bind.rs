//! Binding engine
//!
//! Applies a [`FlatMap`] onto the [`SettingsTree`] through closed tables of
//! recognised field paths. Scalars are assigned individually; the executor
//! collection is rebuilt from `executors[i].<field>` keys and swapped in as
//! a whole. Conversion problems are collected into [`BindResult`], never
//! raised.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::convert::{
    optional_string, parse_bool, parse_duration, parse_http_url, parse_percent, parse_u64,
    parse_usize, TimeUnit,
};
use crate::decode::FlatMap;
use crate::error::BindError;
use crate::pool::PoolSetting;
use crate::settings::{Settings, SettingsTree};

/// Namespace every recognised key lives under.
pub const DEFAULT_ROOT_PREFIX: &str = "kitty.threadpools";

const EXECUTORS: &str = "executors";

/// Outcome of one bind call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindResult {
    /// Scalar fields assigned plus fields of accepted pool records.
    pub applied_field_count: usize,
    pub errors: Vec<BindError>,
}

impl BindResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn record_errors(&self) -> impl Iterator<Item = &BindError> {
        self.errors.iter().filter(|e| e.is_record_invariant())
    }
}

type ScalarSetter = fn(&mut Settings, &str) -> Result<(), String>;

struct ScalarField {
    name: &'static str,
    set: ScalarSetter,
}

static SCALAR_FIELDS: &[ScalarField] = &[
    ScalarField {
        name: "nacosDataId",
        set: |s, v| {
            s.nacos_data_id = optional_string(v);
            Ok(())
        },
    },
    ScalarField {
        name: "nacosGroup",
        set: |s, v| {
            s.nacos_group = optional_string(v);
            Ok(())
        },
    },
    ScalarField {
        name: "nacosWaitRefreshConfigSeconds",
        set: |s, v| {
            s.nacos_wait_refresh_config_seconds = parse_u64(v)?;
            Ok(())
        },
    },
    ScalarField {
        name: "apolloNamespace",
        set: |s, v| {
            s.apollo_namespace = optional_string(v);
            Ok(())
        },
    },
    ScalarField {
        name: "alarmApiUrl",
        set: |s, v| {
            s.alarm_api_url = parse_http_url(v)?;
            Ok(())
        },
    },
    ScalarField {
        name: "accessToken",
        set: |s, v| {
            s.access_token = optional_string(v);
            Ok(())
        },
    },
    ScalarField {
        name: "secret",
        set: |s, v| {
            s.secret = optional_string(v);
            Ok(())
        },
    },
    ScalarField {
        name: "alarmTimeInterval",
        set: |s, v| {
            s.alarm_time_interval = parse_u64(v)?;
            Ok(())
        },
    },
    ScalarField {
        name: "owner",
        set: |s, v| {
            s.owner = optional_string(v);
            Ok(())
        },
    },
];

/// `keepAliveTime` is resolved after `unit` is known.
#[derive(Debug, Clone, Copy)]
enum KeepAlive {
    Units(u64),
    Exact(Duration),
}

fn parse_keep_alive(value: &str) -> Result<KeepAlive, String> {
    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        parse_u64(trimmed).map(KeepAlive::Units)
    } else {
        parse_duration(trimmed, TimeUnit::Seconds).map(KeepAlive::Exact)
    }
}

#[derive(Debug, Default)]
struct PoolDraft {
    setting: PoolSetting,
    keep_alive: Option<KeepAlive>,
    unit: TimeUnit,
}

type PoolSetter = fn(&mut PoolDraft, &str) -> Result<(), String>;

struct PoolField {
    names: &'static [&'static str],
    set: PoolSetter,
}

static POOL_FIELDS: &[PoolField] = &[
    PoolField {
        names: &["threadPoolName", "name"],
        set: |d, v| {
            d.setting.name = v.trim().to_string();
            Ok(())
        },
    },
    PoolField {
        names: &["corePoolSize", "coreSize"],
        set: |d, v| {
            d.setting.core_size = parse_usize(v)?;
            Ok(())
        },
    },
    PoolField {
        names: &["maximumPoolSize", "maxPoolSize", "maxSize"],
        set: |d, v| {
            d.setting.max_size = parse_usize(v)?;
            Ok(())
        },
    },
    PoolField {
        names: &["queueCapacity"],
        set: |d, v| {
            d.setting.queue_capacity = parse_usize(v)?;
            Ok(())
        },
    },
    PoolField {
        names: &["keepAliveTime", "keepAlive"],
        set: |d, v| {
            d.keep_alive = Some(parse_keep_alive(v)?);
            Ok(())
        },
    },
    PoolField {
        names: &["unit", "timeUnit"],
        set: |d, v| {
            d.unit = v.parse()?;
            Ok(())
        },
    },
    PoolField {
        names: &["rejectedExecutionType", "rejectionPolicy"],
        set: |d, v| {
            d.setting.rejection_policy = v.parse()?;
            Ok(())
        },
    },
    PoolField {
        names: &["queueCapacityThreshold", "alarmThreshold"],
        set: |d, v| {
            d.setting.queue_capacity_threshold = parse_percent(v)?;
            Ok(())
        },
    },
    PoolField {
        names: &["fair"],
        set: |d, v| {
            d.setting.fair = parse_bool(v)?;
            Ok(())
        },
    },
];

/// Relaxed form of a name: case-insensitive, `-` and `_` ignored.
fn canonical(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn scalar_field(name: &str) -> Option<&'static ScalarField> {
    let wanted = canonical(name);
    SCALAR_FIELDS
        .iter()
        .find(|field| canonical(field.name) == wanted)
}

fn pool_field(name: &str) -> Option<&'static PoolField> {
    let wanted = canonical(name);
    POOL_FIELDS
        .iter()
        .find(|field| field.names.iter().any(|n| canonical(n) == wanted))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Name(&'a str),
    Index(&'a str),
}

/// Split `a.b[0].c` into names and bracketed indices. `None` when a
/// bracket is never closed.
fn segments(key: &str) -> Option<Vec<Segment<'_>>> {
    let mut out = Vec::new();
    let mut rest = key;

    while !rest.is_empty() {
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        if end > 0 {
            out.push(Segment::Name(&rest[..end]));
        }
        rest = &rest[end..];
        if let Some(after) = rest.strip_prefix('.') {
            rest = after;
        } else if rest.starts_with('[') {
            let close = rest.find(']')?;
            out.push(Segment::Index(&rest[1..close]));
            rest = &rest[close + 1..];
        }
    }
    Some(out)
}

enum Target {
    Scalar(&'static ScalarField),
    Pool {
        index: usize,
        field: &'static PoolField,
    },
    Ignored,
}

type PoolEntries<'a> = BTreeMap<usize, Vec<(&'a str, &'a str, &'static PoolField)>>;

/// Keep one entry per field. Keys that relax to the same field are
/// visited in map order and the last one wins.
fn upsert<'a, F>(
    entries: &mut Vec<(&'a str, &'a str, &'static F)>,
    key: &'a str,
    value: &'a str,
    field: &'static F,
) {
    match entries.iter_mut().find(|(_, _, f)| std::ptr::eq(*f, field)) {
        Some(slot) => {
            debug!(key, shadowed = slot.0, "Config key overrides an equivalent key");
            *slot = (key, value, field);
        }
        None => entries.push((key, value, field)),
    }
}

/// Binds flat mappings under one root prefix.
#[derive(Debug, Clone)]
pub struct Binder {
    prefix: String,
    prefix_segments: Vec<String>,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_PREFIX)
    }
}

impl Binder {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix_segments = prefix
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(canonical)
            .collect();
        Self {
            prefix,
            prefix_segments,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Apply `map` onto `tree` in place.
    ///
    /// Missing keys leave prior values untouched. The executor collection
    /// is replaced only when at least one record in the payload is valid.
    /// The whole call runs under the tree's writer lock.
    pub fn bind(&self, map: &FlatMap, tree: &SettingsTree) -> BindResult {
        let mut scalars = Vec::new();
        let mut pools: PoolEntries<'_> = BTreeMap::new();

        for (key, value) in map {
            match self.resolve(key) {
                Target::Scalar(field) => upsert(&mut scalars, key, value, field),
                Target::Pool { index, field } => {
                    upsert(pools.entry(index).or_default(), key, value, field);
                }
                Target::Ignored => debug!(key = %key, "Ignoring unrecognised config key"),
            }
        }

        if scalars.is_empty() && pools.is_empty() {
            return BindResult::default();
        }

        let mut result = BindResult::default();
        let rebuilt = self.build_pools(pools, &mut result);

        tree.update(move |settings| {
            for (key, value, field) in scalars {
                match (field.set)(settings, value) {
                    Ok(()) => result.applied_field_count += 1,
                    Err(cause) => {
                        warn!(key, %cause, "Rejected config value");
                        result.errors.push(BindError::field(key, cause));
                    }
                }
            }
            if let Some((records, applied)) = rebuilt {
                settings.executors = Arc::new(records);
                result.applied_field_count += applied;
            }
            let applied = result.applied_field_count;
            (result, applied)
        })
    }

    fn resolve(&self, key: &str) -> Target {
        let Some(segments) = segments(key) else {
            return Target::Ignored;
        };
        let depth = self.prefix_segments.len();
        if segments.len() <= depth {
            return Target::Ignored;
        }
        let in_namespace = segments
            .iter()
            .zip(&self.prefix_segments)
            .all(|(segment, wanted)| matches!(segment, Segment::Name(n) if canonical(n) == *wanted));
        if !in_namespace {
            return Target::Ignored;
        }

        match &segments[depth..] {
            [Segment::Name(name)] => scalar_field(name).map_or(Target::Ignored, Target::Scalar),
            [Segment::Name(collection), Segment::Index(index), Segment::Name(name)]
                if canonical(collection) == EXECUTORS =>
            {
                match (index.trim().parse::<usize>(), pool_field(name)) {
                    (Ok(index), Some(field)) => Target::Pool { index, field },
                    _ => Target::Ignored,
                }
            }
            _ => Target::Ignored,
        }
    }

    /// Build one record per index in ascending order. Returns `None` when
    /// there is nothing valid to publish.
    fn build_pools(
        &self,
        pools: PoolEntries<'_>,
        result: &mut BindResult,
    ) -> Option<(Vec<PoolSetting>, usize)> {
        if pools.is_empty() {
            return None;
        }

        let mut records = Vec::with_capacity(pools.len());
        let mut applied = 0;
        for (index, entries) in pools {
            if let Some((record, fields)) = self.build_pool(index, entries, &mut result.errors) {
                records.push(record);
                applied += fields;
            }
        }

        if records.is_empty() {
            warn!("No valid executor records in payload, keeping current executors");
            return None;
        }
        Some((records, applied))
    }

    fn build_pool(
        &self,
        index: usize,
        entries: Vec<(&str, &str, &'static PoolField)>,
        errors: &mut Vec<BindError>,
    ) -> Option<(PoolSetting, usize)> {
        let path = format!("{}.{EXECUTORS}[{index}]", self.prefix);
        let mut draft = PoolDraft::default();
        let mut applied = 0;
        let mut failed = false;

        for (key, value, field) in entries {
            match (field.set)(&mut draft, value) {
                Ok(()) => applied += 1,
                Err(cause) => {
                    warn!(key, %cause, "Rejected executor value");
                    errors.push(BindError::field(key, cause));
                    failed = true;
                }
            }
        }

        match draft.keep_alive {
            Some(KeepAlive::Units(amount)) => match draft.unit.duration(amount) {
                Some(keep_alive) => draft.setting.keep_alive = keep_alive,
                None => {
                    errors.push(BindError::field(
                        format!("{path}.keepAliveTime"),
                        format!("duration out of range: {amount} {:?}", draft.unit),
                    ));
                    failed = true;
                }
            },
            Some(KeepAlive::Exact(keep_alive)) => draft.setting.keep_alive = keep_alive,
            None => {}
        }

        if failed {
            warn!(index, "Dropping executor record with invalid fields");
            return None;
        }

        if let Err(kind) = draft.setting.validate() {
            warn!(index, %kind, "Dropping executor record");
            errors.push(BindError { path, kind });
            return None;
        }

        Some((draft.setting, applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("kitty.threadpools.executors[0].coreSize"),
            Some(vec![
                Segment::Name("kitty"),
                Segment::Name("threadpools"),
                Segment::Name("executors"),
                Segment::Index("0"),
                Segment::Name("coreSize"),
            ])
        );
        assert_eq!(segments("owner"), Some(vec![Segment::Name("owner")]));
        assert_eq!(segments("executors[0"), None);
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical("nacosDataId"), canonical("nacos-data-id"));
        assert_eq!(canonical("nacosDataId"), canonical("NACOS_DATA_ID"));
        assert_ne!(canonical("nacosDataId"), canonical("nacosGroup"));
    }

    #[test]
    fn test_resolve_scalar_and_pool_keys() {
        let binder = Binder::default();
        assert!(matches!(
            binder.resolve("kitty.threadpools.owner"),
            Target::Scalar(field) if field.name == "owner"
        ));
        assert!(matches!(
            binder.resolve("kitty.thread-pools.alarm-api-url"),
            Target::Scalar(field) if field.name == "alarmApiUrl"
        ));
        assert!(matches!(
            binder.resolve("kitty.threadpools.executors[7].coreSize"),
            Target::Pool { index: 7, .. }
        ));
    }

    #[test]
    fn test_resolve_ignores_foreign_and_unknown_keys() {
        let binder = Binder::default();
        for key in [
            "spring.application.name",
            "kitty.threadpools",
            "kitty.threadpools.unknownField",
            "kitty.threadpools.executors[x].coreSize",
            "kitty.threadpools.executors[0].colour",
            "kitty.threadpools.executors[0]",
            "kitty.threadpools.owner.nested",
            "kitty.other.owner",
        ] {
            assert!(matches!(binder.resolve(key), Target::Ignored), "{key}");
        }
    }

    #[test]
    fn test_custom_prefix() {
        let binder = Binder::new("app.pools");
        assert_eq!(binder.prefix(), "app.pools");
        assert!(matches!(binder.resolve("app.pools.owner"), Target::Scalar(_)));
        assert!(matches!(
            binder.resolve("kitty.threadpools.owner"),
            Target::Ignored
        ));
    }

    #[test]
    fn test_pool_field_aliases() {
        assert!(std::ptr::eq(
            pool_field("coreSize").unwrap(),
            pool_field("core-pool-size").unwrap()
        ));
        assert!(pool_field("rejectionPolicy").is_some());
        assert!(pool_field("colour").is_none());
    }

    #[test]
    fn test_keep_alive_parsing() {
        assert!(matches!(parse_keep_alive("30"), Ok(KeepAlive::Units(30))));
        assert!(matches!(
            parse_keep_alive("500ms"),
            Ok(KeepAlive::Exact(d)) if d == Duration::from_millis(500)
        ));
        assert!(parse_keep_alive("").is_err());
        assert!(parse_keep_alive("soon").is_err());
    }
}
