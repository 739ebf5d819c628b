//! Kitty Core - live thread pool reconfiguration
//!
//! Decodes configuration payloads pushed through a remote config channel
//! (flat properties or nested YAML), binds them onto a single long-lived
//! [`SettingsTree`], and reports per-field problems instead of failing.
//!
//! ```
//! use kitty_core::{decode_properties, Binder, SettingsTree};
//!
//! let tree = SettingsTree::shared();
//! let map = decode_properties(
//!     b"kitty.threadpools.owner=alice\n\
//!       kitty.threadpools.executors[0].threadPoolName=orders\n\
//!       kitty.threadpools.executors[0].corePoolSize=4\n\
//!       kitty.threadpools.executors[0].maximumPoolSize=8\n",
//! )
//! .unwrap();
//!
//! let result = Binder::default().bind(&map, &tree);
//! assert!(result.is_clean());
//! assert_eq!(tree.read().owner.as_deref(), Some("alice"));
//! assert_eq!(tree.executors()[0].core_size, 4);
//! ```

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod bind;
pub mod convert;
pub mod decode;
pub mod error;
pub mod pool;
pub mod refresh;
pub mod settings;

pub use bind::{BindResult, Binder, DEFAULT_ROOT_PREFIX};
pub use decode::{decode_properties, decode_yaml, ConfigFormat, FlatMap};
pub use error::{BindError, BindErrorKind, DecodeError, KittyError, Result};
pub use pool::{PoolSetting, RejectPolicy};
pub use refresh::{ConfigSource, RawConfig, Refresher};
pub use settings::{Settings, SettingsTree};
