//! Configuration loading for the Kitty CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File, FileFormat};
use kitty_core::{ConfigFormat, DEFAULT_ROOT_PREFIX};
use serde::{Deserialize, Serialize};

/// Configuration for the CLI itself (not the payloads it checks)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Namespace the binder recognises keys under
    pub root_prefix: String,
    pub log_level: String,
    /// Format used when `--format` is absent; inferred from the file
    /// extension when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<ConfigFormat>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
            log_level: "info".to_string(),
            default_format: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_file().as_deref())
    }

    /// Load from an explicit file (if any), overlaid by `KITTY__*` variables
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = path {
            tracing::debug!("Loading config from: {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("KITTY")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Find the configuration file
    pub fn find_config_file() -> Option<PathBuf> {
        // Check in order: KITTY_CONFIG env, ./kitty.toml, ~/.config/kitty/kitty.toml
        if let Ok(path) = std::env::var("KITTY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("kitty.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("kitty").join("kitty.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Pick the payload format: explicit flag, then configured default,
    /// then file extension, then properties.
    pub fn resolve_format(&self, explicit: Option<ConfigFormat>, path: &Path) -> ConfigFormat {
        explicit
            .or(self.default_format)
            .or_else(|| ConfigFormat::from_path(path))
            .unwrap_or(ConfigFormat::Properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.root_prefix, "kitty.threadpools");
        assert_eq!(config.log_level, "info");
        assert!(config.default_format.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kitty.toml");
        std::fs::write(
            &path,
            "root_prefix = \"app.pools\"\ndefault_format = \"yaml\"\n",
        )
        .unwrap();

        let config = CliConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.root_prefix, "app.pools");
        assert_eq!(config.default_format, Some(ConfigFormat::Yaml));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.root_prefix, CliConfig::default().root_prefix);
    }

    #[test]
    fn test_resolve_format_precedence() {
        let mut config = CliConfig::default();
        let yaml_path = Path::new("pools.yaml");
        let bare_path = Path::new("pools");

        assert_eq!(config.resolve_format(None, yaml_path), ConfigFormat::Yaml);
        assert_eq!(
            config.resolve_format(None, bare_path),
            ConfigFormat::Properties
        );
        assert_eq!(
            config.resolve_format(Some(ConfigFormat::Properties), yaml_path),
            ConfigFormat::Properties
        );

        config.default_format = Some(ConfigFormat::Properties);
        assert_eq!(
            config.resolve_format(None, yaml_path),
            ConfigFormat::Properties
        );
    }

    #[test]
    fn test_serializes_to_toml() {
        let rendered = toml::to_string_pretty(&CliConfig::default()).unwrap();
        assert!(rendered.contains("root_prefix = \"kitty.threadpools\""));
        assert!(!rendered.contains("default_format"));
    }
}
