//! Configuration management for the OPL game catalog
//!
//! Selects the game storage root and layout, and the log level used by front ends.
//! Configuration lives in a TOML file; `load_layered` additionally applies `OPLCAT_*`
//! environment overrides.

mod storage_config;

pub use storage_config::{InstallationType, StorageConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Layered configuration error: {0}")]
    Layered(#[from] config::ConfigError),
}

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "oplcat.toml";

/// Prefix for environment overrides (`OPLCAT_STORAGE__ROOT`, ...)
pub const ENV_PREFIX: &str = "OPLCAT";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Logging settings for front ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level catalog configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CatalogConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load defaults, then `path` if given, then `OPLCAT_*` environment variables
    ///
    /// Nested keys are separated by `__`, so `OPLCAT_STORAGE__INSTALLATION=directory`
    /// sets `storage.installation`.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layered_from(path, environment())
    }

    fn load_layered_from(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().set_default("logging.level", DEFAULT_LOG_LEVEL)?;

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(environment);

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// `OPLCAT_` followed by the key path, nested keys joined by `__`
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert!(config.storage.root.is_none());
        assert!(config.storage.installation.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[storage]
root = "/mnt/opl"
installation = "ul_config"

[logging]
level = "debug"
"#;
        write!(temp_file, "{}", config_content).unwrap();

        let config = CatalogConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.storage.root, Some(PathBuf::from("/mnt/opl")));
        assert_eq!(
            config.storage.installation,
            Some(InstallationType::UlConfig)
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[storage]\ninstallation = \"directory\"\n").unwrap();

        let config = CatalogConfig::load(temp_file.path()).unwrap();
        assert_eq!(
            config.storage.installation,
            Some(InstallationType::Directory)
        );
        assert!(config.storage.root.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CatalogConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_installation_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[storage]\ninstallation = \"zip\"\n").unwrap();

        let err = CatalogConfig::load(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_save_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("oplcat.toml");
        let config = CatalogConfig {
            storage: StorageConfig {
                root: Some(PathBuf::from("/media/usb0")),
                installation: Some(InstallationType::Directory),
            },
            logging: LoggingConfig::default(),
        };

        config.save(&path).unwrap();

        let loaded = CatalogConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_layered_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oplcat.toml");
        std::fs::write(
            &path,
            "[storage]\nroot = \"/srv/ps2\"\ninstallation = \"ul_config\"\n",
        )
        .unwrap();

        let config = CatalogConfig::load_layered(Some(&path)).unwrap();
        assert_eq!(config.storage.root, Some(PathBuf::from("/srv/ps2")));
        assert_eq!(
            config.storage.installation,
            Some(InstallationType::UlConfig)
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_layered_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CatalogConfig::load_layered(Some(&dir.path().join("none.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("oplcat.toml"));
        assert!(format!("{}", err).contains("not found"));

        let err = ConfigError::Invalid("bad root".to_string());
        assert!(format!("{}", err).contains("Invalid"));
    }

    fn env_vars(vars: &[(&str, &str)]) -> config::Map<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_layered_load_from_environment() {
        let env = environment().source(Some(env_vars(&[
            ("OPLCAT_STORAGE__ROOT", "/media/usb1"),
            ("OPLCAT_STORAGE__INSTALLATION", "directory"),
            ("OPLCAT_LOGGING__LEVEL", "debug"),
            ("OTHER_STORAGE__ROOT", "/ignored"),
        ])));

        let config = CatalogConfig::load_layered_from(None, env).unwrap();
        assert_eq!(config.storage.root, Some(PathBuf::from("/media/usb1")));
        assert_eq!(
            config.storage.installation,
            Some(InstallationType::Directory)
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oplcat.toml");
        std::fs::write(
            &path,
            "[storage]\nroot = \"/srv/ps2\"\ninstallation = \"ul_config\"\n",
        )
        .unwrap();
        let env = environment().source(Some(env_vars(&[("OPLCAT_STORAGE__ROOT", "/mnt/opl")])));

        let config = CatalogConfig::load_layered_from(Some(&path), env).unwrap();
        assert_eq!(config.storage.root, Some(PathBuf::from("/mnt/opl")));
        assert_eq!(
            config.storage.installation,
            Some(InstallationType::UlConfig)
        );
    }
}
