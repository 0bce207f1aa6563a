//! Storage selection settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ConfigError;

/// On-disk layout used by the loader for a game root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationType {
    /// `CD/` and `DVD/` subdirectories holding `.iso` images
    Directory,
    /// A single `ul.cfg` file of packed binary records
    UlConfig,
}

impl InstallationType {
    /// Name used in configuration files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallationType::Directory => "directory",
            InstallationType::UlConfig => "ul_config",
        }
    }
}

impl fmt::Display for InstallationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallationType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "directory" | "dir" | "iso" => Ok(InstallationType::Directory),
            "ul_config" | "ul" | "ulcfg" | "ul.cfg" => Ok(InstallationType::UlConfig),
            other => Err(ConfigError::Invalid(format!(
                "unknown installation type '{}'",
                other
            ))),
        }
    }
}

/// Where the games live and how they are laid out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the loader's game storage
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Storage layout; detected from the root when unset
    #[serde(default)]
    pub installation: Option<InstallationType>,
}

impl StorageConfig {
    /// Fill unset fields from `other`
    pub fn merge(&mut self, other: &StorageConfig) {
        if self.root.is_none() {
            self.root = other.root.clone();
        }
        if self.installation.is_none() {
            self.installation = other.installation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_type_parse() {
        assert_eq!(
            "directory".parse::<InstallationType>().unwrap(),
            InstallationType::Directory
        );
        assert_eq!(
            "ul-config".parse::<InstallationType>().unwrap(),
            InstallationType::UlConfig
        );
        assert_eq!(
            "UL_CONFIG".parse::<InstallationType>().unwrap(),
            InstallationType::UlConfig
        );
        assert!("floppy".parse::<InstallationType>().is_err());
    }

    #[test]
    fn test_installation_type_display_round_trips() {
        for kind in [InstallationType::Directory, InstallationType::UlConfig] {
            assert_eq!(kind.to_string().parse::<InstallationType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_storage_merge_keeps_own_values() {
        let mut primary = StorageConfig {
            root: Some(PathBuf::from("/mnt/opl")),
            installation: None,
        };
        let fallback = StorageConfig {
            root: Some(PathBuf::from("/media/usb")),
            installation: Some(InstallationType::Directory),
        };

        primary.merge(&fallback);

        assert_eq!(primary.root, Some(PathBuf::from("/mnt/opl")));
        assert_eq!(primary.installation, Some(InstallationType::Directory));
    }
}
