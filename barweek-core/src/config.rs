//! Global barweek configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{BarweekError, BarweekResult};

static DEFAULT_DATA_DIR: &str = "~/.local/share/barweek";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

/// Global configuration at ~/.config/barweek/config.toml
///
/// Every key can be overridden with a `BARWEEK_` environment variable,
/// e.g. `BARWEEK_DATA_DIR` or `BARWEEK_ADMIN_EMAILS=a@x.com,b@x.com`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BarweekConfig {
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    /// Accounts allowed to read aggregate statistics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_emails: Vec<String>,

    /// Only events tagged with this version are loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_version: Option<String>,
}

impl Default for BarweekConfig {
    fn default() -> Self {
        BarweekConfig {
            data_dir: default_data_dir(),
            admin_emails: Vec::new(),
            event_version: None,
        }
    }
}

impl BarweekConfig {
    pub fn config_path() -> BarweekResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| BarweekError::Config("Could not determine config directory".into()))?
            .join("barweek");

        Ok(config_dir.join("config.toml"))
    }

    /// Load ~/.config/barweek/config.toml, writing a commented default on first run.
    pub fn load() -> BarweekResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> BarweekResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("BARWEEK")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("admin_emails"),
            )
            .build()
            .map_err(|e| BarweekError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| BarweekError::Config(e.to_string()))
    }

    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn backend_path(&self) -> PathBuf {
        self.data_path().join("backend.json")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_path().join("session.json")
    }

    pub fn guest_path(&self) -> PathBuf {
        self.data_path().join("guest")
    }

    /// Add an account to `admin_emails`. Returns false if it was already listed.
    pub fn add_admin(&mut self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        if self.admin_emails.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
            return false;
        }
        self.admin_emails.push(email);
        true
    }

    /// Save the current config to ~/.config/barweek/config.toml
    pub fn save(&self) -> BarweekResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> BarweekResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| BarweekError::Config(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| {
            BarweekError::Config(format!("Could not write {}: {e}", path.display()))
        })
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> BarweekResult<()> {
        let contents = format!(
            "\
# barweek configuration

# Where agendas, visits and the local account database live:
# data_dir = \"{}\"

# Accounts that may run `barweek stats`:
# admin_emails = [\"you@example.com\"]

# Only load events from this catalog version:
# event_version = \"2025\"
",
            DEFAULT_DATA_DIR
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BarweekError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| BarweekError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commented_default_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barweek").join("config.toml");

        BarweekConfig::create_default_config(&path).unwrap();
        let config = BarweekConfig::load_from(&path).unwrap();

        assert_eq!(config.data_dir, default_data_dir());
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.event_version, None);
    }

    #[test]
    fn reads_values_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/bw\"\nadmin_emails = [\"a@example.com\"]\nevent_version = \"2025\"\n",
        )
        .unwrap();

        let config = BarweekConfig::load_from(&path).unwrap();

        assert_eq!(config.data_path(), PathBuf::from("/tmp/bw"));
        assert_eq!(config.admin_emails, vec!["a@example.com".to_string()]);
        assert_eq!(config.event_version.as_deref(), Some("2025"));
        assert_eq!(config.session_path(), PathBuf::from("/tmp/bw/session.json"));
    }

    #[test]
    fn default_data_dir_is_not_serialized() {
        let content = toml::to_string_pretty(&BarweekConfig::default()).unwrap();
        assert!(!content.contains("data_dir"));
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = BarweekConfig::default();
        config.event_version = Some("2025".to_string());
        assert!(config.add_admin(" Admin@Example.com "));
        assert!(!config.add_admin("admin@example.com"));
        config.save_to(&path).unwrap();

        let loaded = BarweekConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.admin_emails, vec!["admin@example.com".to_string()]);
    }
}
