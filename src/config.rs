use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::error::{bug_msg, ConfigError};

pub type SharedConfig = RwLock<Config>;

// this will be initialized by the app itself
pub static CONFIG: OnceLock<SharedConfig> = OnceLock::new();

/// The config file's name, relative to the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Path to the gallery's data directory. The database lives here.
    pub data_dir: Utf8PathBuf,

    /// Limits and defaults for post listings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Defaults for tag creation.
    #[serde(default)]
    pub tags: TagConfig,

    /// Information for automatically reporting bugs.
    pub bug_report_info: BugReportInfo,
}

impl Config {
    pub fn new(data_dir: Utf8PathBuf, bug_report_info: BugReportInfo) -> Self {
        Self {
            data_dir,
            search: SearchConfig::default(),
            tags: TagConfig::default(),
            bug_report_info,
        }
    }

    /// Attempts to read a previous `Config` from disk.
    ///
    /// Note that this may fail across versions, requiring new configs.
    pub async fn from_disk(data_dir: &Utf8Path) -> Result<Self, ConfigError> {
        // read the config from disk
        let s = tokio::fs::read_to_string(data_dir.join(CONFIG_FILE_NAME))
            .await
            .map_err(ConfigError::ReadFailed)?;

        // parse with `toml` crate
        let s: Self = toml::from_str(s.as_str()).map_err(ConfigError::ParseFailed)?;

        // ensure paths are equal
        if s.data_dir != data_dir {
            tracing::error!(
                "loaded config from disk, but it pointed at another data dir: `{}`",
                s.data_dir
            );
            return Err(ConfigError::PathMismatch);
        }

        Ok(s)
    }

    /// Use this EXACTLY ONCE to initialize the config.
    ///
    /// The app should be the only one calling this.
    pub async fn init_config(config: Config) {
        if CONFIG.set(RwLock::new(config)).is_err() {
            tracing::error!(
                "attempted to init the config, but the config is already running. {}",
                bug_msg().await
            )
        }
    }

    /// Grabs the config for reading, if it's been initialized.
    ///
    /// Note that while you're reading the config, others cannot write to it.
    /// DO NOT HOLD ONTO IT FOR A LONG TIME.
    pub async fn read() -> Option<RwLockReadGuard<'static, Config>> {
        match CONFIG.get() {
            Some(conf) => Some(conf.read().await),
            None => None,
        }
    }
}

/// Paging limits for listings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Page size when a request doesn't give one.
    pub default_page_size: u32,
    /// Largest page size a request may ask for.
    pub max_page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: 40,
            max_page_size: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// The category new tags land in when resolution creates them.
    pub default_category: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            default_category: String::from("general"),
        }
    }
}

/// Some info to help with bug reporting.
#[derive(Clone, Debug, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct BugReportInfo {
    pub app_name: String,
    pub app_version: String,

    pub target_triple: String,
    pub build_time: String,

    pub commit: String,
    pub repo: String,
}
