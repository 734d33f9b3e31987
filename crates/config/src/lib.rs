//! Layered configuration.
//!
//! Values are merged, later sources winning:
//! 1. built-in defaults ([`Config::default`]),
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed `BROWSCAP_`, with `__` separating
//!    nested keys (e.g. `BROWSCAP_UPDATES__ENABLED=false`).
//!
//! Durations are expressed in whole seconds.

pub mod error;

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

const ENV_PREFIX: &str = "BROWSCAP_";
const FILE_NAME: &str = "browscap.toml";
const DATABASE_NAME: &str = "browscap.sqlite";

/// Refresh intervals (in seconds) a scheduled update may use: one hour up to
/// sixteen weeks.
pub const REFRESH_INTERVALS: [u64; 13] = [
    3600, 10800, 21600, 32400, 43200, 86400, 172800, 259200, 604800, 1209600, 2419200, 4838400, 9676800,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding patterns, the version marker and cached
    /// classifications.
    pub database: PathBuf,
    pub source: SourceConfig,
    pub updates: UpdateConfig,
    pub lookup: LookupConfig,
}
impl Default for Config {
    fn default() -> Self {
        let database = project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_NAME))
            .unwrap_or_else(|| PathBuf::from(DATABASE_NAME));
        Self {
            database,
            source: SourceConfig::default(),
            updates: UpdateConfig::default(),
            lookup: LookupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub version_url: String,
    pub data_url: String,
    pub version_timeout: u64,
    pub data_timeout: u64,
}
impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            version_url: "https://browscap.org/version-number".to_string(),
            data_url: "https://browscap.org/stream?q=PHP_BrowsCapINI".to_string(),
            version_timeout: 30,
            data_timeout: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Whether scheduled imports run at all. Manual imports ignore this.
    pub enabled: bool,
    /// Minimum time between scheduled imports; one of [`REFRESH_INTERVALS`].
    pub interval: u64,
}
impl Default for UpdateConfig {
    fn default() -> Self {
        Self { enabled: true, interval: 604800 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// How long a cached classification stays valid.
    pub cache_ttl: u64,
}
impl Default for LookupConfig {
    fn default() -> Self {
        Self { cache_ttl: 86400 }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location, if it
    /// exists) and the environment, then validate it.
    #[instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path
            && !path.is_file()
        {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let config: Self = Self::figment(path).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(database = %config.database.display(), "configuration loaded");
        Ok(config)
    }

    /// The merged providers, without extracting.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = path.map(Path::to_path_buf).or_else(default_file);
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database"));
        }
        if self.source.version_url.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("source.version_url"));
        }
        if self.source.data_url.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("source.data_url"));
        }
        if self.source.version_timeout == 0 {
            exn::bail!(ErrorKind::Invalid("source.version_timeout"));
        }
        if self.source.data_timeout == 0 {
            exn::bail!(ErrorKind::Invalid("source.data_timeout"));
        }
        if !REFRESH_INTERVALS.contains(&self.updates.interval) {
            exn::bail!(ErrorKind::Invalid("updates.interval"));
        }
        if self.lookup.cache_ttl == 0 {
            exn::bail!(ErrorKind::Invalid("lookup.cache_ttl"));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "browscap", "browscap")
}

fn default_file() -> Option<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.config_dir().join(FILE_NAME))
        .filter(|path| path.is_file())
}
