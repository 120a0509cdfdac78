// ===========================================================================
// config - Configuration Loading & Merging
// ===========================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::process::DEFAULT_TIMEOUT;
use crate::snapshot::{Limits, MAX_LOG_ENTRIES};

pub type Result<T> = std::result::Result<T, Error>;

pub const PROJECT_FILE: &str = ".git-sync.toml";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("home directory not found")]
    NoHome,
}

// ---------------------------------------------------------------------------
// File layout (~/.git-sync/config.toml and .git-sync.toml share it)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Remote to fetch from and set as upstream (default: origin, else first)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Git executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Summaries kept for the pull/push logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_limit: Option<usize>,

    /// Summaries kept for the recent history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl GeneralConfig {
    /// Fields set in `other` win.
    fn overlay(self, other: GeneralConfig) -> Self {
        Self {
            remote: other.remote.or(self.remote),
            git: other.git.or(self.git),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            log_limit: other.log_limit.or(self.log_limit),
            history_limit: other.history_limit.or(self.history_limit),
        }
    }
}

// ---------------------------------------------------------------------------
// Merged Config (runtime)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub remote: Option<String>,
    pub git: PathBuf,
    pub timeout: Duration,
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_general(GeneralConfig::default())
    }
}

impl Config {
    /// Load global config, then let the nearest project file at or above
    /// `dir` override it.
    pub fn load(dir: &Path) -> Result<Self> {
        let global = match Self::base_dir() {
            Ok(base) => Self::load_file(&base.join("config.toml"))?,
            Err(Error::NoHome) => {
                log::debug!("no home directory; skipping global config");
                FileConfig::default()
            }
            Err(e) => return Err(e),
        };
        let project = match Self::find_project_file(dir) {
            Some(path) => Self::load_file(&path)?,
            None => FileConfig::default(),
        };

        Ok(Self::from_general(global.general.overlay(project.general)))
    }

    pub fn base_dir() -> Result<PathBuf> {
        let base = BaseDirs::new().ok_or(Error::NoHome)?;
        Ok(base.home_dir().join(".git-sync"))
    }

    pub fn find_project_file(dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .map(|d| d.join(PROJECT_FILE))
            .find(|p| p.is_file())
    }

    fn load_file(path: &Path) -> Result<FileConfig> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        log::debug!("loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn from_general(general: GeneralConfig) -> Self {
        Self {
            remote: general.remote,
            git: general.git.unwrap_or_else(|| PathBuf::from("git")),
            timeout: general
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            limits: Limits::new(
                general.log_limit.unwrap_or(MAX_LOG_ENTRIES),
                general.history_limit.unwrap_or(MAX_LOG_ENTRIES),
            ),
        }
    }
}
