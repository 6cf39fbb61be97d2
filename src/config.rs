//! Session configuration, read from `<config_dir>/mailview/config.toml`

use crate::error::{SessionError, SessionResult};
use crate::session::catalog::MailboxNormalizer;
use crate::session::selection::BodyFetchPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Messages requested per page
    pub page_size: usize,
    /// How long a fetched body is served without asking the backend again
    pub body_cache_ttl_secs: u64,
    /// Interval between background mailbox/message update triggers
    pub sync_interval_secs: u64,
    /// Bare namespace entries hidden from the catalog and stripped from labels
    pub namespace_markers: Vec<String>,
    pub body_fetch_policy: BodyFetchPolicy,
    /// Where the persisted view lives; defaults to the config directory
    pub state_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            body_cache_ttl_secs: 300,
            sync_interval_secs: 300,
            namespace_markers: vec!["[Gmail]".to_string(), "[Google Mail]".to_string()],
            body_fetch_policy: BodyFetchPolicy::default(),
            state_dir: None,
        }
    }
}

impl SessionConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mailview").join("config.toml"))
    }

    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SessionError::config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: SessionConfig = toml::from_str(&content)
            .map_err(|e| SessionError::config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` (or the default location), falling back to defaults when
    /// the file does not exist
    pub fn load_or_default(path: Option<&Path>) -> SessionResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn validate(&self) -> SessionResult<()> {
        if self.page_size == 0 {
            return Err(SessionError::config("page_size must be at least 1"));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> SessionResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SessionError::config(format!("Failed to serialize config: {}", e)))
    }

    pub fn body_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.body_cache_ttl_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn normalizer(&self) -> MailboxNormalizer {
        MailboxNormalizer::new(self.namespace_markers.clone())
    }
}
