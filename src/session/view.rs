//! Top-level view persisted across process restarts

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage key holding the active view
pub const VIEW_KEY: &str = "page";

/// Which top-level screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppView {
    #[default]
    Login,
    Mail,
}

impl AppView {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppView::Login => "login",
            AppView::Mail => "mail",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "login" => Some(AppView::Login),
            "mail" => Some(AppView::Mail),
            _ => None,
        }
    }
}

/// Durable string key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> SessionResult<()>;
}

/// Volatile store for tests and the demo
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> SessionResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// TOML table of strings on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `state.toml` inside `dir`, or the user config directory when `None`
    pub fn in_dir(dir: Option<&Path>) -> SessionResult<Self> {
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::config_dir()
                .ok_or_else(|| SessionError::storage("No config directory available"))?
                .join("mailview"),
        };
        Ok(Self::new(dir.join("state.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> SessionResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SessionError::storage(format!("Failed to read {}: {}", self.path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| SessionError::storage(format!("Failed to parse {}: {}", self.path.display(), e)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.read_table()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> SessionResult<()> {
        let mut table = self.read_table()?;
        table.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SessionError::storage(format!("Failed to create state directory: {}", e)))?;
        }
        let content = toml::to_string_pretty(&table)
            .map_err(|e| SessionError::storage(format!("Failed to serialize state: {}", e)))?;
        fs::write(&self.path, content)
            .map_err(|e| SessionError::storage(format!("Failed to write {}: {}", self.path.display(), e)))?;
        debug!("Persisted {} = {} to {}", key, value, self.path.display());
        Ok(())
    }
}

/// Active view with init-from-storage and write-on-change
pub struct ViewState {
    current: AppView,
    store: Box<dyn KeyValueStore>,
}

impl ViewState {
    /// Restore the stored view. Unreadable or unknown values fall back to Login.
    pub fn restore(store: Box<dyn KeyValueStore>) -> Self {
        let current = match store.get(VIEW_KEY) {
            Ok(Some(value)) => AppView::parse(&value).unwrap_or_else(|| {
                warn!("Unknown stored view {:?}, using login", value);
                AppView::Login
            }),
            Ok(None) => AppView::Login,
            Err(e) => {
                warn!("Failed to restore view: {}", e);
                AppView::Login
            }
        };
        debug!("Restored view {}", current.as_str());
        Self { current, store }
    }

    pub fn current(&self) -> AppView {
        self.current
    }

    /// Switch views. Returns true if the view changed. Storage failures are
    /// logged; the in-memory view still switches.
    pub fn set(&mut self, view: AppView) -> bool {
        if self.current == view {
            return false;
        }
        self.current = view;
        if let Err(e) = self.store.set(VIEW_KEY, view.as_str()) {
            warn!("Failed to persist view: {}", e);
        }
        true
    }
}
