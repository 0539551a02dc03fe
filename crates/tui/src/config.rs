use std::{collections::BTreeMap, env, fs, io::Write, path::{Path, PathBuf}, time::Duration};

use directories::BaseDirs;
use luke_core::config::{
    ConfigStore, KEY_API_ENDPOINT, KEY_DEFAULT_MODEL, KEY_OPENROUTER_API_KEY, KEY_USE_UNIFIED_API,
};
use thiserror::Error;
use tracing::warn;

use crate::app::catalog::DEFAULT_MODEL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value store persisted as one JSON object.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonConfigStore {
    pub fn default_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("luke").join("config.json"))
    }

    pub fn open_default() -> Result<Self, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::open(path))
    }

    /// A missing or unreadable file opens as an empty store.
    pub fn open(path: PathBuf) -> Self {
        let values = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                warn!(target: "tui", "ignoring malformed {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(target: "tui", "cannot read {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let data = serde_json::to_vec_pretty(&self.values)?;
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp).map_err(io_err(&tmp))?;
            f.write_all(&data).map_err(io_err(&tmp))?;
            f.flush().map_err(io_err(&tmp))?;
        }
        fs::rename(&tmp, &self.path).map_err(io_err(&self.path))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Io { path, source }
}

impl ConfigStore for JsonConfigStore {
    type Error = ConfigError;

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

/// Values read once at startup, outside the session engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    pub credential: Option<String>,
    pub default_model: Option<String>,
    /// Set when the unified API is enabled and an endpoint is configured.
    pub unified_endpoint: Option<String>,
}

impl Settings {
    pub fn resolve<S: ConfigStore>(store: &S) -> Self {
        Self::from_sources(env::var("OPENROUTER_API_KEY").ok(), store)
    }

    /// The environment credential wins over the stored one.
    pub fn from_sources<S: ConfigStore>(env_key: Option<String>, store: &S) -> Self {
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let credential = non_blank(env_key).or_else(|| non_blank(store.get(KEY_OPENROUTER_API_KEY)));
        let unified = store
            .get(KEY_USE_UNIFIED_API)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let unified_endpoint = if unified {
            non_blank(store.get(KEY_API_ENDPOINT))
        } else {
            None
        };
        Self {
            credential,
            default_model: non_blank(store.get(KEY_DEFAULT_MODEL)),
            unified_endpoint,
        }
    }
}

/// Timing and paging knobs of the chat session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Minimum gap between timer-driven redraws while streaming.
    pub redraw_throttle: Duration,
    pub active_tick: Duration,
    pub idle_tick: Duration,
    pub watchdog_interval: Duration,
    /// Silence after which an outstanding request is given up.
    pub request_timeout: Duration,
    pub page_step: usize,
    pub default_model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            redraw_throttle: Duration::from_millis(100),
            active_tick: Duration::from_millis(50),
            idle_tick: Duration::from_millis(500),
            watchdog_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(90),
            page_step: 10,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}
