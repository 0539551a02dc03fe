use directories::BaseDirs;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Optional overrides read from `<config_dir>/luke/providers.toml`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProviderFileConfig {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub catalog_timeout_ms: Option<u64>,
    pub stream_max_retries: Option<u32>,
    pub stream_idle_timeout_ms: Option<u64>,
    pub referer: Option<String>,
    pub title: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub catalog_timeout: Duration,
    pub stream_max_retries: u32,
    pub stream_idle_timeout: Duration,
    pub referer: String,
    pub title: String,
    pub proxy: Option<String>,
}

impl OpenRouterConfig {
    /// Defaults, then `providers.toml`, then environment. The credential is
    /// resolved by the caller and passed in as is.
    pub fn resolve(api_key: Option<String>) -> Self {
        let file_cfg = Self::config_path()
            .filter(|p| p.exists())
            .and_then(|p| match fs::read_to_string(&p) {
                Ok(text) => match toml::from_str::<ProviderFileConfig>(&text) {
                    Ok(c) => Some(c),
                    Err(e) => {
                        warn!(target: "providers::openrouter", "ignoring {}: {}", p.display(), e);
                        None
                    }
                },
                Err(e) => {
                    warn!(target: "providers::openrouter", "cannot read {}: {}", p.display(), e);
                    None
                }
            })
            .unwrap_or_default();
        let mut cfg = Self::from_file_config(api_key, file_cfg);
        if let Ok(url) = env::var("OPENROUTER_BASE_URL") {
            if !url.trim().is_empty() {
                cfg.base_url = url;
            }
        }
        cfg.proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("HTTP_PROXY").ok());
        cfg
    }

    pub fn from_file_config(api_key: Option<String>, file_cfg: ProviderFileConfig) -> Self {
        OpenRouterConfig {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: file_cfg.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_millis(file_cfg.timeout_ms.unwrap_or(120_000)),
            catalog_timeout: Duration::from_millis(file_cfg.catalog_timeout_ms.unwrap_or(10_000)),
            stream_max_retries: file_cfg.stream_max_retries.unwrap_or(3),
            stream_idle_timeout: Duration::from_millis(
                file_cfg.stream_idle_timeout_ms.unwrap_or(300_000),
            ),
            referer: file_cfg
                .referer
                .unwrap_or_else(|| "https://github.com/luke-cli/luke".to_string()),
            title: file_cfg.title.unwrap_or_else(|| "Luke CLI Chat".to_string()),
            proxy: None,
        }
    }

    fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("luke").join("providers.toml"))
    }
}
