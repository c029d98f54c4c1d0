use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `backend.anon_key` is absent.
pub const ANON_KEY_ENV: &str = "LINKBOARD_ANON_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    /// The project URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn anon_key(&self) -> &str {
        self.anon_key.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
        }
    }
}

fn default_bucket() -> String {
    "images".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    #[serde(default = "default_local_path")]
    pub path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            path: default_local_path(),
        }
    }
}

fn default_local_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("linkboard").join("local.json"))
        .unwrap_or_else(|| PathBuf::from(".linkboard/local.json"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_min_query_len() -> usize {
    linkboard_core::search::MIN_QUERY_LEN
}
fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Defaults with no backend, for commands that only touch the local
    /// store.
    pub fn minimal() -> Self {
        Self {
            backend: BackendConfig {
                url: String::new(),
                anon_key: None,
                timeout_secs: default_timeout_secs(),
            },
            storage: StorageConfig::default(),
            local: LocalConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parses and validates a TOML config document.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate backend
    let url = url::Url::parse(&config.backend.url)
        .with_context(|| format!("backend.url is not a valid URL: '{}'", config.backend.url))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("backend.url must use http or https, got '{}'", url.scheme());
    }
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }

    if config.backend.anon_key.as_deref().unwrap_or("").is_empty() {
        match std::env::var(ANON_KEY_ENV) {
            Ok(key) if !key.is_empty() => config.backend.anon_key = Some(key),
            _ => anyhow::bail!(
                "backend.anon_key is not set (set it in the config file or {})",
                ANON_KEY_ENV
            ),
        }
    }

    // Validate storage
    if config.storage.bucket.trim().is_empty() {
        anyhow::bail!("storage.bucket must not be empty");
    }

    // Validate search
    if config.search.min_query_len == 0 {
        anyhow::bail!("search.min_query_len must be >= 1");
    }

    // Validate server
    config
        .server
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("server.bind is not a socket address: '{}'", config.server.bind))?;

    config.local.path = expand_home(&config.local.path);

    Ok(config)
}
