use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Source catalog connection (GraphQL admin API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the source API (env `API_URL`).
    #[serde(default)]
    pub api_url: Option<String>,
    /// Path appended to `api_url` to reach the GraphQL endpoint.
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,
    /// Admin login email (env `API_USER`).
    #[serde(default)]
    pub username: Option<String>,
    /// Admin password (env `API_PASSWORD`).
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            graphql_path: default_graphql_path(),
            username: None,
            password: None,
        }
    }
}

/// Destination media server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Upload endpoint (env `MEDIA_SERVER_URL`).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static bearer token (env `BEARER_TOKEN`).
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Multipart field carrying the file.
    #[serde(default = "default_file_field")]
    pub file_field: String,
    /// Query parameter carrying the record id.
    #[serde(default = "default_id_param")]
    pub id_param: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bearer_token: None,
            file_field: default_file_field(),
            id_param: default_id_param(),
        }
    }
}

/// Curl handle settings shared by every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Whole-request timeout, covers the largest single asset.
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 300,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Time zone used to render the date component of staging names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameTimezone {
    #[default]
    Local,
    Utc,
}

/// Global configuration loaded from `~/.config/imgmig/config.toml`, then overlaid with env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Directory holding staged and transferred assets.
    pub staging_dir: PathBuf,
    /// Records per catalog page.
    pub page_size: u32,
    #[serde(default)]
    pub name_timezone: NameTimezone,
    /// Where transient upload copies are made (None = system temp dir).
    #[serde(default)]
    pub transient_dir: Option<PathBuf>,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("images"),
            page_size: 100,
            name_timezone: NameTimezone::default(),
            transient_dir: None,
            source: SourceConfig::default(),
            destination: DestinationConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Values needed to authenticate and page through the catalog.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

/// Values needed to upload.
#[derive(Debug, Clone)]
pub struct DestinationSettings {
    pub endpoint: String,
    pub bearer_token: String,
    pub file_field: String,
    pub id_param: String,
}

impl MigrateConfig {
    /// Overlay recognized environment variables. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("API_URL") {
            self.source.api_url = Some(v);
        }
        if let Some(v) = get("API_USER") {
            self.source.username = Some(v);
        }
        if let Some(v) = get("API_PASSWORD") {
            self.source.password = Some(v);
        }
        if let Some(v) = get("MEDIA_SERVER_URL") {
            self.destination.endpoint = Some(v);
        }
        if let Some(v) = get("BEARER_TOKEN") {
            self.destination.bearer_token = Some(v);
        }
        if let Some(v) = get("IMGMIG_STAGING_DIR") {
            self.staging_dir = PathBuf::from(v);
        }
    }

    /// Overlay the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Source settings, or an error naming the first missing variable.
    pub fn require_source(&self) -> Result<SourceSettings> {
        let api_url = required(&self.source.api_url, "API_URL")?;
        let path = self.source.graphql_path.trim_start_matches('/');
        let endpoint = if path.is_empty() {
            api_url.trim_end_matches('/').to_string()
        } else {
            format!("{}/{}", api_url.trim_end_matches('/'), path)
        };
        Ok(SourceSettings {
            endpoint,
            username: required(&self.source.username, "API_USER")?,
            password: required(&self.source.password, "API_PASSWORD")?,
        })
    }

    /// Destination settings, or an error naming the first missing variable.
    pub fn require_destination(&self) -> Result<DestinationSettings> {
        Ok(DestinationSettings {
            endpoint: required(&self.destination.endpoint, "MEDIA_SERVER_URL")?,
            bearer_token: required(&self.destination.bearer_token, "BEARER_TOKEN")?,
            file_field: self.destination.file_field.clone(),
            id_param: self.destination.id_param.clone(),
        })
    }

    /// Directory for transient upload copies.
    pub fn transient_dir(&self) -> PathBuf {
        self.transient_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn required(value: &Option<String>, env_name: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .with_context(|| format!("missing setting: set {} in the environment or config.toml", env_name))
}

fn default_graphql_path() -> String {
    "/v1/admin".to_string()
}

fn default_file_field() -> String {
    "file".to_string()
}

fn default_id_param() -> String {
    "imageId".to_string()
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imgmig")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// Environment overlay is a separate step (`apply_process_env`).
pub fn load_or_init() -> Result<MigrateConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MigrateConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: MigrateConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
