//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub mod cli;

pub use cli::{Cli, Commands, EditorArgs, PostsArgs, PostsCmd};

const LOCAL_CONFIG_BASENAME: &str = "scrittoio";
const DEFAULT_API_URL: &str = "http://localhost:8000/api/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub snapshot: SnapshotSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub timeout: Duration,
    pub token: TokenSource,
}

/// Where the bearer token comes from. A file wins over an inline value so a
/// rotated token on disk is picked up without restarting anything.
#[derive(Debug, Clone)]
pub enum TokenSource {
    File(PathBuf),
    Inline(String),
}

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    /// Serving root the snapshot's `<base>` tag points at. Defaults to the
    /// API origin so relative asset links resolve against the same host.
    pub base_href: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &Cli) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SCRITTOIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    snapshot: RawSnapshotSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
    token: Option<String>,
    token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSnapshotSettings {
    base_href: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(url) = cli.api_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(path) = cli.token_file.as_ref() {
            self.api.token_file = Some(path.clone());
        }
        if let Some(token) = cli.token_env.as_ref() {
            // Only fills the gap; an explicit token file still wins.
            if self.api.token_file.is_none() {
                self.api.token = Some(token.clone());
            }
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            snapshot,
            logging,
        } = raw;

        let api = build_api_settings(api)?;
        let snapshot = build_snapshot_settings(snapshot, &api.base_url);
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            api,
            snapshot,
            logging,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base = api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let base_url = Url::parse(&base)
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            "scheme must be http or https",
        ));
    }

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let token = match (api.token_file, api.token) {
        (Some(path), _) => TokenSource::File(path),
        (None, Some(token)) if !token.trim().is_empty() => {
            TokenSource::Inline(token.trim().to_string())
        }
        _ => {
            return Err(LoadError::invalid(
                "api.token",
                "no API token configured; set api.token, api.token_file or SCRITTOIO_TOKEN",
            ));
        }
    };

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
        token,
    })
}

fn build_snapshot_settings(snapshot: RawSnapshotSettings, api_base: &Url) -> SnapshotSettings {
    let base_href = snapshot.base_href.unwrap_or_else(|| {
        let mut origin = api_base.origin().ascii_serialization();
        origin.push('/');
        origin
    });
    SnapshotSettings { base_href }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}
