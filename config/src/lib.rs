//! Configuration loading.
//!
//! The file is `$COURIER_CONFIG` when set, otherwise
//! `~/.courier/config.toml`. Every section and field is optional; the raw
//! TOML structs are resolved into the fully-populated settings types from
//! `courier-types`. String values may reference environment variables as
//! `${NAME}`.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

use courier_types::{ApiSettings, RouterSettings, StorageSettings, ToastSettings};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "COURIER_CONFIG";
/// Overrides `[api] base_url`.
pub const API_BASE_ENV: &str = "COURIER_API_BASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api: Option<ApiSection>,
    router: Option<RouterSection>,
    toasts: Option<ToastSection>,
    storage: Option<StorageSection>,
    log: Option<LogSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RouterSection {
    default_path: Option<String>,
    history_limit: Option<usize>,
    login_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ToastSection {
    max_visible: Option<usize>,
    exit_transition_ms: Option<u64>,
    success_ms: Option<u64>,
    info_ms: Option<u64>,
    warning_ms: Option<u64>,
    error_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    dir: Option<String>,
    namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LogSection {
    dir: Option<String>,
    filter: Option<String>,
}

/// Where the shell writes its log and how much. `RUST_LOG` overrides
/// `filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `None` only when there is no home directory and none was configured.
    pub dir: Option<PathBuf>,
    pub filter: String,
}

impl LogSettings {
    pub const DEFAULT_FILTER: &'static str = "info";
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourierConfig {
    pub api: ApiSettings,
    pub router: RouterSettings,
    pub toasts: ToastSettings,
    pub storage: StorageSettings,
    pub log: LogSettings,
}

impl Default for CourierConfig {
    /// Built-in defaults with the storage directory under the data dir.
    fn default() -> Self {
        Self::resolve(ConfigFile::default(), |_| None)
    }
}

impl CourierConfig {
    /// Load from the configured location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::warn!("No home directory; using default configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                tracing::warn!(path = %path.display(), "Failed to read config: {source}");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&content, path)
    }

    /// Parse TOML text. `origin` is only used in error reports.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|source| {
            tracing::warn!(path = %origin.display(), "Failed to parse config: {source}");
            ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::resolve(file, |name| env::var(name).ok()))
    }

    fn resolve(file: ConfigFile, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api = file.api.unwrap_or_default();
        let router = file.router.unwrap_or_default();
        let toasts = file.toasts.unwrap_or_default();
        let storage = file.storage.unwrap_or_default();
        let log = file.log.unwrap_or_default();

        let api_defaults = ApiSettings::default();
        let base_url = lookup(API_BASE_ENV)
            .filter(|value| !value.trim().is_empty())
            .or_else(|| api.base_url.map(|raw| expand_env_vars(&raw, &lookup)))
            .unwrap_or(api_defaults.base_url);

        let router_defaults = RouterSettings::default();
        let toast_defaults = ToastSettings::default();
        let ms = |value: Option<u64>, fallback: Duration| {
            value.map_or(fallback, Duration::from_millis)
        };

        let storage_defaults = StorageSettings::default();

        Self {
            api: ApiSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout: api
                    .timeout_secs
                    .map_or(api_defaults.timeout, Duration::from_secs),
                connect_timeout: api
                    .connect_timeout_secs
                    .map_or(api_defaults.connect_timeout, Duration::from_secs),
            },
            router: RouterSettings {
                default_path: router.default_path.unwrap_or(router_defaults.default_path),
                history_limit: router
                    .history_limit
                    .filter(|limit| *limit > 0)
                    .unwrap_or(router_defaults.history_limit),
                login_path: router.login_path.unwrap_or(router_defaults.login_path),
            },
            toasts: ToastSettings {
                max_visible: toasts
                    .max_visible
                    .filter(|max| *max > 0)
                    .unwrap_or(toast_defaults.max_visible),
                exit_transition: ms(toasts.exit_transition_ms, toast_defaults.exit_transition),
                success: ms(toasts.success_ms, toast_defaults.success),
                info: ms(toasts.info_ms, toast_defaults.info),
                warning: ms(toasts.warning_ms, toast_defaults.warning),
                error: ms(toasts.error_ms, toast_defaults.error),
            },
            storage: StorageSettings {
                dir: resolve_dir(storage.dir, "storage", &lookup),
                namespace: storage
                    .namespace
                    .filter(|namespace| !namespace.trim().is_empty())
                    .unwrap_or(storage_defaults.namespace),
            },
            log: LogSettings {
                dir: resolve_dir(log.dir, "logs", &lookup),
                filter: log
                    .filter
                    .filter(|filter| !filter.trim().is_empty())
                    .unwrap_or_else(|| LogSettings::DEFAULT_FILTER.to_string()),
            },
        }
    }
}

/// A configured directory (with `~/` and `${NAME}` expanded), or `leaf`
/// under the data dir.
fn resolve_dir(
    raw: Option<String>,
    leaf: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    match raw {
        Some(raw) => Some(expand_home(&expand_env_vars(&raw, lookup))),
        None => data_dir().map(|dir| dir.join(leaf)),
    }
}

/// `~/.courier`, home of config, storage and logs.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".courier"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    match env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => data_dir().map(|dir| dir.join("config.toml")),
    }
}

/// Replace `${NAME}` with the variable's value. Unknown variables expand to
/// nothing.
fn expand_env_vars(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        if !name.is_empty()
            && let Some(replacement) = lookup(name)
        {
            out.push_str(&replacement);
        }
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}
