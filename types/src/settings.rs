//! Resolved configuration types shared across crates.
//!
//! Raw TOML deserialization structs (with `Option` fields) stay private in
//! `courier-config`. The config loader resolves them into these types, so
//! every consumer works with fully-populated values.

use std::path::PathBuf;
use std::time::Duration;

use crate::Severity;

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Base every relative request path is resolved against.
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSettings {
    /// Where `back()` lands once the navigation trail is exhausted.
    pub default_path: String,
    pub history_limit: usize,
    /// Where the session collaborator sends the user after a 401.
    pub login_path: String,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            default_path: "/".to_string(),
            history_limit: 50,
            login_path: "/login".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastSettings {
    pub max_visible: usize,
    /// Time between the start of the exit animation and removal.
    pub exit_transition: Duration,
    pub success: Duration,
    pub info: Duration,
    pub warning: Duration,
    pub error: Duration,
}

impl ToastSettings {
    /// Auto-dismiss delay for a severity. `None` means the toast stays until
    /// dismissed explicitly.
    #[must_use]
    pub fn default_duration(&self, severity: Severity) -> Option<Duration> {
        match severity {
            Severity::Success => Some(self.success),
            Severity::Info => Some(self.info),
            Severity::Warning => Some(self.warning),
            Severity::Error => Some(self.error),
            Severity::Loading => None,
        }
    }
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            max_visible: 3,
            exit_transition: Duration::from_millis(300),
            success: Duration::from_millis(3000),
            info: Duration::from_millis(4000),
            warning: Duration::from_millis(5000),
            error: Duration::from_millis(6000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Directory holding the durable scope file. `None` keeps everything in
    /// memory.
    pub dir: Option<PathBuf>,
    /// Prefix applied to every stored key.
    pub namespace: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dir: None,
            namespace: "courier".to_string(),
        }
    }
}
