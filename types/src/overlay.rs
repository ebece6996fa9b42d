use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{EnumParseError, ModalId, ToastId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
    /// Stays until the operation that opened it resolves it.
    Loading,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Self::Success,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Loading,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Loading => "loading",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" => Ok(Self::Success),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "loading" => Ok(Self::Loading),
            _ => Err(EnumParseError::new(
                "severity",
                s,
                &["success", "info", "warning", "error", "loading"],
            )),
        }
    }
}

/// Templated field values handed to a modal when it opens.
pub type FieldData = std::collections::BTreeMap<String, String>;

/// Snapshot of a toast as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastView {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
    pub action_label: Option<String>,
}

/// Snapshot of the modal stack, bottom first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalOrder(pub Vec<ModalId>);

impl ModalOrder {
    #[must_use]
    pub fn top(&self) -> Option<&ModalId> {
        self.0.last()
    }
}
