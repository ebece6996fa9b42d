use serde_json::Value;
use thiserror::Error;

use crate::response::ResponseBody;

/// Failure of one request, classified before it reaches the caller.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request never got an HTTP answer: connect failure, timeout, bad
    /// URL or header.
    #[error("network request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    /// The caller's abort handle fired.
    #[error("request aborted")]
    Aborted,
    /// The server answered with a non-2xx status.
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        body: Option<ResponseBody>,
    },
}

impl HttpError {
    /// HTTP status, `0` when no response arrived.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::Transport { .. } | Self::Aborted => 0,
        }
    }

    /// Aborted requests are deliberate and should not surface as errors.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == 401
    }

    /// Text suitable for an error toast.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Transport { .. } => "Network error. Check your connection.".to_string(),
            Self::Aborted => "Request cancelled.".to_string(),
            Self::Api { message, .. } => message.clone(),
        }
    }
}

/// Pull a human-readable message out of an error body. Checks
/// `error.message`, a string `error`, then `message`.
pub(crate) fn extract_error_message(body: &Value) -> Option<String> {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/error").and_then(Value::as_str))
        .or_else(|| body.pointer("/message").and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
}
