use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }
}

/// A 2xx answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// `None` for empty bodies and for JSON bodies that failed to parse.
    pub body: Option<ResponseBody>,
}

impl Response {
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        self.body.as_ref().and_then(ResponseBody::as_json)
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.body.as_ref().and_then(ResponseBody::as_text)
    }

    /// Decode the JSON body into `T`. A missing or mismatched body is logged
    /// and reported as `None`.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.json()?.clone();
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(status = self.status, "Response body has unexpected shape: {e}");
                None
            }
        }
    }
}

/// Decode by declared content type. JSON that does not parse counts as no
/// body at all.
pub(crate) fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> Option<ResponseBody> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("json"));
    if is_json {
        return match serde_json::from_slice(bytes) {
            Ok(value) => Some(ResponseBody::Json(value)),
            Err(e) => {
                tracing::debug!("Ignoring malformed JSON response body: {e}");
                None
            }
        };
    }
    Some(ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()))
}

/// Server back-off hint from `Retry-After-Ms` (milliseconds, may be
/// fractional) or `Retry-After` (whole seconds). A millisecond value that
/// does not fit a `Duration` is ignored.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(val) = headers.get("retry-after-ms")
        && let Ok(s) = val.to_str()
        && let Ok(ms) = s.trim().parse::<f64>()
        && ms > 0.0
        && let Ok(delay) = Duration::try_from_secs_f64(ms / 1000.0)
    {
        return Some(delay);
    }

    if let Some(val) = headers.get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.trim().parse::<u64>()
        && secs > 0
    {
        return Some(Duration::from_secs(secs));
    }

    None
}
