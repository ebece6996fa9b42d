use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::RouteId;

/// Decoded `:name` segments of a matched path.
pub type Params = BTreeMap<String, String>;

/// Parsed query string.
pub type Query = BTreeMap<String, String>;

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    pub path: String,
    pub params: Params,
    pub query: Query,
    pub route: RouteId,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RouteMatch {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// What the platform currently shows: the fragment path and the URL search
/// string (without the leading `?`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub search: String,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<String>, search: impl Into<String>) -> Self {
        let search = search.into();
        Self {
            path: path.into(),
            search: search.strip_prefix('?').map(str::to_string).unwrap_or(search),
        }
    }
}
