//! Runtime events.
//!
//! Every event the bus can carry is a case of [`Event`] with a fixed payload
//! shape. Subscribers register against an [`EventName`]; most events map to a
//! single canonical name, while state changes are additionally published under
//! a per-key name (`state:<key>`).

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::{ModalId, RouteMatch};

/// Keys the runtime reacts to. Anything else arrives as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Other(String),
}

impl Key {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "escape" | "esc" => Self::Escape,
            "enter" | "return" => Self::Enter,
            "tab" => Self::Tab,
            _ => Self::Other(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A state key changed value. Published as `state:<key>` and `state:change`.
    StateChanged {
        key: String,
        value: Value,
        previous: Option<Value>,
    },
    RouteChanged(RouteMatch),
    RouteNotFound {
        path: String,
    },
    /// The server answered 401.
    Unauthorized {
        path: String,
    },
    /// The server answered 429.
    RateLimited {
        path: String,
        retry_after: Option<Duration>,
    },
    KeyPressed(Key),
    /// Click on the backdrop behind the topmost modal.
    OverlayClicked,
    ModalOpened {
        id: ModalId,
    },
    ModalClosed {
        id: ModalId,
    },
    /// Application-defined event for page modules.
    Custom {
        name: String,
        payload: Value,
    },
}

impl Event {
    /// Canonical name this event is published under.
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            Self::StateChanged { .. } => EventName::StateChange,
            Self::RouteChanged(_) => EventName::RouteChange,
            Self::RouteNotFound { .. } => EventName::RouteNotFound,
            Self::Unauthorized { .. } => EventName::Unauthorized,
            Self::RateLimited { .. } => EventName::RateLimited,
            Self::KeyPressed(_) => EventName::KeyPress,
            Self::OverlayClicked => EventName::OverlayClick,
            Self::ModalOpened { .. } => EventName::ModalOpen,
            Self::ModalClosed { .. } => EventName::ModalClose,
            Self::Custom { name, .. } => EventName::Custom(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    StateChange,
    /// Namespaced per-key state channel used by watchers.
    StateKey(String),
    RouteChange,
    RouteNotFound,
    Unauthorized,
    RateLimited,
    KeyPress,
    OverlayClick,
    ModalOpen,
    ModalClose,
    Custom(String),
}

impl EventName {
    #[must_use]
    pub fn state_key(key: impl Into<String>) -> Self {
        Self::StateKey(key.into())
    }

    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateChange => f.write_str("state:change"),
            Self::StateKey(key) => write!(f, "state:{key}"),
            Self::RouteChange => f.write_str("route:change"),
            Self::RouteNotFound => f.write_str("route:notfound"),
            Self::Unauthorized => f.write_str("http:unauthorized"),
            Self::RateLimited => f.write_str("http:ratelimited"),
            Self::KeyPress => f.write_str("key:press"),
            Self::OverlayClick => f.write_str("overlay:click"),
            Self::ModalOpen => f.write_str("modal:open"),
            Self::ModalClose => f.write_str("modal:close"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}
