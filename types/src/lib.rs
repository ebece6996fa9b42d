//! Core domain types for Courier.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the runtime.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod event;
mod ids;
mod overlay;
mod route;
mod settings;

pub use event::{Event, EventName, Key};
pub use ids::{ModalId, RouteId, ToastId};
pub use overlay::{FieldData, ModalOrder, Severity, ToastView};
pub use route::{Location, Params, Query, RouteMatch};
pub use settings::{ApiSettings, RouterSettings, StorageSettings, ToastSettings};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value '{raw}'; expected one of: {expected:?}")]
pub struct EnumParseError {
    kind: &'static str,
    raw: String,
    expected: &'static [&'static str],
}

impl EnumParseError {
    #[must_use]
    pub fn new(
        kind: &'static str,
        raw: impl Into<String>,
        expected: &'static [&'static str],
    ) -> Self {
        Self {
            kind,
            raw: raw.into(),
            expected,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn expected(&self) -> &'static [&'static str] {
        self.expected
    }
}
