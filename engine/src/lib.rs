//! Runtime composition root for Courier.
//!
//! [`Runtime`] constructs one instance of every service, seeds State from
//! durable storage, keeps the persisted keys written back, and reacts to
//! session signals from the HTTP layer. There are no globals: every test can
//! build its own isolated runtime.

mod runtime;
mod session;

pub use runtime::{PERSISTED_KEYS, Presenters, Runtime, RuntimeError};

// Re-export the service crates so hosts depend on one crate.
pub use courier_config::{ConfigError, CourierConfig, LogSettings, config_path, data_dir};
pub use courier_core::{
    ACTIVE_MODAL_KEY, CURRENT_ROUTE_KEY, Delivery, Dispatch, EventBus, MemoryPlatform,
    ModalHandle, ModalPresenter, ModalStack, NullPresenter, Platform, PresenterCall,
    RecordingPresenter, RouteHandler, RouteOptions, Router, State, SubscribeOptions,
    Subscription, ToastAction, ToastDuration, ToastHandle, ToastOptions, ToastPresenter,
    ToastQueue, handler, route_handler,
};
pub use courier_http::{Http, HttpError, RequestOptions, Response, ResponseBody};
pub use courier_store::{PersistentStore, Scope, StoreError};
pub use courier_types as types;

/// Bearer token of the signed-in user.
pub const TOKEN_KEY: &str = "auth.token";
/// Profile of the signed-in user.
pub const USER_KEY: &str = "auth.user";
pub const THEME_KEY: &str = "ui.theme";
pub const LOCALE_KEY: &str = "ui.locale";
pub const PREFS_KEY: &str = "ui.prefs";
