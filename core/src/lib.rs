//! Client runtime services for Courier.
//!
//! Everything here is single-threaded: services are cheap `Rc` handles that
//! share state with their clones, and every callback runs synchronously on
//! the caller's stack. No service holds an internal borrow while user code
//! runs, so handlers may call back into any service.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::must_use_candidate)] // Handle-returning mutators are routinely discarded

pub mod bus;
pub mod modal;
pub mod presenter;
pub mod router;
pub mod state;
pub mod timing;
pub mod toast;

pub use bus::{Delivery, EventBus, Handler, HandlerFailure, SubscribeOptions, Subscription, handler};
pub use modal::{ACTIVE_MODAL_KEY, ModalHandle, ModalStack};
pub use presenter::{
    ModalPresenter, NullPresenter, PresenterCall, RecordingPresenter, ToastPresenter,
};
pub use router::{
    CURRENT_ROUTE_KEY, Dispatch, MemoryPlatform, NavigationHistory, Platform, RouteError,
    RouteHandler, RouteOptions, Router, route_handler,
};
pub use state::{State, StateError};
pub use timing::{Debounce, Throttle};
pub use toast::{ActionCallback, ToastAction, ToastDuration, ToastHandle, ToastOptions, ToastQueue};
