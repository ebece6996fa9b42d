//! Reactions to server-side session signals.
//!
//! A 401 means the stored credentials are no longer valid: they are wiped
//! from State (and, through the write-back watchers, from storage), the
//! user gets an error toast and the router is sent to the login page. A 429
//! only produces a warning toast with the server's back-off hint.

use std::time::Duration;

use serde_json::Value;

use courier_core::{EventBus, Router, State, SubscribeOptions, Subscription, ToastQueue, handler};
use courier_types::{Event, EventName};

use crate::{TOKEN_KEY, USER_KEY};

pub(crate) const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

pub(crate) fn rate_limit_message(retry_after: Option<Duration>) -> String {
    match retry_after {
        Some(delay) => {
            let secs = delay.as_secs_f64().ceil().max(1.0);
            format!("Too many requests. Try again in {secs:.0}s.")
        }
        None => "Too many requests. Please slow down.".to_string(),
    }
}

pub(crate) fn bind(
    bus: &EventBus,
    state: &State,
    toasts: &ToastQueue,
    router: &Router,
    login_path: &str,
) -> Vec<Subscription> {
    let unauthorized = {
        let state = state.clone();
        let toasts = toasts.clone();
        let router = router.clone();
        let login_path = login_path.to_string();
        bus.on(
            EventName::Unauthorized,
            handler(move |event| {
                if let Event::Unauthorized { path } = event {
                    tracing::info!(path = %path, "Session rejected; signing out");
                }
                state.set_value(TOKEN_KEY, Value::Null);
                state.set_value(USER_KEY, Value::Null);
                toasts.error(SESSION_EXPIRED);
                let on_login = router
                    .current()
                    .is_some_and(|current| current.path == login_path);
                if !on_login {
                    router.navigate(&login_path, true);
                }
                Ok(())
            }),
            SubscribeOptions::default(),
        )
    };

    let rate_limited = {
        let toasts = toasts.clone();
        bus.on(
            EventName::RateLimited,
            handler(move |event| {
                if let Event::RateLimited { retry_after, .. } = event {
                    toasts.warning(rate_limit_message(*retry_after));
                }
                Ok(())
            }),
            SubscribeOptions::default(),
        )
    };

    vec![unauthorized, rate_limited]
}
