use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use courier_config::CourierConfig;
use courier_core::{
    Delivery, Dispatch, EventBus, ModalPresenter, ModalStack, NullPresenter, Platform, Router,
    State, Subscription, ToastPresenter, ToastQueue,
};
use courier_http::Http;
use courier_store::PersistentStore;
use courier_types::{Event, Key};

use crate::{LOCALE_KEY, PREFS_KEY, THEME_KEY, TOKEN_KEY, USER_KEY, session};

/// Storage key and the State key it seeds, for everything that survives a
/// restart.
pub const PERSISTED_KEYS: [(&str, &str); 5] = [
    ("token", TOKEN_KEY),
    ("user", USER_KEY),
    ("theme", THEME_KEY),
    ("locale", LOCALE_KEY),
    ("prefs", PREFS_KEY),
];

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Display backends for the overlay services.
#[derive(Clone)]
pub struct Presenters {
    pub modal: Rc<dyn ModalPresenter>,
    pub toast: Rc<dyn ToastPresenter>,
}

impl Presenters {
    /// Draws nothing.
    #[must_use]
    pub fn headless() -> Self {
        Self::shared(Rc::new(NullPresenter))
    }

    /// One value presenting both modals and toasts.
    #[must_use]
    pub fn shared<P>(presenter: Rc<P>) -> Self
    where
        P: ModalPresenter + ToastPresenter + 'static,
    {
        Self {
            modal: Rc::clone(&presenter) as Rc<dyn ModalPresenter>,
            toast: presenter as Rc<dyn ToastPresenter>,
        }
    }
}

impl fmt::Debug for Presenters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presenters").finish_non_exhaustive()
    }
}

// ============================================================================
// Runtime
// ============================================================================

pub struct Runtime {
    config: CourierConfig,
    bus: EventBus,
    state: State,
    store: PersistentStore,
    http: Http,
    router: Router,
    modals: ModalStack,
    toasts: ToastQueue,
    platform: Rc<dyn Platform>,
    bindings: Vec<Subscription>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("bus", &self.bus)
            .field("router", &self.router)
            .field("modals", &self.modals)
            .field("toasts", &self.toasts)
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        config: CourierConfig,
        platform: Rc<dyn Platform>,
        presenters: Presenters,
        store: PersistentStore,
    ) -> Result<Self, RuntimeError> {
        let bus = EventBus::new();
        let state = State::new(bus.clone());
        let http = Http::new(&config.api, bus.clone()).map_err(RuntimeError::HttpClient)?;
        let router = Router::new(state.clone(), Rc::clone(&platform), config.router.clone());
        let modals = ModalStack::new(state.clone(), presenters.modal);
        let toasts = ToastQueue::new(config.toasts.clone(), presenters.toast);

        let mut runtime = Self {
            config,
            bus,
            state,
            store,
            http,
            router,
            modals,
            toasts,
            platform,
            bindings: Vec::new(),
        };
        runtime.seed();
        runtime.bind();
        tracing::info!(base_url = %runtime.http.base_url(), "Runtime ready");
        Ok(runtime)
    }

    /// Copy persisted values into State before anything watches it.
    fn seed(&self) {
        let durable = self.store.durable();
        for (storage_key, state_key) in PERSISTED_KEYS {
            if let Some(value) = durable.get_value(storage_key)
                && !value.is_null()
            {
                self.state.set_value(state_key, value);
            }
        }
        let token: Option<String> = self.state.get(TOKEN_KEY);
        self.http.set_token(token.as_deref());
        tracing::debug!(authenticated = token.is_some(), "State seeded from storage");
    }

    fn bind(&mut self) {
        for (storage_key, state_key) in PERSISTED_KEYS {
            let scope = self.store.durable().clone();
            self.bindings.push(self.state.watch(state_key, move |value, _| {
                if value.is_null() {
                    scope.remove(storage_key)?;
                } else {
                    scope.set_value(storage_key, value.clone())?;
                }
                Ok(())
            }));
        }

        let http = self.http.clone();
        self.bindings.push(self.state.watch(TOKEN_KEY, move |value, _| {
            http.set_token(value.as_str());
            Ok(())
        }));

        self.modals.attach();
        self.bindings.extend(session::bind(
            &self.bus,
            &self.state,
            &self.toasts,
            &self.router,
            &self.config.router.login_path,
        ));
    }

    /// Dispatch the platform's current location.
    pub fn start(&self) -> Dispatch {
        self.router.start()
    }

    /// Move the overlay clock forward.
    pub fn advance(&self, delta: Duration) {
        self.toasts.advance(delta);
    }

    pub fn key_press(&self, key: Key) {
        self.bus.emit(&Event::KeyPressed(key));
    }

    pub fn overlay_click(&self) {
        self.bus.emit(&Event::OverlayClicked);
    }

    /// Store a fresh session. `user` may be `Value::Null`.
    ///
    /// The returned report carries any write-back failure, such as storage
    /// that could not be written.
    pub fn sign_in(&self, token: &str, user: Value) -> Delivery {
        self.set_session(Value::String(token.to_string()), user)
    }

    pub fn sign_out(&self) -> Delivery {
        self.set_session(Value::Null, Value::Null)
    }

    fn set_session(&self, token: Value, user: Value) -> Delivery {
        let mut delivery = Delivery::default();
        for (key, value) in [(TOKEN_KEY, token), (USER_KEY, user)] {
            if let Some(report) = self.state.set_value_reported(key, value) {
                delivery.merge(report);
            }
        }
        if !delivery.is_clean() {
            tracing::warn!(failures = delivery.failures.len(), "Session change not fully applied");
        }
        delivery
    }

    /// Close overlays and drop every bus subscription. Services stay usable
    /// but nothing reacts to events any more.
    pub fn shutdown(&mut self) {
        self.modals.close_all();
        self.toasts.dismiss_all();
        self.modals.detach();
        for binding in self.bindings.drain(..) {
            binding.unsubscribe();
        }
        self.bus.clear(None);
        tracing::info!("Runtime shut down");
    }

    #[must_use]
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[must_use]
    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    #[must_use]
    pub fn http(&self) -> &Http {
        &self.http
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn modals(&self) -> &ModalStack {
        &self.modals
    }

    #[must_use]
    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    #[must_use]
    pub fn platform(&self) -> &Rc<dyn Platform> {
        &self.platform
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use courier_config::CourierConfig;
    use courier_core::{MemoryPlatform, Platform};
    use courier_store::PersistentStore;
    use courier_types::{FieldData, Key, ModalId};

    use super::{Presenters, Runtime};
    use crate::{PREFS_KEY, THEME_KEY, TOKEN_KEY, USER_KEY};

    fn runtime_with(store: PersistentStore) -> Runtime {
        Runtime::new(
            CourierConfig::default(),
            Rc::new(MemoryPlatform::default()) as Rc<dyn Platform>,
            Presenters::headless(),
            store,
        )
        .unwrap()
    }

    #[test]
    fn seeds_state_and_token_from_storage() {
        let store = PersistentStore::in_memory("courier");
        store.durable().set("token", "abc").unwrap();
        store.durable().set("theme", "dark").unwrap();
        store.durable().set("prefs", &json!({"enter_sends": true})).unwrap();

        let runtime = runtime_with(store);

        assert_eq!(runtime.state().get::<String>(TOKEN_KEY).as_deref(), Some("abc"));
        assert_eq!(runtime.state().get::<String>(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(runtime.state().get_value(PREFS_KEY), Some(json!({"enter_sends": true})));
        assert_eq!(runtime.http().token().as_deref(), Some("abc"));
        assert!(!runtime.state().contains(USER_KEY));
    }

    #[test]
    fn changes_are_written_back_and_null_removes() {
        let store = PersistentStore::in_memory("courier");
        let runtime = runtime_with(store.clone());

        runtime.state().set(THEME_KEY, "light").unwrap();
        assert_eq!(store.durable().get::<String>("theme").as_deref(), Some("light"));

        runtime.state().set_value(THEME_KEY, serde_json::Value::Null);
        assert!(store.durable().get_value("theme").is_none());
    }

    #[test]
    fn sign_in_and_out_follow_through_to_http() {
        let store = PersistentStore::in_memory("courier");
        let runtime = runtime_with(store.clone());

        runtime.sign_in("t-1", json!({"id": 7, "name": "Ada"}));
        assert_eq!(runtime.http().token().as_deref(), Some("t-1"));
        assert_eq!(store.durable().get::<String>("token").as_deref(), Some("t-1"));

        runtime.sign_out();
        assert_eq!(runtime.http().token(), None);
        assert!(store.durable().keys().is_empty());
    }

    #[test]
    fn escape_reaches_modal_stack() {
        let runtime = runtime_with(PersistentStore::in_memory("courier"));
        runtime.modals().open("x", &FieldData::new());
        runtime.modals().open("y", &FieldData::new());

        runtime.key_press(Key::Escape);

        assert!(runtime.modals().is_open(&ModalId::new("x")));
        assert!(!runtime.modals().is_open(&ModalId::new("y")));
    }

    #[test]
    fn shutdown_closes_overlays_and_silences_bus() {
        let store = PersistentStore::in_memory("courier");
        let mut runtime = runtime_with(store.clone());
        runtime.modals().open("x", &FieldData::new());
        runtime.toasts().info("bye");

        runtime.shutdown();

        assert!(runtime.modals().is_empty());
        runtime.state().set(THEME_KEY, "dark").unwrap();
        assert!(store.durable().get_value("theme").is_none());
    }
}
