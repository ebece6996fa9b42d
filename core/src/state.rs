//! Reactive key/value store.
//!
//! Values are held as canonical `serde_json::Value`s. A `set` always replaces
//! the stored value, but change events go out only when the new value is not
//! structurally equal to the old one. `Value` equality ignores object key
//! order and cannot contain NaN, so two semantically equal values never
//! trigger a notification.
//!
//! Each change is published twice: under `state:<key>` (what [`State::watch`]
//! listens to) and under the generic `state:change`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use courier_types::{Event, EventName};

use crate::bus::{Delivery, EventBus, SubscribeOptions, Subscription, handler};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state value for '{key}' cannot be serialized: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("state value for '{key}' has an unexpected shape: {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct State {
    bus: EventBus,
    entries: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl State {
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            entries: Rc::default(),
        }
    }

    /// Typed read. A stored value that does not decode into `T` is logged and
    /// reported as absent.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key, "State value has unexpected shape: {e}");
                None
            }
        }
    }

    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        self.get(key).unwrap_or(fallback)
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Store `value` under `key`. Returns whether watchers were notified.
    ///
    /// Fails without touching the store if `value` has no JSON form.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool, StateError> {
        let value = serde_json::to_value(value).map_err(|source| StateError::Serialization {
            key: key.to_string(),
            source,
        })?;
        Ok(self.set_value(key, value))
    }

    pub fn set_value(&self, key: &str, value: Value) -> bool {
        self.set_value_reported(key, value).is_some()
    }

    /// [`set_value`](Self::set_value) that hands back what the watchers and
    /// `state:change` listeners reported. `None` when nothing changed.
    pub fn set_value_reported(&self, key: &str, value: Value) -> Option<Delivery> {
        let previous = self
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.clone());
        if previous.as_ref() == Some(&value) {
            return None;
        }

        tracing::debug!(key, "State changed");
        let event = Event::StateChanged {
            key: key.to_string(),
            value,
            previous,
        };
        let mut delivery = self.bus.emit_named(&EventName::state_key(key), &event);
        delivery.merge(self.bus.emit(&event));
        Some(delivery)
    }

    /// Read-modify-write through `f`. `f` receives `None` when the key is
    /// absent.
    pub fn update<T, F>(&self, key: &str, f: F) -> Result<bool, StateError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let current = match self.get_value(key) {
            Some(value) => Some(serde_json::from_value(value).map_err(|source| {
                StateError::Deserialization {
                    key: key.to_string(),
                    source,
                }
            })?),
            None => None,
        };
        self.set(key, &f(current))
    }

    /// Call `f(value, previous)` on every change of `key`.
    pub fn watch<F>(&self, key: &str, f: F) -> Subscription
    where
        F: Fn(&Value, Option<&Value>) -> anyhow::Result<()> + 'static,
    {
        self.bus.on(
            EventName::state_key(key),
            handler(move |event| match event {
                Event::StateChanged {
                    value, previous, ..
                } => f(value, previous.as_ref()),
                _ => Ok(()),
            }),
            SubscribeOptions::default(),
        )
    }

    /// Sorted snapshot of every entry.
    #[must_use]
    pub fn dump(&self) -> Map<String, Value> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}
