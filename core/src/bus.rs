//! Synchronous in-process publish/subscribe dispatcher.
//!
//! # Delivery
//!
//! `emit` takes a snapshot of the handlers registered for the event name and
//! calls them in registration order before returning. Handlers registered or
//! removed while an emit is running only affect later emits, with one
//! exception: one-shot handlers are detached right before they run, so a
//! nested emit of the same event can never fire them twice.
//!
//! Every handler result is captured on its own. A failing handler is logged
//! and recorded in the returned [`Delivery`]; it never stops the fan-out and
//! never reaches the emitter.
//!
//! Handlers may emit from inside a handler (same or other event). Nothing
//! bounds the recursion depth: a handler that unconditionally re-emits its
//! own event will overflow the stack.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use courier_types::{Event, EventName};

/// Shared handler reference. Identity (the `Rc` allocation) is what `off`
/// matches against.
pub type Handler = Rc<dyn Fn(&Event) -> anyhow::Result<()>>;

/// Wrap a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Event) -> anyhow::Result<()> + 'static,
{
    Rc::new(f)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Remove the registration after its first invocation.
    pub once: bool,
}

struct Registration {
    id: u64,
    handler: Handler,
    once: bool,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<EventName, Vec<Registration>>,
}

impl Registry {
    fn remove(&mut self, name: &EventName, id: u64) -> bool {
        let Some(list) = self.handlers.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|registration| registration.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(name);
        }
        removed
    }
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// Cheap-to-clone handle to a shared registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let total: usize = registry.handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("events", &registry.handlers.len())
            .field("handlers", &total)
            .finish()
    }
}

/// Token returned by [`EventBus::on`]. Dropping it keeps the registration
/// alive; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    name: EventName,
    id: u64,
}

impl Subscription {
    /// Remove this registration. Returns `false` if it was already gone
    /// (fired once, cleared, or unsubscribed before).
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.borrow_mut().remove(&self.name, self.id))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .borrow()
                .handlers
                .get(&self.name)
                .is_some_and(|list| list.iter().any(|r| r.id == self.id))
        })
    }

    #[must_use]
    pub fn name(&self) -> &EventName {
        &self.name
    }
}

#[derive(Debug)]
pub struct HandlerFailure {
    pub subscription: u64,
    pub error: anyhow::Error,
}

/// Outcome of one `emit`.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Handlers invoked, failed ones included.
    pub delivered: usize,
    pub failures: Vec<HandlerFailure>,
}

impl Delivery {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: Delivery) {
        self.delivered += other.delivered;
        self.failures.extend(other.failures);
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, name: EventName, handler: Handler, options: SubscribeOptions) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(name.clone())
            .or_default()
            .push(Registration {
                id,
                handler,
                once: options.once,
            });
        tracing::trace!(
            event = %name,
            subscription = id,
            once = options.once,
            "Handler registered"
        );
        Subscription {
            registry: Rc::downgrade(&self.registry),
            name,
            id,
        }
    }

    pub fn once(&self, name: EventName, handler: Handler) -> Subscription {
        self.on(name, handler, SubscribeOptions { once: true })
    }

    /// Remove every registration of `handler` under `name`. Returns how many
    /// were removed.
    pub fn off(&self, name: &EventName, handler: &Handler) -> usize {
        let mut registry = self.registry.borrow_mut();
        let Some(list) = registry.handlers.get_mut(name) else {
            return 0;
        };
        let before = list.len();
        list.retain(|registration| !same_handler(&registration.handler, handler));
        let removed = before - list.len();
        if list.is_empty() {
            registry.handlers.remove(name);
        }
        removed
    }

    /// Publish under the event's canonical name.
    pub fn emit(&self, event: &Event) -> Delivery {
        self.emit_named(&event.name(), event)
    }

    /// Publish under an explicit name (used for namespaced channels such as
    /// `state:<key>`).
    pub fn emit_named(&self, name: &EventName, event: &Event) -> Delivery {
        let snapshot: Vec<(u64, Handler, bool)> = self
            .registry
            .borrow()
            .handlers
            .get(name)
            .map(|list| {
                list.iter()
                    .map(|r| (r.id, Rc::clone(&r.handler), r.once))
                    .collect()
            })
            .unwrap_or_default();

        let mut delivery = Delivery::default();
        for (id, handler, once) in snapshot {
            if once {
                let detached = self.registry.borrow_mut().remove(name, id);
                if !detached {
                    continue;
                }
            }
            delivery.delivered += 1;
            if let Err(error) = handler(event) {
                tracing::warn!(event = %name, subscription = id, "Event handler failed: {error:#}");
                delivery.failures.push(HandlerFailure {
                    subscription: id,
                    error,
                });
            }
        }
        delivery
    }

    /// Drop all registrations for `name`, or every registration when `None`.
    pub fn clear(&self, name: Option<&EventName>) {
        let mut registry = self.registry.borrow_mut();
        match name {
            Some(name) => {
                registry.handlers.remove(name);
            }
            None => registry.handlers.clear(),
        }
    }

    #[must_use]
    pub fn handler_count(&self, name: &EventName) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(name)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use courier_types::{Event, EventName, Key};

    use super::{EventBus, SubscribeOptions, handler};

    fn custom(name: &str) -> Event {
        Event::Custom {
            name: name.into(),
            payload: serde_json::Value::Null,
        }
    }

    fn counter() -> (Rc<Cell<u32>>, super::Handler) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let h = handler(move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        });
        (count, h)
    }

    #[test]
    fn once_fires_exactly_once() {
        let bus = EventBus::new();
        let (count, h) = counter();
        bus.once(EventName::custom("ping"), h);

        bus.emit(&custom("ping"));
        bus.emit(&custom("ping"));

        assert_eq!(count.get(), 1);
        assert_eq!(bus.handler_count(&EventName::custom("ping")), 0);
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for label in ["a", "b", "c"] {
            let order = Rc::clone(&order);
            bus.on(
                EventName::OverlayClick,
                handler(move |_| {
                    order.borrow_mut().push(label);
                    Ok(())
                }),
                SubscribeOptions::default(),
            );
        }

        bus.emit(&Event::OverlayClicked);

        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failing_handler_does_not_stop_fan_out() {
        let bus = EventBus::new();
        let (count, h) = counter();
        bus.on(
            EventName::KeyPress,
            handler(|_| anyhow::bail!("boom")),
            SubscribeOptions::default(),
        );
        bus.on(EventName::KeyPress, h, SubscribeOptions::default());

        let delivery = bus.emit(&Event::KeyPressed(Key::Escape));

        assert_eq!(count.get(), 1);
        assert_eq!(delivery.delivered, 2);
        assert_eq!(delivery.failures.len(), 1);
        assert!(delivery.failures[0].error.to_string().contains("boom"));
    }

    #[test]
    fn off_removes_every_registration_of_same_handler() {
        let bus = EventBus::new();
        let (count, h) = counter();
        let (other_count, other) = counter();
        let name = EventName::custom("tick");
        bus.on(name.clone(), Rc::clone(&h), SubscribeOptions::default());
        bus.on(name.clone(), Rc::clone(&h), SubscribeOptions::default());
        bus.on(name.clone(), other, SubscribeOptions::default());

        assert_eq!(bus.off(&name, &h), 2);
        bus.emit(&custom("tick"));

        assert_eq!(count.get(), 0);
        assert_eq!(other_count.get(), 1);
    }

    #[test]
    fn handler_added_during_emit_waits_for_next_emit() {
        let bus = EventBus::new();
        let (count, late) = counter();
        let inner_bus = bus.clone();
        bus.once(
            EventName::custom("grow"),
            handler(move |_| {
                inner_bus.on(
                    EventName::custom("grow"),
                    Rc::clone(&late),
                    SubscribeOptions::default(),
                );
                Ok(())
            }),
        );

        bus.emit(&custom("grow"));
        assert_eq!(count.get(), 0);

        bus.emit(&custom("grow"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn nested_emit_cannot_refire_once_handler() {
        let bus = EventBus::new();
        let fired = Rc::new(Cell::new(0));
        let seen = Rc::clone(&fired);
        let inner_bus = bus.clone();
        bus.once(
            EventName::custom("echo"),
            handler(move |_| {
                seen.set(seen.get() + 1);
                inner_bus.emit(&custom("echo"));
                Ok(())
            }),
        );

        bus.emit(&custom("echo"));

        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn unsubscribe_removes_single_registration() {
        let bus = EventBus::new();
        let (count, h) = counter();
        let first = bus.on(EventName::ModalOpen, Rc::clone(&h), SubscribeOptions::default());
        bus.on(EventName::ModalOpen, h, SubscribeOptions::default());

        assert!(first.unsubscribe());
        assert!(!first.unsubscribe());
        assert!(!first.is_active());

        bus.emit(&Event::ModalOpened { id: "x".into() });
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn clear_scoped_and_global() {
        let bus = EventBus::new();
        let (_, h) = counter();
        bus.on(EventName::RouteChange, Rc::clone(&h), SubscribeOptions::default());
        bus.on(EventName::RouteNotFound, h, SubscribeOptions::default());

        bus.clear(Some(&EventName::RouteChange));
        assert_eq!(bus.handler_count(&EventName::RouteChange), 0);
        assert_eq!(bus.handler_count(&EventName::RouteNotFound), 1);

        bus.clear(None);
        assert_eq!(bus.handler_count(&EventName::RouteNotFound), 0);
    }
}
