//! Event bus delivery semantics

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;

use courier_engine::handler;
use courier_engine::types::{Event, EventName};

use crate::common::harness;

fn ping() -> Event {
    Event::Custom {
        name: "chat:typing".to_string(),
        payload: json!({"chat": 4}),
    }
}

#[test]
fn once_fires_exactly_once() {
    let h = harness();
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let sub = h.runtime.bus().once(
        EventName::custom("chat:typing"),
        handler(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        }),
    );

    h.runtime.bus().emit(&ping());
    h.runtime.bus().emit(&ping());

    assert_eq!(hits.get(), 1);
    assert!(!sub.is_active());
}

#[test]
fn handler_errors_are_reported_not_raised() {
    let h = harness();
    let _failing = h.runtime.bus().on(
        EventName::custom("chat:typing"),
        handler(|_| Err(anyhow::anyhow!("render failed"))),
        Default::default(),
    );

    let delivery = h.runtime.bus().emit(&ping());

    assert!(!delivery.is_clean());
    assert_eq!(delivery.failures.len(), 1);
}

#[test]
fn unsubscribed_handler_is_not_called() {
    let h = harness();
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let sub = h.runtime.bus().on(
        EventName::custom("chat:typing"),
        handler(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        }),
        Default::default(),
    );

    assert!(sub.unsubscribe());
    h.runtime.bus().emit(&ping());

    assert_eq!(hits.get(), 0);
}
