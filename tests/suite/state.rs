//! Reactive state through the assembled runtime

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};

use courier_engine::types::{Event, EventName};
use courier_engine::{SubscribeOptions, handler};

use crate::common::harness;

#[test]
fn watcher_fires_only_when_value_differs() {
    let h = harness();
    let seen: Rc<RefCell<Vec<(Value, Option<Value>)>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let _watch = h.runtime.state().watch("chat.draft", move |value, previous| {
        sink.borrow_mut().push((value.clone(), previous.cloned()));
        Ok(())
    });

    let state = h.runtime.state();
    assert!(state.set("chat.draft", "hi").unwrap());
    assert!(!state.set("chat.draft", "hi").unwrap());
    assert!(state.set("chat.draft", "hi there").unwrap());
    assert!(!state.set("chat.draft", "hi there").unwrap());

    assert_eq!(
        *seen.borrow(),
        vec![
            (json!("hi"), None),
            (json!("hi there"), Some(json!("hi"))),
        ]
    );
}

#[test]
fn every_change_is_also_broadcast_on_state_change() {
    let h = harness();
    let keys: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = Rc::clone(&keys);
    let _all = h.runtime.bus().on(
        EventName::StateChange,
        handler(move |event| {
            if let Event::StateChanged { key, .. } = event {
                sink.borrow_mut().push(key.clone());
            }
            Ok(())
        }),
        SubscribeOptions::default(),
    );

    h.runtime.state().set("ui.theme", "dark").unwrap();
    h.runtime.state().set("ui.theme", "dark").unwrap();
    h.runtime.state().set("ui.locale", "fr").unwrap();

    assert_eq!(*keys.borrow(), vec!["ui.theme", "ui.locale"]);
}

#[test]
fn failing_watcher_does_not_block_others() {
    let h = harness();
    let hits = Rc::new(RefCell::new(0));
    let _bad = h
        .runtime
        .state()
        .watch("count", |_, _| Err(anyhow::anyhow!("watcher failed")));
    let counter = Rc::clone(&hits);
    let _good = h.runtime.state().watch("count", move |_, _| {
        *counter.borrow_mut() += 1;
        Ok(())
    });

    h.runtime.state().set("count", &1).unwrap();

    assert_eq!(*hits.borrow(), 1);
    assert_eq!(h.runtime.state().get::<i64>("count"), Some(1));
}
