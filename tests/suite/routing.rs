//! Router dispatch, history and platform integration

use std::cell::RefCell;
use std::rc::Rc;

use courier_engine::types::{Params, RouteMatch};
use courier_engine::{Dispatch, PersistentStore, Platform, RouteOptions, route_handler};

use crate::common::{config_for, harness, harness_with};

#[test]
fn params_and_query_reach_the_handler() {
    let h = harness();
    h.platform.set_search("?tab=media&q=hello%20world");

    let dispatch = h.runtime.router().navigate("/chat/42", false);

    let route = dispatch.matched().expect("chat route matches");
    assert_eq!(route.param("id"), Some("42"));
    assert_eq!(route.query_value("tab"), Some("media"));
    assert_eq!(route.query_value("q"), Some("hello world"));
    assert_eq!(h.runtime.router().current().as_ref(), Some(route));
    assert_eq!(*h.visits.borrow(), vec!["/chat/42"]);
}

#[test]
fn first_registered_pattern_wins() {
    let h = harness();
    let hit = Rc::new(RefCell::new(None::<String>));
    let sink = Rc::clone(&hit);
    // `/chat/:id` was registered first by the harness.
    h.runtime
        .router()
        .define(
            "/chat/new",
            route_handler(move |route: &RouteMatch| {
                *sink.borrow_mut() = Some(route.pattern.clone());
                Ok(())
            }),
            RouteOptions::default(),
        )
        .unwrap();

    let dispatch = h.runtime.router().navigate("/chat/new", false);

    assert_eq!(dispatch.matched().map(|m| m.pattern.as_str()), Some("/chat/:id"));
    assert!(hit.borrow().is_none());
}

#[test]
fn back_walks_the_trail_then_falls_back_to_default() {
    let h = harness();
    let router = h.runtime.router();
    router.navigate("/a", false);
    router.navigate("/b", false);
    router.navigate("/c", false);

    let first = router.back();
    assert_eq!(first.matched().map(|m| m.path.as_str()), Some("/b"));
    let second = router.back();
    assert_eq!(second.matched().map(|m| m.path.as_str()), Some("/a"));
    let third = router.back();
    assert_eq!(third.matched().map(|m| m.path.as_str()), Some("/"));
    assert_eq!(h.platform.location().path, "/");
}

#[test]
fn unknown_path_is_reported_and_keeps_current_route() {
    let h = harness();
    h.runtime.router().navigate("/chats", false);

    let dispatch = h.runtime.router().navigate("/nowhere", false);

    assert!(matches!(dispatch, Dispatch::NotFound { ref path } if path == "/nowhere"));
    assert_eq!(
        h.runtime.router().current().map(|m| m.path),
        Some("/chats".to_string())
    );
}

#[test]
fn platform_back_button_dispatches_without_growing_history() {
    let h = harness();
    let router = h.runtime.router();
    router.navigate("/a", false);
    router.navigate("/b", false);
    let trail = router.history();

    assert!(h.platform.go_back());
    let dispatch = router.dispatch_external();

    assert_eq!(dispatch.matched().map(|m| m.path.as_str()), Some("/a"));
    assert_eq!(router.history(), trail);
}

#[test]
fn start_dispatches_the_initial_location() {
    let h = harness_with(
        config_for("http://127.0.0.1:9"),
        PersistentStore::in_memory("courier"),
        "/chat/7",
    );

    let dispatch = h.runtime.start();

    assert_eq!(dispatch.matched().and_then(|m| m.param("id")), Some("7"));
}

#[test]
fn named_routes_build_links() {
    let h = harness();
    let mut params = Params::new();
    params.insert("id".to_string(), "a b".to_string());

    assert_eq!(h.runtime.router().href("chat", &params).as_deref(), Some("/chat/a%20b"));
    assert_eq!(h.runtime.router().href("chat", &Params::new()), None);
    assert_eq!(h.runtime.router().href("missing", &params), None);
}
