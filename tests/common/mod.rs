//! Shared test utilities and fixtures
//!
//! Every test builds its own runtime over an in-memory platform and a
//! recording presenter, so nothing leaks between tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use courier_engine::types::RouteMatch;
use courier_engine::{
    CourierConfig, MemoryPlatform, PersistentStore, Platform, Presenters, RecordingPresenter,
    RouteOptions, Runtime, route_handler,
};

pub struct Harness {
    pub runtime: Runtime,
    pub platform: Rc<MemoryPlatform>,
    pub presenter: Rc<RecordingPresenter>,
    /// Paths seen by the page handlers, in dispatch order.
    pub visits: Rc<RefCell<Vec<String>>>,
}

pub fn config_for(base_url: &str) -> CourierConfig {
    let mut config = CourierConfig::default();
    config.api.base_url = base_url.to_string();
    config.storage.dir = None;
    config
}

/// Runtime at `initial` with the usual pages defined but not yet started.
pub fn harness_with(config: CourierConfig, store: PersistentStore, initial: &str) -> Harness {
    let platform = Rc::new(MemoryPlatform::new(initial));
    let presenter = Rc::new(RecordingPresenter::new());
    let runtime = Runtime::new(
        config,
        Rc::clone(&platform) as Rc<dyn Platform>,
        Presenters::shared(Rc::clone(&presenter)),
        store,
    )
    .expect("runtime builds");

    let visits = Rc::new(RefCell::new(Vec::new()));
    for (pattern, name) in [
        ("/", "home"),
        ("/login", "login"),
        ("/chats", "chats"),
        ("/chat/:id", "chat"),
        ("/a", "a"),
        ("/b", "b"),
        ("/c", "c"),
    ] {
        let visits = Rc::clone(&visits);
        runtime
            .router()
            .define(
                pattern,
                route_handler(move |route: &RouteMatch| {
                    visits.borrow_mut().push(route.path.clone());
                    Ok(())
                }),
                RouteOptions::named(name),
            )
            .expect("pattern compiles");
    }

    Harness {
        runtime,
        platform,
        presenter,
        visits,
    }
}

/// In-memory runtime pointed at an unreachable API.
pub fn harness() -> Harness {
    harness_with(
        config_for("http://127.0.0.1:9"),
        PersistentStore::in_memory("courier"),
        "/",
    )
}

pub fn api_harness(server: &MockServer, initial: &str) -> Harness {
    harness_with(
        config_for(&server.uri()),
        PersistentStore::in_memory("courier"),
        initial,
    )
}

/// Mount a JSON answer for `verb path`.
pub async fn mount_json(
    server: &MockServer,
    verb: &str,
    route: &str,
    status: u16,
    body: serde_json::Value,
) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_unauthorized(server: &MockServer, route: &str) {
    mount_json(
        server,
        "GET",
        route,
        401,
        json!({"error": {"message": "Token expired"}}),
    )
    .await;
}
