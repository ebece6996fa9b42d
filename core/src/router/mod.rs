//! Pattern-based navigation dispatcher.
//!
//! Routes are tried in registration order and the first structural match
//! wins. A successful dispatch appends to the navigation trail (only when it
//! came from [`Router::navigate`]), emits `RouteChanged`, stores the match
//! under [`CURRENT_ROUTE_KEY`] and then runs the route handler. Handler
//! failures are logged and never undo the earlier steps.

mod history;
mod pattern;
mod platform;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use url::form_urlencoded;

use courier_types::{Event, Params, Query, RouteId, RouteMatch, RouterSettings};

pub use history::NavigationHistory;
pub use platform::{MemoryPlatform, Platform};

use crate::bus::EventBus;
use crate::state::State;
use pattern::CompiledPattern;

/// State key holding the active [`RouteMatch`].
pub const CURRENT_ROUTE_KEY: &str = "route.current";

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route pattern is empty")]
    EmptyPattern,
    #[error("route pattern '{pattern}' has a ':' without a parameter name")]
    EmptyParam { pattern: String },
    #[error("route pattern '{pattern}' repeats parameter ':{name}'")]
    DuplicateParam { pattern: String, name: String },
    #[error("route pattern '{pattern}' does not compile: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("route name '{0}' is already taken")]
    DuplicateName(String),
}

pub type RouteHandler = Rc<dyn Fn(&RouteMatch) -> anyhow::Result<()>>;

pub fn route_handler<F>(f: F) -> RouteHandler
where
    F: Fn(&RouteMatch) -> anyhow::Result<()> + 'static,
{
    Rc::new(f)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Enables reverse lookup through [`Router::href`].
    pub name: Option<String>,
}

impl RouteOptions {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

struct RouteDefinition {
    id: RouteId,
    pattern: CompiledPattern,
    handler: RouteHandler,
    options: RouteOptions,
}

/// What triggered a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Navigate,
    External,
}

/// Outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Matched(RouteMatch),
    NotFound { path: String },
}

impl Dispatch {
    #[must_use]
    pub fn matched(&self) -> Option<&RouteMatch> {
        match self {
            Self::Matched(route) => Some(route),
            Self::NotFound { .. } => None,
        }
    }
}

struct RouterInner {
    bus: EventBus,
    state: State,
    platform: Rc<dyn Platform>,
    settings: RouterSettings,
    routes: RefCell<Vec<Rc<RouteDefinition>>>,
    history: RefCell<NavigationHistory>,
    current: RefCell<Option<RouteMatch>>,
}

/// Cheap-to-clone handle; clones share routes, trail and current match.
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.inner.routes.borrow().len())
            .field("history", &self.inner.history.borrow().len())
            .field("current", &self.inner.current.borrow())
            .finish_non_exhaustive()
    }
}

impl Router {
    #[must_use]
    pub fn new(
        state: State,
        platform: Rc<dyn Platform>,
        settings: RouterSettings,
    ) -> Self {
        let history = NavigationHistory::new(settings.history_limit);
        Self {
            inner: Rc::new(RouterInner {
                bus: state.bus().clone(),
                state,
                platform,
                settings,
                routes: RefCell::default(),
                history: RefCell::new(history),
                current: RefCell::default(),
            }),
        }
    }

    /// Compile and register `pattern`.
    pub fn define(
        &self,
        pattern: &str,
        handler: RouteHandler,
        options: RouteOptions,
    ) -> Result<RouteId, RouteError> {
        let compiled = CompiledPattern::compile(pattern)?;
        let mut routes = self.inner.routes.borrow_mut();
        if let Some(name) = &options.name
            && routes
                .iter()
                .any(|route| route.options.name.as_ref() == Some(name))
        {
            return Err(RouteError::DuplicateName(name.clone()));
        }
        let id = RouteId::new(routes.len());
        tracing::debug!(pattern = compiled.source(), route = id.index(), "Route defined");
        routes.push(Rc::new(RouteDefinition {
            id,
            pattern: compiled,
            handler,
            options,
        }));
        Ok(id)
    }

    /// Update the platform history (push, or overwrite when `replace`) and
    /// dispatch `path`.
    pub fn navigate(&self, path: &str, replace: bool) -> Dispatch {
        if replace {
            self.inner.platform.replace(path);
        } else {
            self.inner.platform.push(path);
        }
        self.dispatch(path, Origin::Navigate)
    }

    /// Drop the current trail entry and return to the one before it, or to
    /// the default path once the trail is exhausted.
    pub fn back(&self) -> Dispatch {
        let prior = {
            let mut history = self.inner.history.borrow_mut();
            history.pop();
            history.pop()
        };
        let target = prior.unwrap_or_else(|| self.inner.settings.default_path.clone());
        self.navigate(&target, true)
    }

    /// Dispatch whatever the platform currently shows. Used after the
    /// platform moved on its own (back/forward buttons).
    pub fn dispatch_external(&self) -> Dispatch {
        let location = self.inner.platform.location();
        self.dispatch(&location.path, Origin::External)
    }

    /// Initial dispatch of the platform location at startup. Counts as a
    /// navigation for the trail but writes nothing to the platform.
    pub fn start(&self) -> Dispatch {
        let location = self.inner.platform.location();
        let path = if location.path.is_empty() {
            self.inner.settings.default_path.clone()
        } else {
            location.path
        };
        self.dispatch(&path, Origin::Navigate)
    }

    #[must_use]
    pub fn current(&self) -> Option<RouteMatch> {
        self.inner.current.borrow().clone()
    }

    /// Navigation trail, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.inner.history.borrow().entries()
    }

    /// Build the path of the route registered under `name`. `None` if no
    /// such route exists or a parameter is missing.
    #[must_use]
    pub fn href(&self, name: &str, params: &Params) -> Option<String> {
        self.inner
            .routes
            .borrow()
            .iter()
            .find(|route| route.options.name.as_deref() == Some(name))
            .and_then(|route| route.pattern.build(params))
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.routes.borrow().len()
    }

    fn dispatch(&self, target: &str, origin: Origin) -> Dispatch {
        let (path, fragment_query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let search = self.inner.platform.location().search;
        let mut query = parse_query(&search);
        if let Some(fragment_query) = fragment_query {
            query.extend(parse_query(fragment_query));
        }

        let routes: Vec<Rc<RouteDefinition>> = self.inner.routes.borrow().clone();
        let found = routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)));

        let Some((route, params)) = found else {
            tracing::warn!(path, "No route matches");
            self.inner.bus.emit(&Event::RouteNotFound {
                path: path.to_string(),
            });
            return Dispatch::NotFound {
                path: path.to_string(),
            };
        };

        let matched = RouteMatch {
            path: path.to_string(),
            params,
            query,
            route: route.id,
            pattern: route.pattern.source().to_string(),
            name: route.options.name.clone(),
        };

        if origin == Origin::Navigate {
            self.inner.history.borrow_mut().push(target);
        }
        *self.inner.current.borrow_mut() = Some(matched.clone());
        tracing::debug!(path, pattern = %matched.pattern, "Route matched");

        self.inner.bus.emit(&Event::RouteChanged(matched.clone()));
        if let Err(e) = self.inner.state.set(CURRENT_ROUTE_KEY, &matched) {
            tracing::warn!(path, "Failed to record current route: {e}");
        }
        if let Err(e) = (route.handler)(&matched) {
            tracing::warn!(path, pattern = %matched.pattern, "Route handler failed: {e:#}");
        }
        Dispatch::Matched(matched)
    }
}

fn parse_query(raw: &str) -> Query {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
