//! Courier shell - drives a headless runtime from stdin.
//!
//! # Event Loop
//!
//! One thread, two sources:
//!
//! 1. A line from stdin is parsed into a [`Command`] and applied to the runtime
//! 2. A 100ms tick moves the overlay clock so toasts expire on time
//!
//! Overlay changes are printed by [`PrintingPresenter`]; logs go to a file so
//! they never interleave with shell output.

mod commands;
mod logging;
mod presenter;

use anyhow::Result;
use serde_json::Value;
use std::{io::Write, rc::Rc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};

use courier_engine::types::{Event, EventName, Key, RouteMatch};
use courier_engine::{
    CourierConfig, HttpError, MemoryPlatform, PersistentStore, Platform, Presenters,
    RequestOptions, Response, RouteOptions, Runtime, SubscribeOptions, TOKEN_KEY, config_path,
    handler, route_handler,
};

use crate::commands::{Command, HELP};
use crate::presenter::PrintingPresenter;

const TICK: Duration = Duration::from_millis(100);

fn print_route(label: &'static str) -> courier_engine::RouteHandler {
    route_handler(move |route: &RouteMatch| {
        let mut line = format!("[route] {label} {}", route.path);
        if !route.params.is_empty() {
            line.push_str(&format!(" params={:?}", route.params));
        }
        if !route.query.is_empty() {
            line.push_str(&format!(" query={:?}", route.query));
        }
        println!("{line}");
        Ok(())
    })
}

fn define_routes(runtime: &Runtime) -> Result<()> {
    let router = runtime.router();
    router.define("/", print_route("home"), RouteOptions::named("home"))?;
    router.define("/login", print_route("login"), RouteOptions::named("login"))?;
    router.define("/chats", print_route("chats"), RouteOptions::named("chats"))?;
    router.define("/chat/:id", print_route("chat"), RouteOptions::named("chat"))?;
    router.define("/contacts", print_route("contacts"), RouteOptions::named("contacts"))?;
    router.define("/settings", print_route("settings"), RouteOptions::named("settings"))?;

    // The subscription lives as long as the bus.
    let _ = runtime.bus().on(
        EventName::RouteNotFound,
        handler(|event| {
            if let Event::RouteNotFound { path } = event {
                println!("[route] no match for {path}");
            }
            Ok(())
        }),
        SubscribeOptions::default(),
    );
    Ok(())
}

fn report(result: Result<Response, HttpError>) {
    match result {
        Ok(response) => {
            let body = match (response.json(), response.text()) {
                (Some(json), _) => {
                    serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string())
                }
                (None, Some(text)) => text.to_string(),
                (None, None) => "(no body)".to_string(),
            };
            println!("[http] {}\n{body}", response.status);
        }
        Err(e) if e.is_abort() => println!("[http] aborted"),
        Err(e) => println!("[http] error: {e}"),
    }
}

/// Apply one command. Returns `false` to leave the loop.
async fn apply(runtime: &Runtime, platform: &MemoryPlatform, command: Command) -> bool {
    match command {
        Command::Go(path) => {
            runtime.router().navigate(&path, false);
        }
        Command::Replace(path) => {
            runtime.router().navigate(&path, true);
        }
        Command::Back => {
            runtime.router().back();
        }
        Command::Pop => {
            if platform.go_back() {
                runtime.router().dispatch_external();
            } else {
                println!("[route] nothing to go back to");
            }
        }
        Command::Forward => {
            if platform.go_forward() {
                runtime.router().dispatch_external();
            } else {
                println!("[route] nothing to go forward to");
            }
        }
        Command::Get(path) => {
            report(runtime.http().get(&path, RequestOptions::default()).await);
        }
        Command::Delete(path) => {
            report(runtime.http().delete(&path, RequestOptions::default()).await);
        }
        Command::Post(path, body) => {
            report(runtime.http().post(&path, body, RequestOptions::default()).await);
        }
        Command::Put(path, body) => {
            report(runtime.http().put(&path, body, RequestOptions::default()).await);
        }
        Command::Patch(path, body) => {
            report(runtime.http().patch(&path, body, RequestOptions::default()).await);
        }
        Command::Token(token) => {
            let delivery = match token {
                Some(token) => runtime.sign_in(&token, Value::Null),
                None => runtime.sign_out(),
            };
            for failure in &delivery.failures {
                println!("[state] session not saved: {}", failure.error);
            }
        }
        Command::Toast(severity, message) => {
            runtime.toasts().show(message, severity, Default::default());
        }
        Command::Modal(id) => {
            runtime.modals().open(id, &Default::default());
        }
        Command::Close(id) => {
            if !runtime.modals().close(id.as_ref()) {
                println!("[modal] nothing to close");
            }
        }
        Command::Esc => runtime.key_press(Key::Escape),
        Command::State => {
            let dump = Value::Object(runtime.state().dump());
            println!(
                "{}",
                serde_json::to_string_pretty(&dump).unwrap_or_else(|_| dump.to_string())
            );
        }
        Command::History => println!("{}", runtime.router().history().join(" -> ")),
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

fn prompt() {
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "> ");
    let _ = out.flush();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Config decides where logs go, so it loads before any subscriber exists.
    let config = CourierConfig::load()?;
    let log_file = logging::init(&config.log);
    tracing::info!(config = ?config_path(), log = ?log_file, "Configuration loaded");
    let store = PersistentStore::open(&config.storage);
    let platform = Rc::new(MemoryPlatform::new(config.router.default_path.clone()));
    let presenters = Presenters::shared(Rc::new(PrintingPresenter));

    let mut runtime = Runtime::new(
        config,
        Rc::clone(&platform) as Rc<dyn Platform>,
        presenters,
        store,
    )?;
    define_routes(&runtime)?;

    let signed_in = runtime.state().contains(TOKEN_KEY);
    println!(
        "courier - {} ({}). Type 'help' for commands.",
        runtime.http().base_url(),
        if signed_in { "signed in" } else { "signed out" }
    );
    runtime.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_tick = tokio::time::Instant::now();

    prompt();
    loop {
        tokio::select! {
            now = tick.tick() => {
                runtime.advance(now.saturating_duration_since(last_tick));
                last_tick = now;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    prompt();
                    continue;
                }
                match Command::parse(&line) {
                    Ok(command) => {
                        tracing::debug!(?command, "Command");
                        if !apply(&runtime, &platform, command).await {
                            break;
                        }
                    }
                    Err(message) => println!("{message}"),
                }
                prompt();
            }
        }
    }

    runtime.shutdown();
    Ok(())
}
