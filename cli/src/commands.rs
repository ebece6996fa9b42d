//! Shell command parsing.

use serde_json::Value;

use courier_engine::types::{ModalId, Severity};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Go(String),
    Replace(String),
    Back,
    /// Platform back button followed by external dispatch.
    Pop,
    Forward,
    Get(String),
    Delete(String),
    Post(String, Value),
    Put(String, Value),
    Patch(String, Value),
    /// `None` clears the token.
    Token(Option<String>),
    Toast(Severity, String),
    Modal(ModalId),
    Close(Option<ModalId>),
    Esc,
    State,
    History,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  go <path>                   navigate (push)
  replace <path>              navigate (replace)
  back                        router back
  pop | forward               platform back/forward, then dispatch
  get|delete <path>           HTTP request
  post|put|patch <path> <json>
  token <value|->             set or clear the bearer token
  toast <severity> <message>  success, info, warning, error, loading
  modal <id>                  open a modal
  close [id]                  close the top modal or a given one
  esc                         press Escape
  state                       dump state
  history                     show navigation trail
  help | quit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "go" => Self::Go(required(rest, "go <path>")?),
            "replace" => Self::Replace(required(rest, "replace <path>")?),
            "back" => Self::Back,
            "pop" => Self::Pop,
            "forward" => Self::Forward,
            "get" => Self::Get(required(rest, "get <path>")?),
            "delete" => Self::Delete(required(rest, "delete <path>")?),
            "post" => {
                let (path, body) = with_body(rest, "post")?;
                Self::Post(path, body)
            }
            "put" => {
                let (path, body) = with_body(rest, "put")?;
                Self::Put(path, body)
            }
            "patch" => {
                let (path, body) = with_body(rest, "patch")?;
                Self::Patch(path, body)
            }
            "token" => match rest {
                "" => return Err("usage: token <value|->".to_string()),
                "-" => Self::Token(None),
                value => Self::Token(Some(value.to_string())),
            },
            "toast" => {
                let (severity, message) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: toast <severity> <message>".to_string())?;
                let severity = severity.parse::<Severity>().map_err(|e| e.to_string())?;
                Self::Toast(severity, message.trim().to_string())
            }
            "modal" => Self::Modal(ModalId::new(required(rest, "modal <id>")?)),
            "close" => Self::Close((!rest.is_empty()).then(|| ModalId::new(rest))),
            "esc" | "escape" => Self::Esc,
            "state" => Self::State,
            "history" => Self::History,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            "" => return Err("empty command".to_string()),
            other => return Err(format!("unknown command '{other}' (try 'help')")),
        };
        Ok(command)
    }
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

/// `<path> <json>`; a missing body is `{}`.
fn with_body(rest: &str, verb: &str) -> Result<(String, Value), String> {
    let (path, body) = match rest.split_once(char::is_whitespace) {
        Some((path, body)) => (path, body.trim()),
        None => (rest, ""),
    };
    if path.is_empty() {
        return Err(format!("usage: {verb} <path> <json>"));
    }
    let body = if body.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(body).map_err(|e| format!("invalid JSON body: {e}"))?
    };
    Ok((path.to_string(), body))
}
