//! Wire envelope.
//!
//! Inbound frames are JSON objects of one of two shapes:
//!
//! ```text
//! {"session": "join-or-create" | "delete" | "list" | "info" | "describe" | "leave", "name"?: string}
//! {"command": string, ...payload}
//! ```
//!
//! A `session` key always wins over a `command` key. Outbound builtin
//! replies carry an `info` tag of `session`, `session_list` or
//! `session_describe`.

use serde_json::{Map, Value, json};

use crate::errors::RouteError;

/// A builtin session-management op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOp {
    /// Bind to a named session, creating it on first use.
    JoinOrCreate,
    /// Delete the bound session and unbind everyone in it.
    Delete,
    /// List every session name.
    List,
    /// Report the caller's own session.
    Info,
    /// Report static server metadata.
    Describe,
    /// Unbind from the current session.
    Leave,
    /// Anything else found under `session`.
    Unknown(String),
}

impl SessionOp {
    /// Parse the value found under the `session` key.
    pub fn parse(value: &Value) -> Self {
        match value.as_str() {
            Some("join-or-create") => Self::JoinOrCreate,
            Some("delete") => Self::Delete,
            Some("list") => Self::List,
            Some("info") => Self::Info,
            Some("describe") => Self::Describe,
            Some("leave") => Self::Leave,
            Some(other) => Self::Unknown(other.to_owned()),
            None => Self::Unknown(value.to_string()),
        }
    }

    /// Wire name of the op.
    pub fn as_str(&self) -> &str {
        match self {
            Self::JoinOrCreate => "join-or-create",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Info => "info",
            Self::Describe => "describe",
            Self::Leave => "leave",
            Self::Unknown(op) => op,
        }
    }
}

/// A classified inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// A builtin session op.
    Session {
        /// The op.
        op: SessionOp,
        /// The `name` field, when present and a string.
        name: Option<String>,
    },
    /// An application command.
    Command {
        /// The command name.
        name: String,
        /// The whole envelope object, `command` key included.
        payload: Value,
    },
}

/// Decode and classify one text frame.
pub fn decode(text: &str) -> Result<Inbound, RouteError> {
    let value: Value = serde_json::from_str(text)?;
    classify(value)
}

/// Classify an already-decoded frame.
pub fn classify(value: Value) -> Result<Inbound, RouteError> {
    let Value::Object(map) = value else {
        return Err(RouteError::InvalidShape(format!(
            "expected an object, got {}",
            json_type(&value)
        )));
    };

    if let Some(op) = map.get("session") {
        let name = map.get("name").and_then(Value::as_str).map(str::to_owned);
        return Ok(Inbound::Session {
            op: SessionOp::parse(op),
            name,
        });
    }

    let name = match map.get("command") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(RouteError::InvalidShape(format!(
                "`command` must be a string, got {}",
                json_type(other)
            )));
        }
        None => return Err(RouteError::InvalidShape(describe_keys(&map))),
    };
    Ok(Inbound::Command {
        name,
        payload: Value::Object(map),
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe_keys(map: &Map<String, Value>) -> String {
    if map.is_empty() {
        return "empty object".into();
    }
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    format!("neither `session` nor `command` in keys [{}]", keys.join(", "))
}

/// `{"info":"session","session":<name|null>}`
pub fn session_info(session: Option<&str>) -> Value {
    json!({ "info": "session", "session": session })
}

/// `{"info":"session_list","sessions":[...]}`
pub fn session_list<I, S>(names: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let sessions: Vec<String> = names.into_iter().map(Into::into).collect();
    json!({ "info": "session_list", "sessions": sessions })
}

/// `{"info":"session_describe","title":...,"command_protocol":...}`
pub fn session_describe(title: &str, command_protocol: &str) -> Value {
    json!({
        "info": "session_describe",
        "title": title,
        "command_protocol": command_protocol,
    })
}
