//! Normalised failure of a remote REST call.
//!
//! Every failure carries a `user_message` derived from the HTTP status and
//! body. Front ends show that message; `detail` is for logs only.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub const GENERIC_MESSAGE: &str = "An unexpected error occurred";
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";
pub const SERVER_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The server answered with a non-success status.
    Status,
    /// The request never produced a response (connection, timeout, TLS).
    Transport,
    /// The server answered 2xx but the body could not be decoded.
    Decode,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemoteErrorKind::Status => "status",
            RemoteErrorKind::Transport => "transport",
            RemoteErrorKind::Decode => "decode",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error)]
#[error("remote call failed ({kind}): {user_message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub status: Option<u16>,
    pub user_message: String,
    pub detail: String,
}

impl RemoteError {
    /// Build the error for a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        let user_message = match status {
            400 => bad_request_message(body),
            404 => NOT_FOUND_MESSAGE.to_string(),
            500 => SERVER_ERROR_MESSAGE.to_string(),
            _ => GENERIC_MESSAGE.to_string(),
        };

        Self {
            kind: RemoteErrorKind::Status,
            status: Some(status),
            user_message,
            detail: body.to_string(),
        }
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self {
            kind: RemoteErrorKind::Transport,
            status: None,
            user_message: GENERIC_MESSAGE.to_string(),
            detail: err.to_string(),
        }
    }

    pub fn decode(status: u16, err: impl fmt::Display) -> Self {
        Self {
            kind: RemoteErrorKind::Decode,
            status: Some(status),
            user_message: GENERIC_MESSAGE.to_string(),
            detail: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// 400 bodies: a plain string, an `error`/`detail` field, or a map of
/// field → messages rendered as `field: msg1, msg2` lines.
fn bad_request_message(body: &str) -> String {
    let parsed = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            let trimmed = body.trim();
            return if trimmed.is_empty() {
                GENERIC_MESSAGE.to_string()
            } else {
                trimmed.to_string()
            };
        }
    };

    match parsed {
        Value::String(message) if !message.is_empty() => message,
        Value::Object(map) => {
            for key in ["error", "detail"] {
                if let Some(value) = map.get(key).filter(|v| is_present(v)) {
                    return value_text(value);
                }
            }

            let lines: Vec<String> = map
                .iter()
                .map(|(field, messages)| match messages {
                    Value::Array(items) => format!(
                        "{}: {}",
                        field,
                        items.iter().map(value_text).collect::<Vec<_>>().join(", ")
                    ),
                    other => format!("{}: {}", field, value_text(other)),
                })
                .collect();

            if lines.is_empty() {
                GENERIC_MESSAGE.to_string()
            } else {
                lines.join("\n")
            }
        }
        _ => GENERIC_MESSAGE.to_string(),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
