//! Wire protocol types
//!
//! Newline-delimited JSON over a byte-stream pair: each non-blank input line
//! decodes to one [`Request`], each processed request yields exactly one
//! output line encoding one [`Response`].
//!
//! Request parsing is deliberately lenient: any valid JSON value is accepted,
//! and missing or wrongly typed fields coerce to their defaults instead of
//! rejecting the line. Only JSON that fails to parse at all is a protocol
//! error.

mod server;

pub use server::{serve_stdio, ProtocolServer};

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::session::ExecutionOutcome;

/// One execution request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Code to execute; empty code is a no-op execution
    pub code: String,
    /// Mapping of relative paths to file contents, written under the
    /// confinement root before execution
    pub files: BTreeMap<String, String>,
    /// Package names to load into the engine before execution
    pub packages: Vec<String>,
    /// Extra module search paths, prepended inside the guest
    pub pythonpath: Vec<String>,
    /// Reserved control flag: terminates the read loop without a response
    pub shutdown: bool,
}

impl Request {
    /// Build a request from an already-parsed JSON value, coercing malformed
    /// fields to defaults
    pub fn from_value(value: Value) -> Request {
        let Some(obj) = value.as_object() else {
            return Request::default();
        };

        let code = obj
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let files = obj
            .get("files")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.clone(), coerce_text(v)))
                    .collect()
            })
            .unwrap_or_default();

        Request {
            code,
            files,
            packages: string_items(obj.get("packages")),
            pythonpath: string_items(obj.get("pythonpath")),
            shutdown: obj.get("shutdown").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Request::from_value(Value::deserialize(deserializer)?))
    }
}

/// File contents must be text; other JSON values coerce to their JSON text
fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep only the string items of a JSON array
fn string_items(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// One execution response, a tagged union on `ok`
///
/// `result` and `error` are always serialized, as `null` when absent, so the
/// response shape is stable for callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    /// Whether the request succeeded end to end
    pub ok: bool,
    /// Captured stdout, bounded
    pub stdout: String,
    /// Captured stderr, bounded
    pub stderr: String,
    /// `repr` of the trailing bare expression on success, otherwise null
    pub result: Option<String>,
    /// Failure description, null on success
    pub error: Option<String>,
}

impl Response {
    /// Successful execution response
    pub fn success(stdout: String, stderr: String, result: Option<String>) -> Self {
        Response {
            ok: true,
            stdout,
            stderr,
            result,
            error: None,
        }
    }

    /// Failure response with no captured output (protocol, quota, and engine
    /// errors)
    pub fn failure(error: impl Into<String>) -> Self {
        Response {
            ok: false,
            stdout: String::new(),
            stderr: String::new(),
            result: None,
            error: Some(error.into()),
        }
    }
}

impl From<ExecutionOutcome> for Response {
    fn from(outcome: ExecutionOutcome) -> Self {
        Response {
            ok: outcome.ok,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            result: if outcome.ok { outcome.result } else { None },
            error: outcome.error,
        }
    }
}
