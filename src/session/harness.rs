//! Guest-side execution harness
//!
//! Renders the Python program handed to the engine for each request. The
//! harness owns the REPL contract inside the guest: it prepends extra module
//! search paths, lazily creates the persistent namespace, splits a trailing
//! bare expression off the parsed statement list, executes statements then
//! evaluates the expression against the same namespace, and reports the
//! outcome as a JSON payload via its own final expression — which is exactly
//! the value `run_guest_code` hands back.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Attribute on the guest's `__main__` module holding the persistent
/// variable-binding table
pub const NAMESPACE_KEY: &str = "__pybridge_namespace__";

/// Outcome payload produced by the harness
#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    /// Whether execution completed without raising
    pub ok: bool,
    /// `repr` of the trailing bare expression's value, when there was one
    /// and it was not `None`
    #[serde(default)]
    pub result: Option<String>,
    /// Full traceback when execution raised
    #[serde(default)]
    pub error: Option<String>,
}

/// Render the harness program for one execution
///
/// `code` and `extra_paths` are embedded as JSON literals, which are also
/// valid Python literals, so no guest-side unescaping is needed.
pub fn render(code: &str, extra_paths: &[String]) -> String {
    let code_literal = serde_json::to_string(code).unwrap_or_else(|_| "\"\"".to_string());
    let paths_literal = serde_json::to_string(extra_paths).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"import ast as _ast
import json as _json
import sys as _sys
import traceback as _traceback

_code = {code}
_extra_paths = {paths}

for _p in reversed(_extra_paths):
    if _p not in _sys.path:
        _sys.path.insert(0, _p)

_ns = _sys.modules["__main__"].__dict__.setdefault(
    "{ns_key}", {{"__name__": "__main__"}}
)

_payload = {{"ok": True, "result": None, "error": None}}
try:
    _tree = _ast.parse(_code, mode="exec")
    _trailing = None
    if _tree.body and isinstance(_tree.body[-1], _ast.Expr):
        _trailing = _ast.Expression(_tree.body.pop().value)
    exec(compile(_tree, "<session>", "exec"), _ns)
    if _trailing is not None:
        _value = eval(compile(_trailing, "<session>", "eval"), _ns)
        if _value is not None:
            _payload["result"] = repr(_value)
except BaseException:
    _payload["ok"] = False
    _payload["error"] = _traceback.format_exc()

_json.dumps(_payload)
"#,
        code = code_literal,
        paths = paths_literal,
        ns_key = NAMESPACE_KEY,
    )
}

/// Render the guest program that drops the persistent namespace
pub fn render_clear() -> String {
    format!(
        "import sys as _sys\n_sys.modules[\"__main__\"].__dict__.pop(\"{}\", None)\n",
        NAMESPACE_KEY
    )
}

/// Decode the payload returned by `run_guest_code`
pub fn parse_payload(text: &str) -> Result<Payload> {
    serde_json::from_str(text.trim()).map_err(|e| {
        let preview: String = text.chars().take(200).collect();
        Error::Engine(format!("engine returned a non-JSON payload ({}): {}", e, preview))
    })
}
