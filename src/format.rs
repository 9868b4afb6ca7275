//! Bounded-depth value rendering for diagnostics.
//!
//! Every function here is pure: the output is an owned `String` that keeps no
//! reference to the rendered value. Composite values are expanded one level
//! deep at most; anything deeper collapses to a placeholder.

use crate::{log::LogLevel, value::Value};

pub const FUNCTION_PLACEHOLDER: &str = "ƒ(…)";
pub const PROMISE_PLACEHOLDER: &str = "<Promise>";
pub const SYMBOL_PLACEHOLDER: &str = "<Symbol>";
pub const ARRAY_PLACEHOLDER: &str = "[…]";
pub const OBJECT_PLACEHOLDER: &str = "{…}";

/// Renders a value for diagnostics.
///
/// # Examples
///
/// ```rust
/// use sandcheck::{format::render, value::Value};
/// assert_eq!(render(&Value::from("hi")), "\"hi\"");
/// assert_eq!(render(&Value::array([Value::from(1)])), "[…]");
/// assert_eq!(
///     render(&Value::object([("a", Value::from(1))])),
///     "{a: 1}"
/// );
/// ```
pub fn render(value: &Value) -> String {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<&(String, Value)> = object.entries().iter().collect();
            // stable: function-valued properties first, otherwise insertion order
            entries.sort_by_key(|(_, v)| !matches!(v, Value::Function(_)));
            let body = entries
                .iter()
                .map(|(k, v)| format!("{k}: {}", render_nested(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{body}}}")
        }
        other => render_nested(other),
    }
}

/// Renders a value that sits inside a composite: no further expansion.
fn render_nested(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(_) => value.to_string(),
        Value::String(s) => quote(s),
        Value::Symbol(_) => SYMBOL_PLACEHOLDER.to_string(),
        Value::Function(_) => FUNCTION_PLACEHOLDER.to_string(),
        Value::Promise(_) => PROMISE_PLACEHOLDER.to_string(),
        Value::Array(_) => ARRAY_PLACEHOLDER.to_string(),
        Value::Object(object) if object.is_empty() => "{}".to_string(),
        Value::Object(_) => OBJECT_PLACEHOLDER.to_string(),
        Value::Set(set) => format!("Set({})", set.size()),
        Value::Map(map) => format!("Map({})", map.size()),
        Value::Date(date) => date
            .to_iso_string()
            .unwrap_or_else(|| "Invalid Date".to_string()),
        Value::Error(err) => err.to_string(),
    }
}

/// JSON string literal for `s`.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// Renders one top-level console argument. Arrays are expanded element by
/// element; everything else renders as [`render`] does.
pub fn render_console_arg(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let body = items.iter().map(render).collect::<Vec<_>>().join(", ");
            format!("[{body}]")
        }
        other => render(other),
    }
}

/// Builds a console line from its arguments.
///
/// A leading string argument is the message and is kept verbatim; every
/// other argument is rendered with [`render_console_arg`]. Parts are joined
/// with a single space. Returns `None` when there is nothing to print.
pub fn render_console_args(args: &[Value]) -> Option<String> {
    let (first, rest) = args.split_first()?;
    let mut parts = Vec::with_capacity(args.len());
    match first {
        Value::String(message) => parts.push(message.clone()),
        other => parts.push(render_console_arg(other)),
    }
    parts.extend(rest.iter().map(render_console_arg));
    Some(parts.join(" "))
}

/// The log-level gate: output at `level` is emitted when its rank is at least
/// the host-supplied `threshold`.
pub fn should_emit(level: LogLevel, threshold: LogLevel) -> bool {
    level.rank() >= threshold.rank()
}
