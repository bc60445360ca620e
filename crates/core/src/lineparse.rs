use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

// identifier=value tokens, value either double-quoted (backslash escapes
// allowed inside) or a run of non-whitespace.
static KV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)=("(?:[^"\\]|\\.)*"|\S+)"#).expect("static pattern"));

/// Extracts structured fields from a raw log line. JSON objects win; a
/// key=value scan is the fallback. `None` means the line carries no
/// structured fields — that absence is the signal, parse failures are never
/// propagated to the caller.
pub fn parse_line(line: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(line) {
        return Some(fields);
    }

    let mut fields = Map::new();
    for caps in KV_PATTERN.captures_iter(line) {
        let key = caps[1].to_string();
        let raw = &caps[2];
        let value = raw
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(raw);
        fields.insert(key, coerce(value));
    }

    if fields.is_empty() { None } else { Some(fields) }
}

// Numeric first (a '.' selects float parsing), then boolean, then the
// literal string.
fn coerce(value: &str) -> Value {
    if value.contains('.') {
        if let Ok(f) = value.parse::<f64>()
            && let Some(n) = Number::from_f64(f)
        {
            return Value::Number(n);
        }
    } else if let Ok(i) = value.parse::<i64>() {
        return Value::Number(Number::from(i));
    }

    match value.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}
