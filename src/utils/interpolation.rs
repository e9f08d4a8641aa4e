use serde_json::{Map, Value};

use crate::host::TemplateEvaluator;

/// Context keys substituted even without `{{ }}` delimiters.
pub const LEGACY_KEYS: &[&str] = &["VALUE", "HOLD_SECS"];

/// Default template evaluator.
///
/// Supported forms:
/// - `{{ path }}` -> value at the dotted `path` in the context (`config.entity`, `VALUE`)
/// - a string that is exactly one token keeps the looked-up value's JSON type
/// - bare `VALUE` / `HOLD_SECS` anywhere in a string (legacy)
///
/// Unknown tokens are left intact to aid debugging.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpolator;

impl TemplateEvaluator for Interpolator {
    fn render(&self, value: &Value, context: &Map<String, Value>) -> Value {
        interpolate_json(value, context)
    }
}

/// Interpolate a single string. See [`Interpolator`].
pub fn interpolate_value(template: &str, context: &Map<String, Value>) -> Value {
    if let Some(path) = whole_token(template) {
        if let Some(found) = lookup_path(context, path) {
            return found.clone();
        }
    }
    for key in LEGACY_KEYS {
        if template == *key {
            if let Some(found) = context.get(*key) {
                return found.clone();
            }
        }
    }
    Value::String(legacy_substitute(&interpolate_string(template, context), context))
}

/// Replace every `{{ path }}` token with its string rendering.
pub fn interpolate_string(template: &str, context: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut idx = 0;
    let bytes = template.as_bytes();

    while let Some(start) = find_subslice(bytes, b"{{", idx) {
        out.push_str(&template[idx..start]);

        let content_start = start + 2;
        if let Some(end) = find_subslice(bytes, b"}}", content_start) {
            let token = template[content_start..end].trim();
            match lookup_path(context, token).filter(|_| !token.is_empty()) {
                Some(found) => out.push_str(&render_scalar(found)),
                None => out.push_str(&template[start..end + 2]),
            }
            idx = end + 2;
        } else {
            out.push_str(&template[start..]);
            idx = template.len();
            break;
        }
    }

    if idx < template.len() {
        out.push_str(&template[idx..]);
    }

    out
}

/// Interpolates all string values in a JSON structure (recursively).
pub fn interpolate_json(value: &Value, context: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => interpolate_value(s, context),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| interpolate_json(v, context)).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), interpolate_json(v, context));
            }
            Value::Object(out)
        }
        _ => value.clone(),
    }
}

fn legacy_substitute(text: &str, context: &Map<String, Value>) -> String {
    let mut out = text.to_string();
    for key in LEGACY_KEYS {
        if out.contains(key) {
            let replacement = context.get(*key).map(render_scalar).unwrap_or_default();
            out = out.replace(key, &replacement);
        }
    }
    out
}

fn whole_token(template: &str) -> Option<&str> {
    let inner = template.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

/// Strings are rendered raw, null as empty, everything else as compact JSON.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Find the first occurrence of `needle` in `haystack` starting at `from`.
fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Lookup a value using a dotted path (e.g., "config.entity", "list.0").
fn lookup_path<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?.trim())?;

    for seg in segments {
        let seg = seg.trim();
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
