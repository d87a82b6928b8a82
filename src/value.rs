//! Helpers for building template [`Value`]s. Plain text always enters a
//! context HTML-escaped, so templates can print any field as-is.

use gtmpl_value::Value;
use std::collections::HashMap;

/// Escapes the characters that are significant in HTML text and attribute
/// values.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// An HTML-escaped string value.
pub fn text(s: &str) -> Value {
    Value::String(escape_html(s))
}

/// A string value that is already HTML (or a URL built from safe parts) and
/// must not be escaped again.
pub fn markup(s: String) -> Value {
    Value::String(s)
}

/// A string value, or `Nil` if there's nothing to show.
pub fn optional(s: Option<String>) -> Value {
    match s {
        Some(s) => Value::String(s),
        None => Value::Nil,
    }
}

/// An object value with the given fields.
pub fn object(fields: Vec<(&str, Value)>) -> Value {
    let mut m: HashMap<String, Value> = HashMap::with_capacity(fields.len());
    for (key, value) in fields {
        m.insert(key.to_owned(), value);
    }
    Value::Object(m)
}

/// Adds fields to an object value. Does nothing to other values.
pub fn extend(value: &mut Value, fields: Vec<(&str, Value)>) {
    if let Value::Object(obj) = value {
        for (key, field) in fields {
            obj.insert(key.to_owned(), field);
        }
    }
}
