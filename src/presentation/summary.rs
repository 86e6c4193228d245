use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display columns a string summary may take before it is cut.
pub const SUMMARY_WIDTH: usize = 24;

/// One-line rendering of a JSON value; long strings are cut on character
/// boundaries to fit [`SUMMARY_WIDTH`] terminal columns.
pub fn summarize_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::String(text) => format!("\"{}\"", truncate_to_width(text, SUMMARY_WIDTH)),
        Value::Array(items) => format!("array({})", items.len()),
        Value::Object(map) => format!("object({})", map.len()),
    }
}

pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut width = 0;
    let mut cut = String::new();
    for ch in text.chars() {
        let char_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + char_width > max_width {
            break;
        }
        width += char_width;
        cut.push(ch);
    }
    cut.push('…');
    cut
}
