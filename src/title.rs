//! Parameterized-case title formatting.
//!
//! Expands a title template once per case row, using positional `%` specifiers
//! for array rows and `$key` substitution for object rows. Formatting is
//! best-effort by design: malformed data degrades to plain stringification and
//! unknown tokens are left in place, never panicking inside a title.

use serde_json::Value;

/// Specifier codes that consume one positional row element.
const POSITIONAL_CODES: [char; 7] = ['p', 's', 'd', 'i', 'f', 'j', 'o'];

/// Format `template` for the case `row` at position `index`.
///
/// * Array rows consume positional specifiers left to right: `%p` renders
///   pretty JSON, `%j`/`%o` compact JSON, `%s`/`%d`/`%i`/`%f` plain
///   stringification. `%%` is a literal percent and `%#` injects `index`
///   without consuming an element.
/// * Object rows substitute `$key` tokens; string fields are inlined
///   verbatim, other fields rendered as compact JSON. A key that is missing
///   or null leaves the token untouched.
/// * Any other row replaces every recognized specifier with the stringified
///   row itself.
pub fn format_title(template: &str, row: &Value, index: usize) -> String {
    match row {
        Value::Array(items) => format_positional(template, items, index),
        Value::Object(_) => format_named(template, row),
        scalar => format_scalar(template, scalar),
    }
}

fn format_positional(template: &str, items: &[Value], index: usize) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = items.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some('#') => {
                chars.next();
                out.push_str(&index.to_string());
            }
            Some(code) if POSITIONAL_CODES.contains(&code) => {
                chars.next();
                match args.next() {
                    Some(arg) => out.push_str(&render(code, arg)),
                    // More specifiers than row elements.
                    None => out.push_str("undefined"),
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

fn format_named(template: &str, row: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let mut key = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                key.push(next);
                chars.next();
            } else {
                break;
            }
        }

        if key.is_empty() {
            out.push('$');
            continue;
        }

        match row.get(key.as_str()) {
            Some(Value::String(s)) => out.push_str(s),
            // Missing and null fields keep the token so the title still
            // shows which placeholder went unfilled.
            None | Some(Value::Null) => {
                out.push('$');
                out.push_str(&key);
            }
            Some(other) => out.push_str(&render('j', other)),
        }
    }
    out
}

fn format_scalar(template: &str, value: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(code) if code == '#' || POSITIONAL_CODES.contains(&code) => {
                chars.next();
                out.push_str(&plain(value));
            }
            _ => out.push('%'),
        }
    }
    out
}

fn render(code: char, value: &Value) -> String {
    match code {
        'p' => serde_json::to_string_pretty(value).unwrap_or_else(|_| plain(value)),
        'j' | 'o' => serde_json::to_string(value).unwrap_or_else(|_| plain(value)),
        _ => plain(value),
    }
}

/// Plain stringification: strings render unquoted, everything else as compact
/// JSON.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
