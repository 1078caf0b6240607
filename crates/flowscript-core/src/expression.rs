//! Expression marker resolution
//!
//! Scripts embed references with `${...}`. At generation time each marker
//! becomes a JavaScript expression:
//!
//! - a string that is exactly one marker becomes the bare expression
//!   (`"${count}"` → `count`)
//! - a string mixing text and markers becomes a template literal
//!   (`"Hi ${user.name}"` → `` `Hi ${user.name}` ``)
//! - a string without markers becomes a quoted literal
//!
//! Environment markers (`${ENV.HOME}`, `${ENV:HOME}`, `${env.HOME}`) resolve
//! to `process.env` lookups at run time and never count as variable
//! references.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^{}]*)\}").expect("marker pattern is valid"));

static ENV_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:ENV|env)[.:]([A-Za-z_][A-Za-z0-9_]*)\s*$").expect("env pattern is valid")
});

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[^.\w$])([A-Za-z_$][\w$]*)").expect("identifier pattern is valid")
});

static ARROW_PARAMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(([^()]*)\)\s*=>|([A-Za-z_$][\w$]*)\s*=>").expect("arrow pattern is valid")
});

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`"#)
        .expect("string literal pattern is valid")
});

/// Identifiers that never name a script variable
const RESERVED: &[&str] = &[
    "true",
    "false",
    "null",
    "undefined",
    "typeof",
    "instanceof",
    "new",
    "this",
    "in",
    "of",
    "void",
    "NaN",
    "Infinity",
    "Math",
    "JSON",
    "Number",
    "String",
    "Boolean",
    "Array",
    "Object",
    "Date",
    "parseInt",
    "parseFloat",
    "process",
];

/// One `${...}` occurrence inside a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'a> {
    /// Trimmed expression between the braces
    pub expr: &'a str,
    /// Byte range of the whole marker, braces included
    pub span: std::ops::Range<usize>,
}

impl Marker<'_> {
    /// Environment variable name, when this is an environment marker
    pub fn env_name(&self) -> Option<&str> {
        env_name(self.expr)
    }

    /// Whether this marker resolves at run time from the environment
    pub fn is_env(&self) -> bool {
        self.env_name().is_some()
    }
}

/// All markers in `text`, in order
pub fn markers(text: &str) -> Vec<Marker<'_>> {
    MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(Marker {
                expr: inner.as_str().trim(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Whether `text` contains any marker
pub fn has_markers(text: &str) -> bool {
    MARKER.is_match(text)
}

/// Whether `text` contains a marker that is not an environment marker
pub fn has_unresolved_markers(text: &str) -> bool {
    markers(text).iter().any(|m| !m.is_env())
}

/// Environment variable name named by a marker expression, if any
pub fn env_name(expr: &str) -> Option<&str> {
    ENV_MARKER
        .captures(expr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Root variable names referenced by the non-environment markers in `text`
///
/// `${user.name}` references `user`; `${a + b.c}` references `a` and `b`.
/// Arrow-function parameters (`x => ...`, `(a, b) => ...`) are local to the
/// expression and are not references. Names are returned once each, in
/// first-seen order.
pub fn references(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for marker in markers(text) {
        if marker.is_env() {
            continue;
        }
        let stripped = STRING_LITERAL.replace_all(marker.expr, "\"\"");
        let params = arrow_params(&stripped);
        for caps in IDENT.captures_iter(&stripped) {
            if let Some(ident) = caps.get(2) {
                let ident = ident.as_str();
                if RESERVED.contains(&ident)
                    || params.contains(&ident)
                    || names.iter().any(|n| n == ident)
                {
                    continue;
                }
                names.push(ident.to_string());
            }
        }
    }
    names
}

/// Names bound as arrow-function parameters anywhere in `expr`
fn arrow_params(expr: &str) -> Vec<&str> {
    let mut params = Vec::new();
    for caps in ARROW_PARAMS.captures_iter(expr) {
        if let Some(single) = caps.get(2) {
            params.push(single.as_str());
        } else if let Some(list) = caps.get(1) {
            params.extend(
                list.as_str()
                    .split(',')
                    .map(|p| p.split('=').next().unwrap_or_default().trim())
                    .map(|p| p.trim_start_matches("..."))
                    .filter(|p| !p.is_empty()),
            );
        }
    }
    params
}

/// Quote `text` as a JavaScript string literal
pub fn escape_literal(text: &str) -> String {
    // JSON string syntax is a subset of JavaScript string syntax.
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.escape_default()))
}

/// Escape literal text for the inside of a template literal
pub fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn marker_expression(expr: &str) -> String {
    match env_name(expr) {
        Some(name) => format!("process.env.{}", name),
        None => expr.to_string(),
    }
}

/// Resolve a string to a JavaScript expression
pub fn resolve(text: &str) -> String {
    let found = markers(text);
    if found.is_empty() {
        return escape_literal(text);
    }

    if found.len() == 1 && found[0].span == (0..text.len()) {
        return marker_expression(found[0].expr);
    }

    let mut out = String::from("`");
    let mut cursor = 0;
    for marker in &found {
        out.push_str(&escape_template(&text[cursor..marker.span.start]));
        out.push_str("${");
        out.push_str(&marker_expression(marker.expr));
        out.push('}');
        cursor = marker.span.end;
    }
    out.push_str(&escape_template(&text[cursor..]));
    out.push('`');
    out
}

/// Resolve a string that is already code, unwrapping markers in place
///
/// Used for predicates and expressions where the author writes JavaScript
/// and may still wrap variable references in `${...}`.
pub fn resolve_code(text: &str) -> String {
    MARKER
        .replace_all(text, |caps: &regex::Captures<'_>| {
            marker_expression(caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default())
        })
        .trim()
        .to_string()
}

/// Render a YAML/JSON value as a JavaScript literal, resolving markers in strings
///
/// Containers nested deeper than `max_depth` are emitted as verbatim JSON.
pub fn resolve_value(value: &Value, max_depth: usize) -> String {
    resolve_value_at(value, 0, max_depth)
}

fn resolve_value_at(value: &Value, depth: usize, max_depth: usize) -> String {
    match value {
        Value::String(s) => resolve(s),
        Value::Array(items) => {
            if depth >= max_depth {
                return verbatim(value);
            }
            let parts: Vec<String> = items
                .iter()
                .map(|item| resolve_value_at(item, depth + 1, max_depth))
                .collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            if depth >= max_depth {
                return verbatim(value);
            }
            if map.is_empty() {
                return "{}".to_string();
            }
            let parts: Vec<String> = map
                .iter()
                .map(|(key, item)| {
                    format!(
                        "{}: {}",
                        escape_literal(key),
                        resolve_value_at(item, depth + 1, max_depth)
                    )
                })
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        other => verbatim(other),
    }
}

fn verbatim(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
