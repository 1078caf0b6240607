//! Data transform codegen
//!
//! Every operation wraps the pipeline expression built so far, so a chain
//! of operations becomes one composed expression over the source:
//!
//! ```text
//! source: ${products}
//! operations: [filter, sort, slice]
//!     =>  ([...(((products ?? [])).filter(...))].sort(...)).slice(0, 5)
//! ```

use serde_json::{Map, Value};

use flowscript_core::expression;
use flowscript_core::step::{DataTransformStep, TransformOp};

use super::scalar_expression;
use crate::context::GenContext;

/// Helper for generating `data_transform` steps
pub struct DataTransformCodegen;

impl DataTransformCodegen {
    /// Compose every operation and bind the result
    pub fn generate(step: &DataTransformStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let source = match step.source {
            Some(value @ Value::String(_)) => scalar_expression(value),
            Some(value) => expression::resolve_value(value, ctx.limits().max_literal_depth),
            None => {
                ctx.warn(path, "data_transform without 'source'; using an empty list");
                "[]".to_string()
            }
        };

        let mut pipeline = format!("({} ?? [])", source);
        for (i, op) in step.operations.iter().enumerate() {
            let location = if step.chained {
                format!("{}.data_transform.operations[{}]", path, i)
            } else {
                format!("{}.data_transform", path)
            };
            pipeline = Self::apply(op, pipeline, &location, ctx);
        }

        match step.name {
            Some(name) => ctx.bind(path, name, &pipeline),
            None => {
                ctx.warn(path, "data_transform without 'name'; result discarded");
                ctx.line(format!("{};", pipeline))
            }
        }
    }

    /// Wrap `input` in one operation
    fn apply(op: &TransformOp<'_>, input: String, location: &str, ctx: &mut GenContext<'_>) -> String {
        let params = op.params;
        let depth = ctx.limits().max_literal_depth;

        let result = match op.operation {
            Some("filter") => text_param(params, &["condition", "where", "predicate"])
                .map(|cond| {
                    format!(
                        "({}).filter((item) => {})",
                        input,
                        expression::resolve_code(cond)
                    )
                }),
            Some("sort") => {
                let key = text_param(params, &["by", "key", "field"]);
                let descending = text_param(params, &["order", "direction"])
                    .is_some_and(|o| o.eq_ignore_ascii_case("desc"));
                let comparator = if descending {
                    descending_comparator(key)
                } else {
                    ascending_comparator(key)
                };
                Some(format!("[...({})].sort({})", input, comparator))
            }
            Some("map") => map_projection(params, depth)
                .map(|projection| format!("({}).map((item) => {})", input, projection)),
            Some("reduce") => text_param(params, &["expression", "reducer"]).map(|expr| {
                let initial = params
                    .get("initial")
                    .or_else(|| params.get("init"))
                    .map_or_else(|| "0".to_string(), |v| expression::resolve_value(v, depth));
                format!(
                    "({}).reduce((acc, item) => {}, {})",
                    input,
                    expression::resolve_code(expr),
                    initial
                )
            }),
            Some("slice") => {
                let start = params.get("start").map_or_else(|| "0".to_string(), scalar_expression);
                Some(match params.get("end") {
                    Some(end) => format!("({}).slice({}, {})", input, start, scalar_expression(end)),
                    None => format!("({}).slice({})", input, start),
                })
            }
            Some("unique") | Some("distinct") => {
                Some(match text_param(params, &["key", "by", "field"]) {
                    Some(key) => format!(
                        "({}).filter((item, index, all) => all.findIndex((other) => {} === {}) === index)",
                        input,
                        field_access("other", key),
                        field_access("item", key)
                    ),
                    None => format!("[...new Set({})]", input),
                })
            }
            Some("flatten") => {
                let depth = params.get("depth").map_or_else(|| "1".to_string(), scalar_expression);
                Some(format!("({}).flat({})", input, depth))
            }
            Some("groupBy") => text_param(params, &["key", "by", "field"]).map(|key| {
                format!(
                    "({}).reduce((groups, item) => {{ const key = {}; (groups[key] ??= []).push(item); return groups; }}, {{}})",
                    input,
                    field_access("item", key)
                )
            }),
            other => {
                ctx.warn(
                    location,
                    format!(
                        "unknown operation {}; passed through unchanged",
                        other.map_or("(none)".to_string(), |o| format!("'{}'", o))
                    ),
                );
                return input;
            }
        };

        result.unwrap_or_else(|| {
            ctx.warn(
                location,
                format!(
                    "'{}' is missing its parameters; passed through unchanged",
                    op.operation.unwrap_or_default()
                ),
            );
            input
        })
    }
}

fn text_param<'a>(params: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| params.get(*k))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Optional-chained access to a dotted field path
fn field_access(base: &str, path: &str) -> String {
    let mut out = base.to_string();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        out.push_str("?.[");
        out.push_str(&expression::escape_literal(segment));
        out.push(']');
    }
    out
}

/// Numeric comparison when both sides are numbers, lexicographic otherwise
fn ascending_comparator(key: Option<&str>) -> String {
    let (x, y) = match key {
        Some(key) => (field_access("a", key), field_access("b", key)),
        None => ("a".to_string(), "b".to_string()),
    };
    format!(
        "(a, b) => {{ const x = {}, y = {}; return typeof x === 'number' && typeof y === 'number' ? x - y : x < y ? -1 : x > y ? 1 : 0; }}",
        x, y
    )
}

/// Exact negation of the ascending order
fn descending_comparator(key: Option<&str>) -> String {
    format!("(a, b) => -({})(a, b)", ascending_comparator(key))
}

/// Projection body for `map`: a field template or an expression
fn map_projection(params: &Map<String, Value>, depth: usize) -> Option<String> {
    if let Some(Value::Object(fields)) = ["fields", "template", "select"]
        .iter()
        .find_map(|k| params.get(*k))
    {
        let parts: Vec<String> = fields
            .iter()
            .map(|(name, value)| {
                let projected = match value {
                    Value::String(text) if expression::has_markers(text) => {
                        expression::resolve(text)
                    }
                    Value::String(text) => field_access("item", text),
                    other => expression::resolve_value(other, depth),
                };
                format!("{}: {}", expression::escape_literal(name), projected)
            })
            .collect();
        return Some(format!("({{ {} }})", parts.join(", ")));
    }

    text_param(params, &["expression", "transform"]).map(expression::resolve_code)
}
