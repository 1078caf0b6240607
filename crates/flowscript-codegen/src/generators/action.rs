//! Leaf action codegen

use serde_json::{Map, Value};

use flowscript_core::expression;
use flowscript_core::step::{ActionStep, CallShape};

use crate::context::GenContext;

const SCROLL_FIELDS: &[&str] = &["direction", "scrollType", "distance"];

/// Helper for generating automation action calls
pub struct ActionCodegen;

impl ActionCodegen {
    /// Generate the statement for one action step
    pub fn generate(step: &ActionStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let call = Self::call_expression(step, ctx);
        match step.name {
            Some(name) => {
                if !step.spec.returns_value {
                    ctx.warn(
                        path,
                        format!(
                            "'{}' does not return a value; '{}' will be undefined",
                            step.spec.keyword, name
                        ),
                    );
                }
                ctx.bind(path, name, &call)
            }
            None => ctx.line(format!("{};", call)),
        }
    }

    /// The awaited call expression, without a trailing semicolon
    pub fn call_expression(step: &ActionStep<'_>, ctx: &GenContext<'_>) -> String {
        let depth = ctx.limits().max_literal_depth;
        let spec = step.spec;

        let args = match spec.shape {
            CallShape::Prompt | CallShape::Report => {
                let mut args = vec![argument(step.value, depth)];
                args.extend(options(step.map, &[spec.keyword, "name"], depth));
                args
            }
            CallShape::ValueAndLocate => {
                // Nested form is tolerated here even though the engine drops it.
                let (value, locate) = match step.value {
                    Value::Object(inner) => (
                        inner.get("value").or_else(|| inner.get("keyName")),
                        inner.get("locate"),
                    ),
                    other => (Some(other), step.map.get("locate")),
                };
                let mut args = vec![
                    value.map_or_else(|| "undefined".to_string(), |v| argument(v, depth)),
                    locate.map_or_else(|| "undefined".to_string(), |v| argument(v, depth)),
                ];
                args.extend(options(step.map, &[spec.keyword, "name", "locate"], depth));
                args
            }
            CallShape::Scroll => {
                let source = step.value.as_object().unwrap_or(step.map);
                let param: Map<String, Value> = SCROLL_FIELDS
                    .iter()
                    .filter_map(|k| source.get(*k).map(|v| (k.to_string(), v.clone())))
                    .collect();
                let locate = source
                    .get("locate")
                    .or_else(|| Some(step.value).filter(|v| v.is_string()));
                vec![
                    expression::resolve_value(&Value::Object(param), depth),
                    locate.map_or_else(|| "undefined".to_string(), |v| argument(v, depth)),
                ]
            }
            CallShape::Assert => {
                let mut args = vec![argument(step.value, depth)];
                if let Some(message) = step.map.get("errorMessage") {
                    args.push(argument(message, depth));
                }
                args
            }
            CallShape::Script => vec![argument(step.value, depth)],
            CallShape::Sleep => {
                return format!("await sleep({})", argument(step.value, depth));
            }
        };

        ctx.target().call(spec.method, &args)
    }
}

fn argument(value: &Value, depth: usize) -> String {
    match value {
        Value::String(text) => expression::resolve(text),
        Value::Null => "undefined".to_string(),
        other => expression::resolve_value(other, depth),
    }
}

/// Sibling keys other than `exclude`, as an options object
fn options(map: &Map<String, Value>, exclude: &[&str], depth: usize) -> Option<String> {
    let rest: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| !exclude.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if rest.is_empty() {
        None
    } else {
        Some(expression::resolve_value(&Value::Object(rest), depth))
    }
}
