//! Import and sub-flow invocation codegen
//!
//! What an import binds depends on the file extension:
//!
//! | extension              | binding                                          |
//! |------------------------|--------------------------------------------------|
//! | `.json`                | parsed data via `fs.readFileSync`                |
//! | `.yaml` / `.yml`       | deferred flow reference `{ kind: 'flow', path }` |
//! | `.js` `.mjs` `.cjs` `.ts` | module namespace via dynamic `import()`       |
//!
//! Sub-flow invocations hand a reference to the `__runSubFlow` helper that
//! every program template defines.

use serde_json::Value;
use std::path::Path;

use flowscript_core::Document;
use flowscript_core::expression;
use flowscript_core::step::{ImportSpec, UseStep, import_spec};

use crate::context::GenContext;

/// Helper for generating `import` and `use` steps
pub struct ImportCodegen;

impl ImportCodegen {
    /// Bind an import under its alias
    pub fn generate(spec: &ImportSpec<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let Some(file) = spec.path else {
            ctx.warn(path, "import without a path; step skipped");
            return ctx.line("// Skipped: import without a path");
        };

        let Some(expr) = import_expression(file) else {
            ctx.warn(
                path,
                format!("cannot import '{}': unsupported file type", file),
            );
            return ctx.line(format!("// Skipped import: {}", file));
        };

        match spec.binding() {
            Some(alias) => ctx.bind(path, &alias, &expr),
            None => {
                ctx.warn(path, format!("no alias could be derived for '{}'", file));
                ctx.line(format!("{};", expr))
            }
        }
    }

    /// Bindings for the document's top-level `imports` list
    pub fn generate_top_level(document: &Document, ctx: &mut GenContext<'_>) -> String {
        document
            .imports()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let spec = import_spec(entry, None);
                Self::generate(&spec, &format!("imports[{}]", i), ctx)
            })
            .collect()
    }

    /// `await __runSubFlow(agent, <ref>, <params>)`
    pub fn generate_use(step: &UseStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let reference = match step.reference {
            Some(Value::String(text)) if expression::has_markers(text) => {
                expression::resolve(text)
            }
            Some(Value::String(text)) if !text.trim().is_empty() => {
                reference_expression(text.trim())
            }
            _ => {
                ctx.warn(path, "'use' needs a file path or an alias; step skipped");
                return ctx.line("// Skipped: 'use' without a reference");
            }
        };

        let params = step.params.map_or_else(
            || "{}".to_string(),
            |p| expression::resolve_value(p, ctx.limits().max_literal_depth),
        );
        let call = format!(
            "await __runSubFlow({}, {}, {})",
            ctx.target().handle(),
            reference,
            params
        );

        match step.name {
            Some(name) => ctx.bind(path, name, &call),
            None => ctx.line(format!("{};", call)),
        }
    }
}

fn extension(file: &str) -> Option<String> {
    Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn flow_reference(file: &str) -> String {
    format!("{{ kind: 'flow', path: {} }}", expression::escape_literal(file))
}

/// The expression an import binds, or `None` for unsupported file types
pub fn import_expression(file: &str) -> Option<String> {
    let literal = expression::escape_literal(file);
    match extension(file)?.as_str() {
        "json" => Some(format!(
            "JSON.parse(fs.readFileSync({}, 'utf-8'))",
            literal
        )),
        "yaml" | "yml" => Some(flow_reference(file)),
        "js" | "mjs" | "cjs" | "ts" => Some(format!("await import({})", literal)),
        _ => None,
    }
}

/// A literal `use` reference; unknown extensions are passed as a flow path
fn reference_expression(file: &str) -> String {
    match extension(file).as_deref() {
        Some("js" | "mjs" | "cjs" | "ts") => {
            format!("await import({})", expression::escape_literal(file))
        }
        _ => flow_reference(file),
    }
}
