//! External call codegen (HTTP and shell)

use serde_json::Value;

use flowscript_core::expression;
use flowscript_core::step::ExternalCallStep;

use crate::context::GenContext;

/// Helper for generating `external_call` steps
pub struct ExternalCallCodegen;

impl ExternalCallCodegen {
    /// Dispatch on the call type
    pub fn generate(step: &ExternalCallStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        match step.call_type {
            Some("http") => Self::generate_http(step, path, ctx),
            Some("shell") => Self::generate_shell(step, path, ctx),
            other => {
                ctx.warn(
                    path,
                    format!(
                        "unsupported external call type {}; step skipped",
                        other.map_or("(none)".to_string(), |t| format!("'{}'", t))
                    ),
                );
                ctx.line("// Skipped: unsupported external call")
            }
        }
    }

    /// `fetch` with the JSON response bound to `name`
    fn generate_http(step: &ExternalCallStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let Some(url) = step.url else {
            ctx.warn(path, "http call without 'url'; step skipped");
            return ctx.line("// Skipped: http call without 'url'");
        };

        let depth = ctx.limits().max_literal_depth;
        let method = step.method.unwrap_or("GET").to_ascii_uppercase();

        let mut options = vec![format!("method: {}", expression::escape_literal(&method))];
        if let Some(headers) = step.headers {
            options.push(format!("headers: {}", expression::resolve_value(headers, depth)));
        }
        if let Some(body) = step.body {
            let body = match body {
                Value::String(text) => expression::resolve(text),
                other => format!("JSON.stringify({})", expression::resolve_value(other, depth)),
            };
            options.push(format!("body: {}", body));
        }

        let request = format!(
            "fetch({}, {{ {} }})",
            expression::resolve_value(url, depth),
            options.join(", ")
        );

        match step.name {
            Some(name) => ctx.bind(path, name, &format!("await (await {}).json()", request)),
            None => ctx.line(format!("await {};", request)),
        }
    }

    /// Synchronous `execSync`, decoded as UTF-8
    fn generate_shell(step: &ExternalCallStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let Some(command) = step.command else {
            ctx.warn(path, "shell call without 'command'; step skipped");
            return ctx.line("// Skipped: shell call without 'command'");
        };

        ctx.imports_mut().child_process = true;
        let command = match command {
            Value::String(text) => expression::resolve(text),
            other => expression::resolve_value(other, 0),
        };
        let call = format!("execSync({}, {{ encoding: 'utf-8' }})", command);

        match step.name {
            Some(name) => ctx.bind(path, name, &call),
            None => ctx.line(format!("{};", call)),
        }
    }
}
