//! Construct-specific code generation
//!
//! Each construct kind has its own generator. [`generate_step`] classifies
//! a step once and dispatches; generators recurse into nested flows through
//! [`generate_block`].

pub mod action;
pub mod conditional;
pub mod data_transform;
pub mod exception;
pub mod external;
pub mod import;
pub mod loops;
pub mod parallel;
pub mod variables;

pub use action::ActionCodegen;
pub use conditional::ConditionalCodegen;
pub use data_transform::DataTransformCodegen;
pub use exception::ExceptionCodegen;
pub use external::ExternalCallCodegen;
pub use import::ImportCodegen;
pub use loops::LoopCodegen;
pub use parallel::ParallelCodegen;
pub use variables::VariablesCodegen;

use serde_json::Value;

use flowscript_core::expression;
use flowscript_core::step::Step;

use crate::context::GenContext;

/// Generate every step of `flow`, in document order
pub fn generate_flow(flow: &[Value], prefix: &str, ctx: &mut GenContext<'_>) -> String {
    let mut code = String::new();
    for (i, value) in flow.iter().enumerate() {
        let path = format!("{}[{}]", prefix, i);
        code.push_str(&generate_step(value, &path, ctx));
    }
    code
}

/// Generate one step
pub fn generate_step(value: &Value, path: &str, ctx: &mut GenContext<'_>) -> String {
    let step = Step::classify(value);
    tracing::debug!("Generating {} at {}", step.kind().as_str(), path);

    match &step {
        Step::Action(a) => ActionCodegen::generate(a, path, ctx),
        Step::VariableBinding(v) => VariablesCodegen::generate(v, path, ctx),
        Step::Conditional(c) => ConditionalCodegen::generate(c, path, ctx),
        Step::Loop(l) => LoopCodegen::generate(l, path, ctx),
        Step::ExceptionBlock(t) => ExceptionCodegen::generate(t, path, ctx),
        Step::ExternalCall(e) => ExternalCallCodegen::generate(e, path, ctx),
        Step::DataTransform(d) => DataTransformCodegen::generate(d, path, ctx),
        Step::Import(spec) => ImportCodegen::generate(spec, path, ctx),
        Step::SubFlowInvocation(u) => ImportCodegen::generate_use(u, path, ctx),
        Step::ConcurrentGroup(p) => ParallelCodegen::generate(p, path, ctx),
        Step::Unknown(raw) => {
            ctx.warn(path, "unrecognized step; emitted as a comment");
            ctx.line(format!("// Unrecognized step: {}", raw))
        }
    }
}

/// Generate a nested flow one block deeper
pub fn generate_block(steps: &[Value], prefix: &str, ctx: &mut GenContext<'_>) -> String {
    generate_scoped_block(steps, prefix, &[], ctx)
}

/// Like [`generate_block`], with `aliases` already declared inside the block
pub fn generate_scoped_block(
    steps: &[Value],
    prefix: &str,
    aliases: &[&str],
    ctx: &mut GenContext<'_>,
) -> String {
    if ctx.depth() >= ctx.limits().max_depth {
        ctx.warn(
            prefix,
            format!(
                "nesting deeper than {}; nested steps omitted",
                ctx.limits().max_depth
            ),
        );
        return ctx.block(|ctx| ctx.line("// Nesting limit reached; steps omitted"));
    }
    ctx.block(|ctx| {
        for alias in aliases {
            ctx.scope_mut().declare(alias);
        }
        generate_flow(steps, prefix, ctx)
    })
}

/// Boolean guard for a condition value
///
/// A string that is exactly one variable marker is used as a JavaScript
/// expression; any other string is evaluated by the execution context.
pub fn condition_expression(value: &Value, ctx: &GenContext<'_>) -> String {
    match value {
        Value::String(text) => {
            let found = expression::markers(text);
            let is_expression =
                found.len() == 1 && found[0].span == (0..text.len()) && !found[0].is_env();
            if is_expression {
                expression::resolve(text)
            } else {
                ctx.target().condition(&expression::resolve(text))
            }
        }
        other => expression::resolve_value(other, ctx.limits().max_literal_depth),
    }
}

/// Resolve a scalar argument (count, bound, index) to an expression
pub(crate) fn scalar_expression(value: &Value) -> String {
    match value {
        Value::String(text) => {
            let found = expression::markers(text);
            if found.is_empty() {
                // Bare code such as `items.length`
                text.trim().to_string()
            } else {
                expression::resolve_code(text)
            }
        }
        other => expression::resolve_value(other, 0),
    }
}
