//! Loop codegen (`for`, `while`, `repeat`)

use serde_json::Value;

use flowscript_core::bindings::collect_bindings;
use flowscript_core::expression;
use flowscript_core::step::{LoopStep, LoopType};

use super::{condition_expression, generate_scoped_block, scalar_expression};
use crate::context::{GenContext, is_identifier};

/// Helper for generating `loop` steps
pub struct LoopCodegen;

impl LoopCodegen {
    /// Generate a loop of any type
    pub fn generate(step: &LoopStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let body = step.body.unwrap_or_default();
        let body_path = format!("{}.loop.flow", path);

        let Some(loop_type) = step.loop_type else {
            ctx.warn(
                path,
                format!(
                    "unknown loop type {}; step skipped",
                    step.type_name.map_or("(none)".to_string(), |t| format!("'{}'", t))
                ),
            );
            return ctx.line("// Skipped: loop without a valid type");
        };

        let aliases: Vec<&str> = match loop_type {
            LoopType::For => std::iter::once(step.item_var).chain(step.index_var).collect(),
            LoopType::While => Vec::new(),
            LoopType::Repeat => vec![step.index_var.unwrap_or("i")],
        };
        if let Some(bad) = aliases.iter().find(|alias| !is_identifier(alias)) {
            ctx.warn(
                path,
                format!("'{}' is not a valid loop variable name; step skipped", bad),
            );
            return ctx.line("// Skipped: loop with an invalid variable name");
        }

        let rebound = Self::rebound_aliases(body, &aliases, ctx);
        for alias in &rebound {
            ctx.warn(
                path,
                format!(
                    "binding '{}' shadows the loop variable; its value is not kept after the loop",
                    alias
                ),
            );
        }

        let mut code = ctx.hoist_except(&[body], &aliases);
        let generated = match loop_type {
            LoopType::For => {
                let keyword = if rebound.is_empty() { "const" } else { "let" };
                Self::generate_for(step, body, &body_path, path, keyword, ctx)
            }
            LoopType::While => Self::generate_while(step, body, &body_path, path, ctx),
            LoopType::Repeat => Self::generate_repeat(step, body, &body_path, path, ctx),
        };
        code.push_str(&generated);
        code
    }

    /// Loop variables the body binds again
    fn rebound_aliases<'a>(
        body: &[Value],
        aliases: &[&'a str],
        ctx: &GenContext<'_>,
    ) -> Vec<&'a str> {
        let bound = collect_bindings(ctx.walker(), body);
        aliases
            .iter()
            .copied()
            .filter(|alias| bound.iter().any(|name| name == alias))
            .collect()
    }

    /// `for (const item of items)`, or indexed iteration when an index alias is set
    fn generate_for(
        step: &LoopStep<'_>,
        body: &[Value],
        body_path: &str,
        path: &str,
        keyword: &str,
        ctx: &mut GenContext<'_>,
    ) -> String {
        let Some(items) = step.items else {
            ctx.warn(path, "for loop without 'items'; step skipped");
            return ctx.line("// Skipped: for loop without 'items'");
        };

        let collection = match items {
            Value::String(_) => scalar_expression(items),
            other => expression::resolve_value(other, ctx.limits().max_literal_depth),
        };

        let (header, aliases) = match step.index_var {
            Some(index) => (
                format!(
                    "for ({} [{}, {}] of ({}).entries()) {{",
                    keyword, index, step.item_var, collection
                ),
                vec![step.item_var, index],
            ),
            None => (
                format!("for ({} {} of {}) {{", keyword, step.item_var, collection),
                vec![step.item_var],
            ),
        };

        let mut code = ctx.line(header);
        code.push_str(&generate_scoped_block(body, body_path, &aliases, ctx));
        code.push_str(&ctx.line("}"));
        code
    }

    /// Guarded while loop with a program-unique iteration counter
    fn generate_while(
        step: &LoopStep<'_>,
        body: &[Value],
        body_path: &str,
        path: &str,
        ctx: &mut GenContext<'_>,
    ) -> String {
        let Some(condition) = step.condition else {
            ctx.warn(path, "while loop without 'condition'; step skipped");
            return ctx.line("// Skipped: while loop without 'condition'");
        };

        let bound = step.max_iterations.map_or_else(
            || ctx.limits().default_while_iterations.to_string(),
            scalar_expression,
        );
        let counter = ctx.unique("__whileCounter");
        ctx.scope_mut().declare(&counter);
        let guard = condition_expression(condition, ctx);

        let mut code = ctx.line(format!("let {} = 0;", counter));
        code.push_str(&ctx.line(format!(
            "while ({}++ < {} && {}) {{",
            counter, bound, guard
        )));
        code.push_str(&generate_scoped_block(body, body_path, &[], ctx));
        code.push_str(&ctx.line("}"));
        code
    }

    /// Counted loop; the count is emitted as written, including zero
    fn generate_repeat(
        step: &LoopStep<'_>,
        body: &[Value],
        body_path: &str,
        path: &str,
        ctx: &mut GenContext<'_>,
    ) -> String {
        let Some(count) = step.count else {
            ctx.warn(path, "repeat loop without 'count'; step skipped");
            return ctx.line("// Skipped: repeat loop without 'count'");
        };

        let index = step.index_var.unwrap_or("i");
        let count = scalar_expression(count);

        let mut code = ctx.line(format!(
            "for (let {i} = 0; {i} < {count}; {i}++) {{",
            i = index,
            count = count
        ));
        code.push_str(&generate_scoped_block(body, body_path, &[index], ctx));
        code.push_str(&ctx.line("}"));
        code
    }
}
