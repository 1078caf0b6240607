//! Conditional codegen

use flowscript_core::step::ConditionalStep;

use super::{condition_expression, generate_block};
use crate::context::GenContext;

/// Helper for generating `logic` steps
pub struct ConditionalCodegen;

impl ConditionalCodegen {
    /// `if (<guard>) { then } else { else }`
    pub fn generate(step: &ConditionalStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let (Some(condition), Some(then_flow)) = (step.condition, step.then_flow) else {
            ctx.warn(path, "conditional needs both 'if' and 'then'; step skipped");
            return ctx.line("// Skipped: conditional without 'if' or 'then'");
        };

        let mut flows = vec![then_flow];
        flows.extend(step.else_flow);

        let mut code = ctx.hoist(&flows);
        let guard = condition_expression(condition, ctx);
        code.push_str(&ctx.line(format!("if ({}) {{", guard)));
        code.push_str(&generate_block(then_flow, &format!("{}.then", path), ctx));
        if let Some(else_flow) = step.else_flow {
            code.push_str(&ctx.line("} else {"));
            code.push_str(&generate_block(else_flow, &format!("{}.else", path), ctx));
        }
        code.push_str(&ctx.line("}"));
        code
    }
}
