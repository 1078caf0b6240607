//! Concurrent group codegen
//!
//! Every branch becomes an async closure inside `Promise.allSettled`, so all
//! branches run to completion before the first rejection is re-thrown. Names
//! bound inside any branch are declared once before the group and assigned
//! inside the branches.

use serde_json::Value;

use flowscript_core::step::ParallelStep;
use flowscript_core::walker::FlowWalker;

use super::generate_block;
use crate::context::{GenContext, is_identifier};

/// Helper for generating `parallel` steps
pub struct ParallelCodegen;

impl ParallelCodegen {
    /// Hoisted declarations, the settled group, then the merged results
    pub fn generate(step: &ParallelStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let branches = match &step.branches {
            Some(branches) if !branches.is_empty() => branches,
            _ => {
                ctx.warn(path, "'parallel' without branches; step skipped");
                return ctx.line("// Skipped: 'parallel' without branches");
            }
        };

        let mut code = ctx.hoist(branches);

        let settled = ctx.unique("__settled");
        let rejected = ctx.unique("__rejected");
        ctx.scope_mut().declare(&settled);
        ctx.scope_mut().declare(&rejected);

        code.push_str(&ctx.line(format!(
            "const {} = await Promise.allSettled([",
            settled
        )));
        let walker = *ctx.walker();
        let merge = step.merge_results;
        code.push_str(&ctx.block(|ctx| {
            let mut out = String::new();
            for (i, branch) in branches.iter().enumerate() {
                let prefix = format!("{}.parallel.branches[{}].flow", path, i);
                out.push_str(&ctx.line("(async () => {"));
                out.push_str(&generate_block(branch, &prefix, ctx));
                if merge {
                    let value = last_binding(&walker, branch)
                        .unwrap_or_else(|| "undefined".to_string());
                    out.push_str(&ctx.block(|ctx| ctx.line(format!("return {};", value))));
                }
                out.push_str(&ctx.line("})(),"));
            }
            out
        }));
        code.push_str(&ctx.line("]);"));

        code.push_str(&ctx.line(format!(
            "const {} = {}.find((r) => r.status === 'rejected');",
            rejected, settled
        )));
        code.push_str(&ctx.line(format!("if ({}) throw {}.reason;", rejected, rejected)));

        if let Some(results) = step.results_binding() {
            code.push_str(&ctx.bind(
                path,
                results,
                &format!("{}.map((r) => r.value)", settled),
            ));
        }
        code
    }
}

/// The last name a branch binds, in document order
fn last_binding(walker: &FlowWalker, branch: &[Value]) -> Option<String> {
    let mut last = None;
    walker.walk(branch, "", &mut |visit| {
        if let Some(name) = visit
            .step
            .bound_names()
            .into_iter()
            .rev()
            .find(|n| is_identifier(n))
        {
            last = Some(name);
        }
        true
    });
    last
}
