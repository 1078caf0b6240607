//! Exception block codegen

use flowscript_core::step::TryStep;

use super::{generate_block, generate_scoped_block};
use crate::context::GenContext;

/// Helper for generating `try` steps
pub struct ExceptionCodegen;

impl ExceptionCodegen {
    /// `try { } catch (error) { } finally { }`, mirroring the parts present
    pub fn generate(step: &TryStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let Some(body) = step.body else {
            ctx.warn(path, "'try' without a flow; step skipped");
            return ctx.line("// Skipped: 'try' without a flow");
        };

        let mut flows = vec![body];
        flows.extend(step.catch.map(|c| c.steps));
        flows.extend(step.finally);

        let mut code = ctx.hoist(&flows);
        code.push_str(&ctx.line("try {"));
        code.push_str(&generate_block(body, &format!("{}.try", path), ctx));

        match step.catch {
            Some(catch) => {
                code.push_str(&ctx.line(format!("}} catch ({}) {{", catch.error_var)));
                code.push_str(&generate_scoped_block(
                    catch.steps,
                    &format!("{}.catch", path),
                    &[catch.error_var],
                    ctx,
                ));
            }
            None if step.finally.is_none() => {
                // A bare try is not valid JavaScript
                ctx.warn(path, "'try' without 'catch' or 'finally'; errors are ignored");
                code.push_str(&ctx.line("} catch (error) {"));
                code.push_str(&ctx.block(|ctx| ctx.line("// ignored")));
            }
            None => {}
        }

        if let Some(finally) = step.finally {
            code.push_str(&ctx.line("} finally {"));
            code.push_str(&generate_block(finally, &format!("{}.finally", path), ctx));
        }
        code.push_str(&ctx.line("}"));
        code
    }
}

#[cfg(test)]
mod tests {
    use crate::context::GenContext;
    use crate::generators::generate_flow;
    use crate::target::NamedAgent;
    use flowscript_core::Limits;
    use serde_json::{Value, json};

    fn generate(flow: Value) -> (String, Vec<String>) {
        let agent = NamedAgent::default();
        let mut ctx = GenContext::new(&agent, Limits::default(), 0);
        let code = generate_flow(flow.as_array().unwrap(), "f", &mut ctx);
        (code, ctx.into_warnings())
    }

    #[test]
    fn test_try_catch_finally() {
        let (code, warnings) = generate(json!([{
            "try": [{"aiTap": "submit"}],
            "catch": {"errorVar": "err", "flow": [{"logScreenshot": "${err.message}"}]},
            "finally": [{"aiTap": "close"}]
        }]));
        assert_eq!(
            code,
            "try {\n  await agent.aiTap(\"submit\");\n} catch (err) {\n  await agent.logScreenshot(err.message);\n} finally {\n  await agent.aiTap(\"close\");\n}\n"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_finally_only() {
        let (code, _) = generate(json!([{"try": [], "finally": []}]));
        assert_eq!(code, "try {\n} finally {\n}\n");
    }

    #[test]
    fn test_bare_try_gets_noop_catch() {
        let (code, warnings) = generate(json!([{"try": {"flow": [{"aiTap": "x"}]}}]));
        assert!(code.contains("} catch (error) {\n  // ignored\n}\n"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_binding_in_try_is_hoisted() {
        let (code, _) = generate(json!([
            {"try": [{"aiQuery": "total", "name": "total"}], "catch": []},
            {"aiTap": "${total}"}
        ]));
        assert!(code.starts_with("let total;\ntry {\n  total = await agent.aiQuery"));
    }
}
