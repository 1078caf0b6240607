//! Variable binding codegen

use flowscript_core::expression;
use flowscript_core::step::VariablesStep;

use crate::context::GenContext;

/// Helper for generating `variables` steps
pub struct VariablesCodegen;

impl VariablesCodegen {
    /// One declaration (or reassignment) per name
    pub fn generate(step: &VariablesStep<'_>, path: &str, ctx: &mut GenContext<'_>) -> String {
        let Some(bindings) = step.bindings else {
            ctx.warn(path, "'variables' is not a mapping; step skipped");
            return ctx.line("// Skipped: 'variables' must be a mapping");
        };

        let depth = ctx.limits().max_literal_depth;
        let mut code = String::new();
        for (name, value) in bindings {
            let expr = expression::resolve_value(value, depth);
            code.push_str(&ctx.bind(path, name, &expr));
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::NamedAgent;
    use flowscript_core::Limits;
    use flowscript_core::step::Step;
    use serde_json::{Value, json};

    fn generate_all(steps: &[Value]) -> String {
        let agent = NamedAgent::default();
        let mut ctx = GenContext::new(&agent, Limits::default(), 0);
        let mut code = String::new();
        for step in steps {
            if let Step::VariableBinding(v) = Step::classify(step) {
                code.push_str(&VariablesCodegen::generate(&v, "p", &mut ctx));
            }
        }
        code
    }

    #[test]
    fn test_declare_then_reassign() {
        let code = generate_all(&[
            json!({"variables": {"count": 1, "label": "total: ${count}"}}),
            json!({"variables": {"count": "${count + 1}"}}),
        ]);
        assert_eq!(
            code,
            "let count = 1;\nlet label = `total: ${count}`;\ncount = count + 1;\n"
        );
    }

    #[test]
    fn test_structured_values() {
        let code = generate_all(&[json!({"variables": {"user": {"name": "ann", "tags": ["a"]}}})]);
        assert_eq!(code, "let user = { \"name\": \"ann\", \"tags\": [\"a\"] };\n");
    }

    #[test]
    fn test_env_marker_value() {
        let code = generate_all(&[json!({"variables": {"home": "${ENV.HOME}"}})]);
        assert_eq!(code, "let home = process.env.HOME;\n");
    }

    #[test]
    fn test_non_mapping_is_skipped() {
        let code = generate_all(&[json!({"variables": ["a"]})]);
        assert!(code.starts_with("// Skipped"));
    }
}
