//! Level 4a: undefined variable references

use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

use crate::bindings::defined_names;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::Document;
use crate::expression;
use crate::step::{NestedFlow, Step};
use crate::walker::FlowWalker;

/// Names a transform predicate or template sees without binding them
const TRANSFORM_LOCALS: &[&str] = &["item", "acc", "index"];

struct References<'d> {
    defined: BTreeSet<String>,
    locals: &'static [&'static str],
    reported: HashSet<(String, String)>,
    diags: &'d mut Diagnostics,
}

impl References<'_> {
    fn name(&mut self, name: &str, location: &str) {
        if self.defined.contains(name) || self.locals.contains(&name) {
            return;
        }
        if self
            .reported
            .insert((name.to_string(), location.to_string()))
        {
            self.diags.warn(
                DiagnosticKind::Reference,
                location,
                format!("undefined variable '{}'", name),
            );
        }
    }

    fn text(&mut self, text: &str, location: &str) {
        for name in expression::references(text) {
            self.name(&name, location);
        }
    }

    /// Scan every string under `value`, skipping the nested flows in `skip`
    fn value(&mut self, value: &Value, location: &str, skip: &[NestedFlow<'_>]) {
        if skip.iter().any(|flow| is_flow(value, flow)) {
            return;
        }
        match value {
            Value::String(text) => self.text(text, location),
            Value::Array(items) => {
                for item in items {
                    self.value(item, location, skip);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    self.value(item, location, skip);
                }
            }
            _ => {}
        }
    }
}

fn is_flow(value: &Value, flow: &NestedFlow<'_>) -> bool {
    match value {
        Value::Array(items) => std::ptr::eq(items.as_ptr(), flow.steps.as_ptr()),
        // a bare mapping used as a one-step branch
        _ => flow.steps.len() == 1 && std::ptr::eq(value, flow.steps.as_ptr()),
    }
}

pub(super) fn check(document: &Document, walker: &FlowWalker, diags: &mut Diagnostics) {
    if document.root_map().is_none() {
        return;
    }

    let mut refs = References {
        defined: defined_names(walker, document),
        locals: &[],
        reported: HashSet::new(),
        diags,
    };

    if let Some(globals) = document.variables() {
        for (name, value) in globals {
            refs.value(value, &format!("variables.{}", name), &[]);
        }
    }

    if let Some((platform, config)) = document.platform() {
        refs.value(config, platform.key(), &[]);
    }

    for task in document.tasks() {
        if let Some(output) = task.output {
            refs.name(output.variable, &format!("tasks[{}].output", task.index));
        }
    }

    walker.walk_all(document, &mut |visit| {
        match &visit.step {
            Step::DataTransform(_) => {
                refs.locals = TRANSFORM_LOCALS;
                refs.value(visit.value, visit.path, &[]);
                refs.locals = &[];
            }
            step => refs.value(visit.value, visit.path, &step.nested_flows()),
        }
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ValidationReport;
    use serde_json::json;

    fn run(value: Value) -> ValidationReport {
        let mut diags = Diagnostics::new();
        check(
            &Document::from_value(value),
            &FlowWalker::default(),
            &mut diags,
        );
        diags.into_report()
    }

    fn messages(report: &ValidationReport) -> Vec<String> {
        report.warnings.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_defined_references_are_clean() {
        let report = run(json!({
            "web": {"url": "${ENV.BASE_URL}"},
            "variables": {"user": {"name": "ann"}},
            "tasks": [{"name": "t", "flow": [
                {"aiQuery": "rows", "name": "rows"},
                {"loop": {"type": "for", "items": "${rows}", "itemVar": "row", "flow": [
                    {"aiInput": "${row.email}", "locate": "email for ${user.name}"}
                ]}},
                {"data_transform": {"source": "${rows}", "operation": "filter", "condition": "${item.active}", "name": "active"}}
            ], "output": {"variable": "active", "path": "./out.json"}}]
        }));
        assert!(report.warnings.is_empty(), "{:?}", messages(&report));
    }

    #[test]
    fn test_transform_parameters_are_scanned() {
        let report = run(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"aiQuery": "products", "name": "products"},
                {"data_transform": {
                    "source": "${products}",
                    "name": "cheap",
                    "operations": [
                        {"filter": {"condition": "item.price > ${minPrice}"}},
                        {"reduce": {"expression": "${acc + item.price * rate}"}}
                    ]
                }}
            ]}]
        }));
        assert_eq!(
            messages(&report),
            vec![
                "tasks[0].flow[1]: undefined variable 'minPrice'",
                "tasks[0].flow[1]: undefined variable 'rate'",
            ]
        );
    }

    #[test]
    fn test_arrow_parameters_are_not_references() {
        let report = run(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"aiQuery": "items", "name": "items"},
                {"aiTap": "${items.filter(x => x.ok).length}"}
            ]}]
        }));
        assert!(report.warnings.is_empty(), "{:?}", messages(&report));
    }

    #[test]
    fn test_undefined_reference_once_per_location() {
        let report = run(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"aiTap": "${ghost} and ${ghost.child}"},
                {"aiTap": "${ghost}"}
            ]}]
        }));
        assert_eq!(
            messages(&report),
            vec![
                "tasks[0].flow[0]: undefined variable 'ghost'",
                "tasks[0].flow[1]: undefined variable 'ghost'",
            ]
        );
    }

    #[test]
    fn test_nested_flows_report_at_their_own_location() {
        let report = run(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"logic": {"if": "${flag}", "then": [{"aiTap": "${missing}"}]}}
            ]}]
        }));
        let messages = messages(&report);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "tasks[0].flow[0]: undefined variable 'flag'");
        assert_eq!(messages[1], "tasks[0].flow[0].then[0]: undefined variable 'missing'");
    }

    #[test]
    fn test_single_step_branch_is_not_scanned_twice() {
        let report = run(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"parallel": {"branches": [{"aiTap": "${nope}"}]}}
            ]}]
        }));
        assert_eq!(
            messages(&report),
            vec!["tasks[0].flow[0].parallel.branches[0].flow[0]: undefined variable 'nope'"]
        );
    }

    #[test]
    fn test_output_variable_must_be_defined() {
        let report = run(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [{"aiTap": "x"}],
                       "output": {"variable": "results", "path": "./r.json"}}]
        }));
        assert_eq!(
            messages(&report),
            vec!["tasks[0].output: undefined variable 'results'"]
        );
    }

    #[test]
    fn test_global_variables_are_scanned() {
        let report = run(json!({
            "web": {"url": "${host}/login"},
            "variables": {"greeting": "hi ${who}"},
            "tasks": [{"name": "t", "flow": [{"aiTap": "x"}]}]
        }));
        let messages = messages(&report);
        assert!(messages.contains(&"variables.greeting: undefined variable 'who'".to_string()));
        assert!(messages.contains(&"web: undefined variable 'host'".to_string()));
    }
}
