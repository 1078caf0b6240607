//! Level 3: mode-aware construct checks

use serde_json::Value;
use std::collections::BTreeSet;

use crate::config::Limits;
use crate::detector::{Feature, detect_document, feature_for_key, used_features};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::{Document, Mode};
use crate::expression;
use crate::step::{FLAT_FORM_ACTIONS, LoopStep, LoopType, Step};
use crate::walker::{FlowWalker, Visit};

/// Operations a data transform understands
pub(crate) const TRANSFORM_OPERATIONS: &[&str] = &[
    "filter", "sort", "map", "reduce", "slice", "unique", "distinct", "flatten", "groupBy",
];

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

pub(super) fn check(
    document: &Document,
    walker: &FlowWalker,
    limits: &Limits,
    diags: &mut Diagnostics,
) {
    if document.root_map().is_none() {
        return;
    }

    let detection = detect_document(document);
    for warning in &detection.warnings {
        diags.warn(DiagnosticKind::Structure, "mode", warning.clone());
    }

    if detection.mode == Mode::Native {
        check_native_keywords(&document.root, "", diags);
    }

    let mut too_deep: Vec<(String, usize)> = Vec::new();
    walker.walk_all_with_limit(
        document,
        &mut |visit| {
            check_step(visit, detection.mode, limits, diags);
            true
        },
        &mut |path, depth| too_deep.push((path.to_string(), depth)),
    );
    for (path, depth) in too_deep {
        diags.warn(
            DiagnosticKind::Safety,
            path,
            format!(
                "nesting depth {} exceeds the limit of {}; deeper steps are not checked",
                depth, limits.max_depth
            ),
        );
    }

    check_declared_features(document, diags);
}

/// Warn about extended keywords the automation engine would ignore
fn check_native_keywords(value: &Value, path: &str, diags: &mut Diagnostics) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                if feature_for_key(key).is_some() {
                    diags.warn(
                        DiagnosticKind::Construct,
                        child_path,
                        format!(
                            "'{}' is an extended construct and is ignored in native mode",
                            key
                        ),
                    );
                    continue;
                }
                check_native_keywords(child, &child_path, diags);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_native_keywords(item, &format!("{}[{}]", path, i), diags);
            }
        }
        _ => {}
    }
}

fn check_step(visit: &Visit<'_, '_>, mode: Mode, limits: &Limits, diags: &mut Diagnostics) {
    match &visit.step {
        Step::Action(action) => {
            if FLAT_FORM_ACTIONS.contains(&action.spec.keyword) && action.value.is_object() {
                diags.warn(
                    DiagnosticKind::Construct,
                    format!("{}.{}", visit.path, action.spec.keyword),
                    format!(
                        "'{}' takes its value directly with sibling options (e.g. `locate`); nested object fields are ignored",
                        action.spec.keyword
                    ),
                );
            }
        }
        Step::Unknown(value) => {
            let keys = value
                .as_object()
                .map(|m| m.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_else(|| value.to_string());
            diags.warn(
                DiagnosticKind::Construct,
                visit.path,
                format!("unrecognized step ({})", keys),
            );
        }
        _ if mode == Mode::Native => {}
        step => check_construct(step, visit.path, limits, diags),
    }
}

fn check_construct(step: &Step<'_>, path: &str, limits: &Limits, diags: &mut Diagnostics) {
    let location = format!("{}.{}", path, step.kind().as_str());

    match step {
        Step::VariableBinding(v) => {
            if v.bindings.is_none() {
                diags.error(
                    DiagnosticKind::Construct,
                    location,
                    "'variables' must be a mapping of names to values",
                );
            }
        }
        Step::Conditional(c) => {
            if c.condition.is_none() {
                diags.error(DiagnosticKind::Construct, &location, "conditional requires 'if'");
            }
            if c.then_flow.is_none() {
                diags.error(DiagnosticKind::Construct, &location, "conditional requires a 'then' flow");
            }
        }
        Step::Loop(l) => check_loop(l, &location, limits, diags),
        Step::ExceptionBlock(t) => {
            if t.body.is_none() {
                diags.error(DiagnosticKind::Construct, &location, "'try' requires a flow");
            }
            if t.catch.is_none() && t.finally.is_none() {
                diags.error(
                    DiagnosticKind::Construct,
                    &location,
                    "'try' requires a 'catch' or 'finally' block",
                );
            }
        }
        Step::ExternalCall(e) => match e.call_type {
            Some("http") => {
                if e.url.is_none() {
                    diags.error(DiagnosticKind::Construct, &location, "http call requires a 'url'");
                }
                if let Some(method) = e.method {
                    if !HTTP_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
                        diags.warn(
                            DiagnosticKind::Construct,
                            &location,
                            format!("unknown HTTP method '{}'", method),
                        );
                    }
                }
            }
            Some("shell") => match e.command {
                None => diags.error(
                    DiagnosticKind::Construct,
                    &location,
                    "shell call requires a 'command'",
                ),
                Some(Value::String(command)) if expression::has_unresolved_markers(command) => {
                    diags.warn(
                        DiagnosticKind::Safety,
                        &location,
                        "shell command interpolates variables; values reach the shell unescaped",
                    );
                }
                Some(_) => {}
            },
            Some(other) => diags.error(
                DiagnosticKind::Construct,
                &location,
                format!("unknown external_call type '{}'; expected 'http' or 'shell'", other),
            ),
            None => diags.error(
                DiagnosticKind::Construct,
                &location,
                "external_call requires a 'type' ('http' or 'shell')",
            ),
        },
        Step::DataTransform(d) => {
            if d.source.is_none() {
                diags.warn(
                    DiagnosticKind::Construct,
                    &location,
                    "data_transform has no 'source'; it will operate on an empty list",
                );
            }
            if d.chained && d.operations.is_empty() {
                diags.error(
                    DiagnosticKind::Construct,
                    &location,
                    "'operations' must list at least one operation",
                );
            }
            for (i, op) in d.operations.iter().enumerate() {
                let op_location = if d.chained {
                    format!("{}.operations[{}]", location, i)
                } else {
                    location.clone()
                };
                match op.operation {
                    Some(name) if TRANSFORM_OPERATIONS.contains(&name) => {}
                    Some(name) => diags.error(
                        DiagnosticKind::Construct,
                        op_location,
                        format!(
                            "unknown data_transform operation '{}'; expected one of: {}",
                            name,
                            TRANSFORM_OPERATIONS.join(", ")
                        ),
                    ),
                    None => diags.error(
                        DiagnosticKind::Construct,
                        op_location,
                        "data_transform requires an 'operation'",
                    ),
                }
            }
        }
        Step::Import(spec) => {
            if spec.path.is_none() {
                diags.error(DiagnosticKind::Construct, location, "'import' requires a path");
            }
        }
        Step::SubFlowInvocation(u) => {
            let has_reference = u
                .reference
                .and_then(Value::as_str)
                .is_some_and(|r| !r.trim().is_empty());
            if !has_reference {
                diags.error(
                    DiagnosticKind::Construct,
                    &location,
                    "'use' requires a non-empty sub-flow reference",
                );
            }
            if u.params.is_some_and(|p| !p.is_object()) {
                diags.error(
                    DiagnosticKind::Construct,
                    &location,
                    "'with' must be a mapping of parameter names to values",
                );
            }
        }
        Step::ConcurrentGroup(p) => {
            if p.branches.as_ref().is_none_or(Vec::is_empty) {
                diags.error(
                    DiagnosticKind::Construct,
                    location,
                    "'parallel' requires a non-empty list of branches",
                );
            }
        }
        Step::Action(_) | Step::Unknown(_) => {}
    }
}

fn check_loop(l: &LoopStep<'_>, location: &str, limits: &Limits, diags: &mut Diagnostics) {
    match l.loop_type {
        Some(LoopType::For) => {
            if l.items.is_none() {
                diags.error(DiagnosticKind::Construct, location, "for loop requires 'items'");
            }
        }
        Some(LoopType::While) => {
            if l.condition.is_none() {
                diags.error(
                    DiagnosticKind::Construct,
                    location,
                    "while loop requires a 'condition'",
                );
            }
            if l.max_iterations.is_none() {
                diags.warn(
                    DiagnosticKind::Safety,
                    location,
                    format!(
                        "while loop has no 'maxIterations'; it will stop after {} iterations",
                        limits.default_while_iterations
                    ),
                );
            }
        }
        Some(LoopType::Repeat) => match l.count {
            None => diags.error(
                DiagnosticKind::Construct,
                location,
                "repeat loop requires 'count' (or 'times')",
            ),
            Some(count) => {
                if let Some(n) = count.as_f64() {
                    if n <= 0.0 {
                        diags.warn(
                            DiagnosticKind::Construct,
                            location,
                            format!("non-positive repeat count {}; the body never runs", count),
                        );
                    } else if n > limits.max_repeat_count as f64 {
                        diags.warn(
                            DiagnosticKind::Safety,
                            location,
                            format!(
                                "repeat count {} exceeds {}",
                                count, limits.max_repeat_count
                            ),
                        );
                    }
                }
            }
        },
        None => {
            let message = match l.type_name {
                Some(name) => format!("unknown loop type '{}'; expected for, while or repeat", name),
                None => "loop requires a 'type' (for, while or repeat)".to_string(),
            };
            diags.error(DiagnosticKind::Construct, location, message);
        }
    }

    if l.body.is_none() {
        diags.warn(DiagnosticKind::Construct, location, "loop has no 'flow'");
    }
}

fn check_declared_features(document: &Document, diags: &mut Diagnostics) {
    let Some(declared) = document.declared_features() else {
        return;
    };

    let used = used_features(&document.root);
    let mut listed = BTreeSet::new();
    for name in declared {
        match Feature::parse(name) {
            Some(feature) => {
                listed.insert(feature);
            }
            None => diags.warn(
                DiagnosticKind::Reference,
                "features",
                format!("unknown feature '{}'", name),
            ),
        }
    }

    for feature in listed.difference(&used) {
        diags.warn(
            DiagnosticKind::Reference,
            "features",
            format!("feature '{}' is declared but never used", feature),
        );
    }
    for feature in used.difference(&listed) {
        diags.warn(
            DiagnosticKind::Reference,
            "features",
            format!("feature '{}' is used but not declared", feature),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Severity, ValidationReport};
    use rstest::rstest;
    use serde_json::json;

    fn run(value: Value) -> ValidationReport {
        let mut diags = Diagnostics::new();
        check(
            &Document::from_value(value),
            &FlowWalker::default(),
            &Limits::default(),
            &mut diags,
        );
        diags.into_report()
    }

    fn run_flow(flow: Value) -> ValidationReport {
        run(json!({"web": {"url": "https://x"}, "tasks": [{"name": "t", "flow": flow}]}))
    }

    #[test]
    fn test_forced_native_warns_on_extended_keywords() {
        let report = run(json!({
            "mode": "native",
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"loop": {"type": "repeat", "count": 2, "flow": [{"aiTap": "x"}]}}
            ]}]
        }));
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].location, "tasks[0].flow[0].loop");
    }

    #[test]
    fn test_flat_form_nested_object_warns() {
        let report = run_flow(json!([{"aiInput": {"value": "x", "locate": "box"}}]));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("aiInput"));

        let report = run_flow(json!([{"aiInput": "x", "locate": "box"}]));
        assert!(report.warnings.is_empty());
    }

    #[rstest]
    #[case(json!({"logic": {"then": [{"aiTap": "a"}]}}), "requires 'if'")]
    #[case(json!({"logic": {"if": "x"}}), "'then'")]
    #[case(json!({"loop": {"flow": []}}), "requires a 'type'")]
    #[case(json!({"loop": {"type": "until", "flow": []}}), "unknown loop type")]
    #[case(json!({"loop": {"type": "for", "flow": []}}), "requires 'items'")]
    #[case(json!({"loop": {"type": "while", "maxIterations": 3, "flow": []}}), "'condition'")]
    #[case(json!({"loop": {"type": "repeat", "flow": []}}), "'count'")]
    #[case(json!({"try": [{"aiTap": "x"}]}), "'catch' or 'finally'")]
    #[case(json!({"external_call": {"type": "ftp"}}), "unknown external_call type")]
    #[case(json!({"external_call": {"type": "http"}}), "'url'")]
    #[case(json!({"external_call": {"type": "shell"}}), "'command'")]
    #[case(json!({"parallel": {"branches": []}}), "non-empty list of branches")]
    #[case(json!({"use": ""}), "non-empty sub-flow reference")]
    #[case(json!({"use": "./a.yaml", "with": [1, 2]}), "'with' must be a mapping")]
    #[case(json!({"data_transform": {"source": "${a}", "operation": "explode"}}), "unknown data_transform operation")]
    #[case(json!({"variables": [1, 2]}), "must be a mapping")]
    fn test_construct_errors(#[case] step: Value, #[case] expected: &str) {
        let report = run_flow(json!([step]));
        assert!(!report.valid);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.kind == DiagnosticKind::Construct && e.message.contains(expected)),
            "expected '{}' in {:?}",
            expected,
            report.errors
        );
    }

    #[test]
    fn test_while_without_bound_warns() {
        let report = run_flow(json!([
            {"loop": {"type": "while", "condition": "more rows", "flow": [{"aiTap": "next"}]}}
        ]));
        assert!(report.valid);
        let w = &report.warnings[0];
        assert_eq!(w.kind, DiagnosticKind::Safety);
        assert_eq!(w.location, "tasks[0].flow[0].loop");
        assert!(w.message.contains("100"));
    }

    #[test]
    fn test_repeat_count_bounds() {
        let report = run_flow(json!([{"loop": {"type": "repeat", "count": -1, "flow": []}}]));
        assert!(report.warnings[0].message.contains("non-positive"));

        let report = run_flow(json!([{"loop": {"type": "repeat", "times": 20000, "flow": []}}]));
        assert_eq!(report.warnings[0].kind, DiagnosticKind::Safety);
        assert!(report.warnings[0].message.contains("10000"));

        let report = run_flow(json!([{"loop": {"type": "repeat", "count": "${n}", "flow": []}}]));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unknown_http_method_warns() {
        let report = run_flow(json!([
            {"external_call": {"type": "http", "url": "https://x", "method": "fetch"}}
        ]));
        assert!(report.valid);
        assert!(report.warnings[0].message.contains("'fetch'"));
    }

    #[test]
    fn test_shell_env_marker_is_not_injection() {
        let report = run_flow(json!([
            {"external_call": {"type": "shell", "command": "echo ${ENV.HOME}"}}
        ]));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_data_transform_without_source_warns() {
        let report = run_flow(json!([{"data_transform": {"operation": "flatten", "name": "x"}}]));
        assert!(report.valid);
        assert!(report.warnings[0].message.contains("'source'"));
    }

    #[test]
    fn test_unknown_step_warns() {
        let report = run_flow(json!([{"frobnicate": 1}]));
        assert!(report.valid);
        assert!(report.warnings[0].message.contains("frobnicate"));
    }

    #[test]
    fn test_depth_limit_is_safety_warning() {
        let mut flow = json!([{"aiTap": "leaf"}]);
        for _ in 0..4 {
            flow = json!([{"logic": {"if": "x", "then": flow}}]);
        }
        let doc = Document::from_value(json!({"web": {}, "tasks": [{"name": "t", "flow": flow}]}));
        let limits = Limits {
            max_depth: 2,
            ..Limits::default()
        };
        let mut diags = Diagnostics::new();
        check(&doc, &FlowWalker::from_limits(&limits), &limits, &mut diags);
        let report = diags.into_report();
        assert_eq!(report.of_kind(DiagnosticKind::Safety).count(), 1);
    }

    #[test]
    fn test_feature_declarations_are_cross_checked() {
        let report = run(json!({
            "features": ["logic", "loop", "teleport"],
            "web": {},
            "tasks": [{"name": "t", "flow": [
                {"logic": {"if": "x", "then": [{"aiTap": "a"}]}},
                {"parallel": [[{"aiTap": "b"}]]}
            ]}]
        }));
        let messages: Vec<&str> = report
            .warnings
            .iter()
            .filter(|w| w.kind == DiagnosticKind::Reference)
            .map(|w| w.message.as_str())
            .collect();
        assert_eq!(messages.len(), 3, "{:?}", messages);
        assert!(messages.iter().any(|m| m.contains("'teleport'")));
        assert!(messages.iter().any(|m| m.contains("'loop' is declared but never used")));
        assert!(messages.iter().any(|m| m.contains("'parallel' is used but not declared")));
        assert!(report.warnings.iter().all(|w| w.severity == Severity::Warning));
    }
}
