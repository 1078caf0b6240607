//! Level 2: document structure

use serde_json::Value;
use std::collections::HashMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::{Document, Platform};
use crate::step::as_flow;

pub(super) fn check(document: &Document, diags: &mut Diagnostics) {
    let Some(root) = document.root_map() else {
        diags.error(
            DiagnosticKind::Structure,
            "",
            "document root must be a mapping",
        );
        return;
    };

    check_platform(document, diags);

    if let Some(features) = root.get("features") {
        if !features.is_array() {
            diags.warn(
                DiagnosticKind::Structure,
                "features",
                "'features' should be a list of feature names",
            );
        }
    }

    match document.tasks_value() {
        None => diags.error(
            DiagnosticKind::Structure,
            "tasks",
            "missing required 'tasks' list",
        ),
        Some(Value::Array(tasks)) if tasks.is_empty() => diags.error(
            DiagnosticKind::Structure,
            "tasks",
            "'tasks' must contain at least one task",
        ),
        Some(Value::Array(tasks)) => check_tasks(tasks, diags),
        Some(_) => diags.error(DiagnosticKind::Structure, "tasks", "'tasks' must be a list"),
    }
}

fn check_platform(document: &Document, diags: &mut Diagnostics) {
    let platforms = document.platforms();
    let expected = Platform::ALL.map(|p| p.key()).join(", ");

    match platforms.as_slice() {
        [] => diags.error(
            DiagnosticKind::Structure,
            "",
            format!("missing platform configuration; expected one of: {}", expected),
        ),
        [(platform, config)] => check_platform_config(*platform, config, diags),
        many => {
            let keys: Vec<&str> = many.iter().map(|(p, _)| p.key()).collect();
            diags.error(
                DiagnosticKind::Structure,
                "",
                format!(
                    "exactly one platform block is allowed, found: {}",
                    keys.join(", ")
                ),
            );
        }
    }
}

fn check_platform_config(platform: Platform, config: &Value, diags: &mut Diagnostics) {
    let location = platform.key();
    let Some(map) = config.as_object() else {
        diags.error(
            DiagnosticKind::Structure,
            location,
            format!("'{}' configuration must be a mapping", location),
        );
        return;
    };

    let known = platform.known_fields();
    for key in map.keys() {
        if !known.contains(&key.as_str()) {
            diags.warn(
                DiagnosticKind::Structure,
                format!("{}.{}", location, key),
                format!("unknown '{}' configuration field '{}'", location, key),
            );
        }
    }

    if let Some(cache) = map.get("cache").and_then(Value::as_object) {
        let has_strategy = cache.get("strategy").is_some_and(|s| !s.is_null());
        let has_id = cache
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.trim().is_empty())
            || map
                .get("cacheId")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.trim().is_empty());
        if has_strategy && !has_id {
            diags.warn(
                DiagnosticKind::Structure,
                format!("{}.cache", location),
                "cache strategy is set but no cache id is given; caching will be disabled",
            );
        }
    }
}

fn check_tasks(tasks: &[Value], diags: &mut Diagnostics) {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (index, task) in tasks.iter().enumerate() {
        let location = format!("tasks[{}]", index);
        let Some(map) = task.as_object() else {
            diags.error(DiagnosticKind::Structure, location, "task must be a mapping");
            continue;
        };

        match map.get("name").and_then(Value::as_str).map(str::trim) {
            Some(name) if !name.is_empty() => {
                if let Some(first) = seen.insert(name, index) {
                    diags.warn(
                        DiagnosticKind::Structure,
                        format!("{}.name", location),
                        format!(
                            "duplicate task name '{}' (first used by tasks[{}])",
                            name, first
                        ),
                    );
                    seen.insert(name, first);
                }
            }
            _ => diags.error(
                DiagnosticKind::Structure,
                format!("{}.name", location),
                "task requires a non-empty 'name'",
            ),
        }

        match map.get("flow") {
            None | Some(Value::Null) => diags.error(
                DiagnosticKind::Structure,
                format!("{}.flow", location),
                "task requires a 'flow'",
            ),
            Some(flow) if as_flow(flow).is_some() => {}
            Some(_) => diags.error(
                DiagnosticKind::Structure,
                format!("{}.flow", location),
                "task 'flow' must be a list of steps or a mapping with 'steps'",
            ),
        }

        if let Some(output) = map.get("output") {
            let complete = output.get("variable").and_then(Value::as_str).is_some()
                && output.get("path").and_then(Value::as_str).is_some();
            if !complete {
                diags.warn(
                    DiagnosticKind::Structure,
                    format!("{}.output", location),
                    "task 'output' needs both 'variable' and 'path'; it will be ignored",
                );
            }
        }
    }
}
