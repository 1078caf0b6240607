//! Variable binding collection
//!
//! Pure functions over flow subtrees. The generator uses
//! [`collect_bindings`] to hoist declarations out of concurrent branches;
//! the validator uses [`defined_names`] as the semantic defined-set.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::document::Document;
use crate::step::import_spec;
use crate::walker::FlowWalker;

/// Names bound anywhere in `flow`, including inside nested constructs
///
/// Loop and catch aliases are excluded: they belong to the construct that
/// introduces them. Each name appears once, in first-bound order.
pub fn collect_bindings(walker: &FlowWalker, flow: &[Value]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    walker.walk(flow, "", &mut |visit| {
        for name in visit.step.bound_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        true
    });
    names
}

/// Names bound in any of `branches`, deduplicated across branches
pub fn collect_branch_bindings(walker: &FlowWalker, branches: &[&[Value]]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for branch in branches {
        for name in collect_bindings(walker, branch) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Every name a document defines anywhere
///
/// Covers global variables, top-level import aliases, step bindings, result
/// names, and loop/catch aliases.
pub fn defined_names(walker: &FlowWalker, document: &Document) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    if let Some(globals) = document.variables() {
        names.extend(globals.keys().cloned());
    }

    for entry in document.imports() {
        if let Some(alias) = import_spec(entry, None).binding() {
            names.insert(alias);
        }
    }

    walker.walk_all(document, &mut |visit| {
        names.extend(visit.step.bound_names());
        names.extend(visit.step.scoped_names().into_iter().map(str::to_string));
        true
    });

    names
}
