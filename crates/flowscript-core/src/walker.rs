//! Flow-tree traversal
//!
//! Every consumer of nested flows (detector, validator, binding collector,
//! generators) walks through here instead of re-implementing recursion.
//! The walker follows [`Step::nested_flows`], so adding a construct that
//! owns child flows only touches the step module.

use serde_json::Value;

use crate::config::Limits;
use crate::document::Document;
use crate::step::Step;

/// One visited step
#[derive(Debug)]
pub struct Visit<'a, 'p> {
    /// Raw step value
    pub value: &'a Value,
    /// Classified step
    pub step: Step<'a>,
    /// Location, e.g. `tasks[0].flow[2].then[0]`
    pub path: &'p str,
    /// Nesting depth; steps of a task flow are at depth 0
    pub depth: usize,
}

/// Depth-first walker with a nesting ceiling
#[derive(Debug, Clone, Copy)]
pub struct FlowWalker {
    max_depth: usize,
}

impl Default for FlowWalker {
    fn default() -> Self {
        Self::new(Limits::default().max_depth)
    }
}

impl FlowWalker {
    /// Create a walker that will not descend below `max_depth`
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Walker using the configured depth limit
    pub fn from_limits(limits: &Limits) -> Self {
        Self::new(limits.max_depth)
    }

    /// Visit every step in document order
    ///
    /// Returning `false` from the visitor skips that step's nested flows.
    pub fn walk<'a, V>(&self, flow: &'a [Value], prefix: &str, visitor: &mut V)
    where
        V: FnMut(&Visit<'a, '_>) -> bool,
    {
        self.walk_with_limit(flow, prefix, visitor, &mut |_, _| {});
    }

    /// Like [`walk`](Self::walk), calling `on_depth_limit(path, depth)` for
    /// each nested flow left unvisited because of the ceiling
    pub fn walk_with_limit<'a, V, D>(
        &self,
        flow: &'a [Value],
        prefix: &str,
        visitor: &mut V,
        on_depth_limit: &mut D,
    ) where
        V: FnMut(&Visit<'a, '_>) -> bool,
        D: FnMut(&str, usize),
    {
        self.walk_at(flow, prefix, 0, visitor, on_depth_limit);
    }

    fn walk_at<'a, V, D>(
        &self,
        flow: &'a [Value],
        prefix: &str,
        depth: usize,
        visitor: &mut V,
        on_depth_limit: &mut D,
    ) where
        V: FnMut(&Visit<'a, '_>) -> bool,
        D: FnMut(&str, usize),
    {
        for (i, value) in flow.iter().enumerate() {
            let path = format!("{}[{}]", prefix, i);
            let visit = Visit {
                value,
                step: Step::classify(value),
                path: &path,
                depth,
            };

            if !visitor(&visit) {
                continue;
            }

            for nested in visit.step.nested_flows() {
                let nested_path = nested.path_under(&path);
                if depth + 1 > self.max_depth {
                    tracing::debug!("Depth limit {} reached at {}", self.max_depth, nested_path);
                    on_depth_limit(&nested_path, depth + 1);
                    continue;
                }
                self.walk_at(nested.steps, &nested_path, depth + 1, visitor, on_depth_limit);
            }
        }
    }

    /// Walk every task's flow
    pub fn walk_all<'a, V>(&self, document: &'a Document, visitor: &mut V)
    where
        V: FnMut(&Visit<'a, '_>) -> bool,
    {
        self.walk_all_with_limit(document, visitor, &mut |_, _| {});
    }

    /// Walk every task's flow, reporting flows cut off by the depth ceiling
    pub fn walk_all_with_limit<'a, V, D>(
        &self,
        document: &'a Document,
        visitor: &mut V,
        on_depth_limit: &mut D,
    ) where
        V: FnMut(&Visit<'a, '_>) -> bool,
        D: FnMut(&str, usize),
    {
        for task in document.tasks() {
            if let Some(flow) = task.flow {
                self.walk_with_limit(flow, &task.flow_path(), visitor, on_depth_limit);
            }
        }
    }
}

/// Walk `flow` with the default depth ceiling
pub fn walk<'a, V>(flow: &'a [Value], prefix: &str, visitor: &mut V)
where
    V: FnMut(&Visit<'a, '_>) -> bool,
{
    FlowWalker::default().walk(flow, prefix, visitor);
}

/// Walk every task of `document` with the default depth ceiling
pub fn walk_all<'a, V>(document: &'a Document, visitor: &mut V)
where
    V: FnMut(&Visit<'a, '_>) -> bool,
{
    FlowWalker::default().walk_all(document, visitor);
}
