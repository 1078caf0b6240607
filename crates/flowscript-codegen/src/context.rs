//! Generation context
//!
//! One [`GenContext`] lives for one generation pass. It threads the variable
//! scope, the Node built-in imports the program needs, warnings, and the
//! current indentation through every generator.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use flowscript_core::Limits;
use flowscript_core::bindings::collect_branch_bindings;
use flowscript_core::walker::FlowWalker;

use crate::target::AgentTarget;

/// Variable names declared at each block level of the generated program
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<BTreeSet<String>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            frames: vec![BTreeSet::new()],
        }
    }
}

impl Scope {
    /// Scope with a single top-level frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a block
    pub fn push(&mut self) {
        self.frames.push(BTreeSet::new());
    }

    /// Leave a block; the top-level frame is never removed
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Whether `name` is visible from the current block
    pub fn is_declared(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains(name))
    }

    /// Declare `name` in the current block; false if it was already visible
    pub fn declare(&mut self, name: &str) -> bool {
        if self.is_declared(name) {
            return false;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string());
        }
        true
    }

    /// Current block depth; 1 at the top level
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Node built-ins the generated program has to import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportTracker {
    /// `execSync` for shell calls
    pub child_process: bool,
    /// `path` for output directives
    pub path: bool,
}

impl ImportTracker {
    /// Import statements, in a stable order
    pub fn statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        if self.child_process {
            statements.push("import { execSync } from 'node:child_process';".to_string());
        }
        if self.path {
            statements.push("import path from 'node:path';".to_string());
        }
        statements
    }
}

/// Words a generated module cannot use as binding names
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` can be used as a JavaScript binding
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}

/// State shared by all generators during one pass
pub struct GenContext<'t> {
    target: &'t dyn AgentTarget,
    limits: Limits,
    walker: FlowWalker,
    scope: Scope,
    imports: ImportTracker,
    warnings: Vec<String>,
    indent: usize,
    depth: usize,
    counters: HashMap<&'static str, usize>,
}

impl<'t> GenContext<'t> {
    /// Fresh context emitting at `indent` levels
    pub fn new(target: &'t dyn AgentTarget, limits: Limits, indent: usize) -> Self {
        Self {
            target,
            walker: FlowWalker::from_limits(&limits),
            limits,
            scope: Scope::new(),
            imports: ImportTracker::default(),
            warnings: Vec::new(),
            indent,
            depth: 0,
            counters: HashMap::new(),
        }
    }

    /// The injected execution context
    pub fn target(&self) -> &'t dyn AgentTarget {
        self.target
    }

    /// Limits in effect
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Variable scope
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Mutable variable scope
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// Import needs recorded so far
    pub fn imports(&self) -> ImportTracker {
        self.imports
    }

    /// Mutable import needs
    pub fn imports_mut(&mut self) -> &mut ImportTracker {
        &mut self.imports
    }

    /// Record a warning against a document location
    pub fn warn(&mut self, location: &str, message: impl AsRef<str>) {
        let warning = if location.is_empty() {
            message.as_ref().to_string()
        } else {
            format!("{}: {}", location, message.as_ref())
        };
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Warnings recorded so far
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Consume the context, keeping its warnings
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    /// One line of output at the current indentation
    pub fn line(&self, text: impl AsRef<str>) -> String {
        format!("{}{}\n", "  ".repeat(self.indent), text.as_ref())
    }

    /// Run `f` one block deeper: indented, in a fresh scope frame
    pub fn block<F>(&mut self, f: F) -> String
    where
        F: FnOnce(&mut Self) -> String,
    {
        self.indent += 1;
        self.depth += 1;
        self.scope.push();
        let out = f(self);
        self.scope.pop();
        self.depth -= 1;
        self.indent -= 1;
        out
    }

    /// Current nesting depth of generated blocks
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bind `name` to `expr`, declaring it unless it is already visible
    pub fn bind(&mut self, location: &str, name: &str, expr: &str) -> String {
        if !is_identifier(name) {
            self.warn(
                location,
                format!("'{}' is not a valid variable name; result discarded", name),
            );
            return self.line(format!("{};", expr));
        }
        if self.scope.declare(name) {
            self.line(format!("let {} = {};", name, expr))
        } else {
            self.line(format!("{} = {};", name, expr))
        }
    }

    /// Declare every name bound inside `flows` that is not yet visible
    ///
    /// Binding sites inside the flows then assign instead of declaring, so
    /// the values survive the block they were produced in.
    pub fn hoist(&mut self, flows: &[&[Value]]) -> String {
        self.hoist_except(flows, &[])
    }

    /// Like [`hoist`](Self::hoist), leaving `except` to the block that declares them
    pub fn hoist_except(&mut self, flows: &[&[Value]], except: &[&str]) -> String {
        let mut out = String::new();
        for name in collect_branch_bindings(&self.walker, flows) {
            if except.contains(&name.as_str()) {
                continue;
            }
            if is_identifier(&name) && self.scope.declare(&name) {
                out.push_str(&self.line(format!("let {};", name)));
            }
        }
        out
    }

    /// Program-unique identifier: `base`, then `base1`, `base2`, ...
    pub fn unique(&mut self, base: &'static str) -> String {
        let n = self.counters.entry(base).or_insert(0);
        let name = if *n == 0 {
            base.to_string()
        } else {
            format!("{}{}", base, n)
        };
        *n += 1;
        name
    }

    /// Walker sharing this pass's depth limit
    pub fn walker(&self) -> &FlowWalker {
        &self.walker
    }
}
