//! Level 4b: import resolution and cycle detection

use serde_json::Value;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::config::Limits;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::Document;
use crate::expression;
use crate::step::{Step, import_spec};
use crate::walker::FlowWalker;

/// One literal import path and where it was written
struct ImportRef<'a> {
    location: String,
    path: &'a str,
}

/// Literal import paths: top-level imports, `import` steps and `use` paths
fn import_refs<'a>(document: &'a Document, walker: &FlowWalker) -> Vec<ImportRef<'a>> {
    let mut refs = Vec::new();

    for (i, entry) in document.imports().iter().enumerate() {
        if let Some(path) = import_spec(entry, None).path {
            refs.push(ImportRef {
                location: format!("imports[{}]", i),
                path,
            });
        }
    }

    walker.walk_all(document, &mut |visit| {
        let path = match &visit.step {
            Step::Import(spec) => spec.path,
            Step::SubFlowInvocation(u) => u.reference.and_then(Value::as_str),
            _ => None,
        };
        if let Some(path) = path {
            refs.push(ImportRef {
                location: visit.path.to_string(),
                path,
            });
        }
        true
    });

    // Template-valued paths are only known at run time.
    refs.retain(|r| !expression::has_markers(r.path) && !r.path.trim().is_empty());
    refs
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Absolute, lexically normalised form of `path`
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

pub(super) fn check(
    document: &Document,
    walker: &FlowWalker,
    limits: &Limits,
    project_root: Option<&Path>,
    diags: &mut Diagnostics,
) {
    if document.root_map().is_none() {
        return;
    }

    let root = normalize(project_root.unwrap_or(&document.base_dir));
    let mut graph = ImportGraph {
        walker,
        limits,
        stack: document
            .path
            .as_deref()
            .and_then(|p| p.canonicalize().ok())
            .into_iter()
            .collect(),
        finished: HashSet::new(),
    };

    for import in import_refs(document, walker) {
        let target = document.resolve_path(import.path);

        if !normalize(&target).starts_with(&root) {
            diags.warn(
                DiagnosticKind::Safety,
                &import.location,
                format!(
                    "import '{}' resolves outside the project root {}",
                    import.path,
                    root.display()
                ),
            );
            continue;
        }

        if !target.exists() {
            diags.warn(
                DiagnosticKind::Reference,
                &import.location,
                format!("imported file not found: {}", target.display()),
            );
            continue;
        }

        if is_yaml(&target) {
            let Ok(canonical) = target.canonicalize() else {
                continue;
            };
            graph.follow(&canonical, &import.location, diags);
        }
    }
}

/// Depth-first state over the YAML import graph
struct ImportGraph<'w> {
    walker: &'w FlowWalker,
    limits: &'w Limits,
    /// Documents on the current import chain
    stack: Vec<PathBuf>,
    /// Documents whose imports were followed to the end
    finished: HashSet<PathBuf>,
}

impl ImportGraph<'_> {
    /// Walk the graph rooted at `path`, reporting at `location`
    fn follow(&mut self, path: &Path, location: &str, diags: &mut Diagnostics) {
        if let Some(start) = self.stack.iter().position(|seen| seen == path) {
            let chain: Vec<String> = self.stack[start..]
                .iter()
                .chain(std::iter::once(&path.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            diags.error(
                DiagnosticKind::ImportCycle,
                location,
                format!("import cycle: {}", chain.join(" -> ")),
            );
            return;
        }

        if self.finished.contains(path) {
            return;
        }

        if self.stack.len() > self.limits.max_import_depth {
            diags.warn(
                DiagnosticKind::Safety,
                location,
                format!(
                    "import chain deeper than {}; {} was not followed",
                    self.limits.max_import_depth,
                    path.display()
                ),
            );
            return;
        }

        let imported = match Document::from_path(path, self.limits) {
            Ok(doc) => doc,
            Err(e) => {
                diags.warn(
                    DiagnosticKind::Reference,
                    location,
                    format!("cannot read imported document {}: {}", path.display(), e),
                );
                self.finished.insert(path.to_path_buf());
                return;
            }
        };

        tracing::debug!("Following imports of {}", path.display());
        self.stack.push(path.to_path_buf());
        for import in import_refs(&imported, self.walker) {
            let target = imported.resolve_path(import.path);
            if !is_yaml(&target) {
                continue;
            }
            if let Ok(canonical) = target.canonicalize() {
                self.follow(&canonical, location, diags);
            }
        }
        self.stack.pop();
        self.finished.insert(path.to_path_buf());
    }
}
