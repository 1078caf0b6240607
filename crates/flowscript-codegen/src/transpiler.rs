//! Transpiler
//!
//! Turns an extended-mode document into a runnable Node program: global
//! variables and imports first, then each task in order, wrapped in the
//! selected boilerplate template.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use flowscript_core::expression;
use flowscript_core::step::VariablesStep;
use flowscript_core::{Document, DocumentSource, Limits, Platform, Task};

use crate::context::{GenContext, is_identifier};
use crate::error::{Error, Result};
use crate::generators::{ImportCodegen, VariablesCodegen, generate_block, generate_flow};
use crate::target::{AgentTarget, NamedAgent};
use crate::template::{self, ProgramContext, TemplateKind, Viewport};

/// Indentation of task code inside the template's `main`
const BODY_INDENT: usize = 2;

/// Options for the transpiler
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// Boilerplate template name
    pub template: String,

    /// Where to write the program, if anywhere
    pub output_path: Option<PathBuf>,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            template: TemplateKind::default().name().to_string(),
            output_path: None,
        }
    }
}

/// A generated program
#[derive(Debug, Clone, Serialize)]
pub struct TranspileOutput {
    /// Program source
    pub code: String,
    /// Degraded-generation warnings
    pub warnings: Vec<String>,
    /// Where the program was written
    pub output_path: Option<PathBuf>,
}

/// Document → program transpiler
pub struct Transpiler {
    options: TranspileOptions,
    limits: Limits,
    target: Box<dyn AgentTarget>,
}

impl Transpiler {
    /// Create a transpiler with default limits and an `agent` context object
    pub fn new(options: TranspileOptions) -> Self {
        Self {
            options,
            limits: Limits::default(),
            target: Box::new(NamedAgent::default()),
        }
    }

    /// Use configured limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Use a different execution context
    pub fn with_target(mut self, target: Box<dyn AgentTarget>) -> Self {
        self.target = target;
        self
    }

    /// Load a document and transpile it
    pub fn transpile(&self, source: DocumentSource) -> Result<TranspileOutput> {
        let document = Document::load(source, &self.limits)?;
        self.transpile_document(&document)
    }

    /// Transpile an already-loaded document
    pub fn transpile_document(&self, document: &Document) -> Result<TranspileOutput> {
        let kind = TemplateKind::parse(&self.options.template)?;

        let root = document.root_map().ok_or_else(|| Error::InvalidDocument {
            message: "root must be a mapping".to_string(),
        })?;
        if root.is_empty() {
            return Err(Error::InvalidDocument {
                message: "document is empty".to_string(),
            });
        }
        match document.tasks_value().and_then(Value::as_array) {
            Some(tasks) if !tasks.is_empty() => {}
            _ => return Err(Error::MissingTasks),
        }

        let source_name = document
            .path
            .as_ref()
            .map_or_else(|| "<inline>".to_string(), |p| p.display().to_string());
        tracing::info!("Transpiling {} with the {} template", source_name, kind.name());

        let mut ctx = GenContext::new(self.target.as_ref(), self.limits, BODY_INDENT);
        let web = Self::web_config(document, kind, &mut ctx);

        let mut body = String::new();
        if let Some(bindings) = document.variables() {
            body.push_str(&VariablesCodegen::generate(
                &VariablesStep {
                    bindings: Some(bindings),
                },
                "variables",
                &mut ctx,
            ));
        }
        body.push_str(&ImportCodegen::generate_top_level(document, &mut ctx));
        for task in document.tasks() {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&Self::generate_task(&task, &mut ctx));
        }

        let node_imports = ctx.imports().statements();
        let warnings = ctx.into_warnings();

        let context = ProgramContext {
            version: env!("CARGO_PKG_VERSION"),
            source_name,
            source_hash: source_hash(document),
            agent: self.target.handle().to_string(),
            url: web.and_then(|w| w.get("url")).map(|url| match url {
                Value::String(text) => expression::resolve(text),
                other => expression::resolve_value(other, 0),
            }),
            viewport: web.and_then(viewport),
            user_agent: web
                .and_then(|w| w.get("userAgent"))
                .and_then(Value::as_str)
                .map(expression::resolve),
            headless: web
                .and_then(|w| w.get("headless"))
                .and_then(Value::as_bool)
                .unwrap_or(true),
            node_imports,
            body: body.trim_end_matches('\n').to_string(),
        };
        let code = template::render(kind, &context)?;

        if let Some(path) = &self.options.output_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &code)?;
            tracing::info!("Wrote program: {}", path.display());
        }

        tracing::info!(
            "Generated {} bytes with {} warning(s)",
            code.len(),
            warnings.len()
        );

        Ok(TranspileOutput {
            code,
            warnings,
            output_path: self.options.output_path.clone(),
        })
    }

    /// The web configuration block; other platforms are not driven by a browser template
    fn web_config<'d>(
        document: &'d Document,
        kind: TemplateKind,
        ctx: &mut GenContext<'_>,
    ) -> Option<&'d Map<String, Value>> {
        let (platform, config) = document.platform()?;
        if platform != Platform::Web {
            ctx.warn(
                platform.key(),
                format!(
                    "the {} template drives a browser; '{}' configuration is ignored",
                    kind.name(),
                    platform.key()
                ),
            );
            return None;
        }
        config.as_object()
    }

    fn generate_task(task: &Task<'_>, ctx: &mut GenContext<'_>) -> String {
        let label = task
            .name
            .map_or_else(|| format!("tasks[{}]", task.index), |n| n.replace('\n', " "));
        let flow_path = task.flow_path();
        let flow = task.flow.unwrap_or_else(|| {
            ctx.warn(&flow_path, "task has no flow");
            &[]
        });

        let mut code = ctx.line(format!("// Task: {}", label));
        if task.continue_on_error {
            code.push_str(&ctx.hoist(&[flow]));
            code.push_str(&ctx.line("try {"));
            code.push_str(&generate_block(flow, &flow_path, ctx));
            code.push_str(&ctx.line("} catch (error) {"));
            let message = expression::escape_literal(&format!("Task '{}' failed:", label));
            code.push_str(&ctx.block(|ctx| ctx.line(format!("console.error({}, error);", message))));
            code.push_str(&ctx.line("}"));
        } else {
            code.push_str(&generate_flow(flow, &flow_path, ctx));
        }

        if let Some(output) = task.output {
            let location = format!("tasks[{}].output", task.index);
            if !is_identifier(output.variable) || !ctx.scope().is_declared(output.variable) {
                ctx.warn(
                    &location,
                    format!("'{}' is never bound; output skipped", output.variable),
                );
                code.push_str(&ctx.line(format!("// Skipped output: {}", output.path)));
            } else {
                ctx.imports_mut().path = true;
                let file = expression::resolve(output.path);
                code.push_str(&ctx.line(format!(
                    "fs.mkdirSync(path.dirname({}), {{ recursive: true }});",
                    file
                )));
                code.push_str(&ctx.line(format!(
                    "fs.writeFileSync({}, JSON.stringify({}, null, 2));",
                    file, output.variable
                )));
            }
        }
        code
    }
}

fn viewport(web: &Map<String, Value>) -> Option<Viewport> {
    Some(Viewport {
        width: web.get("viewportWidth")?.as_u64()?,
        height: web.get("viewportHeight")?.as_u64()?,
    })
}

/// SHA-256 of the document's canonical JSON form
pub fn source_hash(document: &Document) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(document.root.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Transpile with default limits and context
pub fn transpile(source: DocumentSource, options: TranspileOptions) -> Result<TranspileOutput> {
    Transpiler::new(options).transpile(source)
}
