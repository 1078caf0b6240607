//! Program boilerplate templates
//!
//! The generated body is dropped into a minijinja template that sets up the
//! browser, the agent, and the helpers every program relies on (`sleep`,
//! `__runSubFlow`).

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::error::{Error, Result};

/// Built-in program templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateKind {
    /// Puppeteer launcher (default)
    #[default]
    Puppeteer,
    /// Playwright launcher
    Playwright,
}

impl TemplateKind {
    /// Every template, in display order
    pub const ALL: [TemplateKind; 2] = [TemplateKind::Puppeteer, TemplateKind::Playwright];

    /// Selector name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Puppeteer => "puppeteer",
            Self::Playwright => "playwright",
        }
    }

    /// Look up a template by selector name
    pub fn parse(name: &str) -> Result<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| Error::UnsupportedTemplate {
                name: name.to_string(),
                available: Self::ALL.map(|k| k.name()).join(", "),
            })
    }

    fn file_name(&self) -> &'static str {
        match self {
            Self::Puppeteer => "puppeteer.mjs.j2",
            Self::Playwright => "playwright.mjs.j2",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::Puppeteer => include_str!("../templates/puppeteer.mjs.j2"),
            Self::Playwright => include_str!("../templates/playwright.mjs.j2"),
        }
    }
}

/// Browser viewport size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u64,
    /// Height in CSS pixels
    pub height: u64,
}

/// Values a template renders
#[derive(Debug, Clone, Serialize)]
pub struct ProgramContext {
    /// Generator version
    pub version: &'static str,
    /// Where the document came from
    pub source_name: String,
    /// SHA-256 of the canonical document
    pub source_hash: String,
    /// Agent variable name
    pub agent: String,
    /// Start URL as a JavaScript expression
    pub url: Option<String>,
    /// Viewport, when both dimensions are configured
    pub viewport: Option<Viewport>,
    /// User agent as a JavaScript expression
    pub user_agent: Option<String>,
    /// Launch without a visible window
    pub headless: bool,
    /// Node built-in import statements
    pub node_imports: Vec<String>,
    /// Generated task code
    pub body: String,
}

/// Render the full program
pub fn render(kind: TemplateKind, context: &ProgramContext) -> Result<String> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template(kind.file_name(), kind.source())?;

    let template = env.get_template(kind.file_name())?;
    Ok(template.render(context)?)
}
