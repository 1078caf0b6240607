//! Script documents
//!
//! A document is parsed once into a JSON value tree and read through
//! borrowed, lenient accessors afterwards. Accessors never fail: a missing or
//! mistyped field reads as `None`, and the validator reports it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::step::as_flow;

/// Where a document comes from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on disk; `.json` is parsed as JSON, anything else as YAML
    Path(PathBuf),
    /// Raw YAML (or JSON) text
    Text(String),
    /// An already-parsed tree
    Value(Value),
}

impl DocumentSource {
    /// Treat `input` as a path when it names an existing script file, else as text
    pub fn guess(input: &str) -> Self {
        let looks_like_path = !input.contains('\n')
            && [".yaml", ".yml", ".json"]
                .iter()
                .any(|ext| input.trim().ends_with(ext));
        if looks_like_path && Path::new(input.trim()).is_file() {
            Self::Path(PathBuf::from(input.trim()))
        } else {
            Self::Text(input.to_string())
        }
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Value> for DocumentSource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Declared or detected execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every step is an automation-engine primitive
    Native,
    /// Uses constructs that must be compiled first
    Extended,
}

impl Mode {
    /// Parse a declared mode, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" => Some(Self::Native),
            "extended" => Some(Self::Extended),
            _ => None,
        }
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Extended => "extended",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target platform named by the document's configuration block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Desktop or mobile web browser
    Web,
    /// Android device
    Android,
    /// iOS device
    Ios,
}

impl Platform {
    /// All platforms, in key order
    pub const ALL: [Platform; 3] = [Platform::Web, Platform::Android, Platform::Ios];

    /// Root key for this platform
    pub fn key(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// Platform for a root key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    /// Configuration fields the automation engine understands for this platform
    pub fn known_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Web => &[
                "url",
                "serve",
                "userAgent",
                "viewportWidth",
                "viewportHeight",
                "deviceScaleFactor",
                "cookie",
                "waitForNetworkIdle",
                "acceptInsecureCerts",
                "bridgeMode",
                "closeNewTabsAfterDisconnect",
                "forceSameTabNavigation",
                "chromeArgs",
                "headless",
                "cache",
                "cacheId",
                "output",
                "unstableLogContent",
                "aiActionContext",
            ],
            Self::Android => &[
                "deviceId",
                "launch",
                "androidAdbPath",
                "remoteAdbHost",
                "remoteAdbPort",
                "imeStrategy",
                "cache",
                "cacheId",
                "output",
                "unstableLogContent",
                "aiActionContext",
            ],
            Self::Ios => &[
                "wdaPort",
                "wdaHost",
                "launch",
                "autoDismissKeyboard",
                "cache",
                "cacheId",
                "output",
                "unstableLogContent",
                "aiActionContext",
            ],
        }
    }
}

/// A parsed document plus where it came from
#[derive(Debug, Clone)]
pub struct Document {
    /// Parsed tree
    pub root: Value,

    /// File the document was read from, if any
    pub path: Option<PathBuf>,

    /// Directory relative imports resolve against
    pub base_dir: PathBuf,
}

/// Read-only view of one task
#[derive(Debug, Clone, Copy)]
pub struct Task<'a> {
    /// Position in the `tasks` list
    pub index: usize,
    /// Task name, if it is a non-empty string
    pub name: Option<&'a str>,
    /// Task flow, if present and well formed
    pub flow: Option<&'a [Value]>,
    /// Whether a failure in this task lets later tasks run
    pub continue_on_error: bool,
    /// Output persistence directive
    pub output: Option<TaskOutput<'a>>,
    /// The raw task value
    pub raw: &'a Value,
}

/// Where a task persists one of its variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutput<'a> {
    /// Variable to persist
    pub variable: &'a str,
    /// Destination file
    pub path: &'a str,
}

impl Task<'_> {
    /// Walker path prefix for this task's flow
    pub fn flow_path(&self) -> String {
        format!("tasks[{}].flow", self.index)
    }
}

impl Document {
    /// Wrap an already-parsed tree
    pub fn from_value(root: Value) -> Self {
        Self {
            root,
            path: None,
            base_dir: PathBuf::from("."),
        }
    }

    /// Parse YAML (or JSON) text
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(Self::from_value(parse_text(text)?))
    }

    /// Read and parse a document from disk, enforcing the size bound
    pub fn from_path(path: impl AsRef<Path>, limits: &Limits) -> Result<Self> {
        let path = path.as_ref();
        let root = read_path(path, limits)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Ok(Self {
            root,
            path: Some(path.to_path_buf()),
            base_dir,
        })
    }

    /// Load a document from any source
    pub fn load(source: DocumentSource, limits: &Limits) -> Result<Self> {
        match source {
            DocumentSource::Path(path) => Self::from_path(path, limits),
            DocumentSource::Text(text) => Self::from_text(&text),
            DocumentSource::Value(value) => Ok(Self::from_value(value)),
        }
    }

    /// Override the import base directory
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Root mapping, if the root is a mapping
    pub fn root_map(&self) -> Option<&Map<String, Value>> {
        self.root.as_object()
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.root_map().and_then(|m| m.get(key))
    }

    /// Raw declared `mode` value
    pub fn declared_mode(&self) -> Option<&str> {
        self.field("mode").and_then(Value::as_str)
    }

    /// Declared feature names
    pub fn declared_features(&self) -> Option<Vec<&str>> {
        self.field("features")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    /// Platform keys present at the root
    pub fn platforms(&self) -> Vec<(Platform, &Value)> {
        Platform::ALL
            .into_iter()
            .filter_map(|p| self.field(p.key()).map(|v| (p, v)))
            .collect()
    }

    /// The platform block, when exactly one is present
    pub fn platform(&self) -> Option<(Platform, &Value)> {
        let found = self.platforms();
        if found.len() == 1 { found.into_iter().next() } else { None }
    }

    /// Global variable bindings
    pub fn variables(&self) -> Option<&Map<String, Value>> {
        self.field("variables").and_then(Value::as_object)
    }

    /// Raw top-level import entries
    pub fn imports(&self) -> &[Value] {
        self.field("imports")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Raw `tasks` value
    pub fn tasks_value(&self) -> Option<&Value> {
        self.field("tasks")
    }

    /// Task views, skipping entries that are not mappings
    pub fn tasks(&self) -> Vec<Task<'_>> {
        let Some(items) = self.tasks_value().and_then(Value::as_array) else {
            return Vec::new();
        };

        items
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                let map = raw.as_object()?;
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.trim().is_empty());
                let flow = map.get("flow").and_then(as_flow);
                let continue_on_error = map
                    .get("continueOnError")
                    .or_else(|| map.get("continue_on_error"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let output = map.get("output").and_then(|o| {
                    let variable = o.get("variable").and_then(Value::as_str)?;
                    let path = o.get("path").and_then(Value::as_str)?;
                    Some(TaskOutput { variable, path })
                });
                Some(Task {
                    index,
                    name,
                    flow,
                    continue_on_error,
                    output,
                    raw,
                })
            })
            .collect()
    }

    /// Resolve a path relative to the document's base directory
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base_dir.join(candidate)
        }
    }
}

/// Parse YAML (or JSON) text into a value tree
///
/// Non-string mapping keys are stringified.
pub fn parse_text(text: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    Ok(serde_json::to_value(yaml)?)
}

/// Read a document from disk, enforcing the size bound
pub fn read_path(path: &Path, limits: &Limits) -> Result<Value> {
    let size = std::fs::metadata(path)?.len();
    if size > limits.max_document_bytes {
        return Err(Error::DocumentTooLarge {
            path: path.display().to_string(),
            size,
            limit: limits.max_document_bytes,
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&contents)?)
    } else {
        parse_text(&contents)
    }
}
