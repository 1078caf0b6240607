//! Mode detection
//!
//! A single pass over the whole tree records every extended-only keyword
//! and every `${...}` marker, then decides whether the document can run as
//! is or needs compiling. Detection never fails: unreadable input degrades
//! to a native result.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::config::Limits;
use crate::document::{Document, DocumentSource, Mode};
use crate::expression;

/// Category of extended-only construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Conditionals
    Logic,
    /// Loops
    Loop,
    /// Variables and expression markers
    Variables,
    /// Imports and sub-flow invocation
    Import,
    /// Collection pipelines
    DataTransform,
    /// Exception handling
    TryCatch,
    /// HTTP and shell calls
    ExternalCall,
    /// Concurrent branches
    Parallel,
}

impl Feature {
    /// All features in canonical order
    pub const ALL: [Feature; 8] = [
        Feature::Logic,
        Feature::Loop,
        Feature::Variables,
        Feature::Import,
        Feature::DataTransform,
        Feature::TryCatch,
        Feature::ExternalCall,
        Feature::Parallel,
    ];

    /// Canonical tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logic => "logic",
            Self::Loop => "loop",
            Self::Variables => "variables",
            Self::Import => "import",
            Self::DataTransform => "data_transform",
            Self::TryCatch => "try_catch",
            Self::ExternalCall => "external_call",
            Self::Parallel => "parallel",
        }
    }

    /// Parse a canonical tag
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == tag)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature implied by an extended-only mapping key
pub fn feature_for_key(key: &str) -> Option<Feature> {
    match key {
        "variables" => Some(Feature::Variables),
        "logic" | "if" | "then" | "else" => Some(Feature::Logic),
        "loop" | "for" | "while" | "repeat" => Some(Feature::Loop),
        "try" | "catch" | "finally" => Some(Feature::TryCatch),
        "external_call" => Some(Feature::ExternalCall),
        "data_transform" => Some(Feature::DataTransform),
        "import" | "imports" | "use" => Some(Feature::Import),
        "parallel" => Some(Feature::Parallel),
        _ => None,
    }
}

/// Result of mode detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Effective mode
    pub mode: Mode,
    /// Features used, in canonical order
    pub features: Vec<Feature>,
    /// Whether the document must be compiled before running
    pub needs_code_gen: bool,
    /// Advisory messages
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Detection {
    fn native() -> Self {
        Self {
            mode: Mode::Native,
            features: Vec::new(),
            needs_code_gen: false,
            warnings: Vec::new(),
        }
    }

    /// Whether `feature` is in use
    pub fn uses(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

/// Detect the mode of a document from any source
pub fn detect(source: DocumentSource, limits: &Limits) -> Detection {
    match Document::load(source, limits) {
        Ok(document) => detect_document(&document),
        Err(e) => {
            tracing::debug!("Detection fell back to native: {}", e);
            Detection::native()
        }
    }
}

/// Detect the mode of a parsed document
pub fn detect_document(document: &Document) -> Detection {
    let Some(root) = document.root_map() else {
        return Detection::native();
    };

    let features = used_features(&document.root);
    let mut warnings = Vec::new();

    let declared = match root.get("mode") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let parsed = value.as_str().and_then(Mode::parse);
            if parsed.is_none() {
                warnings.push(format!(
                    "unrecognized mode {}; expected 'native' or 'extended', detecting from features instead",
                    value
                ));
            }
            parsed
        }
    };

    let mode = declared.unwrap_or(if features.is_empty() {
        Mode::Native
    } else {
        Mode::Extended
    });

    Detection {
        mode,
        needs_code_gen: mode == Mode::Extended,
        features: features.into_iter().collect(),
        warnings,
    }
}

/// Features used anywhere in a value tree
pub fn used_features(root: &Value) -> BTreeSet<Feature> {
    let mut features = BTreeSet::new();
    scan(root, &mut features);
    features
}

fn scan(value: &Value, features: &mut BTreeSet<Feature>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if let Some(feature) = feature_for_key(key) {
                    features.insert(feature);
                }
                scan(child, features);
            }
        }
        Value::Array(items) => {
            for item in items {
                scan(item, features);
            }
        }
        Value::String(text) => {
            if expression::has_unresolved_markers(text) {
                features.insert(Feature::Variables);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn detect_json(value: Value) -> Detection {
        detect(DocumentSource::Value(value), &Limits::default())
    }

    #[test]
    fn test_native_document() {
        let result = detect_json(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [{"aiTap": "btn"}]}]
        }));
        assert_eq!(result.mode, Mode::Native);
        assert!(result.features.is_empty());
        assert!(!result.needs_code_gen);
    }

    #[test]
    fn test_logic_is_extended() {
        let result = detect_json(json!({
            "web": {"url": "https://x"},
            "tasks": [{"name": "t", "flow": [
                {"logic": {"if": "x", "then": [{"aiTap": "a"}], "else": [{"aiTap": "b"}]}}
            ]}]
        }));
        assert_eq!(result.mode, Mode::Extended);
        assert!(result.uses(Feature::Logic));
        assert!(result.needs_code_gen);
    }

    #[rstest]
    #[case(json!({"try": [], "catch": []}), Feature::TryCatch)]
    #[case(json!({"finally": []}), Feature::TryCatch)]
    #[case(json!({"use": "./a.yaml"}), Feature::Import)]
    #[case(json!({"import": "./a.json"}), Feature::Import)]
    #[case(json!({"loop": {"type": "while"}}), Feature::Loop)]
    #[case(json!({"parallel": []}), Feature::Parallel)]
    #[case(json!({"data_transform": {}}), Feature::DataTransform)]
    #[case(json!({"external_call": {}}), Feature::ExternalCall)]
    #[case(json!({"aiTap": "${target}"}), Feature::Variables)]
    fn test_keys_collapse_to_features(#[case] step: Value, #[case] expected: Feature) {
        let result = detect_json(json!({"web": {}, "tasks": [{"name": "t", "flow": [step]}]}));
        assert_eq!(result.features, vec![expected]);
    }

    #[test]
    fn test_env_markers_stay_native() {
        let result = detect_json(json!({
            "web": {"url": "${ENV.BASE_URL}/login"},
            "tasks": [{"name": "t", "flow": [{"aiInput": "${ENV:PASSWORD}", "locate": "pw"}]}]
        }));
        assert_eq!(result.mode, Mode::Native);
        assert!(result.features.is_empty());
    }

    #[test]
    fn test_forced_native_never_needs_codegen() {
        let result = detect_json(json!({
            "mode": "native",
            "web": {},
            "tasks": [{"name": "t", "flow": [{"loop": {"type": "repeat", "count": 2, "flow": []}}]}]
        }));
        assert_eq!(result.mode, Mode::Native);
        assert!(!result.needs_code_gen);
        assert!(result.uses(Feature::Loop));
    }

    #[test]
    fn test_forced_extended() {
        let result = detect_json(json!({"mode": "extended", "web": {}, "tasks": []}));
        assert_eq!(result.mode, Mode::Extended);
        assert!(result.needs_code_gen);
    }

    #[test]
    fn test_unknown_mode_warns_and_falls_back() {
        let result = detect_json(json!({
            "mode": "turbo",
            "web": {},
            "tasks": [{"name": "t", "flow": [{"variables": {"a": 1}}]}]
        }));
        assert_eq!(result.mode, Mode::Extended);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("turbo"));
    }

    #[test]
    fn test_unparseable_input_degrades() {
        let result = detect(
            DocumentSource::Text("tasks: [unclosed".to_string()),
            &Limits::default(),
        );
        assert_eq!(result, Detection::native());

        let result = detect_json(json!(["not", "an", "object"]));
        assert_eq!(result, Detection::native());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let doc = json!({
            "web": {},
            "tasks": [{"name": "t", "flow": [
                {"parallel": [[{"variables": {"a": "${b}"}}]]},
                {"try": [], "finally": []}
            ]}]
        });
        let first = detect_json(doc.clone());
        let second = detect_json(doc);
        assert_eq!(first.mode, second.mode);
        assert_eq!(first.features, second.features);
        assert_eq!(
            first.features,
            vec![Feature::Variables, Feature::TryCatch, Feature::Parallel]
        );
    }
}
