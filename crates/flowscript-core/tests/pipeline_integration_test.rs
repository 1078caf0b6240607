//! Integration tests for detection and validation over real files
//!
//! Tests use temporary directories with script fixtures to verify:
//! - Mode detection on native and extended scripts
//! - Validation across all four levels in one pass
//! - Import graphs on disk (missing targets, cycles)
//! - Project configuration driving the validator

use std::path::PathBuf;
use tempfile::TempDir;
use flowscript_core::{
    Config, DiagnosticKind, DocumentSource, Feature, Limits, Mode, Validator, detect, validate,
};

/// Helper to create a temporary project directory with a `flows/` folder.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("flows")).unwrap();
    dir
}

fn write(dir: &TempDir, relative: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(relative);
    std::fs::write(&path, contents).unwrap();
    path
}

// =============================================================================
// Detection
// =============================================================================

#[test]
fn test_native_script_from_disk() {
    let dir = setup_project();
    let path = write(
        &dir,
        "flows/search.yaml",
        r#"
web:
  url: https://example.com
tasks:
  - name: search
    flow:
      - aiInput: headphones
        locate: search box
      - aiTap: search button
      - aiAssert: results are shown
"#,
    );

    let detection = detect(DocumentSource::Path(path.clone()), &Limits::default());
    assert_eq!(detection.mode, Mode::Native);
    assert!(!detection.needs_code_gen);

    let report = validate(DocumentSource::Path(path));
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_extended_script_features() {
    let dir = setup_project();
    let path = write(
        &dir,
        "flows/checkout.yaml",
        r#"
web:
  url: https://shop.example.com
variables:
  maxItems: 3
tasks:
  - name: checkout
    flow:
      - aiQuery: "cart items as {name: string, price: number}[]"
        name: items
      - data_transform:
          source: ${items}
          operation: sort
          by: price
          order: desc
          name: sorted
      - loop:
          type: for
          items: ${sorted}
          itemVar: product
          flow:
            - logic:
                if: "${product.name} is in stock"
                then:
                  - aiTap: "add ${product.name} to cart"
      - try:
          - aiTap: checkout
        catch:
          - logScreenshot: checkout failed
"#,
    );

    let detection = detect(DocumentSource::Path(path.clone()), &Limits::default());
    assert_eq!(detection.mode, Mode::Extended);
    assert!(detection.needs_code_gen);
    assert_eq!(
        detection.features,
        vec![
            Feature::Logic,
            Feature::Loop,
            Feature::Variables,
            Feature::DataTransform,
            Feature::TryCatch
        ]
    );

    let report = validate(DocumentSource::Path(path));
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

// =============================================================================
// Validation in one pass
// =============================================================================

#[test]
fn test_all_levels_report_together() {
    let report = validate(DocumentSource::Text(
        r#"
web:
  url: https://example.com
  colour: blue
tasks:
  - name: broken
    flow:
      - try:
          - aiTap: x
      - aiTap: "${nobody}"
  - name: broken
    flow: []
"#
        .to_string(),
    ));

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, DiagnosticKind::Construct);
    assert_eq!(report.errors[0].location, "tasks[0].flow[0].try");

    assert_eq!(report.of_kind(DiagnosticKind::Structure).count(), 2);
    assert_eq!(report.of_kind(DiagnosticKind::Reference).count(), 1);
}

// =============================================================================
// Import graph
// =============================================================================

#[test]
fn test_self_import_is_invalid() {
    let dir = setup_project();
    let path = write(
        &dir,
        "flows/loop.yaml",
        r#"
web:
  url: https://example.com
tasks:
  - name: again
    flow:
      - use: ./loop.yaml
"#,
    );

    let report = validate(DocumentSource::Path(path));
    assert!(!report.valid);
    assert_eq!(report.of_kind(DiagnosticKind::ImportCycle).count(), 1);
}

#[test]
fn test_import_chain_without_cycle() {
    let dir = setup_project();
    write(
        &dir,
        "flows/login.yaml",
        r#"
web:
  url: https://example.com
tasks:
  - name: login
    flow:
      - aiInput: ${ENV:USERNAME}
        locate: username
"#,
    );
    write(&dir, "flows/users.json", r#"[{"name": "ann"}]"#);
    let main = write(
        &dir,
        "flows/main.yaml",
        r#"
web:
  url: https://example.com
imports:
  - { path: ./users.json, as: users }
  - ./login.yaml
tasks:
  - name: main
    flow:
      - use: ${login}
      - loop:
          type: for
          items: ${users}
          flow:
            - aiTap: "${item.name}"
"#,
    );

    let report = validate(DocumentSource::Path(main));
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_limits_reach_validator() {
    let dir = setup_project();
    write(
        &dir,
        "flowscript.yaml",
        r#"
template: playwright
limits:
  max_repeat_count: 5
"#,
    );
    let config = Config::load(dir.path().join("flowscript.yaml")).unwrap();
    let validator = Validator::from_config(&config);

    let report = validator.validate(DocumentSource::Text(
        r#"
web:
  url: https://example.com
tasks:
  - name: spin
    flow:
      - loop:
          type: repeat
          count: 6
          flow:
            - aiTap: next
"#
        .to_string(),
    ));
    assert!(report.valid);
    assert_eq!(report.of_kind(DiagnosticKind::Safety).count(), 1);
}
