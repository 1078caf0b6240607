//! Integration tests for the complete transpile pipeline
//!
//! Tests feed real YAML scripts through detection, validation and
//! generation to verify:
//! - Generated control flow for each extended construct
//! - Declaration hoisting across concurrent branches
//! - Safety diagnostics next to the code they describe
//! - Writing programs to disk

use flowscript_codegen::{Error, TranspileOptions, TranspileOutput, Transpiler, transpile};
use flowscript_core::{DiagnosticKind, DocumentSource, Feature, Limits, Mode, detect, validate};
use tempfile::TempDir;

fn source(yaml: &str) -> DocumentSource {
    DocumentSource::Text(yaml.to_string())
}

fn generate(yaml: &str) -> TranspileOutput {
    transpile(source(yaml), TranspileOptions::default()).unwrap()
}

// =============================================================================
// Constructs
// =============================================================================

#[test]
fn test_conditional_script() {
    let yaml = r#"
web:
  url: https://shop.example
tasks:
  - name: checkout
    flow:
      - logic:
          if: the cart is empty
          then:
            - aiTap: continue shopping
          else:
            - aiTap: checkout
"#;
    let detection = detect(source(yaml), &Limits::default());
    assert_eq!(detection.mode, Mode::Extended);
    assert!(detection.uses(Feature::Logic));

    let output = generate(yaml);
    assert!(output.code.contains(
        "    if (await agent.aiBoolean(\"the cart is empty\")) {\n      await agent.aiTap(\"continue shopping\");\n    } else {\n      await agent.aiTap(\"checkout\");\n    }\n"
    ));
}

#[test]
fn test_zero_repeat_is_flagged_but_still_emitted() {
    let yaml = r#"
web:
  url: https://shop.example
tasks:
  - name: nothing
    flow:
      - loop:
          type: repeat
          count: 0
          flow:
            - aiTap: next
"#;
    let report = validate(source(yaml));
    assert!(report.valid);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == DiagnosticKind::Construct && w.message.contains("repeat count"))
    );

    let output = generate(yaml);
    assert!(output.code.contains("for (let i = 0; i < 0; i++) {"));
}

#[test]
fn test_sibling_while_loops() {
    let yaml = r#"
web:
  url: https://shop.example
tasks:
  - name: paginate
    flow:
      - loop:
          type: while
          condition: there is a next page
          flow:
            - aiTap: next page
      - loop:
          type: while
          condition: a popup is visible
          maxIterations: 3
          flow:
            - aiTap: close popup
"#;
    let output = generate(yaml);
    assert!(output.code.contains(
        "while (__whileCounter++ < 100 && await agent.aiBoolean(\"there is a next page\")) {"
    ));
    assert!(output.code.contains(
        "while (__whileCounter1++ < 3 && await agent.aiBoolean(\"a popup is visible\")) {"
    ));
}

#[test]
fn test_shell_marker_is_safety_warning_and_template_literal() {
    let yaml = r#"
web:
  url: https://shop.example
variables:
  dir: reports
tasks:
  - name: archive
    flow:
      - external_call:
          type: shell
          command: "tar czf out.tgz ${dir}"
          name: archived
"#;
    let report = validate(source(yaml));
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == DiagnosticKind::Safety)
    );

    let output = generate(yaml);
    assert!(output.code.contains("import { execSync } from 'node:child_process';"));
    assert!(
        output
            .code
            .contains("let archived = execSync(`tar czf out.tgz ${dir}`, { encoding: 'utf-8' });")
    );
}

#[test]
fn test_parallel_branches_hoist_once() {
    let yaml = r#"
web:
  url: https://shop.example
tasks:
  - name: compare
    flow:
      - parallel:
          merge_results: true
          name: quotes
          branches:
            - - aiQuery: price on the left panel
                name: left
            - - aiQuery: price on the right panel
                name: right
      - aiAssert: "${left} <= ${right}"
"#;
    let output = generate(yaml);
    let code = &output.code;

    let group_start = code.find("Promise.allSettled").unwrap();
    let group_end = code.find("__settled.map").unwrap();
    let group = &code[group_start..group_end];
    assert!(!group.contains("let "));

    assert_eq!(code.matches("    let left;\n").count(), 1);
    assert_eq!(code.matches("    let right;\n").count(), 1);
    assert!(group.contains("left = await agent.aiQuery(\"price on the left panel\");"));
    assert!(group.contains("return right;"));
    assert!(code.contains("let quotes = __settled.map((r) => r.value);"));
    assert!(code.contains("await agent.aiAssert(`${left} <= ${right}`);"));
}

#[test]
fn test_data_pipeline_with_output() {
    let yaml = r#"
web:
  url: https://shop.example
tasks:
  - name: cheapest
    flow:
      - aiQuery: "products as {name: string, price: number}[]"
        name: products
      - data_transform:
          source: ${products}
          name: cheapest
          operations:
            - filter:
                condition: item.price > 0
            - sort:
                by: price
            - slice:
                end: 3
    output:
      variable: cheapest
      path: out/cheapest.json
"#;
    let output = generate(yaml);
    assert!(output.warnings.is_empty());
    assert!(output.code.contains("let cheapest = ([...(((products ?? [])).filter((item) => item.price > 0))].sort("));
    assert!(output.code.contains(".slice(0, 3);"));
    assert!(output.code.contains("fs.writeFileSync(\"out/cheapest.json\", JSON.stringify(cheapest, null, 2));"));
}

// =============================================================================
// Options and output
// =============================================================================

#[test]
fn test_writes_program_creating_directories() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("build/generated/login.mjs");
    let options = TranspileOptions {
        template: "playwright".to_string(),
        output_path: Some(out.clone()),
    };

    let output = transpile(
        source("web:\n  url: https://example.com\ntasks:\n  - name: t\n    flow:\n      - aiTap: login\n"),
        options,
    )
    .unwrap();

    assert_eq!(output.output_path.as_deref(), Some(out.as_path()));
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, output.code);
    assert!(written.contains("import { chromium } from 'playwright';"));
}

#[test]
fn test_from_disk_records_source_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("search.yaml");
    std::fs::write(
        &path,
        "web:\n  url: https://example.com\ntasks:\n  - name: t\n    flow:\n      - aiTap: search\n",
    )
    .unwrap();

    let output = Transpiler::new(TranspileOptions::default())
        .with_limits(Limits::default())
        .transpile(DocumentSource::Path(path.clone()))
        .unwrap();
    assert!(output.code.contains(&format!("from {}\n", path.display())));
}

#[test]
fn test_oversized_document_is_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.yaml");
    std::fs::write(&path, "tasks: []\n".repeat(20)).unwrap();

    let limits = Limits {
        max_document_bytes: 16,
        ..Limits::default()
    };
    let err = Transpiler::new(TranspileOptions::default())
        .with_limits(limits)
        .transpile(DocumentSource::Path(path))
        .unwrap_err();
    assert!(matches!(err, Error::Load(_)));
}
