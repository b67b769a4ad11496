//! Integration test: end-to-end scenarios through the facade.
//!
//! Each scenario lints the input, formats it, and lints the formatted result
//! again to check that nothing fixable is left.

use kolint::rules::{BinaryExpressionWrapping, ChainMethodContinuation, CommentWrapping, FinalNewline};
use kolint::{format_code, lint_code, standard_engine, RuleEngine, Settings};

fn engine_with<R: kolint::Rule + 'static>(rule: R) -> RuleEngine {
    RuleEngine::builder().rule(rule).build().expect("engine should build")
}

fn rendered(engine: &RuleEngine, code: &str, settings: &Settings) -> Vec<String> {
    lint_code(code, settings, engine)
        .expect("code should parse")
        .violations
        .iter()
        .map(ToString::to_string)
        .collect()
}

// ── Scenario 1: assignment break resolves the operator overflow ──

const ASSIGNMENT: &str = "val bar = leftHandSideExpression && rightHandSideExpression\n";

#[test]
fn scenario_1_lint_reports_assignment_and_operator() {
    let settings = Settings::new().with_max_line_length(55);
    let engine = engine_with(BinaryExpressionWrapping::new());
    assert_eq!(
        rendered(&engine, ASSIGNMENT, &settings),
        vec![
            "1:11: Line is exceeding max line length. Break line between assignment and expression (standard:binary-expression-wrapping)",
            "1:36: Line is exceeding max line length. Break line after '&&' in binary expression (standard:binary-expression-wrapping)",
        ]
    );
}

#[test]
fn scenario_1_format_breaks_only_after_assignment() {
    let settings = Settings::new().with_max_line_length(55);
    let engine = engine_with(BinaryExpressionWrapping::new());
    let formatted = format_code(ASSIGNMENT, &settings, &engine).expect("format should converge");
    assert_eq!(
        formatted.code,
        "val bar =\n    leftHandSideExpression && rightHandSideExpression\n"
    );
    assert!(formatted.outcome.remaining.is_empty());
    assert!(rendered(&engine, &formatted.code, &settings).is_empty());
}

#[test]
fn scenario_1_with_standard_rules() {
    let settings = Settings::new().with_max_line_length(55);
    let engine = standard_engine(&settings).expect("engine should build");
    let formatted = format_code(ASSIGNMENT, &settings, &engine).expect("format should converge");
    assert_eq!(
        formatted.code,
        "val bar =\n    leftHandSideExpression && rightHandSideExpression\n"
    );
    assert!(formatted.outcome.remaining.is_empty());
}

// ── Scenario 2: chain operators move to the start of the line ──

#[test]
fn scenario_2_chain_operators_lead_their_line() {
    let settings = Settings::new();
    let engine = engine_with(ChainMethodContinuation::new());
    let formatted = format_code("a.\n  b().\n  c()\n", &settings, &engine).expect("format should converge");
    insta::assert_snapshot!(formatted.code, @r###"
    a
        .b()
        .c()
    "###);
}

#[test]
fn scenario_2_with_standard_rules() {
    let settings = Settings::new();
    let engine = standard_engine(&settings).expect("engine should build");
    let formatted = format_code("a.\n  b().\n  c()\n", &settings, &engine).expect("format should converge");
    assert_eq!(formatted.code, "a\n    .b()\n    .c()\n");
}

// ── Scenario 3: exactly one final newline ──

#[test]
fn scenario_3_missing_final_newline() {
    let settings = Settings::new().with_insert_final_newline(true);
    let engine = engine_with(FinalNewline::new());
    let code = "fun name() {\n}";
    assert_eq!(
        rendered(&engine, code, &settings),
        vec!["2:2: File must end with a newline (\\n) (standard:final-newline)"]
    );
    let formatted = format_code(code, &settings, &engine).expect("format should converge");
    assert_eq!(formatted.code, "fun name() {\n}\n");
    assert_eq!(formatted.outcome.corrected.len(), 1);
}

#[test]
fn scenario_3_with_standard_rules() {
    let settings = Settings::new();
    let engine = standard_engine(&settings).expect("engine should build");
    let outcome = lint_code("fun name() {\n}", &settings, &engine).expect("code should parse");
    assert_eq!(outcome.violations.len(), 1);
    let formatted = format_code("fun name() {\n}", &settings, &engine).expect("format should converge");
    assert_eq!(formatted.code, "fun name() {\n}\n");
}

// ── Scenario 4: code after a block comment ──

#[test]
fn scenario_4_code_after_block_comment() {
    let settings = Settings::new();
    let engine = engine_with(CommentWrapping::new());
    let code = "fun f() {\n    /* some comment */ val x = 1\n}\n";
    assert_eq!(
        rendered(&engine, code, &settings),
        vec!["2:24: A block comment may not be followed by any other element on that same line (standard:comment-wrapping)"]
    );
    let formatted = format_code(code, &settings, &engine).expect("format should converge");
    insta::assert_snapshot!(formatted.code, @r###"
    fun f() {
        /* some comment */
        val x = 1
    }
    "###);
}

// ── Byte order mark and line separators ──

#[test]
fn crlf_and_bom_survive_formatting() {
    let settings = Settings::new();
    let engine = standard_engine(&settings).expect("engine should build");
    let formatted =
        format_code("\u{feff}val a = 1  \r\nval b = 2", &settings, &engine).expect("format should converge");
    assert_eq!(formatted.code, "\u{feff}val a = 1\r\nval b = 2\r\n");
    assert!(formatted.changed);
}

#[test]
fn crlf_does_not_shift_columns() {
    let settings = Settings::new();
    let engine = standard_engine(&settings).expect("engine should build");
    let outcome = lint_code("val a = 1\r\nval b = 2  \r\n", &settings, &engine).expect("code should parse");
    let positions: Vec<(usize, usize)> = outcome.violations.iter().map(|v| (v.line, v.column)).collect();
    assert_eq!(positions, vec![(2, 10)]);
}
