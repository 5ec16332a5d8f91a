//! Compile-time error surface: every failure is a structured value with a
//! kind, message, and source position.

use weft::{Engine, ErrorKind, FileId, MemLoader, Value, parse, tokenize};

/// Helper to extract the error kind from a failed parse.
fn parse_err(src: &str) -> ErrorKind {
    let tokens = tokenize(src, FileId(0)).expect("source should lex");
    parse(&tokens).expect_err("expected a parse error").kind
}

#[test]
fn stray_symbol_is_unexpected() {
    assert_eq!(parse_err("= div"), ErrorKind::UnexpectedToken);
}

#[test]
fn unclosed_child_block_reports_expected_token() {
    assert_eq!(parse_err("div [ p 'x'"), ErrorKind::ExpectedToken);
}

#[test]
fn element_without_body_or_terminator_is_rejected() {
    assert_eq!(parse_err("div"), ErrorKind::UnexpectedToken);
}

#[test]
fn condition_without_comparison_is_rejected() {
    assert_eq!(parse_err("if (a) [ p; ]"), ErrorKind::ExpectedComparison);
}

#[test]
fn attribute_value_must_be_string_or_braced() {
    assert_eq!(parse_err("div a=1 ;"), ErrorKind::UnexpectedToken);
}

#[test]
fn unknown_controller_is_rejected_at_parse_time() {
    assert_eq!(parse_err("div controller={Nope} [ p; ]"), ErrorKind::UnknownController);
}

#[test]
fn controller_import_is_unsupported() {
    assert_eq!(
        parse_err("module m --> x\n<-- div controller='ctrl.weft' [ p; ]"),
        ErrorKind::ControllerImport
    );
}

#[test]
fn module_dependencies_must_be_declared_first() {
    assert_eq!(parse_err("module a [missing] --> x\n<--"), ErrorKind::UnknownModule);
}

#[test]
fn export_of_unknown_name_fails() {
    assert_eq!(parse_err("export Nope"), ErrorKind::UnknownExport);
}

#[test]
fn export_of_tag_and_module_with_same_name_is_ambiguous() {
    assert_eq!(
        parse_err("tag X [ div; ] module X --> b\n<-- export X"),
        ErrorKind::AmbiguousExport
    );
}

#[test]
fn errors_carry_source_positions() {
    let src = "div [\n  p 'x'\n  =\n]";
    let tokens = tokenize(src, FileId(0)).expect("source should lex");
    let err = parse(&tokens).expect_err("expected a parse error");
    assert_eq!(&src[err.pos..=err.pos], "=");
}

#[test]
fn report_renders_excerpt_with_caret() {
    let mut engine = Engine::with_loader(MemLoader::new().with("bad.weft", "div [\n  ='x'\n]"));
    let err = engine
        .try_render("bad.weft", Value::Null)
        .expect_err("expected a parse error");
    let report = engine.report(&err);
    assert!(report.starts_with("Error: bad.weft\n"), "got: {report}");
    assert!(report.contains("2|   ='x'"), "excerpt should show the line: {report}");
    assert!(report.lines().last().is_some_and(|l| l.trim_end().ends_with('^')));
}

#[test]
fn lex_errors_surface_through_the_engine() {
    let mut engine = Engine::with_loader(MemLoader::new().with("bad.weft", "p 'unterminated"));
    let err = engine
        .try_render("bad.weft", Value::Null)
        .expect_err("expected a lex error");
    assert_eq!(err.kind, ErrorKind::UnterminatedString);
}
