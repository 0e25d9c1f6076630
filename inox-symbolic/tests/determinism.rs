mod common;

use std::path::PathBuf;

use inox_symbolic::ast::BinaryOperator;
use inox_symbolic::{AstBuilder, CheckInput, CheckOptions, Chunk, NodeId, Value, ANY_BOOL};
use pretty_assertions::assert_eq;

use common::{messages, run_input};

/// A module mixing branches, calls, methods and errors.
fn program() -> Chunk {
    let b = AstBuilder::new();
    let describe = b.function(
        vec![("value", None)],
        None,
        vec![
            b.if_statement(
                b.binary(BinaryOperator::Is, b.ident("value"), b.pattern("int")),
                vec![b.return_statement(Some(b.str("int")))],
                None,
            ),
            b.return_statement(Some(b.ident("unknown_name"))),
        ],
    );
    let counter = b.object(vec![
        ("count", b.int(0)),
        (
            "next",
            b.function(
                vec![],
                None,
                vec![b.return_statement(Some(b.member(b.self_expression(), "count")))],
            ),
        ),
    ]);
    b.chunk(
        "main",
        vec![
            b.function_declaration("describe", describe),
            b.local("counter", counter),
            b.if_statement(
                b.global("flag"),
                vec![b.assign(b.ident("x"), b.call(b.ident("describe"), vec![b.int(1)]))],
                Some(vec![b.assign(b.ident("x"), b.list(vec![b.int(1), b.int(2)]))]),
            ),
            b.local("y", b.index(b.list(vec![b.int(1)]), b.int(3))),
            b.expression_statement(b.call(b.member(b.ident("counter"), "next"), vec![])),
        ],
    )
}

fn run_program() -> inox_symbolic::CheckOutput {
    run_input(CheckInput::new(program()).with_global("flag", ANY_BOOL))
}

#[test]
fn checking_twice_gives_identical_results() {
    let first = run_program();
    let second = run_program();

    assert!(first.has_errors(), "{:?}", messages(&first));
    assert_eq!(first.diagnostics.entries(), second.diagnostics.entries());

    let first_values: Vec<(NodeId, Value)> = first
        .data
        .node_values()
        .map(|(node, value)| (*node, value.clone()))
        .collect();
    let second_values: Vec<(NodeId, Value)> = second
        .data
        .node_values()
        .map(|(node, value)| (*node, value.clone()))
        .collect();
    assert_eq!(first_values, second_values);
}

#[test]
fn error_in_function_body_is_reported_once() {
    let output = run_program();
    let unknown = messages(&output)
        .into_iter()
        .filter(|message| message.contains("unknown_name"))
        .count();
    assert_eq!(unknown, 1);
}

#[test]
fn located_messages_name_the_chunk_and_position() {
    let output = run_program();
    let diagnostic = output
        .diagnostics
        .errors()
        .find(|diagnostic| diagnostic.message.contains("index is out of bounds"))
        .expect("out of bounds index should be reported");
    let location = diagnostic.location.as_deref().expect("location");
    assert!(location.starts_with("main:"), "{location}");
    assert!(
        diagnostic.located_message.starts_with("check(symbolic): main:"),
        "{}",
        diagnostic.located_message
    );
    assert!(diagnostic.located_message.ends_with("index is out of bounds"));
}

#[test]
fn locations_are_relative_to_the_location_root() {
    let b = AstBuilder::new();
    let mut chunk = b.chunk("main", vec![b.local("a", b.ident("missing"))]);
    chunk.path = Some(PathBuf::from("/project/src/main.ix"));
    let options = CheckOptions {
        location_root: Some(PathBuf::from("/project")),
        ..CheckOptions::default()
    };

    let output = run_input(CheckInput::new(chunk).with_options(options));
    let location = output.diagnostics.entries()[0]
        .location
        .clone()
        .expect("location");
    assert!(location.starts_with("src/main.ix:"), "{location}");
}
