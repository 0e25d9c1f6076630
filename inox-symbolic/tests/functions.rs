mod common;

use inox_symbolic::ast::{BinaryOperator, Element};
use inox_symbolic::{AstBuilder, CheckInput, CheckOptions, Value, ANY_INT};

use common::{assert_clean, assert_reports, run, run_input};

#[test]
fn self_recursive_declaration_without_return_type_is_accepted() {
    let b = AstBuilder::new();
    let read = b.ident("result");
    let read_id = read.id;
    let recursive = b.function(
        vec![],
        None,
        vec![b.return_statement(Some(b.call(b.ident("f"), vec![])))],
    );
    let chunk = b.chunk(
        "main",
        vec![
            b.function_declaration("f", recursive),
            b.local("result", b.call(b.ident("f"), vec![])),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&Value::Nil));
}

#[test]
fn nested_recursive_declaration_is_rejected() {
    let b = AstBuilder::new();
    let inner = b.function(
        vec![],
        None,
        vec![b.return_statement(Some(b.call(b.ident("inner"), vec![])))],
    );
    let outer = b.function(
        vec![],
        None,
        vec![
            b.function_declaration("inner", inner),
            b.return_statement(Some(b.int(1))),
        ],
    );
    let chunk = b.chunk("main", vec![b.function_declaration("outer", outer)]);

    let output = run(chunk);
    assert_reports(&output, "nested recursive function declarations are not allowed");
}

#[test]
fn call_with_too_many_arguments() {
    let b = AstBuilder::new();
    let identity = b.function(
        vec![("value", None)],
        None,
        vec![b.return_statement(Some(b.ident("value")))],
    );
    let chunk = b.chunk(
        "main",
        vec![
            b.function_declaration("identity", identity),
            b.expression_statement(b.call(b.ident("identity"), vec![b.int(1), b.int(2)])),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "invalid number of arguments : 2, 1 was expected");
}

#[test]
fn argument_not_matching_parameter_pattern() {
    let b = AstBuilder::new();
    let double = b.function(
        vec![("n", Some(b.pattern("int")))],
        None,
        vec![b.return_statement(Some(b.binary(
            BinaryOperator::Add,
            b.ident("n"),
            b.ident("n"),
        )))],
    );
    let chunk = b.chunk(
        "main",
        vec![
            b.function_declaration("double", double),
            b.expression_statement(b.call(b.ident("double"), vec![b.str("two")])),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "invalid value for argument at position 0");
}

#[test]
fn declared_return_type_is_the_call_result() {
    let b = AstBuilder::new();
    let read = b.ident("n");
    let read_id = read.id;
    let one = b.function(
        vec![],
        Some(b.pattern("int")),
        vec![b.return_statement(Some(b.int(1)))],
    );
    let chunk = b.chunk(
        "main",
        vec![
            b.function_declaration("one", one),
            b.local("n", b.call(b.ident("one"), vec![])),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_INT));
}

#[test]
fn inferred_return_follows_the_arguments() {
    let b = AstBuilder::new();
    let read = b.ident("same");
    let read_id = read.id;
    let identity = b.function(
        vec![("value", None)],
        None,
        vec![b.return_statement(Some(b.ident("value")))],
    );
    let chunk = b.chunk(
        "main",
        vec![
            b.function_declaration("identity", identity),
            b.local("same", b.call(b.ident("identity"), vec![b.str("kept")])),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&Value::str("kept")));
}

#[test]
fn typed_function_without_return_statement() {
    let b = AstBuilder::new();
    let broken = b.function(vec![], Some(b.pattern("int")), vec![]);
    let chunk = b.chunk("main", vec![b.function_declaration("broken", broken)]);

    let output = run(chunk);
    assert_reports(&output, "missing return in function");
}

#[test]
fn returned_value_must_match_return_type() {
    let b = AstBuilder::new();
    let wrong = b.function(
        vec![],
        Some(b.pattern("int")),
        vec![b.return_statement(Some(b.str("a")))],
    );
    let chunk = b.chunk("main", vec![b.function_declaration("wrong", wrong)]);

    let output = run(chunk);
    assert_reports(&output, "invalid return value");
}

#[test]
fn calling_an_int_is_reported() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![
            b.local("n", b.int(1)),
            b.expression_statement(b.call(b.ident("n"), vec![])),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "cannot call 1");
}

#[test]
fn spread_argument_to_fixed_arity_function() {
    let b = AstBuilder::new();
    let identity = b.function(
        vec![("value", None)],
        None,
        vec![b.return_statement(Some(b.ident("value")))],
    );
    let spread = Element {
        spread: true,
        value: b.list(vec![b.int(1)]),
    };
    let chunk = b.chunk(
        "main",
        vec![
            b.function_declaration("identity", identity),
            b.expression_statement(b.call_with(b.ident("identity"), vec![spread])),
        ],
    );

    let output = run(chunk);
    assert_reports(
        &output,
        "spread arguments are not supported when calling non-variadic functions",
    );
}

#[test]
fn function_name_cannot_be_declared_twice() {
    let b = AstBuilder::new();
    let first = b.function(vec![], None, vec![]);
    let second = b.function(vec![], None, vec![]);
    let chunk = b.chunk(
        "main",
        vec![
            b.function_declaration("twice", first),
            b.function_declaration("twice", second),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "attempt to assign constant global 'twice'");
}

#[test]
fn arrow_function_result_is_its_body() {
    let b = AstBuilder::new();
    let read = b.ident("answer");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.local("answer_fn", b.arrow_function(vec![], b.int(42))),
            b.local("answer", b.call(b.ident("answer_fn"), vec![])),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&Value::Int(Some(42))));
}

fn base_globals_input(chunk: inox_symbolic::Chunk) -> CheckInput {
    CheckInput::new(chunk).with_options(CheckOptions {
        use_base_globals: true,
        ..CheckOptions::default()
    })
}

#[test]
fn base_host_function_returns_its_declared_result() {
    let b = AstBuilder::new();
    let read = b.ident("parsed");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.local("parsed", b.call(b.ident("parse_int"), vec![b.str("3")])),
            b.expression_statement(read),
        ],
    );

    let output = run_input(base_globals_input(chunk));
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_INT));
}

#[test]
fn base_host_function_checks_its_arguments() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.expression_statement(b.call(b.ident("parse_int"), vec![b.int(3)]))],
    );

    let output = run_input(base_globals_input(chunk));
    assert_reports(&output, "invalid value for argument at position 0");
}

#[test]
fn variadic_host_function_accepts_any_count() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.expression_statement(b.call(
            b.ident("print"),
            vec![b.int(1), b.str("a"), b.bool(true)],
        ))],
    );

    let output = run_input(base_globals_input(chunk));
    assert_clean(&output);
}

#[test]
fn typed_function_returning_in_one_branch_only_is_reported() {
    let b = AstBuilder::new();
    let partial = b.function(
        vec![("flag", Some(b.pattern("bool")))],
        Some(b.pattern("int")),
        vec![b.if_statement(
            b.ident("flag"),
            vec![b.return_statement(Some(b.int(1)))],
            None,
        )],
    );
    let chunk = b.chunk("main", vec![b.function_declaration("partial", partial)]);

    let output = run(chunk);
    assert_reports(&output, "missing unconditional return in function");
}

#[test]
fn typed_function_returning_in_both_branches_is_accepted() {
    let b = AstBuilder::new();
    let total = b.function(
        vec![("flag", Some(b.pattern("bool")))],
        Some(b.pattern("int")),
        vec![b.if_statement(
            b.ident("flag"),
            vec![b.return_statement(Some(b.int(1)))],
            Some(vec![b.return_statement(Some(b.int(2)))]),
        )],
    );
    let chunk = b.chunk("main", vec![b.function_declaration("total", total)]);

    let output = run(chunk);
    assert_clean(&output);
}
