mod common;

use inox_symbolic::ast::{
    AssignmentOperator, BinaryOperator, Expression, ExpressionKind, MultiAssignment,
    SequencePatternLiteral, SliceExpression, StatementKind,
};
use inox_symbolic::{AstBuilder, CheckInput, SequenceShape, Value, ANY_BOOL, ANY_INT};

use common::{assert_clean, assert_reports, messages, run, run_input};

#[test]
fn failed_reassignment_of_typed_local_falls_back_to_any() {
    let b = AstBuilder::new();
    let read = b.ident("x");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.typed_local("x", b.pattern("int"), b.int(1)),
            b.assign(b.ident("x"), b.str("a")),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "a(n) \"a\" is not assignable to a variable of type int");
    assert_eq!(output.diagnostics.errors().count(), 1, "{:?}", messages(&output));
    assert_eq!(output.data.node_value(read_id), Some(&Value::Any));
}

#[test]
fn typed_local_rejects_initializer() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.typed_local("flag", b.pattern("bool"), b.int(1))],
    );

    let output = run(chunk);
    assert_reports(&output, "a(n) 1 is not assignable to a variable of type bool");
}

#[test]
fn reassignment_keeps_literal_precision() {
    let b = AstBuilder::new();
    let read = b.ident("x");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.typed_local("x", b.pattern("int"), b.int(1)),
            b.assign(b.ident("x"), b.int(2)),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&Value::Int(Some(2))));
}

#[test]
fn index_assignment_out_of_bounds_is_reported() {
    let b = AstBuilder::new();
    let assigned = b.int(7);
    let assigned_id = assigned.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.local("list", b.list(vec![b.int(1), b.int(2), b.int(3)])),
            b.assign(b.index(b.ident("list"), b.int(10)), assigned),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "index is out of bounds");
    assert_eq!(output.data.node_value(assigned_id), Some(&Value::Int(Some(7))));
}

#[test]
fn compound_assignment_requires_int_target() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![
            b.local("name", b.str("a")),
            b.assign_with(AssignmentOperator::Add, b.ident("name"), b.int(1)),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "invalid assignment: left hand side is not an integer");
}

#[test]
fn compound_assignment_requires_int_value() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![
            b.local("count", b.int(0)),
            b.assign_with(AssignmentOperator::Add, b.ident("count"), b.str("1")),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "invalid assignment: right hand side is not an integer");
}

#[test]
fn constant_global_cannot_be_assigned() {
    let b = AstBuilder::new();
    let chunk = b.chunk("main", vec![b.assign(b.global("limit"), b.int(4))]);

    let input = CheckInput::new(chunk).with_global("limit", Value::Int(Some(3)));
    let output = run_input(input);
    assert_reports(&output, "attempt to assign constant global 'limit'");
}

#[test]
fn new_property_on_exact_object_is_rejected() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![
            b.local("point", b.object(vec![("x", b.int(1))])),
            b.assign(b.member(b.ident("point"), "y"), b.int(2)),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "cannot add new property .y to an exact object");
}

#[test]
fn property_assignment_narrows_the_object() {
    let b = AstBuilder::new();
    let read = b.member(b.ident("point"), "x");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.local("point", b.object(vec![("x", b.int(1))])),
            b.assign(b.member(b.ident("point"), "x"), b.int(5)),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&Value::Int(Some(5))));
}

#[test]
fn multi_assignment_needs_two_elements() {
    let b = AstBuilder::new();
    let assignment = StatementKind::MultiAssignment(MultiAssignment {
        variables: vec![b.ident("first"), b.ident("second")],
        value: b.list(vec![b.int(1)]),
        nillable: false,
    });
    let chunk = b.chunk("main", vec![b.statement(assignment)]);

    let output = run(chunk);
    assert_reports(&output, "list should have a length greater or equal to two");
}

#[test]
fn nillable_multi_assignment_binds_missing_elements_to_nil() {
    let b = AstBuilder::new();
    let read = b.ident("second");
    let read_id = read.id;
    let assignment = StatementKind::MultiAssignment(MultiAssignment {
        variables: vec![b.ident("first"), b.ident("second")],
        value: b.list(vec![b.int(1)]),
        nillable: true,
    });
    let chunk = b.chunk(
        "main",
        vec![b.statement(assignment), b.expression_statement(read)],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&Value::Nil));
}

#[test]
fn union_of_int_literals_behaves_as_int_in_arithmetic() {
    let b = AstBuilder::new();
    let sum = b.binary(BinaryOperator::Add, b.ident("x"), b.int(1));
    let sum_id = sum.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.if_statement(
                b.global("flag"),
                vec![b.assign(b.ident("x"), b.int(1))],
                Some(vec![b.assign(b.ident("x"), b.int(2))]),
            ),
            b.local("y", sum),
        ],
    );

    let output = run_input(CheckInput::new(chunk).with_global("flag", ANY_BOOL));
    assert_clean(&output);
    assert_eq!(output.data.node_value(sum_id), Some(&ANY_INT));
}

#[test]
fn multi_assignment_needs_an_element_per_variable() {
    let b = AstBuilder::new();
    let last = b.ident("d");
    let last_id = last.id;
    let assignment = StatementKind::MultiAssignment(MultiAssignment {
        variables: vec![b.ident("a"), b.ident("c"), last],
        value: b.list(vec![b.int(1), b.int(2)]),
        nillable: false,
    });
    let chunk = b.chunk("main", vec![b.statement(assignment)]);

    let output = run(chunk);
    assert_reports(&output, "list should have a length greater or equal to 3");
    assert_eq!(output.data.node_value(last_id), Some(&Value::Any));
}

#[test]
fn multi_assignment_records_each_variable() {
    let b = AstBuilder::new();
    let second = b.ident("second");
    let second_id = second.id;
    let assignment = StatementKind::MultiAssignment(MultiAssignment {
        variables: vec![b.ident("first"), second],
        value: b.list(vec![b.int(1), b.int(2)]),
        nillable: false,
    });
    let chunk = b.chunk("main", vec![b.statement(assignment)]);

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(second_id), Some(&Value::Int(Some(2))));
}

fn int_list_pattern(b: &AstBuilder) -> Expression {
    b.expression(ExpressionKind::ListPattern(SequencePatternLiteral {
        elements: vec![],
        general_element: Some(Box::new(b.pattern("int"))),
    }))
}

fn first_slice(b: &AstBuilder, name: &str) -> Expression {
    b.expression(ExpressionKind::Slice(SliceExpression {
        indexed: Box::new(b.ident(name)),
        start: Some(Box::new(b.int(0))),
        end: Some(Box::new(b.int(1))),
    }))
}

#[test]
fn slice_assignment_keeps_the_element_type() {
    let b = AstBuilder::new();
    let read = b.ident("l");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.local("l", b.list(vec![b.int(1), b.int(2), b.int(3)])),
            b.assign(first_slice(&b, "l"), b.list(vec![b.int(4)])),
            b.expression_statement(read),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    let Some(Value::List(list)) = output.data.node_value(read_id) else {
        panic!("l should be recorded as a list");
    };
    match &list.shape {
        SequenceShape::Generic(element) => assert_eq!(element, &ANY_INT),
        SequenceShape::Known(elements) => panic!("length should be unknown, found {elements:?}"),
    }
}

#[test]
fn slice_assignment_of_other_elements_into_typed_list_is_reported() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![
            b.typed_local(
                "l",
                int_list_pattern(&b),
                b.list(vec![b.int(1), b.int(2), b.int(3)]),
            ),
            b.assign(first_slice(&b, "l"), b.list(vec![b.str("a")])),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "impossible to know the updated elements");
}

#[test]
fn element_assignment_into_typed_list_must_match_its_element_type() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![
            b.typed_local("l", int_list_pattern(&b), b.list(vec![b.int(1)])),
            b.assign(b.index(b.ident("l"), b.int(0)), b.int(2)),
            b.assign(b.index(b.ident("l"), b.int(0)), b.str("a")),
        ],
    );

    let output = run(chunk);
    let messages = messages(&output);
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(messages[0].contains("impossible to know the updated element"), "{messages:?}");
}
