mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use inox_symbolic::ast::{
    BinaryOperator, Block, ExpressionKind, MatchCase, MatchStatement, StatementKind,
};
use inox_symbolic::{
    join_values, AstBuilder, CheckInput, ObjectValue, PropertyMap, Value, ANY_INT, ANY_STR, NIL,
};
use pretty_assertions::assert_eq;

use common::{assert_clean, messages, run_input};

fn int_or_str() -> Value {
    join_values([ANY_INT, ANY_STR])
}

#[test]
fn is_test_narrows_both_branches() {
    let b = AstBuilder::new();
    let in_consequent = b.ident("x");
    let consequent_id = in_consequent.id;
    let in_alternate = b.ident("x");
    let alternate_id = in_alternate.id;
    let after = b.ident("x");
    let after_id = after.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.if_statement(
                b.binary(BinaryOperator::Is, b.ident("x"), b.pattern("int")),
                vec![b.expression_statement(in_consequent)],
                Some(vec![b.expression_statement(in_alternate)]),
            ),
            b.expression_statement(after),
        ],
    );

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(consequent_id), Some(&ANY_INT));
    assert_eq!(output.data.node_value(alternate_id), Some(&ANY_STR));
    assert_eq!(output.data.node_value(after_id), Some(&int_or_str()));
}

#[test]
fn nil_comparison_removes_nil() {
    let b = AstBuilder::new();
    let read = b.ident("maybe");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![b.if_statement(
            b.binary(BinaryOperator::NotEqual, b.ident("maybe"), b.nil()),
            vec![b.expression_statement(read)],
            None,
        )],
    );

    let input = CheckInput::new(chunk).with_global("maybe", join_values([NIL, ANY_INT]));
    let output = run_input(input);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_INT));
}

#[test]
fn property_narrowing_rebuilds_the_object() {
    let b = AstBuilder::new();
    let read = b.member(b.ident("config"), "port");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![b.if_statement(
            b.binary(
                BinaryOperator::NotEqual,
                b.member(b.ident("config"), "port"),
                b.nil(),
            ),
            vec![b.expression_statement(read)],
            None,
        )],
    );

    let entries = BTreeMap::from([("port".to_string(), join_values([NIL, ANY_INT]))]);
    let config = Value::Object(Arc::new(ObjectValue::new(PropertyMap::exact(entries))));
    let output = run_input(CheckInput::new(chunk).with_global("config", config));
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_INT));
}

#[test]
fn negated_test_swaps_the_branches() {
    let b = AstBuilder::new();
    let read = b.ident("x");
    let read_id = read.id;
    let test = b.unary(
        inox_symbolic::ast::UnaryOperator::Not,
        b.binary(BinaryOperator::Is, b.ident("x"), b.pattern("int")),
    );
    let chunk = b.chunk(
        "main",
        vec![b.if_statement(test, vec![b.expression_statement(read)], None)],
    );

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_STR));
}

#[test]
fn match_cases_narrow_the_discriminant() {
    let b = AstBuilder::new();
    let in_case = b.ident("x");
    let case_id = in_case.id;
    let in_default = b.ident("x");
    let default_id = in_default.id;
    let statement = b.statement(StatementKind::Match(MatchStatement {
        discriminant: b.ident("x"),
        cases: vec![MatchCase {
            values: vec![b.pattern("int")],
            group_matching_variable: None,
            block: Block {
                statements: vec![b.expression_statement(in_case)],
            },
        }],
        default: Some(Block {
            statements: vec![b.expression_statement(in_default)],
        }),
    }));
    let chunk = b.chunk("main", vec![statement]);

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(case_id), Some(&ANY_INT));
    assert_eq!(output.data.node_value(default_id), Some(&ANY_STR));
}

#[test]
fn assertion_narrows_the_following_statements() {
    let b = AstBuilder::new();
    let read = b.ident("x");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.statement(StatementKind::Assertion(b.binary(
                BinaryOperator::Is,
                b.ident("x"),
                b.pattern("str"),
            ))),
            b.expression_statement(read),
        ],
    );

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_STR));
}

#[test]
fn failed_regex_match_keeps_every_string() {
    let b = AstBuilder::new();
    let read = b.ident("x");
    let read_id = read.id;
    let regex = b.expression(ExpressionKind::RegexPattern("^a+$".to_string()));
    let chunk = b.chunk(
        "main",
        vec![b.if_statement(
            b.binary(BinaryOperator::Match, b.ident("x"), regex),
            vec![],
            Some(vec![b.expression_statement(read)]),
        )],
    );

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&int_or_str()));
}

#[test]
fn match_default_after_regex_case_keeps_the_discriminant() {
    let b = AstBuilder::new();
    let in_default = b.ident("x");
    let default_id = in_default.id;
    let statement = b.statement(StatementKind::Match(MatchStatement {
        discriminant: b.ident("x"),
        cases: vec![MatchCase {
            values: vec![b.expression(ExpressionKind::RegexPattern("^a+$".to_string()))],
            group_matching_variable: None,
            block: Block { statements: vec![] },
        }],
        default: Some(Block {
            statements: vec![b.expression_statement(in_default)],
        }),
    }));
    let chunk = b.chunk("main", vec![statement]);

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(default_id), Some(&int_or_str()));
}

#[test]
fn failed_match_of_a_type_pattern_union_removes_its_members() {
    let b = AstBuilder::new();
    let read = b.ident("x");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![b.if_statement(
            b.binary(
                BinaryOperator::Match,
                b.ident("x"),
                b.pattern_union(vec![b.pattern("int"), b.pattern("bool")]),
            ),
            vec![],
            Some(vec![b.expression_statement(read)]),
        )],
    );

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_STR));
}

#[test]
fn narrowing_reuses_the_checked_operand_without_reporting_twice() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.if_statement(
            b.binary(BinaryOperator::Equal, b.ident("x"), b.ident("missing")),
            vec![],
            None,
        )],
    );

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    let reported = messages(&output)
        .into_iter()
        .filter(|message| message.contains("variable 'missing' is not declared"))
        .count();
    assert_eq!(reported, 1, "{:?}", messages(&output));
}

#[test]
fn equality_narrowing_reuses_the_recorded_operand_value() {
    let b = AstBuilder::new();
    let compared = b.int(1);
    let compared_id = compared.id;
    let read = b.ident("x");
    let read_id = read.id;
    let chunk = b.chunk(
        "main",
        vec![b.if_statement(
            b.binary(BinaryOperator::Equal, b.ident("x"), compared),
            vec![b.expression_statement(read)],
            None,
        )],
    );

    let output = run_input(CheckInput::new(chunk).with_global("x", int_or_str()));
    assert_clean(&output);
    assert_eq!(output.data.node_value(compared_id), Some(&Value::Int(Some(1))));
    assert_eq!(output.data.node_value(read_id), Some(&Value::Int(Some(1))));
}
