mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use inox_symbolic::ast::{
    DictionaryEntry, Element, Expression, ExpressionKind, MappingEntry, ObjectLiteral,
    ObjectProperty, SequenceLiteral, StringTemplate, TemplatePart, XmlChild, XmlElement,
    XmlExpression,
};
use inox_symbolic::{
    AstBuilder, CheckInput, HostFunction, ObjectValue, PropertyMap, Value, ANY_INT, ANY_STR,
};
use pretty_assertions::assert_eq;

use common::{assert_clean, assert_reports, messages, run, run_input};

#[test]
fn unexpected_property_is_reported_but_the_object_keeps_it() {
    let b = AstBuilder::new();
    let literal = b.object(vec![
        ("a", b.int(1)),
        ("b", b.function(vec![], None, vec![])),
    ]);
    let literal_id = literal.id;
    let chunk = b.chunk(
        "main",
        vec![b.typed_local(
            "o",
            b.object_pattern(vec![("a", b.pattern("int"))], true),
            literal,
        )],
    );

    let output = run(chunk);
    assert_reports(&output, "unexpected property b");
    let Some(Value::Object(object)) = output.data.node_value(literal_id) else {
        panic!("object literal should be recorded, found {:?}", messages(&output));
    };
    assert!(object.properties.get("a").is_some());
    assert!(matches!(object.properties.get("b"), Some(Value::Function(Some(_)))));
}

#[test]
fn duplicate_object_key() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.local("o", b.object(vec![("a", b.int(1)), ("a", b.int(2))]))],
    );

    let output = run(chunk);
    assert_reports(&output, "duplicate key 'a'");
}

#[test]
fn record_values_must_be_immutable() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.local("r", b.record(vec![("items", b.list(vec![]))]))],
    );

    let output = run(chunk);
    assert_reports(
        &output,
        "invalid value for key 'items', values of a record should be immutable",
    );
}

#[test]
fn tuple_elements_must_be_immutable() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.local("t", b.tuple(vec![b.int(1), b.list(vec![])]))],
    );

    let output = run(chunk);
    assert_reports(&output, "elements of a tuple should be immutable");
}

#[test]
fn list_literal_keeps_known_elements() {
    let b = AstBuilder::new();
    let literal = b.list(vec![b.int(1), b.str("a")]);
    let literal_id = literal.id;
    let chunk = b.chunk("main", vec![b.local("l", literal)]);

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(
        output.data.node_value(literal_id),
        Some(&Value::list(vec![Value::Int(Some(1)), Value::str("a")]))
    );
}

#[test]
fn annotated_list_rejects_other_elements() {
    let b = AstBuilder::new();
    let literal = b.expression(ExpressionKind::List(SequenceLiteral {
        type_annotation: Some(Box::new(b.pattern("int"))),
        elements: vec![Element {
            spread: false,
            value: b.str("a"),
        }],
    }));
    let chunk = b.chunk("main", vec![b.local("l", literal)]);

    let output = run(chunk);
    assert_reports(&output, "in a list of %int (annotation)");
}

#[test]
fn unknown_metaproperty_is_rejected() {
    let b = AstBuilder::new();
    let literal = b.expression(ExpressionKind::Object(ObjectLiteral {
        properties: Vec::new(),
        meta_properties: vec![ObjectProperty {
            key: Some(b.identifier("_foo_")),
            type_annotation: None,
            value: b.int(1),
        }],
        spreads: Vec::new(),
    }));
    let chunk = b.chunk("main", vec![b.local("o", literal)]);

    let output = run(chunk);
    assert_reports(&output, "cannot initialize metaproperty '_foo_'");
}

#[test]
fn methods_see_the_inferred_result_of_the_methods_they_call() {
    let b = AstBuilder::new();
    let total = b.function(
        vec![],
        None,
        vec![b.return_statement(Some(b.call(
            b.member(b.self_expression(), "tax"),
            vec![],
        )))],
    );
    let tax = b.function(vec![], None, vec![b.return_statement(Some(b.int(2)))]);
    let literal = b.object(vec![("total", total), ("tax", tax)]);
    let literal_id = literal.id;
    let chunk = b.chunk("main", vec![b.local("shop", literal)]);

    let output = run(chunk);
    assert_clean(&output);
    let Some(Value::Object(object)) = output.data.node_value(literal_id) else {
        panic!("object literal should be recorded");
    };
    let Some(Value::Function(Some(total))) = object.properties.get("total") else {
        panic!("total should be a function: {object:?}");
    };
    assert_eq!(total.inferred_return, Value::Int(Some(2)));
}

#[test]
fn untyped_method_cycle_is_reported() {
    let b = AstBuilder::new();
    let ping = b.function(
        vec![],
        None,
        vec![b.return_statement(Some(b.call(
            b.member(b.self_expression(), "pong"),
            vec![],
        )))],
    );
    let pong = b.function(
        vec![],
        None,
        vec![b.return_statement(Some(b.call(
            b.member(b.self_expression(), "ping"),
            vec![],
        )))],
    );
    let chunk = b.chunk(
        "main",
        vec![b.local("o", b.object(vec![("ping", ping), ("pong", pong)]))],
    );

    let output = run(chunk);
    assert_reports(&output, "method cycle detected between");
}

#[test]
fn string_concatenation_rejects_ints() {
    let b = AstBuilder::new();
    let concatenation = b.expression(ExpressionKind::Concatenation(vec![
        Element {
            spread: false,
            value: b.str("a"),
        },
        Element {
            spread: false,
            value: b.int(1),
        },
    ]));
    let chunk = b.chunk("main", vec![b.local("s", concatenation)]);

    let output = run(chunk);
    assert_reports(&output, "string concatenation: invalid element of type 1");
}

#[test]
fn tuple_concatenation_keeps_known_elements() {
    let b = AstBuilder::new();
    let concatenation = b.expression(ExpressionKind::Concatenation(vec![
        Element {
            spread: false,
            value: b.tuple(vec![b.int(1)]),
        },
        Element {
            spread: false,
            value: b.tuple(vec![b.int(2)]),
        },
    ]));
    let concatenation_id = concatenation.id;
    let chunk = b.chunk("main", vec![b.local("t", concatenation)]);

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(
        output.data.node_value(concatenation_id),
        Some(&Value::tuple(vec![Value::Int(Some(1)), Value::Int(Some(2))]))
    );
}

#[test]
fn duplicate_dictionary_key() {
    let b = AstBuilder::new();
    let dictionary = b.expression(ExpressionKind::Dictionary(vec![
        DictionaryEntry {
            key: b.str("k"),
            value: b.int(1),
        },
        DictionaryEntry {
            key: b.str("k"),
            value: b.int(2),
        },
    ]));
    let chunk = b.chunk("main", vec![b.local("d", dictionary)]);

    let output = run(chunk);
    assert_reports(&output, "duplicate key");
}

fn template(b: &AstBuilder, interpolated: Expression) -> Expression {
    b.expression(ExpressionKind::StringTemplate(StringTemplate {
        pattern: None,
        parts: vec![
            TemplatePart::Slice("hello ".to_string()),
            TemplatePart::Interpolation {
                member: None,
                expression: interpolated,
            },
        ],
    }))
}

#[test]
fn string_template_interpolating_a_string_is_a_string() {
    let b = AstBuilder::new();
    let literal = template(&b, b.global("name"));
    let literal_id = literal.id;
    let chunk = b.chunk("main", vec![b.local("greeting", literal)]);

    let output = run_input(CheckInput::new(chunk).with_global("name", ANY_STR));
    assert_clean(&output);
    assert_eq!(output.data.node_value(literal_id), Some(&ANY_STR));
}

#[test]
fn string_template_interpolating_an_int_is_reported() {
    let b = AstBuilder::new();
    let chunk = b.chunk("main", vec![b.local("greeting", template(&b, b.int(1)))]);

    let output = run(chunk);
    assert_reports(&output, "result of interpolation expression should be a string");
}

#[test]
fn string_template_with_missing_pattern_namespace_is_reported() {
    let b = AstBuilder::new();
    let literal = b.expression(ExpressionKind::StringTemplate(StringTemplate {
        pattern: Some(Box::new(b.expression(ExpressionKind::PatternNamespaceMember {
            namespace: "sql".to_string(),
            member: b.identifier("query"),
        }))),
        parts: vec![TemplatePart::Slice("SELECT 1".to_string())],
    }));
    let chunk = b.chunk("main", vec![b.local("query", literal)]);

    let output = run(chunk);
    assert_reports(&output, "pattern namespace 'sql' does not exist");
}

fn xml(b: &AstBuilder, child: Expression) -> Expression {
    b.expression(ExpressionKind::Xml(XmlExpression {
        namespace: Box::new(b.global("html")),
        element: XmlElement {
            name: b.identifier("div"),
            attributes: vec![],
            children: vec![
                XmlChild::Text("count: ".to_string()),
                XmlChild::Interpolation(child),
            ],
        },
    }))
}

fn namespace_object(properties: Vec<(&str, Value)>) -> Value {
    let entries = properties
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect::<BTreeMap<_, _>>();
    Value::Object(Arc::new(ObjectValue::new(PropertyMap::exact(entries))))
}

#[test]
fn xml_expression_takes_the_result_of_the_namespace_factory() {
    let b = AstBuilder::new();
    let element = xml(&b, b.int(1));
    let element_id = element.id;
    let chunk = b.chunk("main", vec![b.local("element", element)]);
    let factory = HostFunction::new("create_element", vec![], ANY_STR);
    let html = namespace_object(vec![(
        "from_xml_factory",
        Value::HostFunction(Arc::new(factory)),
    )]);

    let output = run_input(CheckInput::new(chunk).with_global("html", html));
    assert_clean(&output);
    assert_eq!(output.data.node_value(element_id), Some(&ANY_STR));
}

#[test]
fn xml_namespace_without_factory_is_reported() {
    let b = AstBuilder::new();
    let chunk = b.chunk("main", vec![b.local("element", xml(&b, b.int(1)))]);
    let html = namespace_object(vec![("name", Value::str("html"))]);

    let output = run_input(CheckInput::new(chunk).with_global("html", html));
    assert_reports(&output, "has no callable .from_xml_factory property");
}

#[test]
fn xml_interpolations_are_checked() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![b.local("element", xml(&b, b.ident("missing")))],
    );

    let output = run_input(CheckInput::new(chunk).with_global("html", Value::Any));
    assert_reports(&output, "variable 'missing' is not declared");
}

#[test]
fn mapping_key_variable_is_bound_in_the_entry_value() {
    let b = AstBuilder::new();
    let read = b.ident("n");
    let read_id = read.id;
    let mapping = b.expression(ExpressionKind::Mapping(vec![MappingEntry {
        key: b.pattern("int"),
        key_variable: Some(b.identifier("n")),
        value: read,
    }]));
    let mapping_id = mapping.id;
    let chunk = b.chunk("main", vec![b.local("m", mapping)]);

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(read_id), Some(&ANY_INT));
    assert_eq!(output.data.node_value(mapping_id), Some(&Value::Mapping));
}

#[test]
fn mapping_key_variable_is_not_visible_after_the_mapping() {
    let b = AstBuilder::new();
    let mapping = b.expression(ExpressionKind::Mapping(vec![MappingEntry {
        key: b.pattern("int"),
        key_variable: Some(b.identifier("n")),
        value: b.ident("n"),
    }]));
    let chunk = b.chunk(
        "main",
        vec![
            b.local("m", mapping),
            b.expression_statement(b.ident("n")),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "variable 'n' is not declared");
    assert_eq!(output.diagnostics.errors().count(), 1, "{:?}", messages(&output));
}
