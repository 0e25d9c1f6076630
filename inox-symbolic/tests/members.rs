mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use inox_symbolic::ast::{ExpressionKind, ExtractionExpression};
use inox_symbolic::{AstBuilder, ObjectValue, PropertyMap, Value};
use pretty_assertions::assert_eq;

use common::{assert_clean, assert_reports, run};

#[test]
fn optional_member_of_a_missing_property_is_nil() {
    let b = AstBuilder::new();
    let present = b.optional_member(b.ident("config"), "port");
    let present_id = present.id;
    let absent = b.optional_member(b.ident("config"), "host");
    let absent_id = absent.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.local("config", b.object(vec![("port", b.int(8080))])),
            b.local("port", present),
            b.local("host", absent),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    assert_eq!(output.data.node_value(present_id), Some(&Value::Int(Some(8080))));
    assert_eq!(output.data.node_value(absent_id), Some(&Value::Nil));
}

#[test]
fn plain_member_of_a_missing_property_is_reported() {
    let b = AstBuilder::new();
    let chunk = b.chunk(
        "main",
        vec![
            b.local("config", b.object(vec![("port", b.int(8080))])),
            b.local("host", b.member(b.ident("config"), "host")),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "property .host does not exist");
}

#[test]
fn extraction_builds_an_exact_object_of_the_keys() {
    let b = AstBuilder::new();
    let extraction = b.expression(ExpressionKind::Extraction(ExtractionExpression {
        object: Box::new(b.ident("config")),
        keys: vec![b.identifier("port")],
    }));
    let extraction_id = extraction.id;
    let chunk = b.chunk(
        "main",
        vec![
            b.local(
                "config",
                b.object(vec![("port", b.int(8080)), ("name", b.str("api"))]),
            ),
            b.local("picked", extraction),
        ],
    );

    let output = run(chunk);
    assert_clean(&output);
    let expected = BTreeMap::from([("port".to_string(), Value::Int(Some(8080)))]);
    assert_eq!(
        output.data.node_value(extraction_id),
        Some(&Value::Object(Arc::new(ObjectValue::new(PropertyMap::exact(expected)))))
    );
}

#[test]
fn extraction_of_a_missing_key_is_reported() {
    let b = AstBuilder::new();
    let extraction = b.expression(ExpressionKind::Extraction(ExtractionExpression {
        object: Box::new(b.ident("config")),
        keys: vec![b.identifier("host")],
    }));
    let chunk = b.chunk(
        "main",
        vec![
            b.local("config", b.object(vec![("port", b.int(8080))])),
            b.local("picked", extraction),
        ],
    );

    let output = run(chunk);
    assert_reports(&output, "property .host does not exist");
}
