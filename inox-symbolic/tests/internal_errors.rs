mod common;

use inox_symbolic::ast::{ExpressionKind, InclusionImport, LifetimeJobExpression, StatementKind};
use inox_symbolic::{check, AstBuilder, CancelSignal, CheckError, CheckInput, CheckOptions};

use common::init_test_logging;

fn check_err(input: CheckInput) -> CheckError {
    init_test_logging();
    check(input).expect_err("check should fail")
}

#[test]
fn cancelled_check_stops() {
    let b = AstBuilder::new();
    let chunk = b.chunk("main", vec![b.local("a", b.int(1))]);
    let signal = CancelSignal::new();
    signal.cancel();

    let error = check_err(CheckInput::new(chunk).with_cancel_signal(signal));
    assert!(matches!(error, CheckError::Cancelled), "{error}");
    assert!(error.is_interruption());
}

#[test]
fn step_budget_is_enforced() {
    let b = AstBuilder::new();
    let statements = (0..20)
        .map(|index| b.local(&format!("v{index}"), b.int(index)))
        .collect();
    let chunk = b.chunk("main", statements);
    let options = CheckOptions {
        max_steps: Some(5),
        ..CheckOptions::default()
    };

    let error = check_err(CheckInput::new(chunk).with_options(options));
    assert!(matches!(error, CheckError::StepBudgetExhausted(5)), "{error}");
}

#[test]
fn literal_assignment_target_is_an_invalid_tree() {
    let b = AstBuilder::new();
    let chunk = b.chunk("main", vec![b.assign(b.int(1), b.int(2))]);

    let error = check_err(CheckInput::new(chunk));
    assert!(matches!(error, CheckError::InvalidAst { .. }), "{error}");
    assert!(!error.is_interruption());
}

#[test]
fn implicit_lifetime_job_outside_object() {
    let b = AstBuilder::new();
    let job = b.expression(ExpressionKind::LifetimeJob(LifetimeJobExpression {
        meta: Box::new(b.object(vec![])),
        subject: None,
        module: b.module(vec![]),
    }));
    let chunk = b.chunk("main", vec![b.local("job", job)]);

    let error = check_err(CheckInput::new(chunk));
    assert!(matches!(error, CheckError::MissingNextSelf { .. }), "{error}");
}

#[test]
fn inclusion_import_inside_function_is_unsupported() {
    let b = AstBuilder::new();
    let include = b.statement(StatementKind::InclusionImport(InclusionImport {
        source: "lib.json".to_string(),
    }));
    let function = b.function(vec![], None, vec![include]);
    let chunk = b.chunk("main", vec![b.function_declaration("f", function)]);

    let error = check_err(CheckInput::new(chunk));
    assert!(
        matches!(
            error,
            CheckError::Unsupported {
                construct: "inclusion import",
                ..
            }
        ),
        "{error}"
    );
}

#[test]
fn invalid_options_are_rejected() {
    let error = CheckOptions::from_json_str(r#"{"unknown_field": 1}"#)
        .expect_err("unknown fields are rejected");
    assert!(matches!(error, CheckError::InvalidOptions(_)), "{error}");
}
