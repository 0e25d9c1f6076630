#![allow(dead_code)]

use inox_symbolic::{check, CheckInput, CheckOutput, Chunk};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once per test binary. `RUST_LOG` selects the level.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn run(chunk: Chunk) -> CheckOutput {
    run_input(CheckInput::new(chunk))
}

pub fn run_input(input: CheckInput) -> CheckOutput {
    init_test_logging();
    check(input).expect("check should complete")
}

pub fn messages(output: &CheckOutput) -> Vec<String> {
    output
        .diagnostics
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.message.clone())
        .collect()
}

pub fn assert_reports(output: &CheckOutput, expected: &str) {
    let messages = messages(output);
    assert!(
        messages.iter().any(|msg| msg.contains(expected)),
        "expected diagnostic containing {expected:?}, found {:?}",
        messages
    );
}

pub fn assert_clean(output: &CheckOutput) {
    let messages = messages(output);
    assert!(messages.is_empty(), "expected no diagnostics, found {:?}", messages);
}
